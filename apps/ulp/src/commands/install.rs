//! Install command.
//!
//! Installs or updates the selected tools one after another and prints the
//! files written plus any post-install notices.
//!
//! ## Usage
//!
//! ```bash
//! usr-local-pull install                        # every supported tool
//! usr-local-pull install --app bat --app fd     # only these
//! usr-local-pull install --keep-going           # continue past failures
//! ```
//!
//! ## Output Format
//!
//! ```text
//! bat: installed 0.24.0
//! fd: 10.2.0 is up to date
//!
//! Installed files:
//! - /usr/local/bin/bat
//! - /usr/local/share/zsh/site-functions/_bat
//! - /usr/local/share/man/man1/bat.1
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use usr_local_pull::{InstallOutcome, Installer, ReleaseCache, ReleaseClient, Settings};

use super::select_apps;

/// Arguments for the install command.
#[derive(Args, Debug, Default)]
pub struct InstallArgs {
    /// Only install this tool. May be repeated.
    #[arg(long = "app", value_name = "NAME")]
    pub apps: Vec<String>,

    /// Continue with the remaining tools when one fails.
    ///
    /// Failures are reported as they happen and the command exits with
    /// status 1 at the end.
    #[arg(long)]
    pub keep_going: bool,
}

/// Files and notices collected across installs.
#[derive(Debug, Default)]
struct Summary {
    files: Vec<PathBuf>,
    notices: Vec<(&'static str, &'static str)>,
}

impl Summary {
    fn print(&self) {
        if !self.files.is_empty() {
            println!();
            println!("Installed files:");
            for file in &self.files {
                println!("- {}", file.display());
            }
        }
        for (app, notice) in &self.notices {
            println!();
            println!("{app}: {notice}");
        }
    }
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error for unknown tool names, on the first failed install,
/// or, with `--keep-going`, after all tools ran if any of them failed.
pub async fn execute(args: &InstallArgs, settings: &Settings) -> Result<()> {
    let apps = select_apps(&args.apps)?;
    let client =
        ReleaseClient::from_settings(settings).context("failed to set up the HTTP client")?;
    let mut cache = ReleaseCache::new(&settings.cache_dir);
    let installer = Installer::new(&settings.prefix, &client);

    tracing::info!(prefix = %settings.prefix.display(), "installing");

    let mut summary = Summary::default();
    let mut failed = Vec::new();

    for app in apps {
        match installer.install(app, &mut cache).await {
            Ok(InstallOutcome::UpToDate { version }) => {
                println!("{}: {version} is up to date", app.name);
            }
            Ok(InstallOutcome::Installed {
                previous,
                version,
                paths,
                notice,
            }) => {
                match previous {
                    Some(previous) => println!("{}: updated {previous} -> {version}", app.name),
                    None => println!("{}: installed {version}", app.name),
                }
                summary.files.extend(paths);
                if let Some(notice) = notice {
                    summary.notices.push((app.name, notice));
                }
            }
            Err(e) if args.keep_going => {
                eprintln!("Error: {:?}", anyhow::Error::new(e));
                failed.push(app.name);
            }
            Err(e) => {
                summary.print();
                return Err(e.into());
            }
        }
    }

    summary.print();

    if !failed.is_empty() {
        bail!("failed to install: {}", failed.join(", "));
    }
    Ok(())
}
