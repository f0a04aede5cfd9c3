//! Outdated command.
//!
//! Runs only the version check of each selected tool and prints the ones
//! that an install would touch. Nothing is downloaded besides release
//! metadata.
//!
//! ```bash
//! usr-local-pull outdated
//! usr-local-pull outdated --app jq
//! ```

use anyhow::{Context, Result};
use clap::Args;
use usr_local_pull::{Installer, ReleaseCache, ReleaseClient, Settings};

use super::select_apps;

/// Arguments for the outdated command.
#[derive(Args, Debug, Default)]
pub struct OutdatedArgs {
    /// Only check this tool. May be repeated.
    #[arg(long = "app", value_name = "NAME")]
    pub apps: Vec<String>,
}

/// Executes the outdated command.
///
/// # Errors
///
/// Returns an error for unknown tool names or if any version check fails.
pub async fn execute(args: &OutdatedArgs, settings: &Settings) -> Result<()> {
    let apps = select_apps(&args.apps)?;
    let client =
        ReleaseClient::from_settings(settings).context("failed to set up the HTTP client")?;
    let mut cache = ReleaseCache::new(&settings.cache_dir);
    let installer = Installer::new(&settings.prefix, &client);

    let mut outdated = 0usize;
    for app in apps {
        let check = installer.check(app, &mut cache).await?;
        if !check.needs_install() {
            continue;
        }
        outdated += 1;
        match &check.installed {
            Some(installed) => println!("{} {installed} -> {}", app.name, check.latest()),
            None => println!("{} (not installed) -> {}", app.name, check.latest()),
        }
    }

    if outdated == 0 {
        println!("All tools are up to date.");
    }
    Ok(())
}
