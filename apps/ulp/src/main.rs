#![warn(clippy::pedantic)]

//! # usr-local-pull
//!
//! Installs and updates a curated set of command line tools straight from
//! their release pages into a prefix such as `/usr/local`.
//!
//! ## Subcommands
//!
//! - `install` - Install or update tools (default)
//! - `list` - Show the supported tools
//! - `outdated` - Show tools that would be installed or updated
//!
//! ## Examples
//!
//! Update everything under `/usr/local`:
//! ```bash
//! sudo usr-local-pull
//! ```
//!
//! Install two tools into a home prefix:
//! ```bash
//! usr-local-pull --prefix ~/.local install --app ripgrep --app fd
//! ```

mod catalog;
mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{install, list, outdated};
use tracing_subscriber::EnvFilter;
use usr_local_pull::Settings;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "USR_LOCAL_PULL_LOG";

/// Installs or updates command line tools from release pages.
#[derive(Parser)]
#[command(
    name = "usr-local-pull",
    author,
    version,
    about = "Installs or updates command line tools directly from GitHub releases",
    long_about = "Downloads the latest release of each supported tool and installs its \
    executables, man pages and zsh completions under a prefix. Tools that are already \
    at the latest version are left alone.",
    after_help = "\
ENVIRONMENT VARIABLES:
    USR_LOCAL_PULL_PREFIX        Install prefix (default: /usr/local)
    USR_LOCAL_PULL_CACHE_DIR     Cache directory (default: <user cache dir>/usr-local-pull)
    USR_LOCAL_PULL_API_URL       Release API (default: https://api.github.com)
    USR_LOCAL_PULL_HTTP_TIMEOUT  HTTP timeout in seconds (default: 300)
    USR_LOCAL_PULL_LOG           Log filter (default: info)
    GITHUB_TOKEN, GH_TOKEN       Token for the release API"
)]
pub struct Cli {
    /// Install prefix for everything.
    ///
    /// Installing into `/usr/local` does not interfere with distribution
    /// packages; which copy runs depends on the order of `$PATH`.
    #[arg(long, short, global = true, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Directory for cached release metadata and downloads.
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Install or update tools.
    ///
    /// Installs every supported tool unless `--app` narrows the selection.
    /// Tools are processed one at a time.
    Install(install::InstallArgs),

    /// List the supported tools.
    List,

    /// Show tools whose installed version differs from the latest release.
    Outdated(outdated::OutdatedArgs),
}

impl Cli {
    /// Environment settings with command line flags applied on top.
    fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        if let Some(prefix) = &self.prefix {
            settings.prefix.clone_from(prefix);
        }
        if let Some(cache_dir) = &self.cache_dir {
            settings.cache_dir.clone_from(cache_dir);
        }
        settings
    }
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Logs to stderr, filtered by `USR_LOCAL_PULL_LOG`, then `RUST_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints an error and returns the process exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings();

    match cli.command {
        Some(Commands::Install(args)) => install::execute(&args, &settings).await,
        Some(Commands::List) => {
            list::execute();
            Ok(())
        }
        Some(Commands::Outdated(args)) => outdated::execute(&args, &settings).await,
        None => install::execute(&install::InstallArgs::default(), &settings).await,
    }
}
