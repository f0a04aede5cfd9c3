//! Command modules for the usr-local-pull CLI.
//!
//! - [`install`] - Install or update tools
//! - [`list`] - List the supported tools
//! - [`outdated`] - Show tools needing an install

pub mod install;
pub mod list;
pub mod outdated;

use anyhow::{Result, bail};
use usr_local_pull::AppSpec;

use crate::catalog;

/// Resolves `--app` names to catalog entries, all tools when `names` is empty.
///
/// # Errors
///
/// Returns an error naming every unknown tool.
pub fn select_apps(names: &[String]) -> Result<Vec<&'static AppSpec>> {
    if names.is_empty() {
        return Ok(catalog::APPS.iter().collect());
    }

    let mut selected = Vec::with_capacity(names.len());
    let mut unknown = Vec::new();
    for name in names {
        match catalog::find(name) {
            Some(app) if !selected.iter().any(|s: &&AppSpec| s.name == app.name) => {
                selected.push(app);
            }
            Some(_) => {}
            None => unknown.push(name.as_str()),
        }
    }

    if !unknown.is_empty() {
        bail!(
            "unknown app: {}\n\nRun 'usr-local-pull list' to see the supported tools.",
            unknown.join(", ")
        );
    }
    Ok(selected)
}
