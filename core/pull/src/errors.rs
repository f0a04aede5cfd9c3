//! Error types for the usr-local-pull library.
//!
//! `PullError` is the single taxonomy used by every component of the crate.
//! The installation engine wraps whatever it receives in an [`InstallError`]
//! so that callers know which tool failed and at which stage of the install
//! state machine the failure happened.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::InstallState;

/// Result alias used throughout the crate.
pub type Result<T, E = PullError> = std::result::Result<T, E>;

/// Consolidated error type for release fetching, extraction and installation.
#[derive(Debug, Error)]
pub enum PullError {
    /// Release metadata is malformed or incomplete.
    #[error("invalid release metadata: {message}")]
    Validation {
        /// Description of what was missing or malformed.
        message: String,
    },

    /// No asset of a release matched the selection rule.
    #[error("no asset matching {selector} for {app} (available: {})", format_candidates(.candidates))]
    MissingAsset {
        /// The tool whose asset was being resolved.
        app: String,
        /// Human readable form of the selection rule.
        selector: String,
        /// Names of the assets that were available.
        candidates: Vec<String>,
    },

    /// Archive format unsupported, archive corrupt, or member absent.
    #[error("extraction error: {message}")]
    Extraction {
        /// Description of the extraction failure.
        message: String,
    },

    /// Network failure, bad status code, bad URL or cache I/O failure.
    #[error("fetch error: {message}")]
    Fetch {
        /// Description of the fetch failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Running or parsing the installed binary failed.
    #[error("version probe of {} failed: {message}", .binary.display())]
    VersionProbe {
        /// The binary that was probed.
        binary: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A post-processing command could not be run or exited non-zero.
    #[error("post-processing error: {message}")]
    PostProcess {
        /// Description of the failure.
        message: String,
    },

    /// Writing an artifact or setting its permissions failed.
    #[error("failed to write {}", .path.display())]
    InstallIo {
        /// The file or directory that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn format_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        "none".to_string()
    } else {
        candidates.join(", ")
    }
}

impl PullError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `MissingAsset` error.
    #[must_use]
    pub fn missing_asset(
        app: impl Into<String>,
        selector: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        Self::MissingAsset {
            app: app.into(),
            selector: selector.into(),
            candidates,
        }
    }

    /// Creates a new `Extraction` error.
    #[must_use]
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Creates a new `Fetch` error without an underlying cause.
    #[must_use]
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Fetch` error wrapping an underlying cause.
    #[must_use]
    pub fn fetch_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new `VersionProbe` error.
    #[must_use]
    pub fn version_probe(binary: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VersionProbe {
            binary: binary.into(),
            message: message.into(),
        }
    }

    /// Creates a new `PostProcess` error.
    #[must_use]
    pub fn post_process(message: impl Into<String>) -> Self {
        Self::PostProcess {
            message: message.into(),
        }
    }

    /// Creates a new `InstallIo` error.
    #[must_use]
    pub fn install_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::InstallIo {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a single tool installation.
///
/// Carries the tool name and the state the engine was in when the
/// underlying error was raised.
#[derive(Debug, Error)]
#[error("{app}: {stage} failed")]
pub struct InstallError {
    /// Name of the tool being installed.
    pub app: String,
    /// State in which the failure happened.
    pub stage: InstallState,
    /// The underlying cause.
    #[source]
    pub source: PullError,
}

impl InstallError {
    /// Creates a new `InstallError`.
    #[must_use]
    pub fn new(app: impl Into<String>, stage: InstallState, source: PullError) -> Self {
        Self {
            app: app.into(),
            stage,
            source,
        }
    }
}
