//! Files produced by an installation and where they go.
//!
//! ## Install Layout
//!
//! ```text
//! <prefix>/
//!   bin/<name>                          # executables, mode 0755
//!   share/man/man<N>/<file>             # man pages, mode 0644
//!   share/zsh/site-functions/_<app>     # zsh completions, mode 0644
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{PullError, Result};

/// Permission bits for executables.
pub const BIN_MODE: u32 = 0o755;

/// Permission bits for documentation and shell integration files.
pub const DOC_MODE: u32 = 0o644;

/// A single file to be written under the prefix.
#[derive(Clone, PartialEq, Eq)]
pub enum InstallArtifact {
    Binary {
        name: String,
        data: Vec<u8>,
    },
    ManPage {
        section: u8,
        file_name: String,
        data: Vec<u8>,
    },
    Completion {
        app: String,
        data: Vec<u8>,
    },
}

impl fmt::Debug for InstallArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary { name, data } => f
                .debug_struct("Binary")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            Self::ManPage {
                section,
                file_name,
                data,
            } => f
                .debug_struct("ManPage")
                .field("section", section)
                .field("file_name", file_name)
                .field("len", &data.len())
                .finish(),
            Self::Completion { app, data } => f
                .debug_struct("Completion")
                .field("app", app)
                .field("len", &data.len())
                .finish(),
        }
    }
}

impl InstallArtifact {
    /// Destination of this artifact under `prefix`.
    #[must_use]
    pub fn install_path(&self, prefix: &Path) -> PathBuf {
        match self {
            Self::Binary { name, .. } => prefix.join("bin").join(name),
            Self::ManPage {
                section, file_name, ..
            } => prefix
                .join("share")
                .join("man")
                .join(format!("man{section}"))
                .join(file_name),
            Self::Completion { app, .. } => prefix
                .join("share")
                .join("zsh")
                .join("site-functions")
                .join(format!("_{app}")),
        }
    }

    /// Permission bits the artifact is written with.
    #[must_use]
    pub fn mode(&self) -> u32 {
        match self {
            Self::Binary { .. } => BIN_MODE,
            Self::ManPage { .. } | Self::Completion { .. } => DOC_MODE,
        }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Binary { data, .. }
            | Self::ManPage { data, .. }
            | Self::Completion { data, .. } => data,
        }
    }

    /// Writes the artifact under `prefix`, creating parent directories.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::InstallIo`] if a directory, the file or its
    /// permissions cannot be written.
    pub fn write(&self, prefix: &Path) -> Result<PathBuf> {
        let path = self.install_path(prefix);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PullError::install_io(parent, e))?;
        }
        std::fs::write(&path, self.data()).map_err(|e| PullError::install_io(&path, e))?;
        set_mode(&path, self.mode())?;
        Ok(path)
    }
}

/// Sets permission bits on `path`.
///
/// # Errors
///
/// Returns [`PullError::InstallIo`] if the permissions cannot be changed.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| PullError::install_io(path, e))
}

/// Permission bits are not applicable on non-Unix systems.
#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Everything one download produced for a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationTarget {
    pub binary: Option<InstallArtifact>,
    pub aux_binaries: Vec<InstallArtifact>,
    pub completions: Vec<InstallArtifact>,
    pub man_pages: Vec<InstallArtifact>,
}

impl InstallationTarget {
    /// The primary binary followed by the auxiliary binaries.
    #[must_use]
    pub fn binaries(&self) -> Vec<&InstallArtifact> {
        self.binary.iter().chain(&self.aux_binaries).collect()
    }

    /// Adds an artifact to the matching group. The first binary named
    /// `primary` becomes the required binary.
    pub fn push(&mut self, artifact: InstallArtifact, primary: &str) {
        let is_primary = self.binary.is_none()
            && matches!(&artifact, InstallArtifact::Binary { name, .. } if name == primary);
        match artifact {
            InstallArtifact::Binary { .. } if is_primary => self.binary = Some(artifact),
            InstallArtifact::Binary { .. } => self.aux_binaries.push(artifact),
            InstallArtifact::ManPage { .. } => self.man_pages.push(artifact),
            InstallArtifact::Completion { .. } => self.completions.push(artifact),
        }
    }

    /// Artifacts in write order: primary binary, auxiliary binaries,
    /// completions, man pages.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Extraction`] if no primary binary was produced.
    pub fn write_order(&self, primary: &str) -> Result<Vec<&InstallArtifact>> {
        let binary = self.binary.as_ref().ok_or_else(|| {
            PullError::extraction(format!("no binary named {primary} was produced"))
        })?;
        Ok(std::iter::once(binary)
            .chain(&self.aux_binaries)
            .chain(&self.completions)
            .chain(&self.man_pages)
            .collect())
    }
}
