//! Declarative tool descriptors.
//!
//! An [`AppSpec`] says where a tool is published, which release assets to
//! download, which members to pull out of them, how to read the installed
//! version and which commands to run on the fresh binary before writing.
//! All descriptors are plain `const` data; the installation engine is the
//! only code that interprets them.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveHandle, base_name};
use crate::artifact::InstallArtifact;
use crate::errors::{PullError, Result};
use crate::release::{Asset, Release};
use crate::version::VersionProbe;

/// Rule selecting one asset of a release by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSelector {
    /// The asset with exactly this name.
    Exact(&'static str),
    /// The first asset whose name starts with `prefix` and ends with `suffix`.
    Affixes {
        prefix: &'static str,
        suffix: &'static str,
    },
    /// The release's source snapshot.
    Tarball,
}

impl fmt::Display for AssetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Affixes { prefix, suffix } => write!(f, "{prefix}*{suffix}"),
            Self::Tarball => f.write_str("source tarball"),
        }
    }
}

/// An asset chosen by a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAsset<'r> {
    Asset(&'r Asset),
    Tarball,
}

impl AssetSelector {
    /// Whether `name` satisfies this selector. Never true for [`AssetSelector::Tarball`].
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => name == *exact,
            Self::Affixes { prefix, suffix } => {
                name.len() >= prefix.len() + suffix.len()
                    && name.starts_with(prefix)
                    && name.ends_with(suffix)
            }
            Self::Tarball => false,
        }
    }

    /// Picks the asset of `release` this selector refers to.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::MissingAsset`] listing the available asset names
    /// if nothing matches.
    pub fn resolve<'r>(&self, app: &str, release: &'r Release) -> Result<ResolvedAsset<'r>> {
        let found = match self {
            Self::Tarball => release.tarball_url.as_ref().map(|_| ResolvedAsset::Tarball),
            _ => release
                .assets
                .iter()
                .find(|asset| self.matches(&asset.name))
                .map(ResolvedAsset::Asset),
        };
        found.ok_or_else(|| PullError::missing_asset(app, self.to_string(), release.asset_names()))
    }
}

/// What an extracted file becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Install {
    /// An executable installed under this name.
    Binary(&'static str),
    /// A man page for this section, keeping its file name.
    ManPage(u8),
    /// A zsh completion script for this command name.
    Completion(&'static str),
}

impl Install {
    /// Builds the artifact for a file called `file_name` holding `data`.
    #[must_use]
    pub fn artifact(self, file_name: &str, data: Vec<u8>) -> InstallArtifact {
        match self {
            Self::Binary(name) => InstallArtifact::Binary {
                name: name.to_string(),
                data,
            },
            Self::ManPage(section) => InstallArtifact::ManPage {
                section,
                file_name: file_name.to_string(),
                data,
            },
            Self::Completion(app) => InstallArtifact::Completion {
                app: app.to_string(),
                data,
            },
        }
    }
}

/// Rule locating archive members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRule {
    /// The first member with this base name.
    File {
        name: &'static str,
        install: Install,
    },
    /// Every member that looks like a man page (`name.N` or `name.N.gz`).
    ManPages,
}

impl MemberRule {
    /// Shorthand for a member installed as an executable under its own name.
    #[must_use]
    pub const fn binary(name: &'static str) -> Self {
        Self::File {
            name,
            install: Install::Binary(name),
        }
    }

    /// Extracts the members this rule selects from `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Extraction`] if no member matches or extraction fails.
    pub fn apply(&self, handle: &ArchiveHandle) -> Result<Vec<InstallArtifact>> {
        match self {
            Self::File { name, install } => {
                let member = handle.find_by_base_name(name)?.ok_or_else(|| {
                    PullError::extraction(format!("no member named {name} in {}", handle.name()))
                })?;
                let data = handle.extract(member)?;
                Ok(vec![install.artifact(name, data)])
            }
            Self::ManPages => {
                let mut artifacts = Vec::new();
                for member in handle.members()? {
                    let file_name = base_name(member);
                    if let Some(section) = man_section(file_name) {
                        let data = handle.extract(member)?;
                        artifacts.push(Install::ManPage(section).artifact(file_name, data));
                    }
                }
                if artifacts.is_empty() {
                    return Err(PullError::extraction(format!(
                        "no man pages in {}",
                        handle.name()
                    )));
                }
                Ok(artifacts)
            }
        }
    }
}

/// Section of a man page file name such as `eza_colors.5` or `rg.1.gz`.
#[must_use]
pub fn man_section(file_name: &str) -> Option<u8> {
    let name = file_name.strip_suffix(".gz").unwrap_or(file_name);
    let (stem, suffix) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    match suffix.as_bytes() {
        [digit @ b'1'..=b'9'] => Some(digit - b'0'),
        _ => None,
    }
}

/// How an asset's bytes are turned into artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// The asset itself is the file (e.g. a bare executable).
    Raw(Install),
    /// The asset is an archive; each rule selects members of it.
    Archive(&'static [MemberRule]),
}

/// One asset to download and what to take from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetRule {
    pub selector: AssetSelector,
    /// Base name of an archive member to reopen before applying the payload
    /// rules, e.g. `data.tar.xz` inside a Debian package.
    pub nested: Option<&'static str>,
    pub payload: Payload,
}

impl AssetRule {
    /// An archive asset whose members are selected by `members`.
    #[must_use]
    pub const fn archive(selector: AssetSelector, members: &'static [MemberRule]) -> Self {
        Self {
            selector,
            nested: None,
            payload: Payload::Archive(members),
        }
    }

    /// An asset that is itself the file to install.
    #[must_use]
    pub const fn raw(selector: AssetSelector, install: Install) -> Self {
        Self {
            selector,
            nested: None,
            payload: Payload::Raw(install),
        }
    }

    /// Reopens the member with base name `member` before selecting files.
    #[must_use]
    pub const fn nested(mut self, member: &'static str) -> Self {
        self.nested = Some(member);
        self
    }
}

/// Command run against a staged binary before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStep {
    /// Run `binary args...` and install its stdout as the completion script
    /// for `app`.
    Completion {
        binary: &'static str,
        args: &'static [&'static str],
        app: &'static str,
    },
    /// Run `binary args...`, where the argument `{dir}` is replaced with a
    /// scratch directory, and install every man page written there.
    ManPages {
        binary: &'static str,
        args: &'static [&'static str],
    },
}

impl PostStep {
    /// Placeholder replaced with the output directory in [`PostStep::ManPages`].
    pub const DIR_PLACEHOLDER: &'static str = "{dir}";

    /// Shorthand for a completion generated by the primary binary.
    #[must_use]
    pub const fn completion(binary: &'static str, args: &'static [&'static str]) -> Self {
        Self::Completion {
            binary,
            args,
            app: binary,
        }
    }
}

/// Everything needed to install one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSpec {
    /// Identity used on the command line and in logs.
    pub name: &'static str,
    pub owner: &'static str,
    pub repo: &'static str,
    /// Name of the primary executable under `<prefix>/bin`.
    pub binary: &'static str,
    pub probe: VersionProbe,
    pub assets: &'static [AssetRule],
    pub post: &'static [PostStep],
    /// Printed after a successful install.
    pub notice: Option<&'static str>,
}

impl AppSpec {
    /// Path of the primary executable under `prefix`.
    #[must_use]
    pub fn binary_path(&self, prefix: &Path) -> PathBuf {
        prefix.join("bin").join(self.binary)
    }

    /// `owner/repo` of the hosting repository.
    #[must_use]
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}
