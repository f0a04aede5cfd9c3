//! Installation engine.
//!
//! Drives one tool through the install state machine:
//!
//! ```text
//! NotChecked ─┬─> UpToDate
//!             └─> Stale -> Downloading -> Extracting -> PostProcessing -> Writing -> Installed
//!
//! any non-terminal state ──> Failed
//! ```
//!
//! Tools are installed strictly one after another. Files written before a
//! failure in `Writing` are left in place.

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;

use crate::archive::{ArchiveHandle, base_name};
use crate::artifact::InstallationTarget;
use crate::cache::ReleaseCache;
use crate::client::ReleaseClient;
use crate::errors::{InstallError, PullError, Result};
use crate::postprocess;
use crate::release::Release;
use crate::spec::{AppSpec, AssetRule, Payload, ResolvedAsset};
use crate::version::needs_install;

/// States of a single installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    NotChecked,
    UpToDate,
    Stale,
    Downloading,
    Extracting,
    PostProcessing,
    Writing,
    Installed,
    Failed,
}

impl InstallState {
    /// Whether no further transition can happen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::UpToDate | Self::Installed | Self::Failed)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotChecked => "version check",
            Self::UpToDate => "up to date",
            Self::Stale => "stale",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::PostProcessing => "post-processing",
            Self::Writing => "writing",
            Self::Installed => "installed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Installed and latest version of a tool.
#[derive(Debug, Clone)]
pub struct VersionCheck {
    pub installed: Option<Version>,
    pub release: Release,
}

impl VersionCheck {
    #[must_use]
    pub fn latest(&self) -> &Version {
        &self.release.version
    }

    #[must_use]
    pub fn needs_install(&self) -> bool {
        needs_install(self.installed.as_ref(), self.latest())
    }
}

/// Result of a successful [`Installer::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The installed version already matched the latest release.
    UpToDate { version: Version },
    /// New files were written.
    Installed {
        previous: Option<Version>,
        version: Version,
        paths: Vec<PathBuf>,
        notice: Option<&'static str>,
    },
}

/// Tracks and logs the state of one installation.
struct Progress<'a> {
    app: &'a str,
    state: InstallState,
}

impl<'a> Progress<'a> {
    fn new(app: &'a str) -> Self {
        Self {
            app,
            state: InstallState::NotChecked,
        }
    }

    fn advance(&mut self, next: InstallState) {
        tracing::debug!(app = self.app, from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    fn fail(&mut self, source: PullError) -> InstallError {
        let stage = self.state;
        self.advance(InstallState::Failed);
        InstallError::new(self.app, stage, source)
    }
}

/// Installs tools described by [`AppSpec`]s into a prefix.
#[derive(Debug)]
pub struct Installer<'c> {
    prefix: PathBuf,
    client: &'c ReleaseClient,
}

impl<'c> Installer<'c> {
    #[must_use]
    pub fn new(prefix: impl Into<PathBuf>, client: &'c ReleaseClient) -> Self {
        Self {
            prefix: prefix.into(),
            client,
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Reads the installed version and fetches the latest release.
    ///
    /// # Errors
    ///
    /// Returns an [`InstallError`] in the version check stage if probing
    /// the installed binary or fetching the release fails.
    pub async fn check(
        &self,
        spec: &AppSpec,
        cache: &mut ReleaseCache,
    ) -> Result<VersionCheck, InstallError> {
        let mut progress = Progress::new(spec.name);
        self.version_check(spec, cache)
            .await
            .map_err(|e| progress.fail(e))
    }

    async fn version_check(&self, spec: &AppSpec, cache: &mut ReleaseCache) -> Result<VersionCheck> {
        let installed = spec.probe.installed_version(&spec.binary_path(&self.prefix))?;
        let release = self
            .client
            .latest_release(cache, spec.owner, spec.repo)
            .await?;
        Ok(VersionCheck { installed, release })
    }

    /// Installs or updates one tool.
    ///
    /// # Errors
    ///
    /// Returns an [`InstallError`] naming the state in which the first
    /// failure happened. Nothing is rolled back.
    pub async fn install(
        &self,
        spec: &AppSpec,
        cache: &mut ReleaseCache,
    ) -> Result<InstallOutcome, InstallError> {
        let mut progress = Progress::new(spec.name);

        let check = self
            .version_check(spec, cache)
            .await
            .map_err(|e| progress.fail(e))?;

        if !check.needs_install() {
            progress.advance(InstallState::UpToDate);
            tracing::info!(app = spec.name, version = %check.latest(), "already at latest version");
            return Ok(InstallOutcome::UpToDate {
                version: check.release.version,
            });
        }

        progress.advance(InstallState::Stale);
        match &check.installed {
            Some(installed) => tracing::info!(
                app = spec.name,
                %installed,
                latest = %check.latest(),
                "updating"
            ),
            None => tracing::info!(app = spec.name, latest = %check.latest(), "installing"),
        }

        progress.advance(InstallState::Downloading);
        let payloads = self
            .download(spec, &check.release, cache)
            .await
            .map_err(|e| progress.fail(e))?;

        progress.advance(InstallState::Extracting);
        let mut target = extract(spec, payloads).map_err(|e| progress.fail(e))?;

        progress.advance(InstallState::PostProcessing);
        postprocess::run(spec, &mut target).map_err(|e| progress.fail(e))?;

        progress.advance(InstallState::Writing);
        let paths = self.write(spec, &target).map_err(|e| progress.fail(e))?;

        progress.advance(InstallState::Installed);
        tracing::info!(
            app = spec.name,
            version = %check.latest(),
            files = paths.len(),
            "installed"
        );

        Ok(InstallOutcome::Installed {
            previous: check.installed,
            version: check.release.version,
            paths,
            notice: spec.notice,
        })
    }

    /// Resolves every asset rule, then fetches the bytes of each.
    async fn download<'s>(
        &self,
        spec: &'s AppSpec,
        release: &Release,
        cache: &mut ReleaseCache,
    ) -> Result<Vec<(&'s AssetRule, String, Vec<u8>)>> {
        let resolved = spec
            .assets
            .iter()
            .map(|rule| Ok((rule, rule.selector.resolve(spec.name, release)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut payloads = Vec::with_capacity(resolved.len());
        for (rule, asset) in resolved {
            let (name, data) = match asset {
                ResolvedAsset::Asset(asset) => (
                    asset.name.clone(),
                    self.client.asset_bytes(cache, release, asset).await?,
                ),
                ResolvedAsset::Tarball => (
                    release.tarball_name(),
                    self.client.tarball_bytes(cache, release).await?,
                ),
            };
            payloads.push((rule, name, data));
        }
        Ok(payloads)
    }

    /// Writes every artifact in order and returns the written paths.
    fn write(&self, spec: &AppSpec, target: &InstallationTarget) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for artifact in target.write_order(spec.binary)? {
            let path = artifact.write(&self.prefix)?;
            tracing::debug!(app = spec.name, path = %path.display(), "wrote file");
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Turns downloaded payloads into install artifacts.
fn extract(
    spec: &AppSpec,
    payloads: Vec<(&AssetRule, String, Vec<u8>)>,
) -> Result<InstallationTarget> {
    let mut target = InstallationTarget::default();

    for (rule, name, data) in payloads {
        match rule.payload {
            Payload::Raw(install) => {
                target.push(install.artifact(base_name(&name), data), spec.binary);
            }
            Payload::Archive(members) => {
                let mut handle = ArchiveHandle::new(name, data)?;
                if let Some(nested) = rule.nested {
                    let member = handle
                        .find_by_base_name(nested)?
                        .ok_or_else(|| {
                            PullError::extraction(format!(
                                "no member named {nested} in {}",
                                handle.name()
                            ))
                        })?
                        .to_string();
                    let bytes = handle.extract(&member)?;
                    handle = ArchiveHandle::new(nested, bytes)?;
                }
                for member_rule in members {
                    for artifact in member_rule.apply(&handle)? {
                        target.push(artifact, spec.binary);
                    }
                }
            }
        }
    }

    if target.binary.is_none() {
        return Err(PullError::extraction(format!(
            "no binary named {} among the extracted files",
            spec.binary
        )));
    }
    Ok(target)
}
