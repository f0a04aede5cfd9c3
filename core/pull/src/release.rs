//! Release and asset metadata.
//!
//! A [`Release`] is built from the JSON object returned by the release API
//! plus an injected `fetched_at` timestamp. The whole upstream object is kept
//! so that the on-disk cache stores exactly what was received.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{PullError, Result};
use crate::version::parse_lenient;

/// Key under which the fetch timestamp is stored in the release JSON.
pub const FETCHED_AT_KEY: &str = "fetched_at";

/// A single downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub id: u64,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// Typed view over the fields of the upstream object we care about.
#[derive(Deserialize)]
struct ReleaseFields {
    id: u64,
    tag_name: Option<String>,
    name: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
    tarball_url: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

/// One published release of a repository.
#[derive(Debug, Clone)]
pub struct Release {
    pub owner: String,
    pub repo: String,
    pub id: u64,
    pub version: Version,
    pub assets: Vec<Asset>,
    pub tarball_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
    raw: Value,
}

impl Release {
    /// Builds a release from its JSON object.
    ///
    /// The version comes from the tag name, falling back to the display name,
    /// after stripping any leading non-digit characters.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Validation`] if the object is malformed, if no
    /// version can be derived, or if `fetched_at` is absent.
    pub fn from_json(owner: &str, repo: &str, raw: Value) -> Result<Self> {
        let fields = ReleaseFields::deserialize(&raw).map_err(|e| {
            PullError::validation(format!("malformed release for {owner}/{repo}: {e}"))
        })?;

        let version = fields
            .tag_name
            .as_deref()
            .and_then(parse_lenient)
            .or_else(|| fields.name.as_deref().and_then(parse_lenient))
            .ok_or_else(|| {
                PullError::validation(format!(
                    "no version in tag or name of release for {owner}/{repo}"
                ))
            })?;

        let fetched_at = fields.fetched_at.ok_or_else(|| {
            PullError::validation(format!(
                "release for {owner}/{repo} has no {FETCHED_AT_KEY} timestamp"
            ))
        })?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            id: fields.id,
            version,
            assets: fields.assets,
            tarball_url: fields.tarball_url,
            fetched_at,
            raw,
        })
    }

    /// Stamps a freshly fetched upstream object with `fetched_at` and builds
    /// a release from it.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Validation`] if the object is not a JSON object
    /// or fails validation in [`Release::from_json`].
    pub fn from_fetched(
        owner: &str,
        repo: &str,
        mut raw: Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self> {
        let Some(object) = raw.as_object_mut() else {
            return Err(PullError::validation(format!(
                "release for {owner}/{repo} is not a JSON object"
            )));
        };
        object.insert(
            FETCHED_AT_KEY.to_string(),
            Value::String(fetched_at.to_rfc3339()),
        );
        Self::from_json(owner, repo, raw)
    }

    /// The upstream object including `fetched_at`.
    #[must_use]
    pub fn to_json(&self) -> &Value {
        &self.raw
    }

    /// Looks up an asset by exact name.
    #[must_use]
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Names of all assets, in upstream order.
    #[must_use]
    pub fn asset_names(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.name.clone()).collect()
    }

    /// Nominal file name for the source snapshot of this release.
    #[must_use]
    pub fn tarball_name(&self) -> String {
        format!("{}-{}.tar.gz", self.repo, self.version)
    }
}
