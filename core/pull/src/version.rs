//! Installed-version detection and the install decision.
//!
//! Every tool prints its version differently, so each one carries a
//! [`VersionProbe`]: the arguments that make it print a version, a rule for
//! splitting the output into tokens and the index of the token holding the
//! version. The selected token is parsed leniently into a semantic version.

use std::path::Path;
use std::process::Command;

use semver::Version;

use crate::errors::{PullError, Result};

/// How version output is split into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    /// Split on whitespace (`bat 0.24.0 (fc954685)`).
    Whitespace,
    /// Split on `-`, trimming each token (`jq-1.7.1`).
    Hyphen,
    /// Treat `-` as whitespace, then split on whitespace (`tool-2.4.1-linux (static)`).
    HyphenAsWhitespace,
    /// Split on `separator` and take the value of the `key=value` token.
    /// The token index is ignored.
    KeyValue { separator: char, key: &'static str },
}

/// Strategy for reading the version of an installed binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProbe {
    pub args: &'static [&'static str],
    pub split: SplitRule,
    /// Token index; negative values count from the end.
    pub index: isize,
}

impl VersionProbe {
    /// Probe invoking `--version` and picking token `index` of `split`.
    #[must_use]
    pub const fn new(split: SplitRule, index: isize) -> Self {
        Self {
            args: &["--version"],
            split,
            index,
        }
    }

    /// Replaces the version-query arguments.
    #[must_use]
    pub const fn with_args(mut self, args: &'static [&'static str]) -> Self {
        self.args = args;
        self
    }

    /// Picks the version token out of `output` and parses it.
    #[must_use]
    pub fn parse_output(&self, output: &str) -> Option<Version> {
        let token = match self.split {
            SplitRule::Whitespace => {
                select(&output.split_whitespace().collect::<Vec<_>>(), self.index)?
            }
            SplitRule::Hyphen => select(
                &output.split('-').map(str::trim).collect::<Vec<_>>(),
                self.index,
            )?,
            SplitRule::HyphenAsWhitespace => {
                let spaced = output.replace('-', " ");
                return parse_lenient(select(
                    &spaced.split_whitespace().collect::<Vec<_>>(),
                    self.index,
                )?);
            }
            SplitRule::KeyValue { separator, key } => output
                .split(separator)
                .map(str::trim)
                .find_map(|pair| pair.strip_prefix(key)?.strip_prefix('='))?,
        };
        parse_lenient(token)
    }

    /// Runs `binary` and returns its version.
    ///
    /// Returns `Ok(None)` when `binary` does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::VersionProbe`] if the binary cannot be run, exits
    /// unsuccessfully, or prints no recognizable version.
    pub fn installed_version(&self, binary: &Path) -> Result<Option<Version>> {
        if !binary.exists() {
            tracing::debug!(binary = %binary.display(), "binary not installed");
            return Ok(None);
        }

        let output = Command::new(binary)
            .args(self.args)
            .output()
            .map_err(|e| PullError::version_probe(binary, format!("failed to run: {e}")))?;

        if !output.status.success() {
            return Err(PullError::version_probe(
                binary,
                format!("exited with {}", output.status),
            ));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| PullError::version_probe(binary, "output is not valid UTF-8"))?;

        let version = self.parse_output(&stdout).ok_or_else(|| {
            PullError::version_probe(
                binary,
                format!("no version found in output {:?}", stdout.trim()),
            )
        })?;

        tracing::debug!(binary = %binary.display(), %version, "found installed version");
        Ok(Some(version))
    }
}

impl Default for VersionProbe {
    fn default() -> Self {
        Self::new(SplitRule::Whitespace, -1)
    }
}

fn select<'a>(tokens: &[&'a str], index: isize) -> Option<&'a str> {
    let index = if index < 0 {
        tokens.len().checked_sub(index.unsigned_abs())?
    } else {
        index.unsigned_abs()
    };
    tokens.get(index).copied()
}

/// Parses version text the way release tags and `--version` output are
/// written in practice.
///
/// Leading non-digits are stripped (`v1.2.3`, `jq-1.7.1`), trailing
/// punctuation is dropped, and versions with one or two numeric components
/// are padded with zeros (`1.7` becomes `1.7.0`). Anything after the numeric
/// part is kept as a pre-release.
#[must_use]
pub fn parse_lenient(text: &str) -> Option<Version> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let candidate = text[start..]
        .split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+')))
        .next()?
        .trim_end_matches(['.', '-', '+']);

    if let Ok(version) = Version::parse(candidate) {
        return Some(version);
    }

    let split = candidate
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(candidate.len());
    let (numeric, rest) = candidate.split_at(split);

    let mut parts: Vec<&str> = numeric.split('.').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    parts.resize(3, "0");

    let mut padded = parts.join(".");
    if !rest.is_empty() {
        if !rest.starts_with(['-', '+']) {
            padded.push('-');
        }
        padded.push_str(rest);
    }
    Version::parse(&padded).ok()
}

/// Whether a tool must be (re)installed.
///
/// True when nothing is installed or the installed version differs from the
/// latest release.
#[must_use]
pub fn needs_install(installed: Option<&Version>, latest: &Version) -> bool {
    installed != Some(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u64, minor: u64, patch: u64) -> Version {
        Version::new(major, minor, patch)
    }

    #[test]
    fn parse_lenient_strips_prefixes() {
        assert_eq!(parse_lenient("v1.2.3"), Some(v(1, 2, 3)));
        assert_eq!(parse_lenient("jq-1.7.1"), Some(v(1, 7, 1)));
        assert_eq!(parse_lenient("Release 0.9.1"), Some(v(0, 9, 1)));
    }

    #[test]
    fn parse_lenient_pads_components() {
        assert_eq!(parse_lenient("1.7"), Some(v(1, 7, 0)));
        assert_eq!(parse_lenient("14"), Some(v(14, 0, 0)));
    }

    #[test]
    fn parse_lenient_keeps_prerelease() {
        let version = parse_lenient("v0.3.0-alpha.1").expect("Should parse");
        assert_eq!(version.pre.as_str(), "alpha.1");

        let version = parse_lenient("1.0rc1").expect("Should parse");
        assert_eq!(version.to_string(), "1.0.0-rc1");
    }

    #[test]
    fn parse_lenient_handles_date_tags() {
        let tag = parse_lenient("2024-11-25").expect("Should parse");
        let output = parse_lenient("2024-11-25)").expect("Should parse");
        assert_eq!(tag, output);
        assert!(parse_lenient("2025-01-06").is_some());
    }

    #[test]
    fn parse_lenient_rejects_text_without_digits() {
        assert_eq!(parse_lenient("nightly"), None);
        assert_eq!(parse_lenient(""), None);
        assert_eq!(parse_lenient("1.2.3.4"), None);
    }

    #[test]
    fn whitespace_rule_picks_indexed_token() {
        let probe = VersionProbe::new(SplitRule::Whitespace, 1);
        assert_eq!(probe.parse_output("bat 0.24.0 (fc954685)\n"), Some(v(0, 24, 0)));

        let probe = VersionProbe::new(SplitRule::Whitespace, 0);
        assert_eq!(probe.parse_output("0.56.3 (devel)\n"), Some(v(0, 56, 3)));

        let probe = VersionProbe::new(SplitRule::Whitespace, -1);
        assert_eq!(probe.parse_output("mdbook v0.4.40\n"), Some(v(0, 4, 40)));
    }

    #[test]
    fn hyphen_rule_splits_on_dash() {
        let probe = VersionProbe::new(SplitRule::Hyphen, -1);
        assert_eq!(probe.parse_output("jq-1.7.1\n"), Some(v(1, 7, 1)));
    }

    #[test]
    fn hyphen_as_whitespace_rule() {
        let probe = VersionProbe::new(SplitRule::HyphenAsWhitespace, 1);
        let output = "tool-2.4.1-linux (static)\n";
        assert_eq!(probe.parse_output(output), Some(v(2, 4, 1)));
        assert_eq!(
            VersionProbe::new(SplitRule::Whitespace, 1).parse_output(output),
            None
        );
    }

    #[test]
    fn hyphen_as_whitespace_splits_urls() {
        let output = "eza - A modern, maintained replacement for ls\nv0.20.10 [+git]\n\
                      https://github.com/eza-community/eza\n";
        assert_eq!(
            VersionProbe::new(SplitRule::Whitespace, -3).parse_output(output),
            Some(v(0, 20, 10))
        );
        assert_eq!(
            VersionProbe::new(SplitRule::HyphenAsWhitespace, -3).parse_output(output),
            None
        );
    }

    #[test]
    fn key_value_rule_ignores_similar_keys() {
        let probe = VersionProbe::new(
            SplitRule::KeyValue {
                separator: ',',
                key: "version",
            },
            0,
        );
        let output = "commit=abc, build date=2024-10-01, build source=binaryRelease, \
                      version=0.44.1, os=linux, arch=amd64, git version=2.43.0\n";
        assert_eq!(probe.parse_output(output), Some(v(0, 44, 1)));
        assert_eq!(probe.parse_output("commit=abc, os=linux"), None);
    }

    #[test]
    fn out_of_range_index_yields_none() {
        let probe = VersionProbe::new(SplitRule::Whitespace, 5);
        assert_eq!(probe.parse_output("tool 1.0.0"), None);
        let probe = VersionProbe::new(SplitRule::Whitespace, -3);
        assert_eq!(probe.parse_output("tool 1.0.0"), None);
    }

    #[test]
    fn needs_install_decision() {
        let latest = v(1, 2, 3);
        assert!(needs_install(None, &latest));
        assert!(needs_install(Some(&v(1, 2, 2)), &latest));
        assert!(needs_install(Some(&v(1, 3, 0)), &latest));
        assert!(!needs_install(Some(&v(1, 2, 3)), &latest));
    }

    #[test]
    fn missing_binary_is_not_installed() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let probe = VersionProbe::default();
        assert_eq!(
            probe
                .installed_version(&dir.path().join("bin").join("absent"))
                .expect("Should not fail"),
            None
        );
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Should write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Should set permissions");
        path
    }

    #[cfg(unix)]
    #[test]
    fn installed_version_runs_binary() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let script = write_script(dir.path(), "tool", "echo \"tool 2.5.1 (abcdef)\"");
        let probe = VersionProbe::new(SplitRule::Whitespace, 1);
        assert_eq!(
            probe.installed_version(&script).expect("Should probe"),
            Some(v(2, 5, 1))
        );
    }

    #[cfg(unix)]
    #[test]
    fn installed_version_passes_custom_args() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let script = write_script(
            dir.path(),
            "tool",
            "[ \"$1\" = \"version\" ] && echo 3.0.0 || exit 3",
        );
        let probe = VersionProbe::new(SplitRule::Whitespace, 0).with_args(&["version"]);
        assert_eq!(
            probe.installed_version(&script).expect("Should probe"),
            Some(v(3, 0, 0))
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_binary_is_probe_error() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let script = write_script(dir.path(), "tool", "exit 2");
        let err = VersionProbe::default()
            .installed_version(&script)
            .expect_err("Should fail");
        assert!(matches!(err, PullError::VersionProbe { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn unparseable_output_is_probe_error() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let script = write_script(dir.path(), "tool", "echo unknown");
        let err = VersionProbe::default()
            .installed_version(&script)
            .expect_err("Should fail");
        assert!(err.to_string().contains("unknown"));
    }
}
