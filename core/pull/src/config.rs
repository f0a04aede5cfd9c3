//! Runtime settings resolved from the environment.
//!
//! Every setting has a default and an environment override. Empty or
//! whitespace-only values are treated as unset.
//!
//! | Variable                        | Default                                  |
//! |---------------------------------|------------------------------------------|
//! | `USR_LOCAL_PULL_PREFIX`         | `/usr/local`                             |
//! | `USR_LOCAL_PULL_CACHE_DIR`      | `<user cache dir>/usr-local-pull`        |
//! | `USR_LOCAL_PULL_API_URL`        | `https://api.github.com`                 |
//! | `USR_LOCAL_PULL_HTTP_TIMEOUT`   | `300` (seconds)                          |
//! | `GITHUB_TOKEN` / `GH_TOKEN`     | unauthenticated                          |

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the install prefix.
pub const PREFIX_ENV: &str = "USR_LOCAL_PULL_PREFIX";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "USR_LOCAL_PULL_CACHE_DIR";

/// Environment variable overriding the release API base URL.
pub const API_URL_ENV: &str = "USR_LOCAL_PULL_API_URL";

/// Environment variable overriding the HTTP request timeout, in seconds.
pub const HTTP_TIMEOUT_ENV: &str = "USR_LOCAL_PULL_HTTP_TIMEOUT";

/// Environment variables checked, in order, for an API token.
pub const TOKEN_ENVS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Default install prefix.
pub const DEFAULT_PREFIX: &str = "/usr/local";

/// Default release API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

/// Directory name used under the user cache directory.
const CACHE_DIR_NAME: &str = "usr-local-pull";

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub prefix: PathBuf,
    pub cache_dir: PathBuf,
    pub api_url: String,
    pub token: Option<String>,
    pub http_timeout: Duration,
}

impl Settings {
    /// Resolves settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Resolves settings through `lookup`, which maps a variable name to its value.
    #[must_use]
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

        let prefix = get(PREFIX_ENV).map_or_else(|| PathBuf::from(DEFAULT_PREFIX), PathBuf::from);
        let cache_dir = get(CACHE_DIR_ENV).map_or_else(default_cache_dir, PathBuf::from);

        let api_url = get(API_URL_ENV)
            .map_or_else(|| DEFAULT_API_URL.to_string(), |url| url.trim().to_string())
            .trim_end_matches('/')
            .to_string();

        let token = TOKEN_ENVS
            .iter()
            .find_map(|&name| get(name))
            .map(|token| token.trim().to_string());

        let http_timeout = get(HTTP_TIMEOUT_ENV)
            .and_then(|secs| match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(secs),
                _ => {
                    tracing::warn!(
                        value = %secs,
                        "ignoring invalid {HTTP_TIMEOUT_ENV}, using {DEFAULT_HTTP_TIMEOUT_SECS}s"
                    );
                    None
                }
            })
            .map_or(
                Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
                Duration::from_secs,
            );

        Self {
            prefix,
            cache_dir,
            api_url,
            token,
            http_timeout,
        }
    }
}

/// The per-user cache directory, falling back to `~/.cache`.
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::resolve(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let settings = resolve(&[]);
        assert_eq!(settings.prefix, PathBuf::from("/usr/local"));
        assert!(settings.cache_dir.ends_with("usr-local-pull"));
        assert_eq!(settings.api_url, "https://api.github.com");
        assert_eq!(settings.token, None);
        assert_eq!(settings.http_timeout, Duration::from_secs(300));
    }

    #[test]
    fn overrides_are_applied() {
        let settings = resolve(&[
            (PREFIX_ENV, "/opt/tools"),
            (CACHE_DIR_ENV, "/tmp/ulp-cache"),
            (API_URL_ENV, "http://127.0.0.1:8080/"),
            (HTTP_TIMEOUT_ENV, "15"),
        ]);
        assert_eq!(settings.prefix, PathBuf::from("/opt/tools"));
        assert_eq!(settings.cache_dir, PathBuf::from("/tmp/ulp-cache"));
        assert_eq!(settings.api_url, "http://127.0.0.1:8080");
        assert_eq!(settings.http_timeout, Duration::from_secs(15));
    }

    #[test]
    fn blank_values_are_unset() {
        let settings = resolve(&[(PREFIX_ENV, "   "), (API_URL_ENV, ""), (TOKEN_ENVS[0], " ")]);
        assert_eq!(settings.prefix, PathBuf::from(DEFAULT_PREFIX));
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.token, None);
    }

    #[test]
    fn github_token_takes_precedence() {
        let settings = resolve(&[("GITHUB_TOKEN", "primary"), ("GH_TOKEN", "secondary")]);
        assert_eq!(settings.token.as_deref(), Some("primary"));

        let settings = resolve(&[("GH_TOKEN", "secondary")]);
        assert_eq!(settings.token.as_deref(), Some("secondary"));
    }

    #[test]
    fn invalid_timeout_falls_back_to_default() {
        for value in ["zero", "0", "-5"] {
            let settings = resolve(&[(HTTP_TIMEOUT_ENV, value)]);
            assert_eq!(settings.http_timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        }
    }

    #[test]
    #[serial_test::serial]
    fn from_env_reads_process_environment() {
        let original = std::env::var(PREFIX_ENV).ok();

        // SAFETY: This test is marked #[serial_test::serial] to ensure exclusive
        // access to environment variables.
        unsafe {
            std::env::set_var(PREFIX_ENV, "/srv/prefix");
        }
        assert_eq!(Settings::from_env().prefix, PathBuf::from("/srv/prefix"));

        unsafe {
            match original {
                Some(val) => std::env::set_var(PREFIX_ENV, val),
                None => std::env::remove_var(PREFIX_ENV),
            }
        }
    }
}
