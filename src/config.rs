//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("no config directory available; set TRENDSENSE_SESSION_FILE")]
    NoSessionDir,
}

/// What startup validation does when the server cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestorePolicy {
    /// Treat an unreachable server exactly like a rejected token.
    #[default]
    FailClosed,
    /// Keep the stored token and cached user when the failure is transport-level.
    KeepCached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeouts: Timeouts,
    /// Explicit session file; `None` means the platform config directory.
    pub session_file: Option<PathBuf>,
    pub restore_policy: RestorePolicy,
}

impl ClientConfig {
    /// Build typed config from process environment variables.
    ///
    /// Optional:
    /// - `TRENDSENSE_API_URL`: default `http://127.0.0.1:5001/api`
    /// - `TRENDSENSE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `TRENDSENSE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `TRENDSENSE_SESSION_FILE`: default `<config dir>/trendsense/session.json`
    /// - `TRENDSENSE_RESTORE_POLICY`: `fail_closed` (default) or `keep_cached`
    ///
    /// # Errors
    ///
    /// Returns an error if the restore policy is not recognized.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the restore policy is not recognized.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("TRENDSENSE_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim()
            .trim_end_matches('/')
            .to_owned();
        let timeouts = Timeouts {
            request_secs: parse_u64(lookup("TRENDSENSE_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("TRENDSENSE_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let session_file = lookup("TRENDSENSE_SESSION_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let restore_policy = parse_restore_policy(lookup("TRENDSENSE_RESTORE_POLICY").as_deref())?;

        Ok(Self { api_url, timeouts, session_file, restore_policy })
    }

    /// Resolve where the session is persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if no explicit file is set and the platform has no
    /// config directory.
    pub fn session_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        directories::ProjectDirs::from("", "", "trendsense")
            .map(|dirs| dirs.config_dir().join(SESSION_FILE_NAME))
            .ok_or(ConfigError::NoSessionDir)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            timeouts: Timeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            session_file: None,
            restore_policy: RestorePolicy::FailClosed,
        }
    }
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

pub(crate) fn parse_restore_policy(raw: Option<&str>) -> Result<RestorePolicy, ConfigError> {
    match raw.map(str::trim).unwrap_or("fail_closed") {
        "" | "fail_closed" => Ok(RestorePolicy::FailClosed),
        "keep_cached" => Ok(RestorePolicy::KeepCached),
        other => Err(ConfigError::Parse(format!(
            "unknown TRENDSENSE_RESTORE_POLICY '{other}' (expected 'fail_closed' or 'keep_cached')"
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
