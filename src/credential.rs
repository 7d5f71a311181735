//! API key discovery
//!
//! The key comes from an environment variable, falling back to a
//! `KEY=VALUE` scan of a dotenv file. The first matching assignment wins;
//! comments, blank lines and malformed lines are ignored.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding the API key
pub const DEFAULT_ENV_VAR: &str = "RIOT_API_KEY";

/// Dotenv file consulted when the variable is unset
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Credential errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Neither the environment nor the dotenv file provided a key
    #[error("{env_var} not found. Set it in the environment or {}", env_file.display())]
    Missing {
        /// Variable that was looked up
        env_var: String,
        /// Dotenv file that was scanned
        env_file: PathBuf,
    },
}

/// Opaque API key; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key, for building the request header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Look up `env_var` in the process environment, then in `env_file`
    pub fn load(env_var: &str, env_file: impl AsRef<Path>) -> Option<Self> {
        if let Some(value) = std::env::var(env_var).ok().and_then(non_empty) {
            debug!(env_var, "API key taken from environment");
            return Some(Self(value));
        }
        let env_file = env_file.as_ref();
        let found = Self::from_env_file(env_var, env_file);
        if found.is_some() {
            debug!(env_var, file = %env_file.display(), "API key taken from dotenv file");
        }
        found
    }

    /// Like [`ApiKey::load`], failing with [`CredentialError::Missing`]
    pub fn require(env_var: &str, env_file: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let env_file = env_file.as_ref();
        Self::load(env_var, env_file).ok_or_else(|| CredentialError::Missing {
            env_var: env_var.to_string(),
            env_file: env_file.to_path_buf(),
        })
    }

    /// Scan a dotenv file without touching the process environment
    ///
    /// Each line is read on its own, so a broken line never hides the lines
    /// after it. Values are taken literally apart from one pair of matching
    /// surrounding quotes.
    pub fn from_env_file(env_var: &str, env_file: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(env_file).ok()?;
        contents
            .lines()
            .filter_map(assignment)
            .find(|(key, _)| *key == env_var)
            .and_then(|(_, value)| non_empty(unquote(value).to_string()))
            .map(Self)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// `KEY=VALUE` pair of one line; `None` for blanks, comments and malformed lines
fn assignment(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let key = key.strip_prefix("export ").map(str::trim).unwrap_or(key);
    (!key.is_empty()).then_some((key, value.trim()))
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(value)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
