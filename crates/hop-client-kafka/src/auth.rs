//! Hopskotch credentials.
//!
//! Credentials live in the hop-client `auth.toml` file:
//!
//! ```toml
//! [[auth]]
//! username = "user-abc123"
//! password = "..."
//! hostname = "kafka.scimma.org"
//! ```
//!
//! Each entry may name the host it belongs to; [`select_matching_auth`]
//! picks the one for the host being contacted.

use std::fmt;
use std::path::{Path, PathBuf};

use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable that overrides the credential file location.
pub const AUTH_FILE_ENV: &str = "HOP_AUTH_FILE";

fn default_protocol() -> String {
    "SASL_SSL".to_string()
}

fn default_mechanism() -> String {
    "SCRAM_SHA_512".to_string()
}

/// One set of Hopskotch credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    /// SASL username
    pub username: String,
    /// SASL password
    pub password: String,
    /// Kafka security protocol
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// SASL mechanism, in hop-client spelling (`SCRAM_SHA_512`)
    #[serde(default = "default_mechanism")]
    pub mechanism: String,
    /// Host these credentials belong to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl Auth {
    /// Credentials with the default protocol and mechanism.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            protocol: default_protocol(),
            mechanism: default_mechanism(),
            hostname: None,
        }
    }

    /// Restrict these credentials to `hostname`.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Add the SASL settings for these credentials to a client config.
    pub fn apply(&self, config: &mut ClientConfig) {
        config
            .set("security.protocol", &self.protocol)
            .set("sasl.mechanism", self.mechanism.replace('_', "-"))
            .set("sasl.username", &self.username)
            .set("sasl.password", &self.password);
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("protocol", &self.protocol)
            .field("mechanism", &self.mechanism)
            .field("hostname", &self.hostname)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct AuthFile {
    #[serde(default)]
    auth: Vec<Auth>,
}

/// Location of the credential file: `$HOP_AUTH_FILE`, else
/// `<config dir>/hop/auth.toml`.
pub fn default_auth_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(AUTH_FILE_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("hop").join("auth.toml"))
}

/// Read all credentials from an `auth.toml` file.
pub fn load_auth(path: &Path) -> Result<Vec<Auth>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    let file: AuthFile = toml::from_str(&content).map_err(|source| Error::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), count = file.auth.len(), "Loaded hop credentials");
    Ok(file.auth)
}

fn strip_port(host: &str) -> &str {
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

/// Pick the credential to use for `hostname`.
///
/// A credential naming the host wins; otherwise a single credential with
/// no hostname is used as the fallback. Ports are ignored on both sides.
pub fn select_matching_auth(creds: &[Auth], hostname: &str) -> Result<Auth> {
    let host = strip_port(hostname);

    let named: Vec<&Auth> = creds
        .iter()
        .filter(|c| c.hostname.as_deref().map(strip_port) == Some(host))
        .collect();
    match named.as_slice() {
        [only] => return Ok((*only).clone()),
        [] => {}
        _ => {
            return Err(Error::auth(format!(
                "{} credentials match hostname '{host}'; remove the duplicates",
                named.len()
            )));
        }
    }

    let unnamed: Vec<&Auth> = creds.iter().filter(|c| c.hostname.is_none()).collect();
    match unnamed.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Err(Error::auth(format!(
            "no credentials found for hostname '{host}'"
        ))),
        _ => Err(Error::auth(format!(
            "no credentials name hostname '{host}' and {} unnamed credentials are ambiguous",
            unnamed.len()
        ))),
    }
}

/// How a stream authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthChoice {
    /// Use the credentials stored for the current installation.
    #[default]
    Current,
    /// Use credentials from a specific `auth.toml`.
    File(PathBuf),
    /// Connect without authentication.
    NoAuth,
    /// Use these credentials.
    Explicit(Auth),
}

impl AuthChoice {
    /// Resolve to the credentials to use for `hostname`, if any.
    pub fn resolve(&self, hostname: &str) -> Result<Option<Auth>> {
        match self {
            AuthChoice::NoAuth => Ok(None),
            AuthChoice::Explicit(auth) => Ok(Some(auth.clone())),
            AuthChoice::File(path) => select_matching_auth(&load_auth(path)?, hostname).map(Some),
            AuthChoice::Current => {
                let path = default_auth_path()
                    .ok_or_else(|| Error::auth("could not determine the hop config directory"))?;
                select_matching_auth(&load_auth(&path)?, hostname).map(Some)
            }
        }
    }
}
