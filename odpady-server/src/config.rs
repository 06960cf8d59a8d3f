//! Server settings read from the process environment.

use std::env;
use std::path::PathBuf;

/// Listen address used when `BIND_ADDR` is unset.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
/// Listen port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Invalid or incomplete configuration.
pub enum ConfigError {
    /// A variable required by the selected backend is unset or blank.
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    /// `PORT` is not a valid port number.
    #[error("PORT must be a number between 0 and 65535, got {0:?}")]
    InvalidPort(String),
    /// `ODPADY_BACKEND` names an unknown backend.
    #[error("ODPADY_BACKEND must be \"supabase\" or \"memory\", got {0:?}")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Data backend the server talks to.
pub enum BackendConfig {
    /// Hosted Supabase project.
    Supabase {
        /// Project URL.
        url: String,
        /// Service-role key for table access.
        service_key: String,
    },
    /// In-process store, optionally seeded from a JSON file.
    Memory {
        /// Seed file path from `ODPADY_MEMORY_SEED`.
        seed: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Complete server configuration.
pub struct ServerConfig {
    /// Listen address.
    pub bind_addr: String,
    /// Listen port.
    pub port: u16,
    /// Data backend.
    pub backend: BackendConfig,
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed or missing values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed or missing values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let port = match var("PORT") {
            Some(raw) => raw.parse().ok().ok_or(ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let backend = match var("ODPADY_BACKEND")
            .map(|name| name.to_lowercase())
            .as_deref()
        {
            None | Some("supabase") => BackendConfig::Supabase {
                url: required("SUPABASE_URL")?,
                service_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
            },
            Some("memory") => BackendConfig::Memory {
                seed: var("ODPADY_MEMORY_SEED").map(PathBuf::from),
            },
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_owned())),
        };

        Ok(Self {
            bind_addr,
            port,
            backend,
        })
    }
}
