//! Configuration management for the PDF Toolkit server
//!
//! Only the HTTP surface is configurable. The workspace root and the sweep
//! schedule are compiled in (see `workspace`).

use serde::Deserialize;
use std::env;

/// Default request body limit, enough for several maximum-size uploads
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Default limit on a single upload
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Limit on the whole request body
    pub max_body_bytes: usize,
    /// Limit on each uploaded file
    pub max_file_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            http: HttpConfig {
                cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
                max_file_bytes: MAX_FILE_SIZE,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let port = match lookup("SERVER_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SERVER_PORT",
                    value,
                })?,
            None => defaults.server.port,
        };

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "MAX_BODY_BYTES",
                    value,
                })?,
            None => defaults.http.max_body_bytes,
        };

        let max_file_bytes = match lookup("MAX_FILE_BYTES") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "MAX_FILE_BYTES",
                    value,
                })?,
            None => defaults.http.max_file_bytes,
        };

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.http.cors_origins,
        };

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
            },
            http: HttpConfig {
                cors_origins,
                max_body_bytes,
                max_file_bytes,
            },
        })
    }
}
