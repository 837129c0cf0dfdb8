// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`Config`] loaded from them
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BACKEND_BASE_URL` | Wallet backend base URL | `http://localhost:8000` |
//! | `PARTNER_API_BASE_URL` | Partner API base URL | `https://api.sandbox.cobo.com` |
//! | `APP_CLIENT_ID` | Application id sent as `client_id` | empty |
//! | `APP_PUBLIC_KEY` | Public key identifier sent as `BIZ-API-KEY` | Required for signed calls |
//! | `APP_SECRET` | Hex Ed25519 seed used to sign partner calls | Required for signed calls |
//! | `DATA_DIR` | Directory of the persisted token store | `./data` |
//! | `HTTP_TIMEOUT_SECS` | Per-request timeout in seconds | `15` |
//! | `PORTAL_TOKEN` | Portal token handed over by the host | Optional |
//! | `PORTAL_USER_ID` | Portal user id handed over by the host | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage::keys::DATA_ROOT;

pub const BACKEND_BASE_URL_ENV: &str = "BACKEND_BASE_URL";
pub const PARTNER_API_BASE_URL_ENV: &str = "PARTNER_API_BASE_URL";
pub const APP_CLIENT_ID_ENV: &str = "APP_CLIENT_ID";
pub const APP_PUBLIC_KEY_ENV: &str = "APP_PUBLIC_KEY";
pub const APP_SECRET_ENV: &str = "APP_SECRET";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HTTP_TIMEOUT_SECS_ENV: &str = "HTTP_TIMEOUT_SECS";
pub const PORTAL_TOKEN_ENV: &str = "PORTAL_TOKEN";
pub const PORTAL_USER_ID_ENV: &str = "PORTAL_USER_ID";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_BACKEND_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PARTNER_API_BASE_URL: &str = "https://api.sandbox.cobo.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration missing: {0}")]
    MissingConfig(String),

    #[error("configuration invalid: {name}: {reason}")]
    InvalidConfig { name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone)]
pub struct Config {
    pub backend_base_url: String,
    pub partner_api_base_url: String,
    pub client_id: String,
    pub api_key: Option<String>,
    pub app_secret: Option<String>,
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub portal_token: Option<String>,
    pub portal_user_id: Option<String>,
    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("backend_base_url", &self.backend_base_url)
            .field("partner_api_base_url", &self.partner_api_base_url)
            .field("client_id", &self.client_id)
            .field("api_key", &self.api_key)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("data_dir", &self.data_dir)
            .field("http_timeout", &self.http_timeout)
            .field("portal_token", &self.portal_token.as_ref().map(|_| "<redacted>"))
            .field("portal_user_id", &self.portal_user_id)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or_default =
            |name: &str, default: &str| optional(name).unwrap_or_else(|| default.to_string());

        let http_timeout = match optional(HTTP_TIMEOUT_SECS_ENV) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e| ConfigError::InvalidConfig {
                    name: HTTP_TIMEOUT_SECS_ENV.to_string(),
                    reason: format!("{e}"),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let log_format = match optional(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidConfig {
                    name: LOG_FORMAT_ENV.to_string(),
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        Ok(Self {
            backend_base_url: or_default(BACKEND_BASE_URL_ENV, DEFAULT_BACKEND_BASE_URL),
            partner_api_base_url: or_default(PARTNER_API_BASE_URL_ENV, DEFAULT_PARTNER_API_BASE_URL),
            client_id: optional(APP_CLIENT_ID_ENV).unwrap_or_default(),
            api_key: optional(APP_PUBLIC_KEY_ENV),
            // Escaped newlines are tolerated the same way PEM secrets are.
            app_secret: optional(APP_SECRET_ENV).map(|s| s.replace("\\n", "")),
            data_dir: PathBuf::from(or_default(DATA_DIR_ENV, DATA_ROOT)),
            http_timeout,
            portal_token: optional(PORTAL_TOKEN_ENV),
            portal_user_id: optional(PORTAL_USER_ID_ENV),
            log_format,
        })
    }

    /// The partner signing secret, required for signed calls.
    pub fn require_app_secret(&self) -> Result<&str, ConfigError> {
        self.app_secret
            .as_deref()
            .ok_or_else(|| ConfigError::MissingConfig(APP_SECRET_ENV.to_string()))
    }
}
