// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup and passed
//! around as an immutable [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APP_ENV` | `development` or `production` | `development` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3001` |
//! | `DATA_DIR` | Root directory for the JSON document store | in-memory store |
//! | `JWT_SECRET` | HS256 signing secret | Required for production |
//! | `JWT_EXPIRES_IN_SECS` | Session token lifetime | `7776000` (90 days) |
//! | `JWT_COOKIE_EXPIRES_IN_DAYS` | Session cookie lifetime | `90` |
//! | `BCRYPT_COST` | Password hashing work factor | `12` |
//! | `RESET_TOKEN_TTL_MINUTES` | Reset secret lifetime | `10` |
//! | `PUBLIC_BASE_URL` | Origin used to build reset links | `http://localhost:3001` |
//! | `MAX_PAGE_SIZE` | Upper bound (and default) for list page size | `100` |
//! | `QUERY_STRICT_FILTERS` | Reject filters on undeclared fields | `false` |
//! | `CORS_ORIGIN` | Allowed browser origin | `http://localhost:3000` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | Serve HTTPS with these PEM files | plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;
use url::Url;

pub const APP_ENV_ENV: &str = "APP_ENV";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Root directory of the file-backed document store. When unset the server
/// keeps everything in memory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRES_IN_SECS_ENV: &str = "JWT_EXPIRES_IN_SECS";
pub const JWT_COOKIE_EXPIRES_IN_DAYS_ENV: &str = "JWT_COOKIE_EXPIRES_IN_DAYS";
pub const BCRYPT_COST_ENV: &str = "BCRYPT_COST";
pub const RESET_TOKEN_TTL_MINUTES_ENV: &str = "RESET_TOKEN_TTL_MINUTES";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
pub const MAX_PAGE_SIZE_ENV: &str = "MAX_PAGE_SIZE";
pub const QUERY_STRICT_FILTERS_ENV: &str = "QUERY_STRICT_FILTERS";
pub const CORS_ORIGIN_ENV: &str = "CORS_ORIGIN";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_JWT_EXPIRES_IN_SECS: u64 = 90 * 24 * 60 * 60;
pub const DEFAULT_JWT_COOKIE_EXPIRES_IN_DAYS: i64 = 90;
pub const DEFAULT_BCRYPT_COST: u32 = 12;
pub const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Minimum length of a production signing secret.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Signing secret used when running in development without `JWT_SECRET`.
const DEVELOPMENT_JWT_SECRET: &str = "development-only-secret-do-not-use-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters in production")]
    WeakSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Settings consumed by the authentication pipeline.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub cookie_ttl_days: i64,
    pub bcrypt_cost: u32,
    pub reset_token_ttl_minutes: i64,
}

/// Settings consumed by the query engine.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    /// Page size used when the request does not ask for one, and the cap
    /// applied when it does.
    pub max_page_size: usize,
    /// When set, filters on fields outside a collection's declared
    /// attributes are rejected instead of matching nothing.
    pub strict_filters: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            strict_filters: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub auth: AuthSettings,
    pub public_base_url: Url,
    pub query: QuerySettings,
    pub cors_origin: String,
    pub tls: Option<TlsSettings>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let environment = match get(APP_ENV_ENV).as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: APP_ENV_ENV,
                    value: other.to_string(),
                })
            }
        };

        let jwt_secret = match get(JWT_SECRET_ENV) {
            Some(secret) => {
                if environment.is_production() && secret.len() < MIN_JWT_SECRET_LEN {
                    return Err(ConfigError::WeakSecret);
                }
                secret
            }
            None if environment.is_production() => {
                return Err(ConfigError::Missing(JWT_SECRET_ENV))
            }
            None => DEVELOPMENT_JWT_SECRET.to_string(),
        };

        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let host = get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());

        let bcrypt_cost = parse_or(get(BCRYPT_COST_ENV), BCRYPT_COST_ENV, DEFAULT_BCRYPT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: BCRYPT_COST_ENV,
                value: bcrypt_cost.to_string(),
            });
        }

        let public_base_url = match get(PUBLIC_BASE_URL_ENV) {
            Some(raw) => Url::parse(&raw).map_err(|_| ConfigError::Invalid {
                name: PUBLIC_BASE_URL_ENV,
                value: raw,
            })?,
            None => default_base_url(port)?,
        };

        let max_page_size = parse_or(get(MAX_PAGE_SIZE_ENV), MAX_PAGE_SIZE_ENV, DEFAULT_MAX_PAGE_SIZE)?;
        if max_page_size == 0 {
            return Err(ConfigError::Invalid {
                name: MAX_PAGE_SIZE_ENV,
                value: "0".to_string(),
            });
        }

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsSettings {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            environment,
            host,
            port,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            auth: AuthSettings {
                jwt_secret,
                token_ttl: Duration::from_secs(parse_or(
                    get(JWT_EXPIRES_IN_SECS_ENV),
                    JWT_EXPIRES_IN_SECS_ENV,
                    DEFAULT_JWT_EXPIRES_IN_SECS,
                )?),
                cookie_ttl_days: parse_or(
                    get(JWT_COOKIE_EXPIRES_IN_DAYS_ENV),
                    JWT_COOKIE_EXPIRES_IN_DAYS_ENV,
                    DEFAULT_JWT_COOKIE_EXPIRES_IN_DAYS,
                )?,
                bcrypt_cost,
                reset_token_ttl_minutes: parse_or(
                    get(RESET_TOKEN_TTL_MINUTES_ENV),
                    RESET_TOKEN_TTL_MINUTES_ENV,
                    DEFAULT_RESET_TOKEN_TTL_MINUTES,
                )?,
            },
            public_base_url,
            query: QuerySettings {
                max_page_size,
                strict_filters: matches!(
                    get(QUERY_STRICT_FILTERS_ENV).as_deref(),
                    Some("true") | Some("1")
                ),
            },
            cors_origin: get(CORS_ORIGIN_ENV).unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            tls,
            log_format,
        })
    }

    /// Development defaults with no environment lookups.
    pub fn development() -> Self {
        // The empty lookup only takes default branches, none of which fail.
        match Self::from_lookup(|_| None) {
            Ok(config) => config,
            Err(err) => unreachable!("development defaults are valid: {err}"),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: self.host.clone(),
            })
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn default_base_url(port: u16) -> Result<Url, ConfigError> {
    let raw = format!("http://localhost:{port}");
    Url::parse(&raw).map_err(|_| ConfigError::Invalid {
        name: PUBLIC_BASE_URL_ENV,
        value: raw,
    })
}
