use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::archival::{SweepSettings, DEFAULT_SITE_PREFIX};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub archive: ArchiveConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let site_prefix = env::var("ARCHIVE_SITE_PREFIX")
            .unwrap_or_else(|_| DEFAULT_SITE_PREFIX.to_string())
            .trim()
            .to_string();
        if !is_valid_site_prefix(&site_prefix) {
            return Err(ConfigError::InvalidSitePrefix { value: site_prefix });
        }

        let alert_days = parse_number("RETENTION_ALERT_DAYS", 30u32)?;
        let sweep_interval_secs = parse_number("RETENTION_SWEEP_INTERVAL_SECS", 3600u64)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "RETENTION_SWEEP_INTERVAL_SECS",
            });
        }
        let sweep_batch_size = parse_number("RETENTION_SWEEP_BATCH_SIZE", 100usize)?;
        if sweep_batch_size == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "RETENTION_SWEEP_BATCH_SIZE",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            archive: ArchiveConfig {
                site_prefix,
                alert_days,
                sweep_interval_secs,
                sweep_batch_size,
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn is_valid_site_prefix(value: &str) -> bool {
    (2..=6).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location-code prefix and retention sweep settings.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub site_prefix: String,
    pub alert_days: u32,
    pub sweep_interval_secs: u64,
    pub sweep_batch_size: usize,
}

impl ArchiveConfig {
    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            interval: Duration::from_secs(self.sweep_interval_secs),
            alert_days: self.alert_days,
            batch_size: self.sweep_batch_size,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSitePrefix { value: String },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSitePrefix { value } => write!(
                f,
                "ARCHIVE_SITE_PREFIX must be 2-6 uppercase letters or digits, got '{value}'"
            ),
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSitePrefix { .. }
            | ConfigError::InvalidNumber { .. } => None,
        }
    }
}
