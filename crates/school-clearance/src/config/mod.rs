use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::discipline::OffenseOverflowPolicy;

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
    pub clearance: ClearanceConfig,
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
        let show_targets = env::var("APP_LOG_TARGETS")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let offense_overflow = match env::var("CLEARANCE_OFFENSE_OVERFLOW") {
            Ok(raw) => parse_overflow_policy(&raw)?,
            Err(_) => OffenseOverflowPolicy::default(),
        };
        let violation_catalog = env::var("CLEARANCE_VIOLATION_CATALOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                show_targets,
            },
            clearance: ClearanceConfig {
                offense_overflow,
                violation_catalog,
            },
        })
    }
}

/// Accepts `clamp`/`harshest` and `omit`/`none`, case-insensitively.
pub fn parse_overflow_policy(raw: &str) -> Result<OffenseOverflowPolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "clamp" | "harshest" => Ok(OffenseOverflowPolicy::ClampToHarshest),
        "omit" | "none" => Ok(OffenseOverflowPolicy::Omit),
        _ => Err(ConfigError::InvalidOverflowPolicy {
            value: raw.to_string(),
        }),
    }
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
    /// A bare level or a full `EnvFilter` directive list.
    pub log_level: String,
    /// Print event targets, e.g. to tell notification deliveries apart.
    pub show_targets: bool,
}

/// Policy dials for the clearance and discipline workflows.
#[derive(Debug, Clone)]
pub struct ClearanceConfig {
    pub offense_overflow: OffenseOverflowPolicy,
    /// CSV catalog replacing the built-in handbook violations.
    pub violation_catalog: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidOverflowPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidOverflowPolicy { value } => write!(
                f,
                "CLEARANCE_OFFENSE_OVERFLOW must be 'clamp' or 'omit' (found '{}')",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidOverflowPolicy { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
