use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_CASCADE_SWEEPS: u8 = 3;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;

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

/// Top-level configuration for the marketplace service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub integrity: IntegrityConfig,
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

        let cascade_sweeps = match env::var("APP_CASCADE_SWEEPS") {
            Ok(raw) => match raw.trim().parse::<u8>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidCascadeSweeps { value: raw }),
            },
            Err(_) => DEFAULT_CASCADE_SWEEPS,
        };

        let reconcile_interval_secs = match env::var("APP_RECONCILE_INTERVAL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidReconcileInterval { value: raw })?,
            Err(_) => DEFAULT_RECONCILE_INTERVAL_SECS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            integrity: IntegrityConfig {
                cascade_sweeps,
                reconcile_interval_secs,
            },
        })
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
    pub log_level: String,
}

/// Knobs for the employer-deletion cascade and the background reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityConfig {
    /// Upper bound on cleanup sweeps after the primary cascade pass.
    pub cascade_sweeps: u8,
    /// Seconds between reconciliation passes; zero disables the ticker.
    pub reconcile_interval_secs: u64,
}

impl IntegrityConfig {
    pub fn reconcile_interval(&self) -> Option<Duration> {
        if self.reconcile_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.reconcile_interval_secs))
        }
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            cascade_sweeps: DEFAULT_CASCADE_SWEEPS,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCascadeSweeps { value: String },
    InvalidReconcileInterval { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCascadeSweeps { value } => write!(
                f,
                "APP_CASCADE_SWEEPS must be an integer between 1 and 255 (found '{value}')"
            ),
            ConfigError::InvalidReconcileInterval { value } => write!(
                f,
                "APP_RECONCILE_INTERVAL_SECS must be a non-negative integer (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidCascadeSweeps { .. }
            | ConfigError::InvalidReconcileInterval { .. } => None,
        }
    }
}
