use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub state: StateConfig,
    pub booking: BookingConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub cors_allowed_origin: Option<String>,
}

/// Upstream marketplace API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    pub backend: StateBackend,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub session_refresh_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Server configuration
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();

        // Upstream API. The browser build used NEXT_PUBLIC_API_BASE_URL, so accept it too.
        let base_url = env::var("API_BASE_URL")
            .or_else(|_| env::var("NEXT_PUBLIC_API_BASE_URL"))
            .unwrap_or_else(|_| "http://localhost:5000/api".to_string());
        let timeout_secs = parse_or("API_TIMEOUT_SECS", 15)?;

        // Client state store
        let backend = env::var("STATE_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .parse::<StateBackend>()
            .map_err(anyhow::Error::msg)
            .context("Failed to parse STATE_STORE")?;

        let database = match env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: Some(parse_or("DATABASE_MAX_CONNECTIONS", 10)?),
                min_connections: Some(parse_or("DATABASE_MIN_CONNECTIONS", 1)?),
            }),
            Err(_) => None,
        };

        if backend == StateBackend::Postgres && database.is_none() {
            bail!("DATABASE_URL must be set when STATE_STORE=postgres");
        }

        let booking = BookingConfig {
            session_refresh_secs: parse_or("SESSION_REFRESH_SECS", 30)?,
            retry_max_attempts: parse_or("BOOKING_RETRY_MAX_ATTEMPTS", 3)?,
            retry_backoff_ms: parse_or("BOOKING_RETRY_BACKOFF_MS", 250)?,
        };

        // App configuration
        let environment = env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .parse::<Environment>()
            .unwrap_or_default();

        let name = env::var("APP_NAME").unwrap_or_else(|_| "Tutoring Portal".to_string());

        Ok(Config {
            server: ServerConfig {
                host,
                port,
                cors_allowed_origin,
            },
            api: ApiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout_secs,
            },
            state: StateConfig { backend, database },
            booking,
            app: AppConfig { name, environment },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn session_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.booking.session_refresh_secs.max(1))
    }

    /// Settings suitable for tests and local tooling: memory store, given upstream.
    pub fn for_upstream(base_url: impl Into<String>) -> Self {
        Config {
            server: ServerConfig {
                host: IpAddr::from([127, 0, 0, 1]),
                port: 0,
                cors_allowed_origin: None,
            },
            api: ApiConfig {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                timeout_secs: 5,
            },
            state: StateConfig {
                backend: StateBackend::Memory,
                database: None,
            },
            booking: BookingConfig {
                session_refresh_secs: 30,
                retry_max_attempts: 3,
                retry_backoff_ms: 1,
            },
            app: AppConfig {
                name: "Tutoring Portal".to_string(),
                environment: Environment::Development,
            },
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .with_context(|| format!("Failed to parse {key}")),
        Err(_) => Ok(default),
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

impl FromStr for StateBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StateBackend::Memory),
            "postgres" | "postgresql" => Ok(StateBackend::Postgres),
            _ => Err(format!("Unknown state store: {}", s)),
        }
    }
}

use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}
