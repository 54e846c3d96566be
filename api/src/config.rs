/// Server configuration module
/// Reads the listen address from the environment

use std::env;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;
use tracing::info;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid host: {0}")]
    InvalidHost(String),
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    /// Load configuration from `API_HOST` and `API_PORT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env::var("API_HOST").ok(), env::var("API_PORT").ok())
    }

    fn from_vars(host: Option<String>, port: Option<String>) -> Result<Self, ConfigError> {
        let host = host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host.clone()))?;

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(0) | Err(_) => return Err(ConfigError::InvalidPort(raw)),
                Ok(port) => port,
            },
            None => DEFAULT_PORT,
        };

        info!("Server configuration loaded: host={}, port={}", host, port);
        Ok(Self { host, port })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
