//! Server configuration.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use atm_common::{LedgerError, Result};
use atm_ledger::LockGranularity;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable, for local development.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(LedgerError::ConfigurationError(format!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            ))),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Ledger locking strategy.
    pub lock_granularity: LockGranularity,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            listen_port: 8000,
            lock_granularity: LockGranularity::Global,
            log_format: LogFormat::Json,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("ATM_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("ATM_LISTEN_PORT") {
            config.listen_port = port.trim().parse().map_err(|_| {
                LedgerError::ConfigurationError(format!("invalid ATM_LISTEN_PORT '{port}'"))
            })?;
        }

        if let Some(granularity) = lookup("ATM_LOCK_GRANULARITY") {
            config.lock_granularity = granularity.parse()?;
        }

        if let Some(format) = lookup("ATM_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            return Err(LedgerError::ConfigurationError(
                "Listen port cannot be 0".to_string(),
            ));
        }

        self.socket_addr().map(|_| ())
    }

    /// Address to bind the listener to.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen_addr.trim().parse().map_err(|_| {
            LedgerError::ConfigurationError(format!(
                "invalid listen address '{}'",
                self.listen_addr
            ))
        })?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8000");
        assert_eq!(config.lock_granularity, LockGranularity::Global);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ATM_LISTEN_ADDR", "::1"),
            ("ATM_LISTEN_PORT", "9000"),
            ("ATM_LOCK_GRANULARITY", "per-account"),
            ("ATM_LOG_FORMAT", "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.socket_addr().unwrap().to_string(), "[::1]:9000");
        assert_eq!(config.lock_granularity, LockGranularity::PerAccount);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ServerConfig::from_lookup(lookup(&[("ATM_LISTEN_PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("ATM_LOG_FORMAT", "xml")])).is_err());

        let mut config = ServerConfig::default();
        config.listen_port = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.listen_addr = "localhost".to_string();
        assert!(config.validate().is_err());
    }
}
