//! Process configuration loaded from environment variables.

use crate::selector::{AssignmentPolicy, DEFAULT_REVIEWERS_PER_PR};
use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// `DATABASE_PATH` value that selects the in-memory store.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub request_timeout: Duration,
    pub policy: AssignmentPolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS", "10")
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
        if request_timeout_secs == 0 {
            bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        let reviewers_per_pr: usize = var("REVIEWERS_PER_PR", &DEFAULT_REVIEWERS_PER_PR.to_string())
            .parse()
            .context("REVIEWERS_PER_PR must be a non-negative number")?;

        Ok(Self {
            database_path: PathBuf::from(var("DATABASE_PATH", "data/pr-review.db")),
            host: var("SERVER_HOST", "0.0.0.0")
                .parse()
                .context("SERVER_HOST must be an IP address")?,
            port: var("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            log_level: var("LOG_LEVEL", "info"),
            request_timeout: Duration::from_secs(request_timeout_secs),
            policy: AssignmentPolicy { reviewers_per_pr },
        })
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether state should live only in process memory.
    pub fn uses_memory_store(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_DATABASE
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
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.database_path, PathBuf::from("data/pr-review.db"));
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.policy, AssignmentPolicy::default());
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_PATH", ":memory:"),
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "9000"),
            ("LOG_LEVEL", "debug"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("REVIEWERS_PER_PR", "1"),
        ]))
        .unwrap();

        assert!(config.uses_memory_store());
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.policy.reviewers_per_pr, 1);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(Config::from_lookup(lookup(&[("SERVER_PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SERVER_PORT", "70000")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SERVER_HOST", "localhost:1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("REVIEWERS_PER_PR", "-1")])).is_err());
    }
}
