use std::path::PathBuf;

use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub rank_icons_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup, falling back to
    /// defaults for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default = |var: &str, default: &str| -> String {
            lookup(var).unwrap_or_else(|| default.to_string())
        };

        fn parse<T>(var: &str, raw: String) -> Result<T, ConfigError>
        where
            T: std::str::FromStr,
            T::Err: std::fmt::Display,
        {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
        }

        let defaults = RetryPolicy::default();
        Ok(Config {
            port: parse("PORT", or_default("PORT", "3000"))?,
            db_path: PathBuf::from(or_default("DB_PATH", "data/grids.redb")),
            rank_icons_dir: PathBuf::from(or_default("RANK_ICONS_DIR", "assets/rank-icons")),
            retry: RetryPolicy {
                max_retries: parse(
                    "REPO_MAX_RETRIES",
                    or_default("REPO_MAX_RETRIES", &defaults.max_retries.to_string()),
                )?,
                delay_ms: parse(
                    "REPO_RETRY_DELAY_MS",
                    or_default("REPO_RETRY_DELAY_MS", &defaults.delay_ms.to_string()),
                )?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("data/grids.redb"));
        assert_eq!(cfg.rank_icons_dir, PathBuf::from("assets/rank-icons"));
        assert_eq!(cfg.retry, RetryPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let cfg = config_from(&[
            ("PORT", "8080"),
            ("DB_PATH", "/tmp/g.redb"),
            ("REPO_MAX_RETRIES", "5"),
            ("REPO_RETRY_DELAY_MS", " 250 "),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/g.redb"));
        assert_eq!(cfg.retry.max_retries, 5);
        assert_eq!(cfg.retry.delay_ms, 250);
    }

    #[test]
    fn test_invalid_port_is_reported() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "PORT"));
    }

    #[test]
    fn test_invalid_retry_count_is_reported() {
        let err = config_from(&[("REPO_MAX_RETRIES", "-1")]).unwrap_err();
        assert!(err.to_string().contains("REPO_MAX_RETRIES"));
    }
}
