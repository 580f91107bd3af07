use chrono::Duration;
use std::fmt;
use std::net::SocketAddr;

use shared::services::expiry_service::ExpiryPolicy;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    DynamoDb {
        matches_table: String,
        profiles_table: String,
    },
}

#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub bind_address: SocketAddr,
    pub jwt_secret: String,
    pub store: StoreBackend,
    pub expiry: ExpiryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "Missing environment variable {}", name),
            ConfigError::Invalid { name, value } => {
                write!(f, "Invalid value for {}: {:?}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ArenaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let seconds = |name: &'static str, default: i64| -> Result<i64, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(raw) => raw
                    .parse::<i64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::Invalid { name, value: raw }),
            }
        };

        let raw_address = lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = raw_address.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDRESS",
            value: raw_address.clone(),
        })?;

        let store = match lookup("STORE_BACKEND").as_deref().unwrap_or("memory") {
            "memory" => StoreBackend::Memory,
            "dynamodb" => StoreBackend::DynamoDb {
                matches_table: required("MATCHES_TABLE")?,
                profiles_table: required("PROFILES_TABLE")?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let sweep_secs = seconds("EXPIRY_SWEEP_INTERVAL_SECS", 30)?;
        let expiry = ExpiryPolicy {
            pending_challenge_ttl: Duration::seconds(seconds("PENDING_CHALLENGE_TTL_SECS", 600)?),
            queue_entry_ttl: Duration::seconds(seconds("QUEUE_ENTRY_TTL_SECS", 300)?),
            abandoned_match_ttl: Duration::seconds(seconds("ABANDONED_MATCH_TTL_SECS", 7200)?),
            sweep_interval: std::time::Duration::from_secs(sweep_secs as u64),
        };

        Ok(ArenaConfig {
            bind_address,
            jwt_secret: required("JWT_SECRET")?,
            store,
            expiry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ArenaConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ArenaConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_with_only_secret() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.bind_address.port(), 8000);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.expiry, ExpiryPolicy::default());
    }

    #[test]
    fn test_dynamodb_backend_needs_tables() {
        let err = load(&[("JWT_SECRET", "s"), ("STORE_BACKEND", "dynamodb")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("MATCHES_TABLE"));

        let config = load(&[
            ("JWT_SECRET", "s"),
            ("STORE_BACKEND", "dynamodb"),
            ("MATCHES_TABLE", "matches"),
            ("PROFILES_TABLE", "profiles"),
        ])
        .unwrap();
        assert_eq!(
            config.store,
            StoreBackend::DynamoDb {
                matches_table: "matches".to_string(),
                profiles_table: "profiles".to_string(),
            }
        );
    }

    #[rstest]
    #[case(&[], ConfigError::Missing("JWT_SECRET"))]
    #[case(&[("JWT_SECRET", "s"), ("BIND_ADDRESS", "nowhere")], ConfigError::Invalid { name: "BIND_ADDRESS", value: "nowhere".to_string() })]
    #[case(&[("JWT_SECRET", "s"), ("QUEUE_ENTRY_TTL_SECS", "0")], ConfigError::Invalid { name: "QUEUE_ENTRY_TTL_SECS", value: "0".to_string() })]
    #[case(&[("JWT_SECRET", "s"), ("STORE_BACKEND", "redis")], ConfigError::Invalid { name: "STORE_BACKEND", value: "redis".to_string() })]
    fn test_invalid_configuration(#[case] vars: &[(&str, &str)], #[case] expected: ConfigError) {
        assert_eq!(load(vars).unwrap_err(), expected);
    }
}
