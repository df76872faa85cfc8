use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::context::LifecyclePolicy;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Emit the FREIGHT_AUDIT transition stream
    #[serde(default)]
    pub enable_audit: bool,
    pub gateway: GatewayConfig,
    /// Absent: in-memory store
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub postgres_max_connections: u32,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            token_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LifecycleConfig {
    pub invitation_ttl_hours: i64,
    pub offer_ttl_days: i64,
    pub request_number_attempts: u32,
    /// 0 disables the sweeper
    pub expiry_sweep_interval_secs: u64,
    pub tracking_base_url: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        let policy = LifecyclePolicy::default();
        Self {
            invitation_ttl_hours: policy.invitation_ttl.num_hours(),
            offer_ttl_days: policy.offer_ttl.num_days(),
            request_number_attempts: policy.request_number_attempts,
            expiry_sweep_interval_secs: 60,
            tracking_base_url: policy.tracking_base_url,
        }
    }
}

impl From<&LifecycleConfig> for LifecyclePolicy {
    fn from(c: &LifecycleConfig) -> Self {
        Self {
            invitation_ttl: chrono::Duration::hours(c.invitation_ttl_hours),
            offer_ttl: chrono::Duration::days(c.offer_ttl_days),
            request_number_attempts: c.request_number_attempts,
            tracking_base_url: c.tracking_base_url.clone(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: hm_freight.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 8080
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let cfg = AppConfig::parse(MINIMAL).unwrap();
        assert!(!cfg.enable_audit);
        assert!(cfg.postgres_url.is_none());
        assert_eq!(cfg.postgres_max_connections, 10);
        assert_eq!(cfg.lifecycle.invitation_ttl_hours, 24);
        assert_eq!(cfg.lifecycle.offer_ttl_days, 7);
        assert_eq!(cfg.lifecycle.expiry_sweep_interval_secs, 60);
        assert_eq!(cfg.auth.token_ttl_hours, 24);
    }

    #[test]
    fn test_lifecycle_override_reaches_policy() {
        let yaml = format!("{MINIMAL}lifecycle:\n  invitation_ttl_hours: 168\n");
        let cfg = AppConfig::parse(&yaml).unwrap();
        let policy = LifecyclePolicy::from(&cfg.lifecycle);
        assert_eq!(policy.invitation_ttl, chrono::Duration::days(7));
        assert_eq!(policy.offer_ttl, chrono::Duration::days(7));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load("no-such-env").is_err());
    }
}
