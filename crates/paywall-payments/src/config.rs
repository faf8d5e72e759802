//! Provider Configuration
//!
//! Token lifetimes, simulated delays and settlement details. The mock and
//! store-backed providers issue tokens with different TTLs.

use chrono::Duration;
use std::str::FromStr;

use crate::error::{PaymentError, Result};

/// Longest accepted token or record lifetime
pub const MAX_TTL_DAYS: i64 = 3650;

/// Which provider the application runs with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProviderKind {
    /// Offline demo provider, probabilistic outcomes
    Mock,
    /// Provider backed by the record store
    #[default]
    Store,
}

impl FromStr for ProviderKind {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(ProviderKind::Mock),
            "store" => Ok(ProviderKind::Store),
            other => Err(PaymentError::Config(format!("unknown provider '{other}'"))),
        }
    }
}

/// Deployment environment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(PaymentError::Config(format!("unknown environment '{other}'"))),
        }
    }
}

/// Payment provider settings
#[derive(Clone, Debug)]
pub struct PaywallConfig {
    pub provider: ProviderKind,
    pub environment: Environment,
    pub api_key: String,

    /// Token lifetime for the mock provider (24 hours)
    pub mock_token_ttl: Duration,

    /// Token lifetime for the store-backed provider (30 days)
    pub token_ttl: Duration,

    /// Payment record lifetime (30 days)
    pub record_ttl: Duration,

    /// Delay before a pending transaction is confirmed
    pub settlement_delay: std::time::Duration,

    /// Simulated network latency of the mock provider
    pub processing_delay: std::time::Duration,

    /// Probability that a mock payment succeeds
    pub success_rate: f64,

    /// Address receiving payments
    pub recipient_address: String,

    /// Settlement token symbol
    pub settlement_token: String,

    pub chain: String,
}

impl Default for PaywallConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            environment: Environment::default(),
            api_key: "mock_api_key".into(),
            mock_token_ttl: Duration::hours(24),
            token_ttl: Duration::days(30),
            record_ttl: Duration::days(30),
            settlement_delay: std::time::Duration::from_millis(3000),
            processing_delay: std::time::Duration::from_millis(1500),
            success_rate: 0.9,
            recipient_address: "0x8d8fa42584a727488eeb0e29405ad794a105bb9b".into(),
            settlement_token: "TRUMP".into(),
            chain: "ethereum".into(),
        }
    }
}

impl PaywallConfig {
    /// Load from `PAYWALL_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env("PAYWALL_PROVIDER") {
            config.provider = v.parse()?;
        }
        if let Some(v) = env("PAYWALL_ENVIRONMENT") {
            config.environment = v.parse()?;
        }
        if let Some(v) = env("PAYWALL_API_KEY") {
            config.api_key = v;
        }
        if let Some(ttl) = env_seconds("PAYWALL_MOCK_TOKEN_TTL_SECS")? {
            config.mock_token_ttl = ttl;
        }
        if let Some(ttl) = env_seconds("PAYWALL_TOKEN_TTL_SECS")? {
            config.token_ttl = ttl;
        }
        if let Some(ttl) = env_seconds("PAYWALL_RECORD_TTL_SECS")? {
            config.record_ttl = ttl;
        }
        if let Some(ms) = env_parse::<u64>("PAYWALL_SETTLEMENT_DELAY_MS")? {
            config.settlement_delay = std::time::Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("PAYWALL_PROCESSING_DELAY_MS")? {
            config.processing_delay = std::time::Duration::from_millis(ms);
        }
        if let Some(rate) = env_parse::<f64>("PAYWALL_SUCCESS_RATE")? {
            config.success_rate = rate;
        }
        if let Some(v) = env("PAYWALL_RECIPIENT_ADDRESS") {
            config.recipient_address = v;
        }
        if let Some(v) = env("PAYWALL_SETTLEMENT_TOKEN") {
            config.settlement_token = v;
        }
        if let Some(v) = env("PAYWALL_CHAIN") {
            config.chain = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the providers cannot honor
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(PaymentError::Config(format!(
                "success rate {} outside 0..=1",
                self.success_rate
            )));
        }
        for (name, ttl) in [
            ("mock token TTL", self.mock_token_ttl),
            ("token TTL", self.token_ttl),
            ("record TTL", self.record_ttl),
        ] {
            if ttl <= Duration::zero() {
                return Err(PaymentError::Config(format!("{name} must be positive")));
            }
            if ttl > Duration::days(MAX_TTL_DAYS) {
                return Err(PaymentError::Config(format!(
                    "{name} exceeds {MAX_TTL_DAYS} days"
                )));
            }
        }
        Ok(())
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    env(name)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| PaymentError::Config(format!("{name} has invalid value '{v}'")))
        })
        .transpose()
}

fn env_seconds(name: &str) -> Result<Option<Duration>> {
    env_parse::<i64>(name)?
        .map(|secs| {
            Duration::try_seconds(secs)
                .ok_or_else(|| PaymentError::Config(format!("{name} is out of range")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls_differ_per_provider() {
        let config = PaywallConfig::default();
        assert_eq!(config.mock_token_ttl, Duration::hours(24));
        assert_eq!(config.token_ttl, Duration::days(30));
        assert_eq!(config.record_ttl, Duration::days(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_success_rate() {
        let config = PaywallConfig {
            success_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        let config = PaywallConfig {
            token_ttl: Duration::zero(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_ttl() {
        let config = PaywallConfig {
            token_ttl: Duration::try_seconds(i64::MAX / 1000).unwrap(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));

        let config = PaywallConfig {
            record_ttl: Duration::days(MAX_TTL_DAYS),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("MOCK".parse::<ProviderKind>().unwrap(), ProviderKind::Mock);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert!("paypal".parse::<ProviderKind>().is_err());
    }
}
