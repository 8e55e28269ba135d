use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Currency all persisted fares are converted into (default: "USD")
    #[serde(default = "Config::default_base_currency")]
    pub base_currency: String,
    /// Transfer decision policy
    #[serde(default)]
    pub transfer_policy: TransferPolicyConfig,
    /// Supplier endpoints and credentials
    pub suppliers: SuppliersConfig,
}

/// Policy knobs for the transfer leg builder
#[derive(Debug, Clone, Deserialize)]
pub struct TransferPolicyConfig {
    /// Ground duration above which an inter-city flight is attempted (default: 300).
    /// The boundary is exclusive: a quote of exactly this many minutes stays ground.
    #[serde(default = "TransferPolicyConfig::default_air_fallback_threshold_minutes")]
    pub air_fallback_threshold_minutes: i64,
    /// Hours before flight departure to schedule the hotel pickup (default: 4)
    #[serde(default = "TransferPolicyConfig::default_pickup_lead_hours")]
    pub pickup_lead_hours: i64,
    /// Extra seats reserved on inter-city ground transfers (default: 1).
    /// Airport transfers always use a margin of 0.
    #[serde(default = "TransferPolicyConfig::default_intercity_capacity_margin")]
    pub intercity_capacity_margin: u32,
}

impl Default for TransferPolicyConfig {
    fn default() -> Self {
        Self {
            air_fallback_threshold_minutes: Self::default_air_fallback_threshold_minutes(),
            pickup_lead_hours: Self::default_pickup_lead_hours(),
            intercity_capacity_margin: Self::default_intercity_capacity_margin(),
        }
    }
}

impl TransferPolicyConfig {
    fn default_air_fallback_threshold_minutes() -> i64 {
        300
    }
    fn default_pickup_lead_hours() -> i64 {
        4
    }
    fn default_intercity_capacity_margin() -> u32 {
        1
    }
}

/// Supplier API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SuppliersConfig {
    /// Base URL of the ground transfer supplier API
    pub transfer_base_url: String,
    /// Base URL of the flight search supplier API
    pub flight_base_url: String,
    /// Base URL of the currency rates API
    pub currency_base_url: String,
    /// OAuth token endpoint shared by the suppliers
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "SuppliersConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds (default: 10)
    #[serde(default = "SuppliersConfig::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Maximum concurrent requests per supplier (default: 10)
    #[serde(default = "SuppliersConfig::default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// How long fetched currency rates stay valid, in seconds (default: 3600)
    #[serde(default = "SuppliersConfig::default_rates_ttl_secs")]
    pub rates_ttl_secs: u64,
}

impl SuppliersConfig {
    fn default_request_timeout_secs() -> u64 {
        30
    }
    fn default_connect_timeout_secs() -> u64 {
        10
    }
    fn default_max_concurrent_requests() -> usize {
        10
    }
    fn default_rates_ttl_secs() -> u64 {
        3600
    }
}

impl Config {
    fn default_base_currency() -> String {
        "USD".to_string()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("suppliers.transfer_base_url", &self.suppliers.transfer_base_url),
            ("suppliers.flight_base_url", &self.suppliers.flight_base_url),
            ("suppliers.currency_base_url", &self.suppliers.currency_base_url),
            ("suppliers.auth_url", &self.suppliers.auth_url),
        ] {
            if url.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", name)));
            }
        }
        if self.transfer_policy.air_fallback_threshold_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "transfer_policy.air_fallback_threshold_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
cors_permissive: true
suppliers:
  transfer_base_url: "https://transfers.example.com"
  flight_base_url: "https://flights.example.com"
  currency_base_url: "https://rates.example.com"
  auth_url: "https://auth.example.com/token"
  client_id: "id"
  client_secret: "secret"
"#
    }

    #[test]
    fn policy_defaults_apply() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.transfer_policy.air_fallback_threshold_minutes, 300);
        assert_eq!(config.transfer_policy.pickup_lead_hours, 4);
        assert_eq!(config.transfer_policy.intercity_capacity_margin, 1);
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.suppliers.request_timeout_secs, 30);
    }

    #[test]
    fn empty_supplier_url_rejected() {
        let yaml = minimal_yaml().replace("https://auth.example.com/token", "");
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auth_url"));
    }

    #[test]
    fn zero_threshold_rejected() {
        let yaml = format!(
            "{}\ntransfer_policy:\n  air_fallback_threshold_minutes: 0\n",
            minimal_yaml()
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
