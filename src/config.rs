use crate::error::{ClaimError, Result};

/// Where enrolled subjects are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrySource {
    Http(String),
    Postgres(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimConfig {
    pub enabled: bool,
    pub wallet_url: Option<String>,
    pub registry_url: Option<String>,
    pub database_url: Option<String>,
    pub shuffle_seed: Option<u64>,
    pub run_once: bool,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wallet_url: None,
            registry_url: None,
            database_url: None,
            shuffle_seed: None,
            run_once: false,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ClaimError::Config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

impl ClaimConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("CLAIM_AUTOMATION_ENABLED") {
            config.enabled = parse_bool("CLAIM_AUTOMATION_ENABLED", &v)?;
        }
        if let Some(v) = get("CLAIM_RUN_ONCE") {
            config.run_once = parse_bool("CLAIM_RUN_ONCE", &v)?;
        }
        if let Some(v) = get("CLAIM_SHUFFLE_SEED") {
            let seed = v
                .trim()
                .parse::<u64>()
                .map_err(|e| ClaimError::Config(format!("CLAIM_SHUFFLE_SEED: {}", e)))?;
            config.shuffle_seed = Some(seed);
        }
        config.wallet_url = get("CLAIM_WALLET_URL");
        config.registry_url = get("CLAIM_REGISTRY_URL");
        config.database_url = get("CLAIM_DATABASE_URL");
        Ok(config)
    }

    pub fn wallet_url(&self) -> Result<&str> {
        self.wallet_url
            .as_deref()
            .ok_or_else(|| ClaimError::Config("CLAIM_WALLET_URL is required".to_string()))
    }

    /// The database wins when both sources are configured.
    pub fn registry_source(&self) -> Result<RegistrySource> {
        match (&self.database_url, &self.registry_url) {
            (Some(db), _) => Ok(RegistrySource::Postgres(db.clone())),
            (None, Some(url)) => Ok(RegistrySource::Http(url.clone())),
            (None, None) => Err(ClaimError::Config(
                "one of CLAIM_REGISTRY_URL or CLAIM_DATABASE_URL is required".to_string(),
            )),
        }
    }

    /// A disabled worker needs no endpoints.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.wallet_url()?;
        self.registry_source()?;
        Ok(())
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_enabled_and_incomplete() {
        let config = ClaimConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.enabled);
        assert!(!config.run_once);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_needs_no_endpoints() {
        let config = ClaimConfig::from_lookup(lookup(&[("CLAIM_AUTOMATION_ENABLED", "false")])).unwrap();
        assert!(!config.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_wins_over_registry_url() {
        let config = ClaimConfig::from_lookup(lookup(&[
            ("CLAIM_WALLET_URL", "http://wallet"),
            ("CLAIM_REGISTRY_URL", "http://subjects"),
            ("CLAIM_DATABASE_URL", "postgres://claims"),
            ("CLAIM_SHUFFLE_SEED", "17"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.registry_source().unwrap(),
            RegistrySource::Postgres("postgres://claims".to_string())
        );
        assert_eq!(config.shuffle_seed, Some(17));
        assert_eq!(config.wallet_url().unwrap(), "http://wallet");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ClaimConfig::from_lookup(lookup(&[("CLAIM_AUTOMATION_ENABLED", "maybe")])).is_err());
        assert!(ClaimConfig::from_lookup(lookup(&[("CLAIM_SHUFFLE_SEED", "-1")])).is_err());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = ClaimConfig::from_lookup(lookup(&[
            ("CLAIM_WALLET_URL", "  "),
            ("CLAIM_REGISTRY_URL", "http://subjects"),
        ]))
        .unwrap();
        assert!(config.wallet_url.is_none());
        assert!(config.validate().is_err());
    }
}
