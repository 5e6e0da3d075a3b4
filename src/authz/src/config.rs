//! Engine configuration

use crate::error::{BindingError, Result};
use serde::Deserialize;

/// Prefix distinguishing policy-derived roles from other evaluator roles
pub const DEFAULT_POLICY_PREFIX: &str = "pol-";

/// Identity attribute slot carrying declared policies
pub const DEFAULT_POLICIES_KEY: &str = "policies";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Role identifiers with this prefix are policy grants
    pub policy_prefix: String,

    /// Identity `extra` key used for declared input and display-name output
    pub policies_key: String,

    /// Domain passed to the evaluator for both reads and writes
    pub evaluator_domain: String,

    /// Extra attempts after a binding update conflict; 0 surfaces the conflict
    pub update_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy_prefix: DEFAULT_POLICY_PREFIX.to_string(),
            policies_key: DEFAULT_POLICIES_KEY.to_string(),
            evaluator_domain: String::new(),
            update_conflict_retries: 0,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `POLBIND_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(prefix) = lookup("POLBIND_POLICY_PREFIX") {
            config.policy_prefix = prefix;
        }
        if let Some(key) = lookup("POLBIND_POLICIES_KEY") {
            config.policies_key = key;
        }
        if let Some(domain) = lookup("POLBIND_EVALUATOR_DOMAIN") {
            config.evaluator_domain = domain;
        }
        if let Some(retries) = lookup("POLBIND_UPDATE_CONFLICT_RETRIES") {
            config.update_conflict_retries = retries.trim().parse().map_err(|_| {
                BindingError::Configuration(format!(
                    "POLBIND_UPDATE_CONFLICT_RETRIES must be a non-negative integer, got '{}'",
                    retries
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.policy_prefix.is_empty() {
            return Err(BindingError::Configuration(
                "policy_prefix cannot be empty".to_string(),
            ));
        }
        if self.policies_key.is_empty() {
            return Err(BindingError::Configuration(
                "policies_key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_update_conflict_retries(mut self, retries: u32) -> Self {
        self.update_conflict_retries = retries;
        self
    }

    pub fn with_evaluator_domain(mut self, domain: impl Into<String>) -> Self {
        self.evaluator_domain = domain.into();
        self
    }
}
