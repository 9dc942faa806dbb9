//! Runtime configuration shared by the services.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//! ```json
//! { "minPasswordLen": 6, "requireRegistration": false, "simulatedLatencyMs": 0 }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum password length accepted by login and registration.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub min_password_len: usize,
    /// When set, `login` refuses emails that were never registered.
    /// Otherwise a first login registers the account implicitly.
    pub require_registration: bool,
    /// Accept identity-assertion tokens whose signature was not checked.
    pub trust_unverified_assertions: bool,
    /// Artificial delay before identity and ledger operations complete.
    pub simulated_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
            require_registration: false,
            trust_unverified_assertions: false,
            simulated_latency_ms: 0,
        }
    }
}

impl Config {
    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn with_require_registration(mut self, require: bool) -> Self {
        self.require_registration = require;
        self
    }

    pub fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.min_password_len, 6);
    }

    #[test]
    fn test_partial_override() {
        let config: Config =
            serde_json::from_str(r#"{"requireRegistration": true, "simulatedLatencyMs": 250}"#)
                .unwrap();
        assert!(config.require_registration);
        assert_eq!(config.simulated_latency(), Duration::from_millis(250));
        assert!(!config.trust_unverified_assertions);
    }
}
