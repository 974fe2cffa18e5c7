//! Environment-driven configuration for the demographics pipeline.
//!
//! | variable | meaning |
//! |---|---|
//! | `ESTAT_APP_ID` | e-Stat application ID; unset disables official statistics |
//! | `ESTAT_BASE_URL` | e-Stat endpoint override |
//! | `ESTAT_STATS_DATA_ID` | census table to read |
//! | `AI_PROVIDER`, `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, `AI_MODEL`, `AI_BASE_URL` | see [`ProviderConfig::from_env`] |
//! | `SOURCE_TIMEOUT_SECS` | per-call timeout, default 30 |

use std::time::Duration;

use store_site_ai::providers::ProviderConfig;

use crate::SourceError;
use crate::sources::estat::{DEFAULT_BASE_URL, DEFAULT_STATS_DATA_ID, EStatConfig};

/// Default per-call source timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved configuration for [`crate::RegionDemographicsAggregator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemographicsConfig {
    /// Official statistics source, if configured.
    pub estat: Option<EStatConfig>,
    /// AI provider, if configured.
    pub ai: Option<ProviderConfig>,
    /// Timeout applied to each outbound source call.
    pub source_timeout: Duration,
}

impl Default for DemographicsConfig {
    fn default() -> Self {
        Self {
            estat: None,
            ai: None,
            source_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DemographicsConfig {
    /// Reads configuration from the process environment.
    ///
    /// Missing credentials leave the corresponding source unconfigured.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Ai`] if `AI_PROVIDER` names an unknown
    /// provider.
    pub fn from_env() -> Result<Self, SourceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] but reads variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Ai`] if `AI_PROVIDER` names an unknown
    /// provider.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SourceError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let estat = non_empty("ESTAT_APP_ID").map(|app_id| EStatConfig {
            app_id,
            base_url: non_empty("ESTAT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            stats_data_id: non_empty("ESTAT_STATS_DATA_ID")
                .unwrap_or_else(|| DEFAULT_STATS_DATA_ID.to_string()),
        });
        if estat.is_none() {
            log::info!("ESTAT_APP_ID not set; official statistics disabled");
        }

        let ai = ProviderConfig::from_lookup(&lookup)?;

        let source_timeout = match non_empty("SOURCE_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    log::warn!(
                        "Invalid SOURCE_TIMEOUT_SECS '{raw}', using {}s",
                        DEFAULT_TIMEOUT.as_secs()
                    );
                    DEFAULT_TIMEOUT
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            estat,
            ai,
            source_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_configures_nothing() {
        let config = DemographicsConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DemographicsConfig::default());
    }

    #[test]
    fn reads_estat_settings() {
        let config = DemographicsConfig::from_lookup(lookup(&[
            ("ESTAT_APP_ID", "abc123"),
            ("ESTAT_STATS_DATA_ID", "0000000042"),
            ("SOURCE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        let estat = config.estat.unwrap();
        assert_eq!(estat.app_id, "abc123");
        assert_eq!(estat.base_url, DEFAULT_BASE_URL);
        assert_eq!(estat.stats_data_id, "0000000042");
        assert_eq!(config.source_timeout, Duration::from_secs(5));
        assert!(config.ai.is_none());
    }

    #[test]
    fn invalid_timeout_falls_back_to_default() {
        for raw in ["0", "soon", "-3"] {
            let config =
                DemographicsConfig::from_lookup(lookup(&[("SOURCE_TIMEOUT_SECS", raw)])).unwrap();
            assert_eq!(config.source_timeout, DEFAULT_TIMEOUT);
        }
    }

    #[test]
    fn unknown_ai_provider_is_an_error() {
        let result = DemographicsConfig::from_lookup(lookup(&[("AI_PROVIDER", "palm")]));
        assert!(matches!(result, Err(SourceError::Ai(_))));
    }
}
