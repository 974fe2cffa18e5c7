//! Fallback-and-merge pipeline over the official and AI sources.
//!
//! ```text
//!            ┌─ official data ──▶ Enrich ─┐
//! Primary ───┤                            ├──▶ Done
//!            └─ unavailable ───▶ Fallback ┘
//! ```
//!
//! * **Primary** — query the statistics source. A profile with at least
//!   one metric becomes the base; anything else falls through.
//! * **Fallback** — ask the AI source for the whole profile. Failure
//!   leaves an identity-only profile.
//! * **Enrich** — ask the AI source for the fields the base is still
//!   missing and merge them in with
//!   [`RegionDemographics::fill_missing`]. Official values are never
//!   replaced.
//!
//! At most two outbound calls happen per [`RegionDemographicsAggregator::fetch`]
//! (one statistics call, then one AI call), strictly in sequence. Each is
//! bounded by the configured timeout; a timeout counts as "unavailable".

use std::future::Future;
use std::time::Duration;

use store_site_demographics_models::{DemographicField, RegionDemographics};

use crate::SourceError;
use crate::config::{DEFAULT_TIMEOUT, DemographicsConfig};
use crate::estimator::AiEstimator;
use crate::sources::StatisticsSource;
use crate::sources::estat::EStatSource;

/// Pipeline state. Each variant carries what the next step needs.
enum Stage {
    Primary,
    Fallback,
    Enrich(RegionDemographics),
    Done(RegionDemographics),
}

/// Produces a region's demographic profile from whichever sources are
/// configured.
///
/// Holds no per-call state, so one instance can serve concurrent
/// [`fetch`](Self::fetch) calls for different regions.
pub struct RegionDemographicsAggregator {
    primary: Option<Box<dyn StatisticsSource>>,
    estimator: Option<AiEstimator>,
    timeout: Duration,
}

impl RegionDemographicsAggregator {
    /// Creates an aggregator over the given sources. `None` means the
    /// source is not configured.
    #[must_use]
    pub fn new(primary: Option<Box<dyn StatisticsSource>>, estimator: Option<AiEstimator>) -> Self {
        Self {
            primary,
            estimator,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the e-Stat and AI sources described by `config`.
    #[must_use]
    pub fn from_config(config: DemographicsConfig) -> Self {
        let primary = config
            .estat
            .map(|c| Box::new(EStatSource::new(c)) as Box<dyn StatisticsSource>);
        let estimator = config.ai.map(|c| AiEstimator::new(c.build()));

        log::info!(
            "Demographics sources: official={} ai={}",
            primary.as_ref().map_or("none", |p| p.name()),
            estimator
                .as_ref()
                .map_or_else(|| "none".to_string(), AiEstimator::source_name),
        );

        Self::new(primary, estimator).with_timeout(config.source_timeout)
    }

    /// Whether an official statistics source is configured.
    #[must_use]
    pub const fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Whether an AI source is configured.
    #[must_use]
    pub const fn has_estimator(&self) -> bool {
        self.estimator.is_some()
    }

    /// Returns the best available profile for `region`.
    ///
    /// Never fails: unavailable sources, timeouts and malformed responses
    /// are logged and yield a less complete profile, down to one holding
    /// only the region name.
    pub async fn fetch(&self, region: &str) -> RegionDemographics {
        let mut stage = Stage::Primary;

        loop {
            stage = match stage {
                Stage::Primary => {
                    log::debug!("[{region}] primary");
                    self.primary(region)
                        .await
                        .map_or(Stage::Fallback, Stage::Enrich)
                }
                Stage::Fallback => {
                    log::debug!("[{region}] fallback");
                    Stage::Done(self.fallback(region).await)
                }
                Stage::Enrich(base) => {
                    log::debug!("[{region}] enrich");
                    Stage::Done(self.enrich(region, base).await)
                }
                Stage::Done(profile) => {
                    log::info!(
                        "[{region}] demographics: {}",
                        describe_fields(&profile)
                    );
                    return profile;
                }
            };
        }
    }

    async fn primary(&self, region: &str) -> Option<RegionDemographics> {
        let Some(source) = &self.primary else {
            log::debug!("[{region}] no official statistics source configured");
            return None;
        };

        match self
            .bounded(source.name(), source.region_demographics(region))
            .await
        {
            Ok(mut profile) if !profile.is_identity_only() => {
                profile.region = region.to_string();
                Some(profile)
            }
            Ok(_) => {
                log::warn!("[{region}] {} returned no metrics", source.name());
                None
            }
            Err(e) => {
                log::warn!("[{region}] {} unavailable: {e}", source.name());
                None
            }
        }
    }

    async fn fallback(&self, region: &str) -> RegionDemographics {
        let Some(estimator) = &self.estimator else {
            log::warn!("[{region}] no source available; returning empty profile");
            return RegionDemographics::new(region);
        };

        match self.bounded("AI", estimator.estimate(region)).await {
            Ok(profile) => profile,
            Err(e) => {
                log::warn!("[{region}] AI fallback failed: {e}");
                RegionDemographics::new(region)
            }
        }
    }

    async fn enrich(&self, region: &str, mut base: RegionDemographics) -> RegionDemographics {
        let missing: Vec<DemographicField> = base
            .missing_fields()
            .into_iter()
            .filter(|f| f.is_ai_estimable())
            .collect();

        if missing.is_empty() {
            return base;
        }
        let Some(estimator) = &self.estimator else {
            log::debug!("[{region}] no AI source; leaving {missing:?} absent");
            return base;
        };

        match self
            .bounded("AI", estimator.estimate_missing(region, &missing))
            .await
        {
            Ok(estimate) => {
                let filled = base.fill_missing(estimate);
                log::debug!("[{region}] enrichment filled {filled:?}");
            }
            Err(e) => log::warn!("[{region}] enrichment failed: {e}"),
        }

        base
    }

    /// Applies the per-call timeout to a source future.
    async fn bounded<T>(
        &self,
        source_name: &str,
        call: impl Future<Output = Result<T, SourceError>>,
    ) -> Result<T, SourceError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(SourceError::Timeout {
                    source_name: source_name.to_string(),
                    timeout: self.timeout,
                })
            })
    }
}

fn describe_fields(profile: &RegionDemographics) -> String {
    let fields = profile.populated_fields();
    if fields.is_empty() {
        return "no metrics".to_string();
    }
    fields
        .into_iter()
        .filter_map(|f| {
            profile
                .source_of(f)
                .map(|source| format!("{f}={}", source.source_type))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
