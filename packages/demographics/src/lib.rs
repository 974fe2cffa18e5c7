#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Regional demographics aggregation.
//!
//! Reconciles two unreliable sources into one provenance-tagged
//! [`RegionDemographics`] profile:
//!
//! 1. **Official statistics** ([`sources::estat`]) — Japan's e-Stat API.
//!    Authoritative but usually missing income and foreign-resident data.
//! 2. **AI estimation** ([`estimator`]) — an LLM asked for a fixed JSON
//!    schema. Used as a full fallback when official data is unavailable,
//!    or to fill only the gaps the official source left.
//!
//! [`aggregator::RegionDemographicsAggregator`] drives the sequence and
//! never fails: every source error degrades to a less complete profile.

pub mod aggregator;
pub mod config;
pub mod estimator;
pub mod retry;
pub mod sources;

pub use aggregator::RegionDemographicsAggregator;
pub use config::DemographicsConfig;
pub use store_site_demographics_models::{
    AgeBucket, DemographicField, GenderRatio, Metric, MetricSource, RegionDemographics,
    SourceType,
};

use std::time::Duration;

use thiserror::Error;

/// A canonical age bucket: inclusive lower bound, inclusive upper bound
/// (`None` for the open-ended top bucket) and its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBand {
    /// Youngest age in the bucket.
    pub min: u32,
    /// Oldest age in the bucket, or `None` if open-ended.
    pub max: Option<u32>,
    /// Bucket label as it appears in [`AgeBucket::range`].
    pub label: &'static str,
}

impl AgeBand {
    /// Whether a person of age `age` falls in this bucket.
    #[must_use]
    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && self.max.is_none_or(|max| age <= max)
    }
}

/// Lowest age counted as elderly when ranking.
pub const ELDERLY_MIN_AGE: u32 = 60;

/// The five buckets every age distribution is reported in.
///
/// Band edges fall on [`ELDERLY_MIN_AGE`], so the 60+ population is
/// exactly the last two bands.
pub const AGE_BANDS: [AgeBand; 5] = [
    AgeBand {
        min: 0,
        max: Some(19),
        label: "0-19歳",
    },
    AgeBand {
        min: 20,
        max: Some(39),
        label: "20-39歳",
    },
    AgeBand {
        min: 40,
        max: Some(59),
        label: "40-59歳",
    },
    AgeBand {
        min: ELDERLY_MIN_AGE,
        max: Some(74),
        label: "60-74歳",
    },
    AgeBand {
        min: 75,
        max: None,
        label: "75歳以上",
    },
];

/// Rounds to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Errors that can occur while querying a demographic source.
///
/// None of these escape [`RegionDemographicsAggregator::fetch`]; they are
/// logged and turned into a degraded profile.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// The API reported an application-level error.
    #[error("API error {status}: {message}")]
    Api {
        /// API status code.
        status: i64,
        /// API error message.
        message: String,
    },

    /// The source has no credential configured.
    #[error("{source_name} is not configured")]
    NotConfigured {
        /// Source label.
        source_name: String,
    },

    /// The source does not know the requested region.
    #[error("Region not found: {region}")]
    RegionNotFound {
        /// The requested region name.
        region: String,
    },

    /// The response did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The AI provider failed.
    #[error("AI error: {0}")]
    Ai(#[from] store_site_ai::AiError),

    /// The source did not answer within the configured timeout.
    #[error("{source_name} timed out after {timeout:?}")]
    Timeout {
        /// Source label.
        source_name: String,
        /// Configured timeout.
        timeout: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cover_every_age_once() {
        for age in 0..=120 {
            let hits = AGE_BANDS.iter().filter(|b| b.contains(age)).count();
            assert_eq!(hits, 1, "age {age} is in {hits} bands");
        }
    }

    #[test]
    fn no_band_straddles_the_elderly_boundary() {
        for band in AGE_BANDS {
            let straddles = band.min < ELDERLY_MIN_AGE
                && band.max.is_none_or(|max| max >= ELDERLY_MIN_AGE);
            assert!(!straddles, "{} mixes under-60 and 60+", band.label);
        }
        assert!(AGE_BANDS.iter().any(|b| b.min == ELDERLY_MIN_AGE));
    }

    #[test]
    fn sub_second_timeout_is_reported_precisely() {
        let error = SourceError::Timeout {
            source_name: "e-Stat".to_string(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(error.to_string(), "e-Stat timed out after 250ms");
    }

    #[test]
    fn round1_rounds_half_away_from_zero() {
        assert!((round1(12.34) - 12.3).abs() < 1e-9);
        assert!((round1(0.25) - 0.3).abs() < 1e-9);
        assert!((round1(0.0) - 0.0).abs() < 1e-9);
    }
}
