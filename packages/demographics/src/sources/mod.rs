//! Authoritative statistics sources.
//!
//! A [`StatisticsSource`] returns whatever subset of a region's profile it
//! can determine, tagging each value with its own provenance. The
//! aggregator treats any error as "source unavailable".

pub mod estat;

use async_trait::async_trait;
use store_site_demographics_models::RegionDemographics;

use crate::SourceError;

/// A source of official demographic statistics.
#[async_trait]
pub trait StatisticsSource: Send + Sync {
    /// Label used in logs (e.g. `"e-Stat"`).
    fn name(&self) -> &str;

    /// Fetches the demographic profile for `region`.
    ///
    /// Fields the source cannot determine are left absent.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the source is unreachable, does not know
    /// the region, or answers with something unparseable.
    async fn region_demographics(&self, region: &str) -> Result<RegionDemographics, SourceError>;
}
