#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ranks a region for sales visits by the share of residents who are
//! both elderly and female.
//!
//! The ratio is the summed percentage of 60+ age buckets times the female
//! share from the gender split. Profiles missing either input rank `D`
//! with a ratio of `0`.

use store_site_demographics_models::{AgeBucket, RegionDemographics};
pub use store_site_rank_models::{RankCriteria, RankResult, StoreRank};

/// Label fragments marking a bucket as 60 or older.
///
/// Matched as plain substrings of the bucket label. Full-width digits
/// (`６０歳代`) do not match.
pub const ELDERLY_AGE_TOKENS: [&str; 6] = ["60", "65", "70", "75", "80", "85"];

/// Whether a bucket label denotes an age range of 60 or above.
#[must_use]
pub fn is_elderly_bucket(label: &str) -> bool {
    ELDERLY_AGE_TOKENS.iter().any(|token| label.contains(token))
}

/// Summed percentage of all 60+ buckets.
#[must_use]
pub fn elderly_percentage(buckets: &[AgeBucket]) -> f64 {
    buckets
        .iter()
        .filter(|bucket| is_elderly_bucket(&bucket.range))
        .map(|bucket| bucket.percentage)
        .sum()
}

fn percentage_2dp(ratio: f64) -> f64 {
    (ratio * 10_000.0).round() / 100.0
}

/// Derives a [`RankResult`] from a demographic profile.
pub struct StoreRankCalculator;

impl StoreRankCalculator {
    /// Elderly-female ratio as a fraction, or `None` if the profile lacks
    /// an age distribution or gender split.
    #[must_use]
    pub fn elderly_female_ratio(demographics: &RegionDemographics) -> Option<f64> {
        let buckets = &demographics.age_distribution.as_ref()?.value;
        let female = demographics.gender_ratio.as_ref()?.value.female;
        Some(elderly_percentage(buckets) / 100.0 * (female / 100.0))
    }

    /// Ranks `demographics`.
    ///
    /// Never fails: a profile without an age distribution or gender split
    /// ranks [`StoreRank::D`] with a reported ratio of `0`.
    #[must_use]
    pub fn rank(demographics: &RegionDemographics) -> RankResult {
        let Some(ratio) = Self::elderly_female_ratio(demographics) else {
            log::debug!(
                "[{}] age distribution or gender ratio missing; ranking D",
                demographics.region
            );
            return RankResult {
                rank: StoreRank::D,
                criteria: RankCriteria {
                    elderly_female_ratio: 0.0,
                },
            };
        };

        let rank = StoreRank::from_ratio(ratio);
        log::debug!(
            "[{}] elderly female ratio {ratio:.4} -> {rank}",
            demographics.region
        );

        RankResult {
            rank,
            criteria: RankCriteria {
                elderly_female_ratio: percentage_2dp(ratio),
            },
        }
    }
}
