#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Store priority rank types.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Visit priority tier, `S` highest.
///
/// Variants are declared best first, so `S < A < ... < D` under [`Ord`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum StoreRank {
    /// Visit first; ratio at least 25%.
    S,
    /// Ratio at least 18%.
    A,
    /// Ratio at least 12%.
    B,
    /// Ratio at least 6%.
    C,
    /// Below 6%, or the profile lacked the data to compute a ratio.
    D,
}

impl StoreRank {
    /// Lowest elderly-female ratio (as a fraction) that earns this rank.
    #[must_use]
    pub const fn min_ratio(self) -> f64 {
        match self {
            Self::S => 0.25,
            Self::A => 0.18,
            Self::B => 0.12,
            Self::C => 0.06,
            Self::D => 0.0,
        }
    }

    /// Maps an elderly-female ratio (as a fraction) to its tier.
    ///
    /// Anything below the `C` threshold, including `NaN` and negative
    /// values, is `D`.
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        [Self::S, Self::A, Self::B, Self::C]
            .into_iter()
            .find(|rank| ratio >= rank.min_ratio())
            .unwrap_or(Self::D)
    }
}

/// Inputs that determined a rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankCriteria {
    /// Percentage of the population that is 60+ and female, 2 decimals.
    pub elderly_female_ratio: f64,
}

/// A region's rank together with the figures it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankResult {
    /// Assigned tier.
    pub rank: StoreRank,
    /// Inputs behind the tier.
    pub criteria: RankCriteria,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(StoreRank::from_ratio(0.25), StoreRank::S);
        assert_eq!(StoreRank::from_ratio(0.249_999), StoreRank::A);
        assert_eq!(StoreRank::from_ratio(0.18), StoreRank::A);
        assert_eq!(StoreRank::from_ratio(0.12), StoreRank::B);
        assert_eq!(StoreRank::from_ratio(0.06), StoreRank::C);
        assert_eq!(StoreRank::from_ratio(0.059), StoreRank::D);
        assert_eq!(StoreRank::from_ratio(0.0), StoreRank::D);
    }

    #[test]
    fn degenerate_ratios_are_lowest_tier() {
        assert_eq!(StoreRank::from_ratio(f64::NAN), StoreRank::D);
        assert_eq!(StoreRank::from_ratio(-1.0), StoreRank::D);
    }

    #[test]
    fn tiers_are_ordered_best_first() {
        let ranks: Vec<_> = StoreRank::iter().collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
        assert!(StoreRank::S < StoreRank::D);

        for pair in ranks.windows(2) {
            assert!(pair[0].min_ratio() > pair[1].min_ratio());
        }
    }

    #[test]
    fn displays_and_parses_as_letter() {
        assert_eq!(StoreRank::B.to_string(), "B");
        assert_eq!(StoreRank::from_str("S").unwrap(), StoreRank::S);
        assert!(StoreRank::from_str("E").is_err());
    }

    #[test]
    fn result_json_shape() {
        let result = RankResult {
            rank: StoreRank::S,
            criteria: RankCriteria {
                elderly_female_ratio: 30.0,
            },
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["rank"], "S");
        assert_eq!(json["criteria"]["elderlyFemaleRatio"], 30.0);
    }
}
