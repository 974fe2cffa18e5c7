#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accessibility scoring for candidate store locations.
//!
//! The score is a `0..=100` composite of two signals:
//!
//! | nearest station within | points |
//! |---|---|
//! | 0.5 km | 20 |
//! | 1.0 km | 15 |
//! | 2.0 km | 8 |
//! | 3.0 km (exclusive) | 3 |
//! | farther / none | 0 |
//!
//! plus a flat [`PARKING_POINTS`] when any parking is available. Parking
//! dominates: event visitors mostly arrive by car.

use store_site_accessibility_models::{AccessibilityResult, ParkingOptions, StationInfo};
use store_site_station::StationIndex;
use store_site_station_models::StationDistance;

/// Points awarded when any parking option is available.
pub const PARKING_POINTS: u8 = 80;

/// Upper bound of the composite score.
pub const MAX_SCORE: u8 = 100;

/// Points for station proximity.
#[must_use]
pub fn distance_points(distance_km: f64) -> u8 {
    if distance_km <= 0.5 {
        20
    } else if distance_km <= 1.0 {
        15
    } else if distance_km <= 2.0 {
        8
    } else if distance_km < 3.0 {
        3
    } else {
        0
    }
}

/// Scores accessibility from station proximity and parking availability.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessibilityScorer;

impl AccessibilityScorer {
    /// Scores a location given its nearest station (if any) and whether
    /// it has any parking.
    #[must_use]
    pub fn score(
        nearest_station: Option<&StationDistance>,
        has_parking: bool,
    ) -> AccessibilityResult {
        let station_points = nearest_station.map_or(0, |sd| distance_points(sd.distance));
        let parking_points = if has_parking { PARKING_POINTS } else { 0 };
        let score = station_points.saturating_add(parking_points).min(MAX_SCORE);

        log::debug!(
            "Accessibility: station={station_points} parking={parking_points} total={score}"
        );

        AccessibilityResult {
            score,
            station_info: nearest_station.map(|sd| StationInfo {
                name: sd.station.name.clone(),
                distance: sd.distance,
            }),
        }
    }

    /// Looks up the nearest station to a location and scores it together
    /// with the place's parking options.
    #[must_use]
    pub fn score_location(
        index: &StationIndex,
        latitude: f64,
        longitude: f64,
        parking: &ParkingOptions,
    ) -> AccessibilityResult {
        let nearest = index.nearest_one(latitude, longitude);
        Self::score(nearest.as_ref(), parking.has_any())
    }
}
