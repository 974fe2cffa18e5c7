#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parking availability and accessibility score types.

use serde::{Deserialize, Serialize};

/// Parking availability flags as reported by the place data provider.
///
/// Every flag is optional: the provider omits flags it has no information
/// about, and an omitted flag counts as "not available".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingOptions {
    /// Free surface parking lot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_parking_lot: Option<bool>,
    /// Paid surface parking lot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_parking_lot: Option<bool>,
    /// Free street parking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_street_parking: Option<bool>,
    /// Paid street parking (meters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_street_parking: Option<bool>,
    /// Free parking garage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_garage_parking: Option<bool>,
    /// Paid parking garage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_garage_parking: Option<bool>,
    /// Valet parking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valet_parking: Option<bool>,
}

impl ParkingOptions {
    /// Whether any kind of parking, free or paid, is available.
    #[must_use]
    pub fn has_any(&self) -> bool {
        [
            self.free_parking_lot,
            self.paid_parking_lot,
            self.free_street_parking,
            self.paid_street_parking,
            self.free_garage_parking,
            self.paid_garage_parking,
            self.valet_parking,
        ]
        .into_iter()
        .any(|flag| flag == Some(true))
    }
}

/// The station that contributed to an accessibility score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationInfo {
    /// Station name.
    pub name: String,
    /// Distance from the location in kilometres.
    pub distance: f64,
}

/// Result of scoring a location's accessibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityResult {
    /// Composite score in `0..=100`.
    pub score: u8,
    /// Nearest station, or `None` if no station was considered.
    pub station_info: Option<StationInfo>,
}
