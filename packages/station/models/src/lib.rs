#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rail station reference types.
//!
//! A [`Station`] is immutable reference data loaded once from the embedded
//! catalog. A [`StationDistance`] is the ephemeral result of a
//! nearest-neighbor query against that catalog.

use serde::{Deserialize, Serialize};

/// A rail station from the reference catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Station name (e.g. "新宿").
    pub name: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Prefectures served by this station (e.g. `["東京都"]`).
    #[serde(default)]
    pub prefectures: Vec<String>,
}

impl Station {
    /// Whether this station serves the given prefecture.
    #[must_use]
    pub fn serves(&self, prefecture: &str) -> bool {
        self.prefectures.iter().any(|p| p == prefecture)
    }
}

/// A catalog station paired with its great-circle distance from a query
/// point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDistance {
    /// The matched station.
    #[serde(flatten)]
    pub station: Station,
    /// Distance from the query point in kilometres.
    pub distance: f64,
}
