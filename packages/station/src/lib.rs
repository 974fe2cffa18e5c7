#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rail station index with nearest-neighbor distance search.
//!
//! The catalog is a fixed list of major stations embedded at compile time
//! (see [`catalog`]). [`StationIndex::global`] parses it once per process
//! and is read-only afterwards, so it can be shared freely across threads.
//!
//! Distances are great-circle distances computed with the haversine
//! formula on a sphere of radius [`EARTH_RADIUS_KM`].

pub mod catalog;

use std::sync::LazyLock;

use store_site_station_models::{Station, StationDistance};

/// Earth radius used by [`haversine_km`], in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

static GLOBAL_INDEX: LazyLock<StationIndex> = LazyLock::new(|| {
    let index = StationIndex::new(catalog::all_stations());
    log::debug!("Station index initialized with {} stations", index.len());
    index
});

/// Great-circle distance in kilometres between two WGS84 points.
#[must_use]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Immutable station catalog supporting nearest-station queries.
#[derive(Debug, Clone, Default)]
pub struct StationIndex {
    stations: Vec<Station>,
}

impl StationIndex {
    /// Builds an index over the given stations. Iteration order is kept
    /// and used to break distance ties.
    #[must_use]
    pub const fn new(stations: Vec<Station>) -> Self {
        Self { stations }
    }

    /// The process-wide index over the embedded catalog.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_INDEX
    }

    /// All stations in catalog order.
    #[must_use]
    pub fn catalog(&self) -> &[Station] {
        &self.stations
    }

    /// Number of stations in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations serving the given prefecture, in catalog order.
    pub fn stations_in<'a>(&'a self, prefecture: &'a str) -> impl Iterator<Item = &'a Station> {
        self.stations.iter().filter(move |s| s.serves(prefecture))
    }

    /// Returns the `count` stations closest to the given point, ordered by
    /// ascending distance.
    ///
    /// The result length is `min(count, self.len())`. Stations at equal
    /// distance keep their catalog order.
    #[must_use]
    pub fn nearest(&self, latitude: f64, longitude: f64, count: usize) -> Vec<StationDistance> {
        let mut distances: Vec<StationDistance> = self
            .stations
            .iter()
            .map(|station| StationDistance {
                distance: haversine_km(latitude, longitude, station.latitude, station.longitude),
                station: station.clone(),
            })
            .collect();

        // `sort_by` is stable, which gives the catalog-order tie-break.
        distances.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        distances.truncate(count);
        distances
    }

    /// The single closest station, if the catalog is non-empty.
    #[must_use]
    pub fn nearest_one(&self, latitude: f64, longitude: f64) -> Option<StationDistance> {
        self.nearest(latitude, longitude, 1).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str, latitude: f64, longitude: f64) -> Station {
        Station {
            name: name.to_string(),
            latitude,
            longitude,
            prefectures: vec!["東京都".to_string()],
        }
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_km(35.6812, 139.7671, 35.6812, 139.7671).abs() < 1e-9);
    }

    #[test]
    fn haversine_tokyo_to_osaka() {
        // 東京駅 -> 大阪駅 is roughly 400 km as the crow flies.
        let d = haversine_km(35.6812, 139.7671, 34.7025, 135.4959);
        assert!((395.0..410.0).contains(&d), "got {d}");
    }

    #[test]
    fn haversine_one_degree_latitude() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-9);
    }

    #[test]
    fn nearest_is_sorted_non_decreasing() {
        let index = StationIndex::global();
        let points = [
            (35.6812, 139.7671),
            (43.0, 141.0),
            (33.0, 130.0),
            (0.0, 0.0),
            (-33.8, 151.2),
        ];
        for (lat, lng) in points {
            let result = index.nearest(lat, lng, index.len());
            assert_eq!(result.len(), index.len());
            for pair in result.windows(2) {
                assert!(pair[0].distance <= pair[1].distance);
            }
            let first = result[0].distance;
            assert!(result.iter().all(|sd| first <= sd.distance));
        }
    }

    #[test]
    fn nearest_finds_shinjuku() {
        // A point right outside 新宿駅 south exit.
        let result = StationIndex::global().nearest(35.6880, 139.7005, 3);
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].station.name, "新宿");
        assert!(result[0].distance < 0.5);
    }

    #[test]
    fn nearest_clamps_count_to_catalog_size() {
        let index = StationIndex::new(vec![station("A", 35.0, 139.0), station("B", 35.1, 139.0)]);
        assert_eq!(index.nearest(35.0, 139.0, 10).len(), 2);
        assert!(index.nearest(35.0, 139.0, 0).is_empty());
    }

    #[test]
    fn nearest_on_empty_catalog_is_empty() {
        let index = StationIndex::default();
        assert!(index.nearest(35.0, 139.0, 5).is_empty());
        assert!(index.nearest_one(35.0, 139.0).is_none());
    }

    #[test]
    fn ties_keep_catalog_order() {
        let index = StationIndex::new(vec![
            station("first", 35.0, 139.0),
            station("second", 35.0, 139.0),
            station("third", 35.0, 139.0),
        ]);
        let names: Vec<String> = index
            .nearest(35.5, 139.5, 3)
            .into_iter()
            .map(|sd| sd.station.name)
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn stations_in_filters_by_prefecture() {
        let index = StationIndex::global();
        let osaka: Vec<&str> = index.stations_in("大阪府").map(|s| s.name.as_str()).collect();
        assert!(osaka.contains(&"大阪"));
        assert!(!osaka.contains(&"東京"));
        // 町田 serves both Tokyo and Kanagawa.
        assert!(index.stations_in("神奈川県").any(|s| s.name == "町田"));
    }
}
