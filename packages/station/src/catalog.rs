//! Compile-time embedded station catalog.
//!
//! Each area's stations are defined in a TOML file under `catalog/`. The
//! files are embedded at compile time and parsed once by
//! [`all_stations`]. Editing the catalog only touches data, never the
//! search algorithm.

use serde::Deserialize;
use store_site_station_models::Station;

/// One catalog file: an area label and its stations.
#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    /// Human-readable area label (e.g. `"関東"`).
    area: String,
    #[serde(default)]
    stations: Vec<Station>,
}

// ── Compile-time embedded TOML files ────────────────────────────────

const CATALOG_TOMLS: &[(&str, &str)] = &[
    ("north", include_str!("../catalog/north.toml")),
    ("kanto", include_str!("../catalog/kanto.toml")),
    ("chubu", include_str!("../catalog/chubu.toml")),
    ("kansai", include_str!("../catalog/kansai.toml")),
    ("west", include_str!("../catalog/west.toml")),
];

/// Returns every catalog station, in file order then entry order.
///
/// The order is significant: it is the tie-break order for stations at
/// identical distance from a query point.
///
/// # Panics
///
/// Panics if any embedded TOML file is malformed (the files are
/// compiled in, so this is caught by the catalog tests).
#[must_use]
pub fn all_stations() -> Vec<Station> {
    CATALOG_TOMLS
        .iter()
        .flat_map(|(name, toml_str)| {
            let file: CatalogFile = toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse station catalog '{name}': {e}"));
            log::trace!(
                "Loaded {} stations from catalog '{name}' ({})",
                file.stations.len(),
                file.area
            );
            file.stations
        })
        .collect()
}
