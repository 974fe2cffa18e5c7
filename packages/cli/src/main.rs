#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for store-site evaluation.
//!
//! Every subcommand prints JSON to stdout. Logs go to stderr and are
//! controlled by `RUST_LOG`.

use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use store_site_accessibility::AccessibilityScorer;
use store_site_accessibility_models::{AccessibilityResult, ParkingOptions};
use store_site_demographics::{DemographicsConfig, RegionDemographicsAggregator};
use store_site_demographics_models::RegionDemographics;
use store_site_rank::StoreRankCalculator;
use store_site_rank_models::RankResult;
use store_site_station::StationIndex;

#[derive(Parser)]
#[command(name = "store_site", about = "Store-site potential evaluation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the rail stations nearest to a location
    Stations {
        #[command(flatten)]
        location: Location,
        /// Number of stations to return
        #[arg(long, default_value = "3")]
        count: usize,
    },
    /// Score a location's accessibility from station proximity and parking
    Accessibility {
        #[command(flatten)]
        location: Location,
        #[command(flatten)]
        parking: ParkingFlags,
    },
    /// Fetch provenance-tagged demographics for one or more regions
    Demographics {
        /// Region names (e.g., "世田谷区")
        #[arg(required = true)]
        regions: Vec<String>,
    },
    /// Evaluate a candidate site: demographics, accessibility and rank
    Evaluate {
        /// Region the site belongs to
        region: String,
        #[command(flatten)]
        location: Location,
        #[command(flatten)]
        parking: ParkingFlags,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct Location {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lng: f64,
}

#[derive(Args, Debug, Clone, Copy, Default)]
struct ParkingFlags {
    /// The site has a parking lot
    #[arg(long)]
    parking_lot: bool,
    /// Street parking is available
    #[arg(long)]
    street_parking: bool,
    /// A parking garage is available
    #[arg(long)]
    garage: bool,
    /// Valet parking is available
    #[arg(long)]
    valet: bool,
}

impl ParkingFlags {
    /// Flags not given are left unknown rather than `false`.
    fn to_options(self) -> ParkingOptions {
        let flag = |set: bool| set.then_some(true);
        ParkingOptions {
            free_parking_lot: flag(self.parking_lot),
            free_street_parking: flag(self.street_parking),
            free_garage_parking: flag(self.garage),
            valet_parking: flag(self.valet),
            ..ParkingOptions::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Evaluation {
    region: String,
    demographics: RegionDemographics,
    accessibility: AccessibilityResult,
    rank: RankResult,
}

fn print_json(value: &impl Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn aggregator_from_env() -> Result<RegionDemographicsAggregator, Box<dyn std::error::Error>> {
    let config = DemographicsConfig::from_env()?;
    if config.estat.is_none() && config.ai.is_none() {
        log::warn!(
            "Neither ESTAT_APP_ID nor an AI provider key is set; demographics will be empty"
        );
    }
    Ok(RegionDemographicsAggregator::from_config(config))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stations { location, count } => {
            let nearest = StationIndex::global().nearest(location.lat, location.lng, count);
            print_json(&nearest)?;
        }
        Commands::Accessibility { location, parking } => {
            let result = AccessibilityScorer::score_location(
                StationIndex::global(),
                location.lat,
                location.lng,
                &parking.to_options(),
            );
            print_json(&result)?;
        }
        Commands::Demographics { regions } => {
            let aggregator = aggregator_from_env()?;
            let start = Instant::now();

            let profiles = futures::future::join_all(
                regions.iter().map(|region| aggregator.fetch(region)),
            )
            .await;

            log::info!(
                "Fetched {} region(s) in {:.1}s",
                profiles.len(),
                start.elapsed().as_secs_f64()
            );
            print_json(&profiles)?;
        }
        Commands::Evaluate {
            region,
            location,
            parking,
        } => {
            let aggregator = aggregator_from_env()?;
            let demographics = aggregator.fetch(&region).await;
            let accessibility = AccessibilityScorer::score_location(
                StationIndex::global(),
                location.lat,
                location.lng,
                &parking.to_options(),
            );
            let rank = StoreRankCalculator::rank(&demographics);

            log::info!(
                "{region}: rank {} accessibility {}",
                rank.rank,
                accessibility.score
            );
            print_json(&Evaluation {
                region,
                demographics,
                accessibility,
                rank,
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_evaluate() {
        let cli = Cli::try_parse_from([
            "store_site",
            "evaluate",
            "世田谷区",
            "--lat",
            "35.646",
            "--lng",
            "139.653",
            "--parking-lot",
        ])
        .unwrap();

        let Commands::Evaluate {
            region,
            location,
            parking,
        } = cli.command
        else {
            panic!("expected evaluate");
        };
        assert_eq!(region, "世田谷区");
        assert!((location.lat - 35.646).abs() < f64::EPSILON);
        assert!(parking.parking_lot);
        assert!(!parking.valet);
    }

    #[test]
    fn stations_count_defaults_to_three() {
        let cli = Cli::try_parse_from(["store_site", "stations", "--lat", "35.0", "--lng", "135.7"])
            .unwrap();
        let Commands::Stations { count, .. } = cli.command else {
            panic!("expected stations");
        };
        assert_eq!(count, 3);
    }

    #[test]
    fn demographics_requires_a_region() {
        assert!(Cli::try_parse_from(["store_site", "demographics"]).is_err());
    }

    #[test]
    fn parking_flags_leave_unset_fields_unknown() {
        let options = ParkingFlags::default().to_options();
        assert_eq!(options, ParkingOptions::default());
        assert!(!options.has_any());

        let options = ParkingFlags {
            valet: true,
            ..ParkingFlags::default()
        }
        .to_options();
        assert_eq!(options.valet_parking, Some(true));
        assert_eq!(options.free_parking_lot, None);
        assert!(options.has_any());
    }

    #[test]
    fn evaluation_serializes_camel_case() {
        let demographics = RegionDemographics::new("北区");
        let evaluation = Evaluation {
            region: "北区".to_string(),
            rank: StoreRankCalculator::rank(&demographics),
            accessibility: AccessibilityScorer::score(None, true),
            demographics,
        };
        let json = serde_json::to_value(&evaluation).unwrap();
        assert_eq!(json["rank"]["rank"], "D");
        assert_eq!(json["accessibility"]["score"], 80);
        assert_eq!(json["demographics"]["region"], "北区");
    }
}
