#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Provenance-tagged demographic profile types.
//!
//! Every value in a [`RegionDemographics`] is wrapped in a [`Metric`] that
//! records which source produced it. An absent metric means no source
//! determined the value, which is distinct from a zero value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Kind of source that backed a metric.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceType {
    /// Government statistics.
    Official,
    /// Inferred by a generative model.
    AiEstimated,
}

/// Where a metric value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSource {
    /// Human-readable origin label.
    pub name: String,
    /// Citation URL, if the source provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// When the value was retrieved.
    pub retrieved_at: DateTime<Utc>,
    /// Official or AI-estimated.
    #[serde(rename = "type")]
    pub source_type: SourceType,
}

impl MetricSource {
    /// An official-statistics source retrieved now.
    #[must_use]
    pub fn official(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
            retrieved_at: Utc::now(),
            source_type: SourceType::Official,
        }
    }

    /// An AI-estimated source retrieved now.
    #[must_use]
    pub fn ai_estimated(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
            retrieved_at: Utc::now(),
            source_type: SourceType::AiEstimated,
        }
    }
}

/// A value paired with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric<T> {
    /// The measured or estimated value.
    pub value: T,
    /// The source that produced `value`.
    pub source: MetricSource,
}

impl<T> Metric<T> {
    /// Wraps a value with its source.
    pub const fn new(value: T, source: MetricSource) -> Self {
        Self { value, source }
    }
}

/// One bucket of an age distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBucket {
    /// Bucket label (e.g. `"75歳以上"`).
    pub range: String,
    /// Share of the population in percent.
    pub percentage: f64,
}

/// Male/female split in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderRatio {
    /// Male share in percent.
    pub male: f64,
    /// Female share in percent.
    pub female: f64,
}

/// Names of the metrics a [`RegionDemographics`] can hold.
///
/// The string form is the metric's JSON key.
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
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DemographicField {
    /// Mean age in years.
    AverageAge,
    /// Share of population per age bucket.
    AgeDistribution,
    /// Male/female split.
    GenderRatio,
    /// Mean annual income.
    AverageIncome,
    /// Share of foreign residents in percent.
    ForeignerRatio,
    /// Resident count.
    Population,
}

impl DemographicField {
    /// Whether the AI source's response schema includes this field.
    #[must_use]
    pub const fn is_ai_estimable(self) -> bool {
        !matches!(self, Self::Population)
    }
}

/// Demographic profile of a region with per-field provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDemographics {
    /// The region name this profile describes.
    pub region: String,
    /// Mean age in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_age: Option<Metric<f64>>,
    /// Age buckets, percentages summing to roughly 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_distribution: Option<Metric<Vec<AgeBucket>>>,
    /// Male/female split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender_ratio: Option<Metric<GenderRatio>>,
    /// Mean annual income in yen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_income: Option<Metric<f64>>,
    /// Share of foreign residents in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreigner_ratio: Option<Metric<f64>>,
    /// Resident count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<Metric<u64>>,
}

/// Moves `candidate` into `slot` only if `slot` is empty.
///
/// Returns `true` if the slot was filled.
fn fill<T>(slot: &mut Option<T>, candidate: Option<T>) -> bool {
    if slot.is_none() && candidate.is_some() {
        *slot = candidate;
        true
    } else {
        false
    }
}

impl RegionDemographics {
    /// A profile carrying only the region name.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            average_age: None,
            age_distribution: None,
            gender_ratio: None,
            average_income: None,
            foreigner_ratio: None,
            population: None,
        }
    }

    /// The source backing `field`, or `None` if the field is absent.
    #[must_use]
    pub fn source_of(&self, field: DemographicField) -> Option<&MetricSource> {
        match field {
            DemographicField::AverageAge => self.average_age.as_ref().map(|m| &m.source),
            DemographicField::AgeDistribution => {
                self.age_distribution.as_ref().map(|m| &m.source)
            }
            DemographicField::GenderRatio => self.gender_ratio.as_ref().map(|m| &m.source),
            DemographicField::AverageIncome => self.average_income.as_ref().map(|m| &m.source),
            DemographicField::ForeignerRatio => self.foreigner_ratio.as_ref().map(|m| &m.source),
            DemographicField::Population => self.population.as_ref().map(|m| &m.source),
        }
    }

    /// Whether `field` holds a value.
    #[must_use]
    pub fn has(&self, field: DemographicField) -> bool {
        self.source_of(field).is_some()
    }

    /// Fields holding a value, in declaration order.
    #[must_use]
    pub fn populated_fields(&self) -> Vec<DemographicField> {
        use strum::IntoEnumIterator as _;

        DemographicField::iter().filter(|f| self.has(*f)).collect()
    }

    /// Fields with no value, in declaration order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<DemographicField> {
        use strum::IntoEnumIterator as _;

        DemographicField::iter().filter(|f| !self.has(*f)).collect()
    }

    /// Whether this is a bare identity record with no metric populated.
    #[must_use]
    pub fn is_identity_only(&self) -> bool {
        self.populated_fields().is_empty()
    }

    /// Copies metrics from `other` into every slot that is still empty.
    ///
    /// Slots that already hold a value are never touched, so a value keeps
    /// the source that actually supplied it. Returns the fields that were
    /// filled.
    pub fn fill_missing(&mut self, other: Self) -> Vec<DemographicField> {
        let mut filled = Vec::new();

        if fill(&mut self.average_age, other.average_age) {
            filled.push(DemographicField::AverageAge);
        }
        if fill(&mut self.age_distribution, other.age_distribution) {
            filled.push(DemographicField::AgeDistribution);
        }
        if fill(&mut self.gender_ratio, other.gender_ratio) {
            filled.push(DemographicField::GenderRatio);
        }
        if fill(&mut self.average_income, other.average_income) {
            filled.push(DemographicField::AverageIncome);
        }
        if fill(&mut self.foreigner_ratio, other.foreigner_ratio) {
            filled.push(DemographicField::ForeignerRatio);
        }
        if fill(&mut self.population, other.population) {
            filled.push(DemographicField::Population);
        }

        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn official() -> MetricSource {
        MetricSource::official("e-Stat", Some("https://www.e-stat.go.jp/".to_string()))
    }

    fn estimated() -> MetricSource {
        MetricSource::ai_estimated("AI", None)
    }

    #[test]
    fn new_profile_is_identity_only() {
        let profile = RegionDemographics::new("世田谷区");
        assert!(profile.is_identity_only());
        assert_eq!(profile.missing_fields().len(), 6);
        assert!(profile.populated_fields().is_empty());
    }

    #[test]
    fn fill_missing_never_overwrites() {
        let mut base = RegionDemographics::new("世田谷区");
        base.average_age = Some(Metric::new(44.1, official()));
        base.population = Some(Metric::new(943_664, official()));

        let mut estimate = RegionDemographics::new("世田谷区");
        estimate.average_age = Some(Metric::new(50.0, estimated()));
        estimate.average_income = Some(Metric::new(6_000_000.0, estimated()));

        let before = base.clone();
        let filled = base.fill_missing(estimate);

        assert_eq!(filled, vec![DemographicField::AverageIncome]);
        assert_eq!(base.average_age, before.average_age);
        assert_eq!(base.population, before.population);
        assert_eq!(
            base.source_of(DemographicField::AverageAge)
                .unwrap()
                .source_type,
            SourceType::Official
        );
        assert_eq!(
            base.source_of(DemographicField::AverageIncome)
                .unwrap()
                .source_type,
            SourceType::AiEstimated
        );
    }

    #[test]
    fn fill_missing_ignores_absent_candidates() {
        let mut base = RegionDemographics::new("港区");
        let filled = base.fill_missing(RegionDemographics::new("港区"));
        assert!(filled.is_empty());
        assert!(base.is_identity_only());
    }

    #[test]
    fn field_names_match_json_keys() {
        assert_eq!(DemographicField::AverageAge.to_string(), "averageAge");
        assert_eq!(DemographicField::ForeignerRatio.as_ref(), "foreignerRatio");
        assert!(!DemographicField::Population.is_ai_estimable());
        assert!(DemographicField::GenderRatio.is_ai_estimable());
    }

    #[test]
    fn serializes_with_provenance_and_omits_absent_metrics() {
        let mut profile = RegionDemographics::new("中野区");
        profile.gender_ratio = Some(Metric::new(
            GenderRatio {
                male: 49.5,
                female: 50.5,
            },
            estimated(),
        ));

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["region"], "中野区");
        assert_eq!(json["genderRatio"]["value"]["female"], 50.5);
        assert_eq!(json["genderRatio"]["source"]["type"], "ai_estimated");
        assert!(json["genderRatio"]["source"].get("url").is_none());
        assert!(json.get("averageAge").is_none());

        let back: RegionDemographics = serde_json::from_value(json).unwrap();
        assert_eq!(back, profile);
    }
}
