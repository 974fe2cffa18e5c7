//! e-Stat (政府統計の総合窓口) API client.
//!
//! Reads a census table of population by sex and age class:
//!
//! 1. `GET /getMetaInfo` — resolve the region name to an area code.
//! 2. `GET /getStatsData` — fetch that area's cells and fold them into a
//!    profile (population, gender ratio, age distribution, average age).
//!
//! e-Stat JSON wraps single-element lists as bare objects, so every list
//! field is read through [`as_list`].
//!
//! See <https://www.e-stat.go.jp/api/api-info/e-stat-manual3-0>

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use store_site_demographics_models::{
    AgeBucket, GenderRatio, Metric, MetricSource, RegionDemographics,
};

use super::StatisticsSource;
use crate::retry::{self, RetryPolicy};
use crate::{AGE_BANDS, SourceError, round1};

/// Public e-Stat JSON API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.e-stat.go.jp/rest/3.0/app/json";

/// 2020 census, population by sex and five-year age class, by municipality.
pub const DEFAULT_STATS_DATA_ID: &str = "0003445139";

/// Provenance label attached to every value from this source.
pub const SOURCE_NAME: &str = "e-Stat 国勢調査";

static CODE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]+_").expect("valid regex"));
static AGE_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\s*[～〜~\-－]\s*([0-9]+)\s*歳").expect("valid regex"));
static AGE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\s*歳以上").expect("valid regex"));
static AGE_SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\s*歳$").expect("valid regex"));

/// Connection settings for the e-Stat API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EStatConfig {
    /// Application ID issued by e-Stat.
    pub app_id: String,
    /// API base URL.
    pub base_url: String,
    /// Statistics table to read.
    pub stats_data_id: String,
}

impl EStatConfig {
    /// Configuration for the public API with the default census table.
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            stats_data_id: DEFAULT_STATS_DATA_ID.to_string(),
        }
    }
}

/// e-Stat backed [`StatisticsSource`].
pub struct EStatSource {
    config: EStatConfig,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl EStatSource {
    /// Creates a client for the given configuration.
    #[must_use]
    pub fn new(config: EStatConfig) -> Self {
        Self {
            config: EStatConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Human-facing page for the configured table, used as the citation.
    #[must_use]
    pub fn table_url(&self) -> String {
        format!(
            "https://www.e-stat.go.jp/dbview?sid={}",
            self.config.stats_data_id
        )
    }

    async fn resolve_area(&self, region: &str) -> Result<ClassItem, SourceError> {
        let url = format!("{}/getMetaInfo", self.config.base_url);
        let body = retry::send_json(&self.retry, || {
            self.client.get(&url).query(&[
                ("appId", self.config.app_id.as_str()),
                ("statsDataId", self.config.stats_data_id.as_str()),
            ])
        })
        .await?;

        check_status(&body, "GET_META_INFO")?;

        let objects = class_objects(&body["GET_META_INFO"]["METADATA_INF"]["CLASS_INF"]);
        let areas = objects
            .iter()
            .find(|o| o.id == "area")
            .ok_or_else(|| SourceError::Parse {
                message: "table has no area dimension".to_string(),
            })?;

        find_area(&areas.items, region)
            .cloned()
            .ok_or_else(|| SourceError::RegionNotFound {
                region: region.to_string(),
            })
    }

    async fn fetch_stats(&self, area_code: &str) -> Result<Value, SourceError> {
        let url = format!("{}/getStatsData", self.config.base_url);
        let body = retry::send_json(&self.retry, || {
            self.client.get(&url).query(&[
                ("appId", self.config.app_id.as_str()),
                ("statsDataId", self.config.stats_data_id.as_str()),
                ("cdArea", area_code),
                ("metaGetFlg", "Y"),
                ("cntGetFlg", "N"),
            ])
        })
        .await?;

        check_status(&body, "GET_STATS_DATA")?;
        Ok(body)
    }
}

#[async_trait]
impl StatisticsSource for EStatSource {
    fn name(&self) -> &str {
        "e-Stat"
    }

    async fn region_demographics(&self, region: &str) -> Result<RegionDemographics, SourceError> {
        let area = self.resolve_area(region).await?;
        log::debug!("e-Stat: '{region}' resolved to area {} ({})", area.code, area.name);

        let body = self.fetch_stats(&area.code).await?;
        let table = parse_stats_data(&body, &area.code)?;

        let source = MetricSource::official(SOURCE_NAME, Some(self.table_url()));
        Ok(table.into_demographics(region, &source))
    }
}

/// One code/label pair within a classification dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassItem {
    /// Category code (e.g. `"13104"`).
    pub code: String,
    /// Category label (e.g. `"新宿区"`).
    pub name: String,
}

/// A classification dimension of a statistics table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClassObject {
    id: String,
    items: Vec<ClassItem>,
}

/// Reads a field that e-Stat emits as either an array or a single object.
fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn check_status(body: &Value, root: &str) -> Result<(), SourceError> {
    let result = &body[root]["RESULT"];
    let status = result["STATUS"].as_i64().ok_or_else(|| SourceError::Parse {
        message: format!("missing {root}.RESULT.STATUS"),
    })?;

    if status == 0 {
        return Ok(());
    }

    Err(SourceError::Api {
        status,
        message: result["ERROR_MSG"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string(),
    })
}

fn class_objects(class_inf: &Value) -> Vec<ClassObject> {
    as_list(&class_inf["CLASS_OBJ"])
        .into_iter()
        .filter_map(|obj| {
            let id = obj["@id"].as_str()?.to_string();
            let items = as_list(&obj["CLASS"])
                .into_iter()
                .filter_map(|c| {
                    Some(ClassItem {
                        code: c["@code"].as_str()?.to_string(),
                        name: c["@name"].as_str()?.to_string(),
                    })
                })
                .collect();
            Some(ClassObject { id, items })
        })
        .collect()
}

/// Strips a leading `"<code>_"` prefix and all whitespace from a label.
fn normalize_label(label: &str) -> String {
    CODE_PREFIX_RE
        .replace(label, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Finds the area matching `region`: exact name first, then an area whose
/// name ends with the region (e.g. `"東京都 新宿区"` for `"新宿区"`), then
/// any area containing it.
#[must_use]
pub fn find_area<'a>(areas: &'a [ClassItem], region: &str) -> Option<&'a ClassItem> {
    let wanted = normalize_label(region);
    if wanted.is_empty() {
        return None;
    }

    let normalized: Vec<(String, &ClassItem)> = areas
        .iter()
        .map(|a| (normalize_label(&a.name), a))
        .collect();

    normalized
        .iter()
        .find(|(name, _)| *name == wanted)
        .or_else(|| normalized.iter().find(|(name, _)| name.ends_with(&wanted)))
        .or_else(|| normalized.iter().find(|(name, _)| name.contains(&wanted)))
        .map(|(_, area)| *area)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AgeClass {
    Total,
    Range { min: u32, max: u32 },
    OpenEnded { min: u32 },
    Unknown,
}

impl AgeClass {
    const fn is_age(self) -> bool {
        matches!(self, Self::Range { .. } | Self::OpenEnded { .. })
    }

    const fn lower_bound(self) -> Option<u32> {
        match self {
            Self::Range { min, .. } | Self::OpenEnded { min } => Some(min),
            Self::Total | Self::Unknown => None,
        }
    }

    fn midpoint(self) -> Option<f64> {
        match self {
            Self::Range { min, max } => Some(f64::from(min + max + 1) / 2.0),
            Self::OpenEnded { min } => Some(f64::from(min) + 2.5),
            Self::Total | Self::Unknown => None,
        }
    }
}

fn parse_age_label(label: &str) -> AgeClass {
    let label = normalize_label(label);

    if label.contains("総数") {
        return AgeClass::Total;
    }
    if let Some(caps) = AGE_RANGE_RE.captures(&label)
        && let (Ok(min), Ok(max)) = (caps[1].parse(), caps[2].parse())
        && min <= max
    {
        return AgeClass::Range { min, max };
    }
    if let Some(caps) = AGE_OPEN_RE.captures(&label)
        && let Ok(min) = caps[1].parse()
    {
        return AgeClass::OpenEnded { min };
    }
    if let Some(caps) = AGE_SINGLE_RE.captures(&label)
        && let Ok(age) = caps[1].parse()
    {
        return AgeClass::Range { min: age, max: age };
    }

    AgeClass::Unknown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sex {
    Total,
    Male,
    Female,
    Other,
}

fn parse_sex_label(label: &str) -> Sex {
    let label = normalize_label(label);

    if label.contains("総数") || label.contains("男女計") {
        Sex::Total
    } else if label.starts_with('男') {
        Sex::Male
    } else if label.starts_with('女') {
        Sex::Female
    } else {
        Sex::Other
    }
}

/// Population counts for one area, extracted from a `getStatsData` body.
#[derive(Debug, Clone, Default, PartialEq)]
struct PopulationTable {
    total: Option<f64>,
    male: Option<f64>,
    female: Option<f64>,
    /// Counts per age class, both sexes.
    by_age: BTreeMap<AgeClass, f64>,
}

/// Which role each classification dimension plays.
struct Dimensions {
    sex: Option<(String, BTreeMap<String, Sex>)>,
    age: Option<(String, BTreeMap<String, AgeClass>)>,
    /// Any other `cat*` dimension, pinned to its total category.
    pinned: Vec<(String, String)>,
    tab: Option<String>,
}

fn classify_dimensions(objects: &[ClassObject]) -> Dimensions {
    let mut dims = Dimensions {
        sex: None,
        age: None,
        pinned: Vec::new(),
        tab: None,
    };

    for obj in objects {
        match obj.id.as_str() {
            "area" | "time" => {}
            "tab" => {
                dims.tab = obj
                    .items
                    .iter()
                    .find(|i| i.name.contains("人口"))
                    .or_else(|| obj.items.first())
                    .map(|i| i.code.clone());
            }
            _ => {
                let sexes: BTreeMap<String, Sex> = obj
                    .items
                    .iter()
                    .map(|i| (i.code.clone(), parse_sex_label(&i.name)))
                    .collect();
                let ages: BTreeMap<String, AgeClass> = obj
                    .items
                    .iter()
                    .map(|i| (i.code.clone(), parse_age_label(&i.name)))
                    .collect();

                let has_sexes = sexes.values().any(|s| *s == Sex::Male)
                    && sexes.values().any(|s| *s == Sex::Female);
                let age_count = ages.values().filter(|a| a.is_age()).count();

                if dims.sex.is_none() && has_sexes {
                    dims.sex = Some((obj.id.clone(), sexes));
                } else if dims.age.is_none() && age_count >= 2 {
                    dims.age = Some((obj.id.clone(), ages));
                } else if let Some(total) = obj
                    .items
                    .iter()
                    .find(|i| i.name.contains("総数") || i.name.ends_with('計'))
                    .or_else(|| obj.items.first())
                {
                    dims.pinned.push((obj.id.clone(), total.code.clone()));
                }
            }
        }
    }

    dims
}

fn cell_value(cell: &Value) -> Option<f64> {
    cell["$"].as_str()?.replace(',', "").trim().parse().ok()
}

fn parse_stats_data(body: &Value, area_code: &str) -> Result<PopulationTable, SourceError> {
    let data = &body["GET_STATS_DATA"]["STATISTICAL_DATA"];
    let objects = class_objects(&data["CLASS_INF"]);
    if objects.is_empty() {
        return Err(SourceError::Parse {
            message: "getStatsData response has no CLASS_INF".to_string(),
        });
    }
    let dims = classify_dimensions(&objects);

    let cells: Vec<&Value> = as_list(&data["DATA_INF"]["VALUE"])
        .into_iter()
        .filter(|c| c["@area"].as_str().is_none_or(|a| a == area_code))
        .filter(|c| {
            dims.tab
                .as_deref()
                .is_none_or(|tab| c["@tab"].as_str().is_none_or(|t| t == tab))
        })
        .filter(|c| {
            dims.pinned.iter().all(|(id, code)| {
                c[format!("@{id}").as_str()]
                    .as_str()
                    .is_none_or(|v| v == code)
            })
        })
        .collect();

    let latest_time = cells.iter().filter_map(|c| c["@time"].as_str()).max();

    let mut table = PopulationTable::default();
    let mut by_age_summed: BTreeMap<AgeClass, f64> = BTreeMap::new();

    for cell in cells {
        if let Some(latest) = latest_time
            && cell["@time"].as_str().is_some_and(|t| t != latest)
        {
            continue;
        }
        let Some(value) = cell_value(cell) else {
            continue;
        };

        let sex = dims.sex.as_ref().map_or(Sex::Total, |(id, map)| {
            cell[format!("@{id}").as_str()]
                .as_str()
                .and_then(|code| map.get(code))
                .copied()
                .unwrap_or(Sex::Other)
        });
        let age = dims.age.as_ref().map_or(AgeClass::Total, |(id, map)| {
            cell[format!("@{id}").as_str()]
                .as_str()
                .and_then(|code| map.get(code))
                .copied()
                .unwrap_or(AgeClass::Unknown)
        });

        match (sex, age) {
            (Sex::Total, AgeClass::Total) => table.total = Some(value),
            (Sex::Male, AgeClass::Total) => table.male = Some(value),
            (Sex::Female, AgeClass::Total) => table.female = Some(value),
            (Sex::Total, class) if class.is_age() => {
                table.by_age.insert(class, value);
            }
            (Sex::Male | Sex::Female, class) if class.is_age() => {
                *by_age_summed.entry(class).or_default() += value;
            }
            _ => {}
        }
    }

    if table.by_age.is_empty() {
        table.by_age = by_age_summed;
    }

    Ok(table)
}

/// Picks one non-overlapping partition of age classes: five-year classes
/// (or single years if the table has none) plus the open-ended class
/// directly above them. Aggregates such as `15～64歳` are dropped.
fn select_partition(by_age: &BTreeMap<AgeClass, f64>) -> Vec<(AgeClass, f64)> {
    let width = if by_age
        .keys()
        .any(|c| matches!(c, AgeClass::Range { min, max } if max - min == 4))
    {
        4
    } else {
        0
    };

    let mut selected: Vec<(AgeClass, f64)> = by_age
        .iter()
        .filter(|(c, _)| matches!(c, AgeClass::Range { min, max } if max - min == width))
        .map(|(c, v)| (*c, *v))
        .collect();

    let top = selected
        .iter()
        .filter_map(|(c, _)| match c {
            AgeClass::Range { max, .. } => Some(*max),
            _ => None,
        })
        .max();

    if let Some(top) = top
        && let Some((c, v)) = by_age
            .iter()
            .find(|(c, _)| matches!(c, AgeClass::OpenEnded { min } if *min == top + 1))
    {
        selected.push((*c, *v));
    }

    selected
}

impl PopulationTable {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn into_demographics(self, region: &str, source: &MetricSource) -> RegionDemographics {
        let mut profile = RegionDemographics::new(region);

        let partition = select_partition(&self.by_age);
        let known: f64 = partition.iter().map(|(_, v)| v).sum();

        if known > 0.0 {
            let buckets = AGE_BANDS
                .iter()
                .map(|band| {
                    let count: f64 = partition
                        .iter()
                        .filter(|(c, _)| c.lower_bound().is_some_and(|m| band.contains(m)))
                        .map(|(_, v)| v)
                        .sum();
                    AgeBucket {
                        range: band.label.to_string(),
                        percentage: round1(count / known * 100.0),
                    }
                })
                .collect();
            profile.age_distribution = Some(Metric::new(buckets, source.clone()));

            let weighted: f64 = partition
                .iter()
                .filter_map(|(c, v)| c.midpoint().map(|mid| mid * v))
                .sum();
            profile.average_age = Some(Metric::new(round1(weighted / known), source.clone()));
        }

        if let (Some(male), Some(female)) = (self.male, self.female)
            && male + female > 0.0
        {
            let sum = male + female;
            profile.gender_ratio = Some(Metric::new(
                GenderRatio {
                    male: round1(male / sum * 100.0),
                    female: round1(female / sum * 100.0),
                },
                source.clone(),
            ));
        }

        let population = self
            .total
            .or_else(|| self.male.zip(self.female).map(|(m, f)| m + f))
            .or((known > 0.0).then_some(known));
        if let Some(population) = population {
            profile.population = Some(Metric::new(population.round() as u64, source.clone()));
        }

        profile
    }
}
