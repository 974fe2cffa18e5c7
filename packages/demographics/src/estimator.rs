//! AI-based demographic estimation.
//!
//! Asks an LLM for a fixed JSON schema, either for a whole profile (when
//! official statistics are unavailable) or for a named subset of fields
//! (to fill gaps the official source left). Every value parsed from the
//! response is tagged [`SourceType::AiEstimated`].
//!
//! [`SourceType::AiEstimated`]: store_site_demographics_models::SourceType::AiEstimated

use serde::{Deserialize, Serialize};
use store_site_ai::providers::LlmProvider;
use store_site_demographics_models::{
    AgeBucket, DemographicField, GenderRatio, Metric, MetricSource, RegionDemographics,
};

use crate::{AGE_BANDS, SourceError};

const SYSTEM_PROMPT: &str = "あなたは日本の地域統計に詳しいリサーチアナリストです。\
国勢調査・住民基本台帳・自治体の統計書など公開されている統計に基づいて数値を推定し、\
指定されたJSONオブジェクトのみを出力してください。説明文やコメントは出力しないでください。";

/// The JSON object the model is asked to return.
///
/// Every metric is optional so a partial answer still parses; unknown
/// keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiDemographicsResponse {
    /// Echo of the requested region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Mean age in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_age: Option<f64>,
    /// Five-bucket age distribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_distribution: Option<Vec<AgeBucket>>,
    /// Male/female split in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender_ratio: Option<GenderRatio>,
    /// Mean annual income in yen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_income: Option<f64>,
    /// Share of foreign residents in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreigner_ratio: Option<f64>,
    /// Citation URLs the model relied on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl AiDemographicsResponse {
    /// Converts the response into a profile for `region`, attributing every
    /// populated field to `source_name` and the first citation.
    #[must_use]
    pub fn into_demographics(self, region: &str, source_name: &str) -> RegionDemographics {
        let source = MetricSource::ai_estimated(source_name, self.sources.into_iter().next());
        let metric = |value: f64| Metric::new(value, source.clone());

        let mut profile = RegionDemographics::new(region);
        profile.average_age = self.average_age.map(metric);
        profile.average_income = self.average_income.map(metric);
        profile.foreigner_ratio = self.foreigner_ratio.map(metric);
        profile.gender_ratio = self
            .gender_ratio
            .map(|ratio| Metric::new(ratio, source.clone()));
        profile.age_distribution = self
            .age_distribution
            .filter(|buckets| !buckets.is_empty())
            .map(|buckets| Metric::new(buckets, source.clone()));
        profile
    }
}

/// Returns the content of the first markdown code fence in `text`, or the
/// trimmed text itself if there is no fence.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[start + 3..];
    let body = match after_open.find('\n') {
        Some(newline)
            if after_open[..newline]
                .trim()
                .chars()
                .all(|c| c.is_ascii_alphanumeric()) =>
        {
            &after_open[newline + 1..]
        }
        _ => after_open.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    body.find("```").map_or(body, |end| &body[..end]).trim()
}

/// Parses a model response as the fixed schema after stripping any code
/// fence.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if the text is not a JSON object of the
/// expected shape.
pub fn parse_response(text: &str) -> Result<AiDemographicsResponse, serde_json::Error> {
    serde_json::from_str(strip_code_fence(text))
}

/// JSON schema line describing `field`, as shown to the model.
fn schema_line(field: DemographicField) -> Option<String> {
    let line = match field {
        DemographicField::AverageAge => r#"  "averageAge": 平均年齢（数値、歳）"#.to_string(),
        DemographicField::AgeDistribution => {
            let buckets = AGE_BANDS
                .iter()
                .map(|band| format!(r#"{{"range": "{}", "percentage": 数値}}"#, band.label))
                .collect::<Vec<_>>()
                .join(", ");
            format!(r#"  "ageDistribution": [{buckets}]"#)
        }
        DemographicField::GenderRatio => {
            r#"  "genderRatio": {"male": 男性の割合（%）, "female": 女性の割合（%）}"#.to_string()
        }
        DemographicField::AverageIncome => r#"  "averageIncome": 平均年収（数値、円）"#.to_string(),
        DemographicField::ForeignerRatio => {
            r#"  "foreignerRatio": 外国人住民の割合（数値、%）"#.to_string()
        }
        DemographicField::Population => return None,
    };
    Some(line)
}

fn schema_block(region: &str, fields: &[DemographicField]) -> String {
    let region = serde_json::Value::from(region);
    let mut lines = vec![format!(r#"  "region": {region}"#)];
    lines.extend(fields.iter().filter_map(|f| schema_line(*f)));
    lines.push(r#"  "sources": ["参照した統計資料のURL"]"#.to_string());
    format!("{{\n{}\n}}", lines.join(",\n"))
}

/// Prompt requesting the complete profile for `region`.
#[must_use]
pub fn full_profile_prompt(region: &str) -> String {
    let fields = [
        DemographicField::AverageAge,
        DemographicField::AgeDistribution,
        DemographicField::GenderRatio,
        DemographicField::AverageIncome,
        DemographicField::ForeignerRatio,
    ];
    let bands = AGE_BANDS.map(|b| b.label).join("、");

    format!(
        "「{region}」の人口統計データを推定してください。\n\
         年齢分布は {bands} の5区分で、割合の合計が100になるようにしてください。\n\
         次のJSON形式のみで回答してください。\n\n{}",
        schema_block(region, &fields)
    )
}

/// Prompt requesting only `missing` fields for `region`.
#[must_use]
pub fn missing_fields_prompt(region: &str, missing: &[DemographicField]) -> String {
    let keys = missing
        .iter()
        .filter(|f| f.is_ai_estimable())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "「{region}」について、公的統計から取得できなかった次の項目のみを推定してください: {keys}\n\
         それ以外の項目は出力しないでください。\n\
         次のJSON形式のみで回答してください。\n\n{}",
        schema_block(region, missing)
    )
}

/// Estimates demographics with an LLM.
pub struct AiEstimator {
    provider: Box<dyn LlmProvider>,
}

impl AiEstimator {
    /// Wraps a provider.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Provenance label for values this estimator produces.
    #[must_use]
    pub fn source_name(&self) -> String {
        format!("AI推定 ({})", self.provider.label())
    }

    /// Estimates the full profile for `region`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the provider fails or the response does
    /// not parse.
    pub async fn estimate(&self, region: &str) -> Result<RegionDemographics, SourceError> {
        self.request(region, &full_profile_prompt(region)).await
    }

    /// Estimates only the `missing` fields for `region`.
    ///
    /// The returned profile may still contain fields that were not asked
    /// for; callers merge it with [`RegionDemographics::fill_missing`],
    /// which ignores anything already present.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the provider fails or the response does
    /// not parse.
    pub async fn estimate_missing(
        &self,
        region: &str,
        missing: &[DemographicField],
    ) -> Result<RegionDemographics, SourceError> {
        self.request(region, &missing_fields_prompt(region, missing))
            .await
    }

    async fn request(&self, region: &str, prompt: &str) -> Result<RegionDemographics, SourceError> {
        let text = self.provider.complete(SYSTEM_PROMPT, prompt).await?;
        let response = parse_response(&text)?;
        if response.region.as_deref().is_some_and(|r| r != region) {
            log::debug!(
                "AI response names region {:?}, requested '{region}'",
                response.region
            );
        }
        Ok(response.into_demographics(region, &self.source_name()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use store_site_ai::AiError;
    use store_site_demographics_models::SourceType;

    use super::*;

    /// Provider returning canned answers in order and recording prompts.
    pub struct ScriptedProvider {
        answers: Mutex<Vec<Result<String, AiError>>>,
        pub prompts: std::sync::Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedProvider {
        pub fn new(answers: Vec<Result<String, AiError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().rev().collect()),
                prompts: std::sync::Arc::default(),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        fn label(&self) -> String {
            "scripted/test".to_string()
        }

        async fn complete(&self, _system_prompt: &str, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(AiError::EmptyResponse))
        }
    }

    pub const FULL_ANSWER: &str = r#"```json
{
  "region": "世田谷区",
  "averageAge": 44.2,
  "ageDistribution": [
    {"range": "0-19歳", "percentage": 16.0},
    {"range": "20-39歳", "percentage": 27.0},
    {"range": "40-59歳", "percentage": 30.0},
    {"range": "60-74歳", "percentage": 15.0},
    {"range": "75歳以上", "percentage": 12.0}
  ],
  "genderRatio": {"male": 47.5, "female": 52.5},
  "averageIncome": 6100000,
  "foreignerRatio": 2.4,
  "sources": ["https://www.city.setagaya.lg.jp/toukei", "https://www.e-stat.go.jp/"]
}
```"#;

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence_with_surrounding_prose() {
        let text = "Here you go:\n```\n{\"a\":1}\n```\nHope this helps.";
        assert_eq!(strip_code_fence(text), "{\"a\":1}");
    }

    #[test]
    fn strips_single_line_fence() {
        assert_eq!(strip_code_fence("```json {\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn unfenced_text_is_trimmed() {
        assert_eq!(strip_code_fence("  {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn parses_full_answer() {
        let response = parse_response(FULL_ANSWER).unwrap();
        assert_eq!(response.region.as_deref(), Some("世田谷区"));
        assert_eq!(response.age_distribution.as_ref().unwrap().len(), 5);
        assert_eq!(response.sources.len(), 2);

        let profile = response.into_demographics("世田谷区", "AI推定 (test)");
        for field in [
            DemographicField::AverageAge,
            DemographicField::AgeDistribution,
            DemographicField::GenderRatio,
            DemographicField::AverageIncome,
            DemographicField::ForeignerRatio,
        ] {
            let source = profile.source_of(field).unwrap();
            assert_eq!(source.source_type, SourceType::AiEstimated);
            assert_eq!(
                source.url.as_deref(),
                Some("https://www.city.setagaya.lg.jp/toukei")
            );
        }
        assert!(profile.population.is_none());
    }

    #[test]
    fn reserializing_is_lossless() {
        let parsed = parse_response(FULL_ANSWER).unwrap();
        let json = serde_json::to_string(&parsed).unwrap();
        let reparsed: AiDemographicsResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(reparsed, parsed);

        let value = serde_json::to_value(&parsed).unwrap();
        assert_eq!(value["averageIncome"], 6_100_000.0);
        assert_eq!(value["ageDistribution"][4]["range"], "75歳以上");
        assert_eq!(value["genderRatio"]["female"], 52.5);
    }

    #[test]
    fn partial_answer_leaves_fields_absent() {
        let profile = parse_response(r#"{"averageIncome": 5200000, "foreignerRatio": null}"#)
            .unwrap()
            .into_demographics("港区", "AI");
        assert!(profile.average_income.is_some());
        assert!(profile.foreigner_ratio.is_none());
        assert!(profile.average_income.unwrap().source.url.is_none());
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_response("申し訳ありませんが、分かりません。").is_err());
        assert!(parse_response("```json\n{\"averageAge\": \"forty\"}\n```").is_err());
    }

    #[test]
    fn full_prompt_lists_schema() {
        let prompt = full_profile_prompt("札幌市");
        assert!(prompt.contains("「札幌市」"));
        for key in [
            "averageAge",
            "ageDistribution",
            "genderRatio",
            "averageIncome",
            "foreignerRatio",
            "sources",
        ] {
            assert!(prompt.contains(key), "missing {key}");
        }
        for band in AGE_BANDS {
            assert!(prompt.contains(band.label), "missing {}", band.label);
        }
    }

    #[test]
    fn region_is_escaped_in_schema() {
        let block = schema_block(r#"架空"市"#, &[DemographicField::AverageAge]);
        let region_line = block.lines().nth(1).unwrap().trim().trim_end_matches(',');
        let value: serde_json::Value =
            serde_json::from_str(&format!("{{{region_line}}}")).unwrap();
        assert_eq!(value["region"], r#"架空"市"#);
    }

    #[test]
    fn missing_prompt_only_asks_for_missing_fields() {
        let prompt = missing_fields_prompt(
            "新宿区",
            &[
                DemographicField::AverageIncome,
                DemographicField::ForeignerRatio,
                DemographicField::Population,
            ],
        );
        assert!(prompt.contains("averageIncome, foreignerRatio"));
        assert!(!prompt.contains("averageAge"));
        assert!(!prompt.contains("genderRatio"));
        assert!(!prompt.contains("population"));
    }

    #[tokio::test]
    async fn estimator_attributes_provider() {
        let estimator = AiEstimator::new(Box::new(ScriptedProvider::new(vec![Ok(
            FULL_ANSWER.to_string(),
        )])));
        let profile = estimator.estimate("世田谷区").await.unwrap();
        assert_eq!(
            profile.average_age.unwrap().source.name,
            "AI推定 (scripted/test)"
        );
    }

    #[tokio::test]
    async fn estimator_reports_parse_failure() {
        let estimator = AiEstimator::new(Box::new(ScriptedProvider::new(vec![Ok(
            "not json".to_string(),
        )])));
        assert!(matches!(
            estimator.estimate("世田谷区").await,
            Err(SourceError::Json(_))
        ));
    }
}
