//! Lead Classifier
//!
//! Turns a free-text consumer problem description into a structured
//! `ClassifiedLead` with a quality score. The structure comes from one
//! text-generation call; the score is computed here, deterministically,
//! from what was extracted.

pub mod score;

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use fixline_config::ClassifierConfig;
use fixline_core::{
    BudgetRange, ClassifiedLead, GenerateRequest, GeoPoint, Sentiment, ServiceCategory,
    TextGenerator, Urgency,
};
use fixline_llm::parse_structured;

pub use score::quality_score;

/// Classifier errors
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Empty input: description is empty or whitespace-only")]
    EmptyInput,

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Malformed classification response: {0}")]
    Malformed(String),
}

impl From<ClassifierError> for fixline_core::Error {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::EmptyInput => {
                fixline_core::Error::EmptyInput("lead description".to_string())
            }
            ClassifierError::Malformed(m) => fixline_core::Error::MalformedResponse(m),
            ClassifierError::Generation(m) => fixline_core::Error::Generation(m),
        }
    }
}

/// The payload the model is instructed to emit.
///
/// `category` and `urgency` are required; a response missing either is
/// malformed. Everything else degrades to a default.
#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    urgency: String,
    #[serde(default)]
    budget_min: Option<f64>,
    #[serde(default)]
    budget_max: Option<f64>,
    #[serde(default)]
    location_zip: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    requirements: Vec<String>,
    #[serde(default)]
    sentiment: Option<String>,
}

const SYSTEM_PROMPT: &str = "You extract structured data from consumer home-service requests. \
Respond with a single JSON object and nothing else. Fields: \
category (one of plumbing, hvac, electrical, roofing, landscaping, cleaning, \
pest_control, appliance_repair, carpentry, other), \
urgency (one of emergency, high, medium, low), \
budget_min and budget_max (numbers, omit when the text names none), \
location_zip (string, omit when absent), \
requirements (array of short phrases quoting the concrete needs), \
sentiment (positive, neutral, or negative).";

/// Lead classifier backed by a text-generation service
pub struct LeadClassifier {
    llm: Arc<dyn TextGenerator>,
    config: ClassifierConfig,
}

impl LeadClassifier {
    pub fn new(llm: Arc<dyn TextGenerator>, config: ClassifierConfig) -> Self {
        Self { llm, config }
    }

    /// Classify one description.
    ///
    /// Fails with `EmptyInput` for empty/whitespace text, `Generation` when
    /// the backend call errors, and `Malformed` when the response carries no
    /// parseable payload or is missing required fields.
    pub async fn classify(&self, text: &str) -> Result<ClassifiedLead, ClassifierError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        let request = GenerateRequest::new(format!("Request:\n{}", text))
            .with_system(SYSTEM_PROMPT.to_string())
            .with_max_tokens(512);

        let response = self
            .llm
            .generate(request)
            .await
            .map_err(|e| ClassifierError::Generation(e.to_string()))?;

        let raw: RawClassification =
            parse_structured(&response).map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        Ok(self.build_lead(raw))
    }

    /// Classify a batch sequentially, failing the whole batch on the first
    /// error.
    pub async fn classify_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<ClassifiedLead>, ClassifierError> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.classify(text).await?);
        }
        Ok(results)
    }

    /// Classify, converting any failure into `None` for call sites that
    /// tolerate skips.
    pub async fn classify_safe(&self, text: &str) -> Option<ClassifiedLead> {
        match self.classify(text).await {
            Ok(lead) => Some(lead),
            Err(e) => {
                tracing::warn!(error = %e, "Classification skipped");
                None
            }
        }
    }

    fn build_lead(&self, raw: RawClassification) -> ClassifiedLead {
        let category = ServiceCategory::parse_lenient(&raw.category);
        let urgency = Urgency::parse_lenient(&raw.urgency);

        let budget = match (raw.budget_min, raw.budget_max) {
            (None, None) => None,
            (min, max) => Some(BudgetRange {
                min: min.unwrap_or(0.0),
                max,
            }),
        };

        let location = match (raw.latitude, raw.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };

        let location_zip = raw
            .location_zip
            .map(|z| z.trim().to_string())
            .filter(|z| !z.is_empty());

        let mut requirements: Vec<String> = raw
            .requirements
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        requirements.truncate(self.config.max_requirements);

        let sentiment = match raw.sentiment.as_deref() {
            Some("positive") => Sentiment::Positive,
            Some("negative") => Sentiment::Negative,
            _ => Sentiment::Neutral,
        };

        let mut lead = ClassifiedLead {
            category,
            urgency,
            budget,
            location_zip,
            location,
            requirements,
            sentiment,
            quality_score: 0.0,
        };
        lead.quality_score = quality_score(&lead);
        lead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Mock backend replaying canned responses in order.
    struct MockGenerator {
        responses: Mutex<Vec<fixline_core::Result<String>>>,
        calls: Mutex<usize>,
    }

    impl MockGenerator {
        fn new(responses: Vec<fixline_core::Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn replying(response: &str) -> Arc<Self> {
            Arc::new(Self::new(vec![Ok(response.to_string())]))
        }

        fn call_count(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl TextGenerator for MockGenerator {
        async fn generate(&self, _request: GenerateRequest) -> fixline_core::Result<String> {
            *self.calls.lock() += 1;
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Err(fixline_core::Error::Generation("exhausted".into()));
            }
            responses.remove(0)
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn classifier(llm: Arc<dyn TextGenerator>) -> LeadClassifier {
        LeadClassifier::new(llm, ClassifierConfig::default())
    }

    const WATER_HEATER_RESPONSE: &str = r#"{
        "category": "plumbing",
        "urgency": "emergency",
        "budget_min": 0,
        "budget_max": 500,
        "location_zip": "46032",
        "requirements": ["water heater leaking badly", "need someone ASAP"],
        "sentiment": "negative"
    }"#;

    #[tokio::test]
    async fn test_classify_water_heater_scenario() {
        let c = classifier(MockGenerator::replying(WATER_HEATER_RESPONSE));
        let lead = c
            .classify("My water heater is leaking badly, need someone ASAP in 46032, budget $500 max")
            .await
            .unwrap();

        assert_eq!(lead.category, ServiceCategory::Plumbing);
        assert_eq!(lead.urgency, Urgency::Emergency);
        assert_eq!(lead.budget.unwrap().max, Some(500.0));
        assert_eq!(lead.location_zip.as_deref(), Some("46032"));
        assert!(lead.quality_score > 7.0, "score {}", lead.quality_score);
    }

    #[tokio::test]
    async fn test_classify_vague_request_scores_low() {
        let response = r#"{
            "category": "other",
            "urgency": "low",
            "requirements": [],
            "sentiment": "neutral"
        }"#;
        let c = classifier(MockGenerator::replying(response));
        let lead = c.classify("need help with stuff").await.unwrap();

        assert_eq!(lead.category, ServiceCategory::Other);
        assert!(
            lead.quality_score < ClassifierConfig::default().quality_threshold,
            "score {}",
            lead.quality_score
        );
    }

    #[tokio::test]
    async fn test_classify_empty_input() {
        let c = classifier(MockGenerator::replying("{}"));
        let result = c.classify("   \n\t ").await;
        assert!(matches!(result, Err(ClassifierError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_classify_tolerates_prose_wrapping() {
        let response = format!(
            "Sure, here is my assessment:\n```json\n{}\n```\nHope that helps!",
            WATER_HEATER_RESPONSE
        );
        let c = classifier(MockGenerator::replying(&response));
        let lead = c.classify("water heater leaking").await.unwrap();
        assert_eq!(lead.category, ServiceCategory::Plumbing);
    }

    #[tokio::test]
    async fn test_classify_missing_required_field_is_malformed() {
        // urgency missing
        let response = r#"{"category": "plumbing"}"#;
        let c = classifier(MockGenerator::replying(response));
        let result = c.classify("leaky faucet").await;
        assert!(matches!(result, Err(ClassifierError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_classify_generation_error_propagates() {
        let mock = Arc::new(MockGenerator::new(vec![Err(
            fixline_core::Error::Generation("rate limited".into()),
        )]));
        let c = classifier(mock);
        let result = c.classify("leaky faucet").await;
        assert!(matches!(result, Err(ClassifierError::Generation(_))));
    }

    #[tokio::test]
    async fn test_batch_fails_fast() {
        let mock = Arc::new(MockGenerator::new(vec![
            Ok(WATER_HEATER_RESPONSE.to_string()),
            Err(fixline_core::Error::Generation("boom".into())),
            Ok(WATER_HEATER_RESPONSE.to_string()),
        ]));
        let c = classifier(mock.clone());
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let result = c.classify_batch(&texts).await;

        assert!(result.is_err());
        // fail-fast: the third item was never attempted
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_classify_safe_swallows_failure() {
        let mock = Arc::new(MockGenerator::new(vec![Err(
            fixline_core::Error::Generation("boom".into()),
        )]));
        let c = classifier(mock);
        assert!(c.classify_safe("leaky faucet").await.is_none());
    }

    #[tokio::test]
    async fn test_requirements_capped() {
        let response = r#"{
            "category": "cleaning",
            "urgency": "low",
            "requirements": ["a","b","c","d","e","f","g","h","i","j"]
        }"#;
        let c = classifier(MockGenerator::replying(response));
        let lead = c.classify("clean everything").await.unwrap();
        assert_eq!(lead.requirements.len(), ClassifierConfig::default().max_requirements);
    }
}
