use super::sentiment::{SentimentResult, SentimentService};
use super::{batch_texts, output_values, text_batches};
use crate::core::service::Service;
use crate::domain::model::{
    DependencyMap, InferenceResult, PreprocessOutput, ServiceInput, ServiceKey, ServiceOutput,
    Version,
};
use crate::utils::error::{Result, ServiceError};
use std::collections::HashSet;

/// Texts scoring at or above this are flagged.
pub const TOXICITY_THRESHOLD: f64 = 0.5;

const STRICT_MODEL: &str = "toxicity_classifier_strict";

/// Toxicity check over the texts sentiment labelled negative.
///
/// Reads the `sentiment` output from the dependency map, so nothing is sent
/// to the backend when every text was positive. `{"strict": true}` in the
/// payload switches to the strict model.
#[derive(Debug, Default)]
pub struct ModerationService;

impl ModerationService {
    pub fn new() -> Self {
        Self
    }
}

impl Service for ModerationService {
    fn name(&self) -> &str {
        "moderation"
    }

    fn version(&self) -> Version {
        Version::new(1, 0, 0)
    }

    fn target_model_name(&self) -> &str {
        "toxicity_classifier"
    }

    fn dependencies(&self) -> HashSet<ServiceKey> {
        HashSet::from([SentimentService::service_key()])
    }

    fn preprocess(&self, payload: &ServiceInput, deps: &DependencyMap) -> Result<Vec<PreprocessOutput>> {
        let sentiment = deps
            .get(&SentimentService::service_key())
            .ok_or_else(|| ServiceError::PreprocessError {
                message: format!("missing upstream output from {}", SentimentService::service_key()),
            })?;
        let results: Vec<SentimentResult> = serde_json::from_value(sentiment.data["results"].clone())
            .map_err(|e| ServiceError::PreprocessError {
                message: format!("unreadable sentiment output: {}", e),
            })?;

        let negative: Vec<String> = results
            .into_iter()
            .filter(|r| r.label == "negative")
            .map(|r| r.text)
            .collect();

        let strict = payload.data["strict"].as_bool().unwrap_or(false);
        Ok(text_batches(&negative, "TOXICITY")
            .into_iter()
            .map(|unit| if strict { unit.with_model(STRICT_MODEL) } else { unit })
            .collect())
    }

    fn postprocess(
        &self,
        _payload: &ServiceInput,
        _deps: &DependencyMap,
        preprocess_results: &[PreprocessOutput],
        inference_results: Vec<InferenceResult>,
    ) -> Result<ServiceOutput> {
        let mut reviewed = 0;
        let mut flagged = Vec::new();
        for (unit, result) in preprocess_results.iter().zip(&inference_results) {
            let texts = batch_texts(unit)?;
            let scores = output_values(result, "TOXICITY", texts.len())?;
            reviewed += texts.len();

            for (text, toxicity) in texts.into_iter().zip(scores) {
                if toxicity >= TOXICITY_THRESHOLD {
                    flagged.push(serde_json::json!({ "text": text, "toxicity": toxicity }));
                }
            }
        }

        Ok(ServiceOutput::new(serde_json::json!({
            "reviewed": reviewed,
            "flagged": flagged,
        })))
    }
}
