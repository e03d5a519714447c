use super::{batch_texts, output_values, text_batches};
use crate::core::service::Service;
use crate::domain::model::{
    DependencyMap, InferenceResult, PreprocessOutput, ServiceInput, ServiceKey, ServiceOutput,
    Version,
};
use crate::utils::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};

pub const SENTIMENT_VERSION: Version = Version::new(1, 0, 0);

/// Two-class sentiment over `{"texts": [...]}`.
///
/// The model returns `LOGITS` of shape `[n, 2]` ordered (negative, positive).
#[derive(Debug, Default)]
pub struct SentimentService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub text: String,
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
struct SentimentRequest {
    texts: Vec<String>,
}

impl SentimentService {
    pub fn new() -> Self {
        Self
    }

    pub fn service_key() -> ServiceKey {
        ServiceKey::new("sentiment", SENTIMENT_VERSION)
    }
}

fn softmax_pair(negative: f64, positive: f64) -> (f64, f64) {
    let max = negative.max(positive);
    let (n, p) = ((negative - max).exp(), (positive - max).exp());
    (n / (n + p), p / (n + p))
}

impl Service for SentimentService {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn version(&self) -> Version {
        SENTIMENT_VERSION
    }

    fn target_model_name(&self) -> &str {
        "sentiment_classifier"
    }

    fn preprocess(&self, payload: &ServiceInput, _deps: &DependencyMap) -> Result<Vec<PreprocessOutput>> {
        let request: SentimentRequest =
            serde_json::from_value(payload.data.clone()).map_err(|e| ServiceError::PreprocessError {
                message: format!("expected {{\"texts\": [...]}}: {}", e),
            })?;
        Ok(text_batches(&request.texts, "LOGITS"))
    }

    fn postprocess(
        &self,
        _payload: &ServiceInput,
        _deps: &DependencyMap,
        preprocess_results: &[PreprocessOutput],
        inference_results: Vec<InferenceResult>,
    ) -> Result<ServiceOutput> {
        let mut results = Vec::new();
        for (unit, result) in preprocess_results.iter().zip(&inference_results) {
            let texts = batch_texts(unit)?;
            let logits = output_values(result, "LOGITS", texts.len() * 2)?;

            for (text, pair) in texts.into_iter().zip(logits.chunks(2)) {
                let (negative, positive) = softmax_pair(pair[0], pair[1]);
                let (label, score) = if positive >= negative {
                    ("positive", positive)
                } else {
                    ("negative", negative)
                };
                results.push(SentimentResult {
                    text,
                    label: label.to_string(),
                    score,
                });
            }
        }

        Ok(ServiceOutput::new(serde_json::json!({ "results": results })))
    }
}
