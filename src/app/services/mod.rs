pub mod moderation;
pub mod sentiment;

pub use moderation::ModerationService;
pub use sentiment::SentimentService;

use crate::core::registry::ServiceRegistry;
use crate::domain::model::{InferenceResult, PreprocessOutput, RequestedOutput, Tensor};
use crate::utils::error::{Result, ServiceError};
use std::sync::Arc;

/// Largest number of texts sent in one backend request.
pub const MAX_BATCH_SIZE: usize = 8;

/// Register every bundled service, returning their api names.
pub fn register_builtin(registry: &mut ServiceRegistry) -> Result<Vec<String>> {
    Ok(vec![
        registry.register(Arc::new(SentimentService::new()))?,
        registry.register(Arc::new(ModerationService::new()))?,
    ])
}

/// One unit per batch of at most [`MAX_BATCH_SIZE`] texts, as a `[n, 1]`
/// BYTES tensor named `TEXT`.
pub(crate) fn text_batches(texts: &[String], output: &str) -> Vec<PreprocessOutput> {
    texts
        .chunks(MAX_BATCH_SIZE)
        .map(|batch| {
            let input = Tensor::new(
                "TEXT",
                "BYTES",
                vec![batch.len() as i64, 1],
                serde_json::json!(batch),
            );
            PreprocessOutput::new(vec![input], vec![RequestedOutput::new(output)])
        })
        .collect()
}

/// Texts carried by a unit built with [`text_batches`].
pub(crate) fn batch_texts(unit: &PreprocessOutput) -> Result<Vec<String>> {
    let tensor = unit.inputs.first().ok_or_else(|| ServiceError::PostprocessError {
        message: "preprocess unit has no TEXT input".to_string(),
    })?;
    serde_json::from_value(tensor.data.clone()).map_err(|e| ServiceError::PostprocessError {
        message: format!("TEXT input is not a list of strings: {}", e),
    })
}

/// Flat FP32 values of output `name`, checked against the expected length.
pub(crate) fn output_values(
    result: &InferenceResult,
    name: &str,
    expected_len: usize,
) -> Result<Vec<f64>> {
    let tensor = result.output(name).ok_or_else(|| ServiceError::PostprocessError {
        message: format!("model '{}' returned no {} output", result.model_name, name),
    })?;
    let values: Vec<f64> =
        serde_json::from_value(tensor.data.clone()).map_err(|e| ServiceError::PostprocessError {
            message: format!("{} output is not numeric: {}", name, e),
        })?;
    if values.len() != expected_len {
        return Err(ServiceError::PostprocessError {
            message: format!(
                "{} output has {} values, expected {}",
                name,
                values.len(),
                expected_len
            ),
        });
    }
    Ok(values)
}
