use crate::config::ServicesConfig;
use crate::domain::model::{Deadline, InferenceResult, RequestedOutput, Tensor};
use crate::domain::ports::Dispatcher;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Dispatcher speaking the KServe v2 REST protocol (Triton's HTTP endpoint).
#[derive(Debug, Clone)]
pub struct TritonDispatcher {
    client: Client,
    endpoint: String,
    request_timeout: Option<Duration>,
}

#[derive(Serialize)]
struct InferRequest<'a> {
    inputs: &'a [Tensor],
    #[serde(skip_serializing_if = "no_outputs")]
    outputs: &'a [RequestedOutput],
}

fn no_outputs(outputs: &&[RequestedOutput]) -> bool {
    outputs.is_empty()
}

impl TritonDispatcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            request_timeout: None,
        }
    }

    pub fn from_config(config: &ServicesConfig) -> Result<Self> {
        let client = Client::builder()
            .default_headers(Self::header_map(&config.headers())?)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ServiceError::InvalidConfigValueError {
                    field: "dispatcher.headers".to_string(),
                    value: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ServiceError::InvalidConfigValueError {
                    field: format!("dispatcher.headers.{}", name),
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    /// `{endpoint}/v2/models/{model}/infer`, with the model name escaped as a
    /// single path segment.
    fn infer_url(&self, model_name: &str) -> Result<Url> {
        let invalid = |reason: String| ServiceError::InvalidConfigValueError {
            field: "dispatcher.endpoint".to_string(),
            value: self.endpoint.clone(),
            reason,
        };

        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("endpoint cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v2", "models", model_name, "infer"]);
        Ok(url)
    }

    /// Time left for one request: the service deadline, capped by the
    /// dispatcher-wide request timeout.
    fn request_budget(&self, deadline: &Deadline) -> Duration {
        match self.request_timeout {
            Some(cap) => deadline.remaining().min(cap),
            None => deadline.remaining(),
        }
    }
}

#[async_trait]
impl Dispatcher for TritonDispatcher {
    async fn infer(
        &self,
        model_name: &str,
        inputs: &[Tensor],
        outputs: &[RequestedOutput],
        deadline: Deadline,
    ) -> Result<InferenceResult> {
        let url = self.infer_url(model_name)?;
        tracing::debug!("POST {} ({} inputs)", url, inputs.len());

        let response = self
            .client
            .post(url)
            .timeout(self.request_budget(&deadline))
            .json(&InferRequest { inputs, outputs })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(body);
            tracing::warn!("Model '{}' returned {}: {}", model_name, status, message);
            return Err(ServiceError::BackendError {
                model: model_name.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<InferenceResult>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_url_strips_trailing_slash() {
        let dispatcher = TritonDispatcher::new("http://triton:8000/");
        assert_eq!(dispatcher.endpoint(), "http://triton:8000");
        assert_eq!(
            dispatcher.infer_url("sentiment_classifier").unwrap().as_str(),
            "http://triton:8000/v2/models/sentiment_classifier/infer"
        );
    }

    #[test]
    fn test_infer_url_escapes_model_name() {
        let dispatcher = TritonDispatcher::new("http://triton:8000/proxy/");
        assert_eq!(
            dispatcher.infer_url("a/b c").unwrap().as_str(),
            "http://triton:8000/proxy/v2/models/a%2Fb%20c/infer"
        );
        assert_eq!(
            dispatcher.infer_url("../admin").unwrap().path(),
            "/proxy/v2/models/..%2Fadmin/infer"
        );
    }

    #[test]
    fn test_infer_url_rejects_unparseable_endpoint() {
        let dispatcher = TritonDispatcher::new("not a url");
        assert!(matches!(
            dispatcher.infer_url("m"),
            Err(ServiceError::InvalidConfigValueError { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_budget_capped_by_request_timeout() {
        let dispatcher =
            TritonDispatcher::new("http://triton:8000").with_request_timeout(Duration::from_millis(50));
        let long = Deadline::after(Duration::from_secs(10));
        assert_eq!(dispatcher.request_budget(&long), Duration::from_millis(50));

        let short = Deadline::after(Duration::from_millis(10));
        assert!(dispatcher.request_budget(&short) <= Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let headers = HashMap::from([("bad header".to_string(), "v".to_string())]);
        assert!(matches!(
            TritonDispatcher::header_map(&headers),
            Err(ServiceError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let inputs = [Tensor::new("TEXT", "BYTES", vec![1, 1], serde_json::json!(["hi"]))];
        let body = serde_json::to_value(InferRequest {
            inputs: &inputs,
            outputs: &[],
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "inputs": [{"name": "TEXT", "datatype": "BYTES", "shape": [1, 1], "data": ["hi"]}]
            })
        );
    }
}
