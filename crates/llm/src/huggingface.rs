//! [`DraftProducer`] over the Hugging Face hosted inference API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use pipeline::{DraftProducer, DraftRequest, GeneratedText, PipelineError};

use crate::error::LlmError;
use crate::prompt::{build_prompt, split_output};

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "HUGGINGFACE_API_TOKEN";

const MAX_NEW_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Parameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// Extracts the generated text from an inference response.
///
/// Accepted shapes are a list whose first element carries `generated_text`
/// or `summary_text`, and an object carrying `generated_text`. An object with
/// an `error` field is an API error.
pub fn parse_response(value: &Value) -> Result<String, LlmError> {
    let text_of = |v: &Value| {
        v.get("generated_text")
            .or_else(|| v.get("summary_text"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    match value {
        Value::Object(map) if map.contains_key("error") => {
            let detail = match &map["error"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Err(LlmError::Api(detail))
        }
        Value::Object(_) => value
            .get("generated_text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::UnexpectedPayload("object without generated_text".into())),
        Value::Array(items) => items
            .first()
            .and_then(text_of)
            .ok_or_else(|| LlmError::UnexpectedPayload("list without generated text".into())),
        _ => Err(LlmError::UnexpectedPayload(format!(
            "expected list or object, got {value}"
        ))),
    }
}

/// Producer backed by one hosted model.
#[derive(Clone)]
pub struct HuggingFaceProducer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    token: String,
}

impl fmt::Debug for HuggingFaceProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuggingFaceProducer")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HuggingFaceProducer {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        token: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(LlmError::MissingToken(TOKEN_ENV));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            token,
        })
    }

    /// Reads the token from [`TOKEN_ENV`].
    pub fn from_env(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| LlmError::MissingToken(TOKEN_ENV))?;
        Self::new(endpoint, model, token, timeout_secs)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.model)
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = InferenceRequest {
            inputs: prompt,
            parameters: Parameters {
                max_new_tokens: MAX_NEW_TOKENS,
                temperature: TEMPERATURE,
                return_full_text: false,
            },
        };

        let resp = self
            .client
            .post(self.url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        parse_response(&value)
    }
}

#[async_trait]
impl DraftProducer for HuggingFaceProducer {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn produce(&self, request: &DraftRequest) -> Result<GeneratedText, PipelineError> {
        let prompt = build_prompt(request);
        debug!(model = %self.model, keyword = %request.keyword, "Requesting draft");
        let raw = self.generate(&prompt).await.map_err(|err| {
            warn!(model = %self.model, error = %err, "Model request failed");
            err
        })?;
        Ok(split_output(&raw, &request.disclosure_text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn list_and_object_shapes_are_accepted() {
        let list = json!([{ "generated_text": "Title\nBody" }]);
        assert_eq!(parse_response(&list).unwrap(), "Title\nBody");

        let summary = json!([{ "summary_text": "Summary" }]);
        assert_eq!(parse_response(&summary).unwrap(), "Summary");

        let object = json!({ "generated_text": "Title\nBody" });
        assert_eq!(parse_response(&object).unwrap(), "Title\nBody");
    }

    #[test]
    fn error_field_is_an_api_error() {
        let err = parse_response(&json!({ "error": "Model is loading" })).unwrap_err();
        assert!(matches!(err, LlmError::Api(ref m) if m == "Model is loading"));
    }

    #[test]
    fn other_shapes_are_unexpected() {
        for value in [json!([]), json!({ "text": "x" }), json!("plain")] {
            assert!(matches!(
                parse_response(&value),
                Err(LlmError::UnexpectedPayload(_))
            ));
        }
    }

    #[test]
    fn blank_token_is_refused() {
        let err = HuggingFaceProducer::new("https://hf.example", "org/model", "  ", 5).unwrap_err();
        assert!(matches!(err, LlmError::MissingToken(TOKEN_ENV)));
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let producer =
            HuggingFaceProducer::new("https://hf.example/models/", "org/model", "t", 5).unwrap();
        assert_eq!(producer.url(), "https://hf.example/models/org/model");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_reported_as_unavailable() {
        let producer = HuggingFaceProducer::new("http://127.0.0.1:9", "org/model", "t", 2).unwrap();
        let request = DraftRequest {
            keyword: "notion pricing".to_string(),
            intent: None,
            recommendations: Vec::new(),
            disclosure_text: "Disclosure.".to_string(),
            min_chars: 100,
            date: NaiveDate::from_ymd_opt(2024, 5, 16).unwrap(),
        };
        let err = producer.produce(&request).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ExternalServiceUnavailable { ref service, .. } if service == "huggingface"
        ));
    }
}
