//! Transport to the completion service.
//!
//! [`CompletionGateway`] is the seam the session calls through; the session
//! never sees HTTP. [`HttpGateway`] speaks the OpenAI-compatible
//! `/chat/completions` endpoint with a blocking client.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::GatewayError;
use crate::message::Message;
use crate::params::CallParams;
use crate::response::WireResponse;

/// Body of one completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub params: CallParams,
}

/// Sends a conversation and returns the decoded reply.
///
/// Timeouts and cancellation are the implementation's concern.
pub trait CompletionGateway: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<WireResponse, GatewayError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

pub struct HttpGateway {
    endpoint: String,
    api_key: String,
    http: reqwest::blocking::Client,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            http,
        })
    }

    /// Build from config, reading the API key from the configured variable.
    pub fn from_config(api: &ApiConfig) -> Result<Self, GatewayError> {
        let api_key = std::env::var(&api.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GatewayError::MissingApiKey {
                var: api.api_key_env.clone(),
            })?;
        Self::new(&api.base_url, api_key, Duration::from_secs(api.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionGateway for HttpGateway {
    fn complete(&self, request: &CompletionRequest) -> Result<WireResponse, GatewayError> {
        debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "sending completion request"
        );
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<WireResponse>()
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base_url: &str, env: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            api_key_env: env.to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn request_body_flattens_params() {
        let request = CompletionRequest {
            model: "gpt-4".into(),
            messages: vec![Message::system("sys"), Message::user("hi")],
            params: CallParams::new().with_temperature(0.0),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.0
            })
        );
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let gateway =
            HttpGateway::new("https://example.test/v1/", "key", Duration::from_secs(1)).unwrap();
        assert_eq!(gateway.endpoint(), "https://example.test/v1/chat/completions");
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = HttpGateway::from_config(&api(
            "https://example.test/v1",
            "GPT_CHAT_TEST_KEY_THAT_IS_NEVER_SET",
        ))
        .err()
        .unwrap();
        assert!(matches!(err, GatewayError::MissingApiKey { .. }));
    }

    #[test]
    fn unreachable_service_is_a_network_error() {
        let gateway = HttpGateway::new("http://127.0.0.1:1", "key", Duration::from_secs(2)).unwrap();
        let request = CompletionRequest {
            model: "gpt-4".into(),
            messages: vec![Message::user("hi")],
            params: CallParams::new(),
        };
        let err = gateway.complete(&request).unwrap_err();
        assert!(matches!(err, GatewayError::Network(_)));
    }
}
