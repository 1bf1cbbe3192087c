//! Completion responses: the wire shape and its validated form.
//!
//! [`WireResponse`] is what the gateway decodes from the service.
//! [`Response::from_wire`] checks it before the session trusts it.

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::message::{Message, Role};
use crate::model::ModelIdentity;

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    pub choices: Vec<WireChoice>,
    pub created: i64,
    pub model: String,
    pub usage: WireUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireChoice {
    /// `None` when the service sends JSON `null`.
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
    pub message: WireMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Validated types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    /// Accept wire usage only if its total is the sum of its parts.
    pub fn from_wire(raw: WireUsage) -> Result<Self> {
        let sum = raw.prompt_tokens.checked_add(raw.completion_tokens);
        if sum != Some(raw.total_tokens) {
            return Err(ChatError::malformed(format!(
                "usage total {} != prompt {} + completion {}",
                raw.total_tokens, raw.prompt_tokens, raw.completion_tokens
            )));
        }
        Ok(Self {
            prompt_tokens: raw.prompt_tokens,
            completion_tokens: raw.completion_tokens,
        })
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub finish_reason: FinishReason,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    choices: Vec<Choice>,
    created: i64,
    model: ModelIdentity,
    usage: Usage,
}

impl Response {
    /// Validate a decoded response.
    ///
    /// Rejects empty choice lists, non-assistant choices, inconsistent usage
    /// totals and unknown model families.
    pub fn from_wire(raw: WireResponse) -> Result<Self> {
        if raw.choices.is_empty() {
            return Err(ChatError::malformed("response has no choices"));
        }
        let choices = raw
            .choices
            .into_iter()
            .enumerate()
            .map(|(index, choice)| {
                if choice.message.role != Role::Assistant {
                    return Err(ChatError::malformed(format!(
                        "choice {index} has role '{}', expected 'assistant'",
                        choice.message.role
                    )));
                }
                Ok(Choice {
                    finish_reason: choice.finish_reason.unwrap_or(FinishReason::Null),
                    message: Message::assistant(choice.message.content.unwrap_or_default()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let model = ModelIdentity::parse(&raw.model).map_err(|e| {
            ChatError::malformed(format!("unrecognised model '{}': {e}", raw.model))
        })?;

        Ok(Self {
            choices,
            created: raw.created,
            model,
            usage: Usage::from_wire(raw.usage)?,
        })
    }

    /// Non-empty by construction.
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn first_choice(&self) -> &Choice {
        &self.choices[0]
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn model(&self) -> &ModelIdentity {
        &self.model
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4-0613",
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": "Hi there"}
            }],
            "usage": {"prompt_tokens": 15, "completion_tokens": 2, "total_tokens": 17}
        })
    }

    fn decode(value: serde_json::Value) -> WireResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn ingests_service_payload() {
        let response = Response::from_wire(decode(sample_json())).unwrap();
        assert_eq!(response.created(), 1_700_000_000);
        assert_eq!(response.model().version(), Some("gpt-4-0613"));
        assert_eq!(response.usage().total(), 17);
        let choice = response.first_choice();
        assert_eq!(choice.finish_reason, FinishReason::Stop);
        assert_eq!(choice.message, Message::assistant("Hi there"));
    }

    #[test]
    fn null_finish_reason_in_either_form() {
        let mut json = sample_json();
        json["choices"][0]["finish_reason"] = serde_json::Value::Null;
        let response = Response::from_wire(decode(json.clone())).unwrap();
        assert_eq!(response.first_choice().finish_reason, FinishReason::Null);

        json["choices"][0]["finish_reason"] = serde_json::json!("null");
        let response = Response::from_wire(decode(json)).unwrap();
        assert_eq!(response.first_choice().finish_reason, FinishReason::Null);
    }

    #[test]
    fn content_filter_reason_parses() {
        let mut json = sample_json();
        json["choices"][0]["finish_reason"] = serde_json::json!("content_filter");
        let response = Response::from_wire(decode(json)).unwrap();
        assert_eq!(
            response.first_choice().finish_reason,
            FinishReason::ContentFilter
        );
    }

    #[test]
    fn inconsistent_total_is_rejected() {
        let mut json = sample_json();
        json["usage"]["total_tokens"] = serde_json::json!(18);
        let err = Response::from_wire(decode(json)).unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn empty_choices_are_rejected() {
        let mut json = sample_json();
        json["choices"] = serde_json::json!([]);
        assert!(Response::from_wire(decode(json)).is_err());
    }

    #[test]
    fn non_assistant_choice_is_rejected() {
        let mut json = sample_json();
        json["choices"][0]["message"]["role"] = serde_json::json!("user");
        let err = Response::from_wire(decode(json)).unwrap_err();
        assert!(err.to_string().contains("expected 'assistant'"));
    }

    #[test]
    fn unknown_model_is_rejected() {
        let mut json = sample_json();
        json["model"] = serde_json::json!("mistral-large");
        assert!(Response::from_wire(decode(json)).is_err());
    }
}
