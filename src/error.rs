//! Error types for chat sessions and the completion transport.
//!
//! [`ChatError::is_fatal`] marks failures that break the session's integrity
//! guarantees and poison it; gateway failures are retryable and leave the
//! conversation untouched.

use std::io;
use thiserror::Error;

/// Transport-level failure talking to the completion service.
///
/// Every variant is recoverable: the session rolls back and the caller may
/// retry or give up.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("API key not found in environment variable '{var}'")]
    MissingApiKey { var: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by the completion service")]
    RateLimited,

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode service response: {0}")]
    Decode(String),
}

/// Core error type for gpt-chat.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("unknown model family '{family}'")]
    UnknownModel { family: String },

    #[error("completion request failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("nothing to resend: the conversation has no user turn")]
    NothingToResend,

    #[error("model family changed: expected '{expected}', response reported '{actual}'")]
    FamilyMismatch { expected: String, actual: String },

    #[error("model version drifted: pinned '{expected}', response reported '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    #[error("{side} token mismatch: predicted {predicted}, service reported {reported}")]
    TokenMismatch {
        side: &'static str,
        predicted: u64,
        reported: u64,
    },

    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("tokenizer lookup failed for '{model}': {message}")]
    Tokenization { model: String, message: String },

    #[error("session is unusable after an earlier integrity failure")]
    SessionPoisoned,
}

impl ChatError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn tokenization(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tokenization {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Returns true if local state has diverged from the service.
    ///
    /// Fatal errors must be propagated, never retried. A session that
    /// produced one refuses further transactions.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FamilyMismatch { .. }
                | Self::ModelMismatch { .. }
                | Self::TokenMismatch { .. }
                | Self::MalformedResponse { .. }
                | Self::Tokenization { .. }
                | Self::SessionPoisoned
        )
    }

    /// Returns true if retrying the operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }

    /// Returns true if this error is caused by user input (vs internal/system).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::UnknownModel { .. } | Self::NothingToResend
        )
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
