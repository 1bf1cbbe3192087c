//! Token accounting for prompt and completion validation.
//!
//! The [`TokenizerOracle`] trait is the black-box "text -> token count"
//! lookup, addressed by canonical model identifier. [`TiktokenOracle`] is the
//! built-in BPE implementation. [`TokenAccountant`] applies the service's
//! counting formulas on top of an oracle so predictions can be compared with
//! reported usage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tiktoken_rs::CoreBPE;
use tracing::{debug, error};

use crate::error::{ChatError, Result};
use crate::message::Message;
use crate::model::{ModelFamily, ModelIdentity};
use crate::response::{Choice, Response};

/// Priming tokens the service adds once per prompt.
pub const PROMPT_OVERHEAD: u64 = 3;

/// Tokens the service adds around each prompt message.
pub fn per_message_overhead(family: ModelFamily) -> u64 {
    match family {
        ModelFamily::Gpt35Turbo => 5,
        ModelFamily::Gpt4 => 4,
    }
}

// ---------------------------------------------------------------------------
// Trait (extensibility point)
// ---------------------------------------------------------------------------

/// Counts tokens in a text for a given model identifier.
///
/// Failing to resolve the identifier is a fatal lookup failure.
pub trait TokenizerOracle: Send + Sync {
    fn token_count(&self, model: &str, text: &str) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// tiktoken-backed oracle
// ---------------------------------------------------------------------------

/// Exact BPE counts via `tiktoken-rs`. Encoders are cached per identifier.
#[derive(Default)]
pub struct TiktokenOracle {
    encoders: Mutex<HashMap<String, Arc<CoreBPE>>>,
}

impl TiktokenOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn encoder(&self, model: &str) -> Result<Arc<CoreBPE>> {
        let mut cache = self.encoders.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bpe) = cache.get(model) {
            return Ok(Arc::clone(bpe));
        }
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .map(Arc::new)
            .map_err(|e| ChatError::tokenization(model, e.to_string()))?;
        debug!(model, "loaded tokenizer");
        cache.insert(model.to_string(), Arc::clone(&bpe));
        Ok(bpe)
    }
}

impl TokenizerOracle for TiktokenOracle {
    fn token_count(&self, model: &str, text: &str) -> Result<usize> {
        Ok(self.encoder(model)?.encode_ordinary(text).len())
    }
}

// ---------------------------------------------------------------------------
// Accountant
// ---------------------------------------------------------------------------

/// Reproduces the service's token accounting.
pub struct TokenAccountant {
    oracle: Box<dyn TokenizerOracle>,
}

impl TokenAccountant {
    pub fn new(oracle: impl TokenizerOracle + 'static) -> Self {
        Self {
            oracle: Box::new(oracle),
        }
    }

    fn count(&self, model: &ModelIdentity, text: &str) -> Result<u64> {
        Ok(self.oracle.token_count(model.canonical(), text)? as u64)
    }

    /// Per-message prompt cost: content tokens plus the family overhead.
    pub fn message_tokens(&self, message: &Message, model: &ModelIdentity) -> Result<u64> {
        Ok(self.count(model, message.content())? + per_message_overhead(model.family()))
    }

    /// Predicted prompt tokens for sending `messages`.
    pub fn prompt_tokens(&self, messages: &[Message], model: &ModelIdentity) -> Result<u64> {
        messages.iter().try_fold(PROMPT_OVERHEAD, |total, message| {
            Ok(total + self.message_tokens(message, model)?)
        })
    }

    /// Predicted completion tokens: content only, summed over all choices.
    pub fn completion_tokens(&self, choices: &[Choice], model: &ModelIdentity) -> Result<u64> {
        choices.iter().try_fold(0, |total, choice| {
            Ok(total + self.count(model, choice.message.content())?)
        })
    }

    /// Check predicted counts against the usage `response` reports for
    /// the prompt `sent`.
    pub fn validate(
        &self,
        sent: &[Message],
        response: &Response,
        model: &ModelIdentity,
    ) -> Result<()> {
        let usage = response.usage();
        let prompt = self.prompt_tokens(sent, model)?;
        let completion = self.completion_tokens(response.choices(), model)?;
        debug!(
            model = %model,
            predicted_prompt = prompt,
            predicted_completion = completion,
            reported_prompt = usage.prompt_tokens,
            reported_completion = usage.completion_tokens,
            "checking token usage"
        );
        check("prompt", prompt, usage.prompt_tokens)?;
        check("completion", completion, usage.completion_tokens)
    }
}

fn check(side: &'static str, predicted: u64, reported: u64) -> Result<()> {
    if predicted == reported {
        return Ok(());
    }
    error!(side, predicted, reported, "token count disagrees with service");
    Err(ChatError::TokenMismatch {
        side,
        predicted,
        reported,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
