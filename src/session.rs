//! The send/resend transaction.
//!
//! Each `send` optimistically appends the user turn, calls the gateway, and
//! then either commits the validated assistant reply or rolls the user turn
//! back. Gateway failures are recoverable and leave the conversation exactly
//! as it was. Integrity failures (model drift, token disagreement, malformed
//! responses) poison the session: the transaction is left uncommitted and
//! every later call is refused.

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::message::Conversation;
use crate::model::ModelIdentity;
use crate::params::CallParams;
use crate::response::{Response, WireResponse};
use crate::tokens::{TokenAccountant, TokenizerOracle};

pub struct Session<G> {
    conversation: Conversation,
    model: ModelIdentity,
    defaults: CallParams,
    gateway: G,
    accountant: TokenAccountant,
    latest_response: Option<Response>,
    poisoned: bool,
}

impl<G: CompletionGateway> Session<G> {
    pub fn new(
        system_prompt: impl Into<String>,
        model: &str,
        defaults: CallParams,
        gateway: G,
        oracle: impl TokenizerOracle + 'static,
    ) -> Result<Self> {
        defaults.validate()?;
        Ok(Self {
            conversation: Conversation::system(system_prompt),
            model: ModelIdentity::parse(model)?,
            defaults,
            gateway,
            accountant: TokenAccountant::new(oracle),
            latest_response: None,
            poisoned: false,
        })
    }

    pub fn from_config(
        config: &Config,
        gateway: G,
        oracle: impl TokenizerOracle + 'static,
    ) -> Result<Self> {
        Self::new(
            config.system_prompt.clone(),
            &config.model,
            config.params.clone(),
            gateway,
            oracle,
        )
    }

    /// Send a user turn and return the assistant's reply.
    ///
    /// `overrides` take precedence over the session defaults for this call only.
    pub fn send(&mut self, content: impl Into<String>, overrides: &CallParams) -> Result<String> {
        self.ensure_usable()?;
        let params = self.defaults.merged(overrides);
        params.validate()?;

        if let Some(stale) = self.conversation.discard_pending() {
            warn!(content = stale.content(), "discarded unanswered user turn");
        }
        self.conversation.append_user(content);

        let request = CompletionRequest {
            model: self.model.canonical().to_string(),
            messages: self.conversation.messages().to_vec(),
            params,
        };
        let wire = match self.gateway.complete(&request) {
            Ok(wire) => wire,
            Err(e) => {
                self.conversation.discard_pending();
                warn!(error = %e, "completion failed, rolled back user turn");
                return Err(e.into());
            }
        };

        self.commit(wire).inspect_err(|e| {
            if e.is_fatal() {
                error!(error = %e, "integrity failure, session is now unusable");
                self.poisoned = true;
            }
        })
    }

    /// Replay the most recent user turn, optionally with new text.
    ///
    /// Any assistant reply to that turn is discarded first.
    pub fn resend(&mut self, content: Option<String>) -> Result<String> {
        self.ensure_usable()?;
        let previous = self
            .conversation
            .take_last_user()
            .ok_or(ChatError::NothingToResend)?;
        debug!(previous = previous.content(), edited = content.is_some(), "resending");
        let content = content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| previous.into_content());
        self.send(content, &CallParams::default())
    }

    fn commit(&mut self, wire: WireResponse) -> Result<String> {
        let response = self.latest_response.insert(Response::from_wire(wire)?);
        self.model.reconcile(response.model())?;
        self.accountant
            .validate(self.conversation.messages(), response, &self.model)?;

        let reply = response.first_choice().message.clone();
        info!(
            model = %self.model,
            prompt_tokens = response.usage().prompt_tokens,
            completion_tokens = response.usage().completion_tokens,
            "committed assistant turn"
        );
        let content = reply.content().to_string();
        self.conversation.append_assistant(reply);
        Ok(content)
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            Err(ChatError::SessionPoisoned)
        } else {
            Ok(())
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn model(&self) -> &ModelIdentity {
        &self.model
    }

    pub fn defaults(&self) -> &CallParams {
        &self.defaults
    }

    /// The last response ingested, whether or not it was committed.
    pub fn latest_response(&self) -> Option<&Response> {
        self.latest_response.as_ref()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
