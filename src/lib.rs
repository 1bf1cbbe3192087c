//! A single chat session against an OpenAI-compatible completion service.
//!
//! Every turn is a transaction: the user message is appended optimistically,
//! the service is called, and the reply is committed only after its model
//! identity and token usage agree with local predictions. Transport failures
//! roll the user turn back; integrity failures are fatal.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod message;
pub mod model;
pub mod params;
pub mod response;
pub mod session;
pub mod tokens;

pub use error::{ChatError, GatewayError, Result};
pub use gateway::{CompletionGateway, CompletionRequest, HttpGateway};
pub use message::{Conversation, Message, Role, Tail};
pub use model::{ModelFamily, ModelIdentity};
pub use params::CallParams;
pub use response::{Choice, FinishReason, Response, Usage, WireResponse};
pub use session::Session;
pub use tokens::{TiktokenOracle, TokenAccountant, TokenizerOracle};
