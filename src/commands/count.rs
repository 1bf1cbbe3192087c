//! Handler for the `gpt-chat count` command.
//!
//! Reads a JSON array of `{role, content}` messages and prints the prompt
//! token count the service should report for it.

use std::io::Read;
use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::message::{Message, Role};
use crate::model::ModelIdentity;
use crate::tokens::{TiktokenOracle, TokenAccountant, TokenizerOracle, PROMPT_OVERHEAD};

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CountCommandOptions {
    /// Transcript file; stdin when `None`.
    pub file: Option<PathBuf>,
    pub model: Option<String>,
    pub config_path: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountReport {
    pub model: String,
    pub prompt_tokens: u64,
    pub overhead: u64,
    pub messages: Vec<MessageCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageCount {
    pub role: Role,
    pub tokens: u64,
}

pub fn run(options: CountCommandOptions) -> Result<()> {
    let model_name = match options.model {
        Some(model) => model,
        None => Config::discover(options.config_path.as_deref())?.model,
    };
    let model = ModelIdentity::parse(&model_name)?;
    let messages = read_transcript(options.file.as_ref())?;
    let report = count(&messages, &model, TiktokenOracle::new())?;

    if options.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| ChatError::config_with_source("failed to serialize report", e))?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", "Prompt Tokens".bold());
    println!("  model:           {}", report.model);
    println!("  messages:        {}", report.messages.len());
    println!("  overhead:        {}", report.overhead);
    for (i, entry) in report.messages.iter().enumerate() {
        println!("  #{i:<3} {:<10} {}", entry.role.to_string(), entry.tokens);
    }
    println!("  prompt tokens:   {}", report.prompt_tokens.to_string().green());
    Ok(())
}

/// Build the per-message breakdown and total for `messages`.
pub fn count(
    messages: &[Message],
    model: &ModelIdentity,
    oracle: impl TokenizerOracle + 'static,
) -> Result<CountReport> {
    let accountant = TokenAccountant::new(oracle);
    let per_message = messages
        .iter()
        .map(|m| {
            Ok(MessageCount {
                role: m.role(),
                tokens: accountant.message_tokens(m, model)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CountReport {
        model: model.to_string(),
        prompt_tokens: accountant.prompt_tokens(messages, model)?,
        overhead: PROMPT_OVERHEAD,
        messages: per_message,
    })
}

fn read_transcript(file: Option<&PathBuf>) -> Result<Vec<Message>> {
    let (content, source) = match file {
        Some(path) => (
            std::fs::read_to_string(path).map_err(|e| {
                ChatError::io(format!("reading transcript '{}'", path.display()), e)
            })?,
            path.display().to_string(),
        ),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| ChatError::io("reading transcript from stdin", e))?;
            (buf, "stdin".to_string())
        }
    };
    serde_json::from_str(&content).map_err(|e| {
        ChatError::validation("transcript", format!("invalid JSON in {source}: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
