//! Handler for the `gpt-chat ask` command: one send, one reply.

use colored::Colorize;

use crate::commands::SessionOptions;
use crate::error::Result;
use crate::params::CallParams;

#[derive(Debug)]
pub struct AskCommandOptions {
    pub session: SessionOptions,
    pub text: String,
    /// Print reported usage to stderr after the reply.
    pub usage: bool,
}

pub fn run(options: AskCommandOptions) -> Result<()> {
    let mut session = options.session.open()?;
    let reply = session.send(options.text, &CallParams::default())?;
    println!("{reply}");

    if options.usage {
        if let Some(response) = session.latest_response() {
            let usage = response.usage();
            eprintln!(
                "{} {} prompt + {} completion = {} tokens ({})",
                "usage:".dimmed(),
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total(),
                response.model()
            );
        }
    }
    Ok(())
}
