//! Handler for the `gpt-chat chat` command.
//!
//! Reads one line per turn. Lines starting with `/` are commands:
//! `/resend [text]`, `/history`, `/usage`, `/quit`. Recoverable failures are
//! reported and the loop continues; integrity failures end it.

use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::commands::SessionOptions;
use crate::error::{ChatError, Result};
use crate::gateway::CompletionGateway;
use crate::params::CallParams;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ChatCommandOptions {
    pub session: SessionOptions,
    pub quiet: bool,
}

/// Run the chat command against stdin/stdout.
pub fn run(options: ChatCommandOptions) -> Result<()> {
    let mut session = options.session.open()?;
    if !options.quiet {
        eprintln!(
            "{} {} (type /quit to exit)",
            "chatting with".dimmed(),
            session.model().to_string().bold()
        );
    }
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_loop(&mut session, stdin.lock(), stdout.lock(), !options.quiet)
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Send(String),
    Resend(Option<String>),
    History,
    Usage,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Send(line.to_string());
    };
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));
    match name {
        "resend" | "r" => Input::Resend((!rest.is_empty()).then(|| rest.to_string())),
        "history" | "h" => Input::History,
        "usage" | "u" => Input::Usage,
        "quit" | "q" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

/// Drive a session from `input`, writing replies to `output`.
pub fn run_loop<G, R, W>(
    session: &mut Session<G>,
    input: R,
    mut output: W,
    prompt: bool,
) -> Result<()>
where
    G: CompletionGateway,
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if prompt {
            write_out(&mut output, format_args!("{} ", ">".cyan().bold()))?;
            output.flush().map_err(|e| ChatError::io("flushing output", e))?;
        }
        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line.map_err(|e| ChatError::io("reading input", e))?;

        let result = match parse_line(&line) {
            Input::Empty => continue,
            Input::Quit => return Ok(()),
            Input::History => {
                print_history(session, &mut output)?;
                continue;
            }
            Input::Usage => {
                print_usage(session, &mut output)?;
                continue;
            }
            Input::Unknown(name) => {
                write_out(
                    &mut output,
                    format_args!("{} unknown command '/{name}'\n", "warning:".yellow().bold()),
                )?;
                continue;
            }
            Input::Send(text) => session.send(text, &CallParams::default()),
            Input::Resend(text) => session.resend(text),
        };

        match result {
            Ok(reply) => write_out(&mut output, format_args!("{reply}\n"))?,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => write_out(
                &mut output,
                format_args!("{} {e}\n", "warning:".yellow().bold()),
            )?,
        }
    }
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn write_out<W: Write>(output: &mut W, args: std::fmt::Arguments<'_>) -> Result<()> {
    output
        .write_fmt(args)
        .map_err(|e| ChatError::io("writing output", e))
}

fn print_history<G: CompletionGateway, W: Write>(session: &Session<G>, output: &mut W) -> Result<()> {
    for message in session.conversation() {
        write_out(
            output,
            format_args!(
                "{} {}\n",
                format!("[{}]", message.role()).dimmed(),
                message.content()
            ),
        )?;
    }
    Ok(())
}

fn print_usage<G: CompletionGateway, W: Write>(session: &Session<G>, output: &mut W) -> Result<()> {
    match session.latest_response() {
        Some(response) => {
            let usage = response.usage();
            write_out(
                output,
                format_args!(
                    "model {}: prompt {} + completion {} = {} tokens\n",
                    response.model(),
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    usage.total()
                ),
            )
        }
        None => write_out(output, format_args!("no response yet\n")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
