use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "gpt-chat",
    about = "A validated, rollback-safe chat session for OpenAI-compatible APIs",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model identifier, e.g. gpt-4 or gpt-3.5-turbo-0613 (overrides config)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file
    Init {
        /// Where to write the config file
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Start an interactive chat session
    #[command(alias = "c")]
    Chat {
        /// System prompt (overrides config)
        #[arg(long)]
        system: Option<String>,

        /// Sampling temperature for every turn
        #[arg(long)]
        temperature: Option<f64>,

        /// Maximum completion tokens for every turn
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Send a single message and print the reply
    Ask {
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,

        /// System prompt (overrides config)
        #[arg(long)]
        system: Option<String>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f64>,

        /// Maximum completion tokens
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Print reported token usage after the reply
        #[arg(long)]
        usage: bool,
    },

    /// Predict prompt tokens for a JSON transcript
    Count {
        /// JSON file holding an array of {role, content} messages (stdin if omitted)
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
