use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use gpt_chat::cli::{Cli, ColorMode, Command};
use gpt_chat::commands::ask::AskCommandOptions;
use gpt_chat::commands::chat::ChatCommandOptions;
use gpt_chat::commands::count::CountCommandOptions;
use gpt_chat::commands::init::{InitOptions, InitResult};
use gpt_chat::commands::{self, SessionOptions};

fn main() {
    let cli = Cli::parse();

    // Configure color output
    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    // Init tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init { path, force } => {
            let result = commands::init::run(InitOptions {
                path: path.or(cli.config),
                model: cli.model,
                force,
            })?;
            if !cli.quiet {
                print_init_result(&result);
            }
        }
        Command::Chat {
            system,
            temperature,
            max_tokens,
        } => commands::chat::run(ChatCommandOptions {
            session: SessionOptions {
                config_path: cli.config,
                model: cli.model,
                system,
                temperature,
                max_tokens,
            },
            quiet: cli.quiet,
        })?,
        Command::Ask {
            text,
            system,
            temperature,
            max_tokens,
            usage,
        } => commands::ask::run(AskCommandOptions {
            session: SessionOptions {
                config_path: cli.config,
                model: cli.model,
                system,
                temperature,
                max_tokens,
            },
            text: text.join(" "),
            usage,
        })?,
        Command::Count { file, json } => commands::count::run(CountCommandOptions {
            file,
            model: cli.model,
            config_path: cli.config,
            json,
        })?,
    }
    Ok(())
}

fn print_init_result(result: &InitResult) {
    let verb = if result.overwritten { "Overwrote" } else { "Created" };
    println!(
        "{} {verb} config at {}",
        "ok".green().bold(),
        result.config_path.display()
    );
    println!();
    println!("Next steps:");
    println!(
        "  1. Export your API key ({} by default)",
        "OPENAI_API_KEY".bold()
    );
    println!("  2. Run {} to start talking", "gpt-chat chat".bold());
}
