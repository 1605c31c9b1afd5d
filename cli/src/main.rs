//! Nexus CLI - binary entry point.
//!
//! ```text
//! main() -> Runtime::load() -> run | tui | ask | tool | tools | doctor | ...
//!                                |     |
//!                                |     v
//!                                |   dashboard: Agent task <-> App (events / commands)
//!                                v
//!                              console: Agent task -> printed events
//! ```

mod console;
mod dashboard;
mod doctor;
mod logging;
mod startup;
mod wiring;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::wiring::Runtime;

#[derive(Debug, Parser)]
#[command(name = "nexus")]
#[command(about = "Voice-driven desktop assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Listen for commands and act on them (the default)
    Run {
        /// Read commands from stdin instead of the microphone
        #[arg(long)]
        text: bool,
    },

    /// Full-screen dashboard with live stats and an activity log
    Tui,

    /// Run a single command and print what happened
    Ask {
        /// The command, e.g. "what time is it"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Run one skill directly, without the model
    Tool {
        /// Skill name, e.g. "get_battery"
        name: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// List the registered skills by category
    Tools,

    /// Check configuration, audio devices and helper programs
    Doctor,

    /// Launch Nexus automatically at login
    InstallStartup {
        /// Remove the startup entry instead
        #[arg(long)]
        remove: bool,
    },

    /// Save the Groq API key to the config file
    SetKey {
        key: String,
    },

    /// Save the chat model to the config file
    SetModel {
        model: String,
    },
}

async fn dispatch(command: Command) -> Result<ExitCode> {
    match command {
        Command::Run { text } => console::run(&Runtime::load()?, text).await?,
        Command::Tui => dashboard::run(&Runtime::load()?).await?,
        Command::Ask { text } => console::ask(&Runtime::load()?, &text.join(" ")).await?,
        Command::Tool { name, args } => {
            if !console::tool(&Runtime::load()?, &name, &args).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Tools => console::tools(&Runtime::load()?)?,
        Command::Doctor => {
            if !doctor::run() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::InstallStartup { remove } => startup::run(remove)?,
        Command::SetKey { key } => {
            nexus_config::persist_api_key(key.trim()).context("failed to save API key")?;
            println!("API key saved.");
        }
        Command::SetModel { model } => {
            nexus_config::persist_model(model.trim()).context("failed to save model")?;
            println!("Model set to {}.", model.trim());
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_tracing();

    let command = cli.command.unwrap_or(Command::Run { text: false });
    tracing::info!(?command, "Starting");
    match dispatch(command).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
