pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "printdesk",
    about = "Printdesk operator CLI",
    long_about = "Apply migrations, load the demo catalog, inspect configuration, and chat with the order assistant from a terminal.",
    after_help = "Examples:\n  printdesk migrate\n  printdesk seed\n  printdesk chat --customer 6f1c2b0e-4f7a-4a59-9a51-0d7f2c3b9e11"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog and verify it")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Start an interactive chat session on stdin/stdout")]
    Chat {
        #[arg(long, help = "Signed-in customer id (omit to chat anonymously)")]
        customer: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Chat { customer } => commands::chat::run(customer),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
