// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bizmate - AI business assistant for overseas Chinese small businesses.
//!
//! Binary entry point: loads configuration, then starts the HTTP server
//! bridging the Feishu channel, the Moonshot model, Xero, and OCR.

mod dispatch;
mod routes;
mod serve;

use clap::{Parser, Subcommand};

/// Bizmate - AI business assistant for overseas Chinese small businesses.
#[derive(Parser, Debug)]
#[command(name = "bizmate", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Bizmate server.
    Serve,
    /// Print the effective configuration and exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match bizmate_config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bizmate: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("bizmate serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match render_config(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("bizmate config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("bizmate: use --help for available commands");
        }
    }
}

fn render_config(config: &bizmate_config::BizmateConfig) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(config)
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        let config = bizmate_config::load().expect("default config should be valid");
        assert_eq!(config.agent.name, "bizmate");
        assert_eq!(config.agent.max_tool_rounds, 8);
    }
}
