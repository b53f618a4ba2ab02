mod audit;
mod cli;
mod utils;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan { format, output, timeout, no_vulns } => {
            audit::run_scan(&format, output.as_deref(), timeout, no_vulns).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
