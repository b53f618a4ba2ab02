use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "podguard")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(about = "Podman container security audit tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit all containers for vulnerabilities and risky configuration
    Scan {
        /// Output format (text, json or html)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Global timeout in seconds (0 disables the timeout)
        #[arg(short, long, default_value = "60")]
        timeout: u64,

        /// Skip CVE scanning even when trivy is installed
        #[arg(long)]
        no_vulns: bool,
    },
}
