pub mod compliance;
pub mod container;
pub mod finding;
pub mod orchestrator;
pub mod output;
pub mod podman;
pub mod ports;
pub mod report;
pub mod trivy;

use anyhow::Context;
use std::time::Duration;
use tokio::time::Instant;

use compliance::ComplianceInspector;
use orchestrator::Auditor;
use podman::PodmanClient;
use ports::VulnerabilityScanner;
use trivy::TrivyScanner;

pub async fn run_scan(
    format: &str,
    output_file: Option<&str>,
    timeout_secs: u64,
    no_vulns: bool,
) -> anyhow::Result<()> {
    let runtime = PodmanClient::new();
    let scanner = if no_vulns {
        TrivyScanner::disabled()
    } else {
        TrivyScanner::locate()
    };
    if !no_vulns && !scanner.is_available() {
        eprintln!("warn: trivy not found in PATH, CVE scanning disabled");
    }

    let auditor = Auditor::new(runtime, scanner, ComplianceInspector::new());

    let deadline = (timeout_secs > 0).then(|| Instant::now() + Duration::from_secs(timeout_secs));

    let progress = |processed: usize, total: usize, msg: &str| {
        if total > 0 {
            eprintln!("[{}/{}] {}", processed, total, msg);
        } else {
            eprintln!("{}", msg);
        }
    };

    let report = auditor
        .run_audit(deadline, Some(&progress))
        .await
        .context("audit failed")?;

    match output_file {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path))?;
            output::render(&report, format, &mut file)?;
            eprintln!("report written to {}", path);
        }
        None => {
            let stdout = std::io::stdout();
            output::render(&report, format, &mut stdout.lock())?;
        }
    }

    Ok(())
}
