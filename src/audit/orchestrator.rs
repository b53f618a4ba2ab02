//! 审计编排引擎
//! ping → list → 有界并发 fan-out（inspect / trivy / compliance）→ 聚合 → 汇总
//!
//! Aggregation discipline: worker pipelines never touch the report. Each one
//! returns a `ContainerOutcome`, and the single `buffer_unordered` consumer
//! loop appends findings and drives the progress callback, so every report
//! mutation and every callback invocation is serialized in one place.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio::time::Instant;

use crate::audit::container::Container;
use crate::audit::finding::{Misconfiguration, Vulnerability};
use crate::audit::ports::{ComplianceChecker, ContainerRuntime, ProgressFn, VulnerabilityScanner};
use crate::audit::report::AuditReport;
use crate::utils::{PodguardError, Result};

/// Max simultaneous per-container pipelines. Keeps trivy from saturating
/// the CPU on hosts with many containers.
const MAX_CONCURRENT_SCANS: usize = 5;

pub struct Auditor<R, V, C> {
    runtime: R,
    vuln_scanner: V,
    compliance: C,
}

/// Everything one container's pipeline produced. FIFO order of the vectors
/// is preserved when the aggregator appends them to the report.
struct ContainerOutcome {
    name: String,
    vulnerabilities: Vec<Vulnerability>,
    misconfigurations: Vec<Misconfiguration>,
    errors: Vec<String>,
}

impl<R, V, C> Auditor<R, V, C>
where
    R: ContainerRuntime,
    V: VulnerabilityScanner,
    C: ComplianceChecker,
{
    pub fn new(runtime: R, vuln_scanner: V, compliance: C) -> Self {
        Auditor { runtime, vuln_scanner, compliance }
    }

    /// Runs the full audit. Connectivity and listing failures are fatal;
    /// every per-container failure is recorded as a scan error instead.
    ///
    /// `deadline` bounds the whole audit. Expiry before the fan-out is fatal;
    /// expiry during the fan-out records a scan error for each interrupted
    /// container and still returns the partial report.
    pub async fn run_audit(
        &self,
        deadline: Option<Instant>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<AuditReport> {
        let start = std::time::Instant::now();
        let notify = |processed: usize, total: usize, msg: &str| {
            if let Some(f) = on_progress {
                f(processed, total, msg);
            }
        };

        notify(0, 0, "Connecting to container runtime...");
        with_deadline(deadline, self.runtime.ping())
            .await
            .map_err(|e| PodguardError::Podman(format!("runtime unreachable: {}", e)))?;

        notify(0, 0, "Listing containers...");
        let containers = with_deadline(deadline, self.runtime.list_containers())
            .await
            .map_err(|e| PodguardError::Podman(format!("listing containers failed: {}", e)))?;

        let total = containers.len();
        let mut report = AuditReport::new(containers.clone());

        // One availability check up front; an absent scanner silently
        // disables CVE scanning instead of failing every container.
        let scan_vulns = self.vuln_scanner.is_available();

        notify(0, total, "Starting scanners...");
        let mut outcomes = stream::iter(containers.iter())
            .map(|c| self.scan_container(c, scan_vulns, deadline))
            .buffer_unordered(MAX_CONCURRENT_SCANS);

        let mut processed = 0;
        while let Some(outcome) = outcomes.next().await {
            processed += 1;
            let failed = !outcome.errors.is_empty();
            report.vulnerabilities.extend(outcome.vulnerabilities);
            report.misconfigurations.extend(outcome.misconfigurations);
            report.scan_errors.extend(outcome.errors);

            let msg = if failed {
                format!("Errors on {}", outcome.name)
            } else {
                format!("Analyzed: {}", outcome.name)
            };
            notify(processed, total, &msg);
        }
        drop(outcomes);

        report.finalize(start.elapsed());
        Ok(report)
    }

    /// One container's pipeline: inspect, then (independently) vulnerability
    /// scan and compliance check. A failed inspect skips both follow-ups;
    /// a failed scan does not prevent the compliance check.
    async fn scan_container(
        &self,
        container: &Container,
        scan_vulns: bool,
        deadline: Option<Instant>,
    ) -> ContainerOutcome {
        let mut outcome = ContainerOutcome {
            name: container.name.clone(),
            vulnerabilities: Vec::new(),
            misconfigurations: Vec::new(),
            errors: Vec::new(),
        };

        let details = match with_deadline(deadline, self.runtime.inspect_container(&container.id)).await {
            Ok(d) => d,
            Err(e) => {
                outcome.errors.push(format!(
                    "container {} ({}): {}",
                    container.name, container.id, e
                ));
                return outcome;
            }
        };

        if scan_vulns {
            match with_deadline(deadline, self.vuln_scanner.scan_image(&container.image)).await {
                Ok(vulns) => outcome.vulnerabilities.extend(vulns),
                Err(e) => outcome.errors.push(format!("vulnerability scan {}: {}", container.image, e)),
            }
        }

        match with_deadline(deadline, self.compliance.check_compliance(&details)).await {
            Ok(misconfigs) => outcome.misconfigurations.extend(misconfigs),
            Err(e) => outcome.errors.push(format!("compliance check {}: {}", container.name, e)),
        }

        outcome
    }
}

/// Bounds one suspension point by the audit-wide deadline. In-flight calls
/// unblock with `DeadlineExceeded` once the deadline passes.
async fn with_deadline<T>(
    deadline: Option<Instant>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some(at) => match tokio::time::timeout_at(at, fut).await {
            Ok(result) => result,
            Err(_) => Err(PodguardError::DeadlineExceeded),
        },
        None => fut.await,
    }
}
