//! 顶层审计报告结构体与风险评分

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audit::compliance::RULE_PRIVILEGED;
use crate::audit::container::Container;
use crate::audit::finding::{Misconfiguration, Severity, Vulnerability};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub metadata: ReportMetadata,
    pub containers: Vec<Container>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub misconfigurations: Vec<Misconfiguration>,
    pub scan_errors: Vec<String>,        // non-fatal per-container failures
    pub summary: AuditSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub version: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub hostname: String,
    pub total_containers: usize,
    pub scan_duration: Duration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_vulnerabilities: usize,
    pub critical_vulnerabilities: usize,
    pub high_vulnerabilities: usize,
    pub total_misconfigurations: usize,
    pub privileged_containers: usize,
    pub risk_score: f64,                 // 0-100
}

impl AuditReport {
    pub fn new(containers: Vec<Container>) -> Self {
        let total = containers.len();
        AuditReport {
            metadata: ReportMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: chrono::Utc::now(),
                hostname: hostname(),
                total_containers: total,
                scan_duration: Duration::ZERO,
            },
            containers,
            vulnerabilities: Vec::new(),
            misconfigurations: Vec::new(),
            scan_errors: Vec::new(),
            summary: AuditSummary::default(),
        }
    }

    /// Derives the summary counts and the risk score from the accumulated
    /// findings. Called once, after every scan task has joined.
    pub fn finalize(&mut self, scan_duration: Duration) {
        self.metadata.scan_duration = scan_duration;
        self.summary = self.derive_summary();
        self.summary.risk_score = self.risk_score();
    }

    fn derive_summary(&self) -> AuditSummary {
        let mut summary = AuditSummary {
            total_vulnerabilities: self.vulnerabilities.len(),
            total_misconfigurations: self.misconfigurations.len(),
            ..AuditSummary::default()
        };

        for vuln in &self.vulnerabilities {
            match vuln.severity {
                Severity::Critical => summary.critical_vulnerabilities += 1,
                Severity::High     => summary.high_vulnerabilities += 1,
                _ => {}
            }
        }

        // Inferred from the fixed rule id rather than from the inspected
        // details; the catalog ids are stable precisely so this works.
        summary.privileged_containers = self.misconfigurations.iter()
            .filter(|m| m.id == RULE_PRIVILEGED)
            .count();

        summary
    }

    /// Heuristic, monotonic, saturating score — not a calibrated risk model.
    /// 10 per critical CVE, 5 per high CVE, 3 per privileged container,
    /// flat +5 when any scan error occurred, clamped to [0, 100].
    fn risk_score(&self) -> f64 {
        let mut score = self.summary.critical_vulnerabilities as f64 * 10.0
            + self.summary.high_vulnerabilities as f64 * 5.0
            + self.summary.privileged_containers as f64 * 3.0;

        if !self.scan_errors.is_empty() {
            score += 5.0;
        }

        score.clamp(0.0, 100.0)
    }
}

fn hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::finding::Severity;

    fn vuln(severity: Severity) -> Vulnerability {
        Vulnerability {
            id: "CVE-2024-0001".to_string(),
            severity,
            title: "test".to_string(),
            description: String::new(),
            package: "libtest".to_string(),
            version: "1.0".to_string(),
            fixed_in: String::new(),
            references: vec![],
        }
    }

    fn misconfig(id: &str) -> Misconfiguration {
        Misconfiguration {
            id: id.to_string(),
            severity: Severity::High,
            title: "test".to_string(),
            description: String::new(),
            resource: "web".to_string(),
            remediation: String::new(),
        }
    }

    #[test]
    fn test_summary_counts_match_collections() {
        let mut report = AuditReport::new(vec![]);
        report.vulnerabilities.push(vuln(Severity::Critical));
        report.vulnerabilities.push(vuln(Severity::High));
        report.vulnerabilities.push(vuln(Severity::Low));
        report.misconfigurations.push(misconfig(RULE_PRIVILEGED));
        report.misconfigurations.push(misconfig("RULE-HOST-NETWORK"));
        report.finalize(Duration::from_secs(1));

        assert_eq!(report.summary.total_vulnerabilities, 3);
        assert_eq!(report.summary.critical_vulnerabilities, 1);
        assert_eq!(report.summary.high_vulnerabilities, 1);
        assert_eq!(report.summary.total_misconfigurations, 2);
        assert_eq!(report.summary.privileged_containers, 1);
    }

    #[test]
    fn test_risk_score_formula() {
        let mut report = AuditReport::new(vec![]);
        report.vulnerabilities.push(vuln(Severity::Critical));
        report.vulnerabilities.push(vuln(Severity::High));
        report.misconfigurations.push(misconfig(RULE_PRIVILEGED));
        report.finalize(Duration::ZERO);
        // 10 + 5 + 3
        assert_eq!(report.summary.risk_score, 18.0);
    }

    #[test]
    fn test_risk_score_scan_error_penalty() {
        let mut report = AuditReport::new(vec![]);
        report.scan_errors.push("inspect failed".to_string());
        report.finalize(Duration::ZERO);
        assert_eq!(report.summary.risk_score, 5.0);
    }

    #[test]
    fn test_risk_score_clamped_to_100() {
        let mut report = AuditReport::new(vec![]);
        for _ in 0..11 {
            report.vulnerabilities.push(vuln(Severity::Critical));
        }
        report.finalize(Duration::ZERO);
        assert_eq!(report.summary.risk_score, 100.0);
    }

    #[test]
    fn test_risk_score_monotonic_in_criticals() {
        let mut prev = -1.0;
        for n in 0..15 {
            let mut report = AuditReport::new(vec![]);
            for _ in 0..n {
                report.vulnerabilities.push(vuln(Severity::Critical));
            }
            report.finalize(Duration::ZERO);
            assert!(report.summary.risk_score >= prev);
            assert!(report.summary.risk_score <= 100.0);
            prev = report.summary.risk_score;
        }
    }

    #[test]
    fn test_empty_report_scores_zero() {
        let mut report = AuditReport::new(vec![]);
        report.finalize(Duration::ZERO);
        assert_eq!(report.summary.risk_score, 0.0);
        assert_eq!(report.metadata.total_containers, 0);
    }
}
