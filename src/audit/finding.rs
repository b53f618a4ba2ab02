//! 审计发现：CVE 漏洞与配置违规

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[serde(other)]
    Unknown,
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH"     => Severity::High,
            "MEDIUM"   => Severity::Medium,
            "LOW"      => Severity::Low,
            _          => Severity::Unknown,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Critical => "CRITICAL",
            Severity::High     => "HIGH",
            Severity::Medium   => "MEDIUM",
            Severity::Low      => "LOW",
            Severity::Unknown  => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

// ── CVE 漏洞 ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,                  // e.g. CVE-2024-1234
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub package: String,             // affected package name
    pub version: String,             // installed version
    pub fixed_in: String,            // empty when no fix is known
    pub references: Vec<String>,
}

// ── 配置违规 ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Misconfiguration {
    pub id: String,                  // stable rule id, see compliance catalog
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub resource: String,            // container name the finding applies to
    pub remediation: String,
}
