//! Trivy 漏洞扫描 adapter
//! 来源：trivy image --format json（失败时回退 --image-src podman）

use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;

use crate::audit::finding::{Severity, Vulnerability};
use crate::audit::ports::VulnerabilityScanner;
use crate::utils::{PodguardError, Result};

pub struct TrivyScanner {
    binary: Option<PathBuf>,
}

impl TrivyScanner {
    /// Looks for the trivy binary on $PATH. An absent binary is not an
    /// error; the scanner just reports itself unavailable.
    pub fn locate() -> Self {
        let binary = std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join("trivy"))
                .find(|candidate| candidate.is_file())
        });
        TrivyScanner { binary }
    }

    /// A scanner that always reports itself unavailable (for --no-vulns).
    pub fn disabled() -> Self {
        TrivyScanner { binary: None }
    }

    async fn run_trivy(&self, binary: &std::path::Path, image: &str, podman_src: bool) -> Result<Vec<Vulnerability>> {
        let mut args = vec![
            "image",
            "--format", "json",
            "--quiet",
            "--severity", "HIGH,CRITICAL",
            "--scanners", "vuln",
        ];
        if podman_src {
            // rootless / custom-socket setups need the explicit image source
            args.extend(["--image-src", "podman"]);
        }
        args.push(image);

        let out = Command::new(binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| PodguardError::Trivy(format!("spawning trivy: {}", e)))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(PodguardError::Trivy(stderr.trim().to_string()));
        }

        parse_trivy_output(&out.stdout)
    }
}

impl VulnerabilityScanner for TrivyScanner {
    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    async fn scan_image(&self, image: &str) -> Result<Vec<Vulnerability>> {
        let binary = self.binary.as_ref()
            .ok_or_else(|| PodguardError::Trivy("trivy not available".to_string()))?;

        // podman prefixes locally built images with "localhost/"
        let image = image.strip_prefix("localhost/").unwrap_or(image);

        // standard scan first, then one podman-source retry; the retry is
        // adapter-local and the orchestrator only sees the final outcome
        let first_err = match self.run_trivy(binary, image, false).await {
            Ok(vulns) => return Ok(vulns),
            Err(e) => e,
        };

        if let Ok(vulns) = self.run_trivy(binary, image, true).await {
            return Ok(vulns);
        }

        Err(PodguardError::Trivy(format!("scan failed: {}", first_err)))
    }
}

// ── trivy JSON 响应 ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TrivyReport {
    #[serde(rename = "Results", default)]
    results: Vec<TrivyResult>,
}

#[derive(Debug, Deserialize)]
struct TrivyResult {
    #[serde(rename = "Vulnerabilities", default)]
    vulnerabilities: Vec<TrivyVulnerability>,
}

#[derive(Debug, Deserialize)]
struct TrivyVulnerability {
    #[serde(rename = "VulnerabilityID", default)]
    vulnerability_id: String,
    #[serde(rename = "PkgName", default)]
    pkg_name: String,
    #[serde(rename = "InstalledVersion", default)]
    installed_version: String,
    #[serde(rename = "FixedVersion", default)]
    fixed_version: String,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Severity", default)]
    severity: String,
    #[serde(rename = "PrimaryURL", default)]
    primary_url: String,
}

fn parse_trivy_output(data: &[u8]) -> Result<Vec<Vulnerability>> {
    if data.is_empty() {
        return Ok(vec![]);
    }

    let report: TrivyReport = serde_json::from_slice(data)
        .map_err(|e| PodguardError::Parse(format!("trivy JSON: {}", e)))?;

    let vulns = report.results.into_iter()
        .flat_map(|result| result.vulnerabilities)
        .map(|v| Vulnerability {
            id: v.vulnerability_id,
            severity: Severity::from(v.severity.as_str()),
            title: v.title,
            description: v.description,
            package: v.pkg_name,
            version: v.installed_version,
            fixed_in: v.fixed_version,
            references: if v.primary_url.is_empty() { vec![] } else { vec![v.primary_url] },
        })
        .collect();

    Ok(vulns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trivy_report() {
        let json = br#"{
            "Results": [
                {
                    "Target": "alpine:3.18",
                    "Vulnerabilities": [
                        {
                            "VulnerabilityID": "CVE-2024-1234",
                            "PkgName": "openssl",
                            "InstalledVersion": "3.1.0",
                            "FixedVersion": "3.1.1",
                            "Title": "openssl: something bad",
                            "Description": "details",
                            "Severity": "CRITICAL",
                            "PrimaryURL": "https://avd.aquasec.com/nvd/cve-2024-1234"
                        }
                    ]
                },
                {"Target": "app", "Vulnerabilities": []}
            ]
        }"#;
        let vulns = parse_trivy_output(json).unwrap();
        assert_eq!(vulns.len(), 1);
        assert_eq!(vulns[0].id, "CVE-2024-1234");
        assert_eq!(vulns[0].severity, Severity::Critical);
        assert_eq!(vulns[0].fixed_in, "3.1.1");
        assert_eq!(vulns[0].references.len(), 1);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_trivy_output(b"").unwrap().is_empty());
        assert!(parse_trivy_output(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_missing_fix_version() {
        let json = br#"{
            "Results": [{"Vulnerabilities": [{
                "VulnerabilityID": "CVE-2024-9999",
                "PkgName": "zlib",
                "InstalledVersion": "1.2.3",
                "Severity": "HIGH"
            }]}]
        }"#;
        let vulns = parse_trivy_output(json).unwrap();
        assert_eq!(vulns.len(), 1);
        assert!(vulns[0].fixed_in.is_empty());
        assert!(vulns[0].references.is_empty());
    }

    #[test]
    fn test_garbage_output_is_parse_error() {
        assert!(parse_trivy_output(b"not json at all").is_err());
    }
}
