//! 输出层：接收 AuditReport，渲染 text / json / html 到任意 sink

use std::io::Write;

use crate::audit::finding::Severity;
use crate::audit::report::AuditReport;
use crate::utils::{PodguardError, Result};

pub fn render(report: &AuditReport, format: &str, out: &mut dyn Write) -> Result<()> {
    match format {
        "json"  => render_json(report, out),
        "text"  => render_text(report, out),
        "html"  => render_html(report, out),
        other   => Err(PodguardError::System(format!("unknown format: {}", other))),
    }
}

// ── JSON ────────────────────────────────────────────────────────────────────

fn render_json(report: &AuditReport, out: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)
        .map_err(|e| PodguardError::System(format!("JSON serialize: {}", e)))?;
    writeln!(out)?;
    Ok(())
}

// ── Text ────────────────────────────────────────────────────────────────────

fn render_text(report: &AuditReport, out: &mut dyn Write) -> Result<()> {
    print_section(out, "SECURITY AUDIT REPORT")?;
    let meta = &report.metadata;
    writeln!(out, "  Generated at : {}", meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "  Host         : {}", meta.hostname)?;
    writeln!(out, "  Version      : {}", meta.version)?;
    writeln!(out, "  Duration     : {:.1}s", meta.scan_duration.as_secs_f64())?;
    writeln!(out, "  Containers   : {}", meta.total_containers)?;

    // ── Summary ───────────────────────────────────────────────────────────
    print_section(out, "SUMMARY")?;
    let s = &report.summary;
    writeln!(out, "  Vulnerabilities      : {}  (critical: {}, high: {})",
        s.total_vulnerabilities, s.critical_vulnerabilities, s.high_vulnerabilities)?;
    writeln!(out, "  Misconfigurations    : {}", s.total_misconfigurations)?;
    writeln!(out, "  Privileged containers: {}", s.privileged_containers)?;
    writeln!(out, "  Risk score           : {:.1}/100", s.risk_score)?;

    if !report.scan_errors.is_empty() {
        writeln!(out, "  ⚠  Scan errors:")?;
        for err in &report.scan_errors {
            writeln!(out, "    - {}", err)?;
        }
    }

    // ── Containers ────────────────────────────────────────────────────────
    print_section(out, &format!("CONTAINERS ({})", report.containers.len()))?;
    if report.containers.is_empty() {
        writeln!(out, "  no containers found")?;
    }
    for c in &report.containers {
        let status_icon = match c.state.as_str() {
            "running" => "●",
            "paused"  => "⏸",
            _         => "○",
        };
        writeln!(out, "  {} {:<24} [{:<10}] {}", status_icon, c.name, c.state.as_str(), c.image)?;
    }

    // ── Vulnerabilities ───────────────────────────────────────────────────
    if !report.vulnerabilities.is_empty() {
        print_section(out, &format!("VULNERABILITIES ({})", report.vulnerabilities.len()))?;
        for v in &report.vulnerabilities {
            let fix = if v.fixed_in.is_empty() {
                "no fix available".to_string()
            } else {
                format!("fixed in {}", v.fixed_in)
            };
            writeln!(out, "  {} {:<18} {:<10} {} {}  ({})",
                severity_icon(v.severity), v.id, v.severity.to_string(), v.package, v.version, fix)?;
        }
    }

    // ── Misconfigurations ─────────────────────────────────────────────────
    if !report.misconfigurations.is_empty() {
        print_section(out, &format!("MISCONFIGURATIONS ({})", report.misconfigurations.len()))?;
        for (i, m) in report.misconfigurations.iter().enumerate() {
            writeln!(out, "  [{}] {} {} — {}", i + 1, severity_icon(m.severity), m.id, m.title)?;
            writeln!(out, "      Resource    : {}", m.resource)?;
            writeln!(out, "      Severity    : {}", m.severity)?;
            writeln!(out, "      Description : {}", m.description)?;
            writeln!(out, "      Remediation : {}", m.remediation)?;
        }
    }

    Ok(())
}

fn print_section(out: &mut dyn Write, title: &str) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "═══ {} {}", title, "═".repeat(60_usize.saturating_sub(title.len())))?;
    Ok(())
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴",
        Severity::High     => "🟠",
        Severity::Medium   => "🟡",
        Severity::Low      => "🟢",
        Severity::Unknown  => "⚪",
    }
}

// ── HTML ────────────────────────────────────────────────────────────────────

fn render_html(report: &AuditReport, out: &mut dyn Write) -> Result<()> {
    let meta = &report.metadata;
    let s = &report.summary;

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\"><head><meta charset=\"utf-8\">")?;
    writeln!(out, "<title>podguard audit — {}</title>", escape(&meta.hostname))?;
    writeln!(out, "<style>{}</style></head><body>", STYLE)?;

    writeln!(out, "<h1>Security Audit Report</h1>")?;
    writeln!(out, "<p class=\"meta\">{} · {} · {} containers · {:.1}s</p>",
        escape(&meta.hostname),
        meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        meta.total_containers,
        meta.scan_duration.as_secs_f64())?;

    writeln!(out, "<div class=\"summary\">")?;
    writeln!(out, "<div class=\"card\"><b>{}</b>Vulnerabilities</div>", s.total_vulnerabilities)?;
    writeln!(out, "<div class=\"card\"><b>{}</b>Misconfigurations</div>", s.total_misconfigurations)?;
    writeln!(out, "<div class=\"card\"><b>{}</b>Privileged</div>", s.privileged_containers)?;
    writeln!(out, "<div class=\"card risk\"><b>{:.0}</b>Risk score</div>", s.risk_score)?;
    writeln!(out, "</div>")?;

    if !report.scan_errors.is_empty() {
        writeln!(out, "<h2>Scan errors</h2><ul class=\"errors\">")?;
        for err in &report.scan_errors {
            writeln!(out, "<li>{}</li>", escape(err))?;
        }
        writeln!(out, "</ul>")?;
    }

    writeln!(out, "<h2>Containers ({})</h2>", report.containers.len())?;
    writeln!(out, "<table><tr><th>Name</th><th>State</th><th>Image</th><th>ID</th></tr>")?;
    for c in &report.containers {
        writeln!(out, "<tr><td>{}</td><td>{}</td><td>{}</td><td><code>{}</code></td></tr>",
            escape(&c.name), escape(c.state.as_str()), escape(&c.image), escape(&c.id))?;
    }
    writeln!(out, "</table>")?;

    if !report.vulnerabilities.is_empty() {
        writeln!(out, "<h2>Vulnerabilities ({})</h2>", report.vulnerabilities.len())?;
        writeln!(out, "<table><tr><th>ID</th><th>Severity</th><th>Package</th><th>Installed</th><th>Fixed in</th></tr>")?;
        for v in &report.vulnerabilities {
            writeln!(out,
                "<tr><td>{}</td><td class=\"sev-{}\">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&v.id),
                v.severity.to_string().to_lowercase(),
                v.severity,
                escape(&v.package),
                escape(&v.version),
                escape(&v.fixed_in))?;
        }
        writeln!(out, "</table>")?;
    }

    if !report.misconfigurations.is_empty() {
        writeln!(out, "<h2>Misconfigurations ({})</h2>", report.misconfigurations.len())?;
        for m in &report.misconfigurations {
            writeln!(out, "<div class=\"finding\">")?;
            writeln!(out, "<h3><span class=\"sev-{}\">{}</span> {} — {}</h3>",
                m.severity.to_string().to_lowercase(),
                m.severity, escape(&m.id), escape(&m.title))?;
            writeln!(out, "<p><b>Resource:</b> {}</p>", escape(&m.resource))?;
            writeln!(out, "<p>{}</p>", escape(&m.description))?;
            writeln!(out, "<p class=\"remediation\"><b>Remediation:</b> {}</p>", escape(&m.remediation))?;
            writeln!(out, "</div>")?;
        }
    }

    writeln!(out, "</body></html>")?;
    Ok(())
}

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;color:#222}\
h1{border-bottom:2px solid #444}table{border-collapse:collapse;width:100%}\
td,th{border:1px solid #ccc;padding:4px 8px;text-align:left}\
.meta{color:#666}.summary{display:flex;gap:1em}\
.card{border:1px solid #ccc;border-radius:6px;padding:1em;flex:1;text-align:center}\
.card b{display:block;font-size:1.8em}.card.risk{background:#fff3f0}\
.errors li{color:#a40000}.finding{border:1px solid #ddd;border-radius:6px;padding:0 1em;margin:1em 0}\
.remediation{background:#f4f9f4;padding:.5em}\
.sev-critical{color:#a40000;font-weight:bold}.sev-high{color:#d4650a;font-weight:bold}\
.sev-medium{color:#b8860b}.sev-low{color:#2e7d32}.sev-unknown{color:#666}";

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::container::{Container, ContainerState};
    use crate::audit::finding::{Misconfiguration, Vulnerability};
    use std::collections::HashMap;
    use std::time::Duration;

    fn sample_report() -> AuditReport {
        let mut report = AuditReport::new(vec![Container {
            id: "abc123def456".to_string(),
            name: "web<script>".to_string(),
            image: "nginx:alpine".to_string(),
            state: ContainerState::Running,
            status: "Up".to_string(),
            created: chrono::Utc::now(),
            labels: HashMap::new(),
        }]);
        report.vulnerabilities.push(Vulnerability {
            id: "CVE-2024-1234".to_string(),
            severity: Severity::Critical,
            title: "t".to_string(),
            description: "d".to_string(),
            package: "openssl".to_string(),
            version: "3.1.0".to_string(),
            fixed_in: "3.1.1".to_string(),
            references: vec![],
        });
        report.misconfigurations.push(Misconfiguration {
            id: "RULE-PRIVILEGED".to_string(),
            severity: Severity::High,
            title: "Privileged container".to_string(),
            description: "desc".to_string(),
            resource: "web".to_string(),
            remediation: "fix it".to_string(),
        });
        report.finalize(Duration::from_secs(2));
        report
    }

    #[test]
    fn test_json_output_parses_back() {
        let mut buf = Vec::new();
        render(&sample_report(), "json", &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["summary"]["total_vulnerabilities"], 1);
        assert_eq!(value["misconfigurations"][0]["id"], "RULE-PRIVILEGED");
    }

    #[test]
    fn test_text_output_contains_sections() {
        let mut buf = Vec::new();
        render(&sample_report(), "text", &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("SUMMARY"));
        assert!(text.contains("CVE-2024-1234"));
        assert!(text.contains("RULE-PRIVILEGED"));
        assert!(text.contains("Risk score"));
    }

    #[test]
    fn test_html_output_escapes_values() {
        let mut buf = Vec::new();
        render(&sample_report(), "html", &mut buf).unwrap();
        let html = String::from_utf8(buf).unwrap();
        assert!(html.contains("web&lt;script&gt;"));
        assert!(!html.contains("web<script>"));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let mut buf = Vec::new();
        assert!(render(&sample_report(), "yaml", &mut buf).is_err());
    }

    #[test]
    fn test_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut file = std::fs::File::create(&path).unwrap();
        render(&sample_report(), "json", &mut file).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["metadata"]["total_containers"], 1);
    }
}
