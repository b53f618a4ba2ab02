//! 合规规则目录：对单个容器元数据的无状态规则评估
//! 规则 ID 固定不变，summary 的特权容器统计依赖 RULE-PRIVILEGED

use crate::audit::container::{ContainerDetails, Mount};
use crate::audit::finding::{Misconfiguration, Severity};
use crate::audit::ports::ComplianceChecker;
use crate::utils::Result;
use std::collections::HashMap;

pub const RULE_PRIVILEGED: &str = "RULE-PRIVILEGED";
pub const RULE_SENSITIVE_MOUNT: &str = "RULE-SENSITIVE-MOUNT";
pub const RULE_SECRET_ENV: &str = "RULE-SECRET-ENV";
pub const RULE_HOST_NETWORK: &str = "RULE-HOST-NETWORK";

const SENSITIVE_PATHS: &[&str] = &["/etc", "/var", "/root", "/sys", "/proc", "/boot", "/dev"];

const SECRET_KEYWORDS: &[&str] = &[
    "PASSWORD", "PASSWD", "PWD",
    "SECRET", "API_KEY", "APIKEY",
    "TOKEN", "AUTH", "PRIVATE_KEY",
    "AWS_SECRET", "DATABASE_PASSWORD",
];

/// Stateless rule evaluation over one container's inspected metadata.
pub struct ComplianceInspector;

impl ComplianceInspector {
    pub fn new() -> Self {
        ComplianceInspector
    }

    fn check(&self, c: &ContainerDetails) -> Vec<Misconfiguration> {
        let name = &c.container.name;
        let mut misconfigs = Vec::new();

        if c.privileged {
            misconfigs.push(Misconfiguration {
                id: RULE_PRIVILEGED.to_string(),
                severity: Severity::High,
                title: "Privileged container".to_string(),
                description: format!(
                    "Container '{}' runs with --privileged, granting full root access to the host",
                    name
                ),
                resource: name.clone(),
                remediation: "Drop --privileged and grant specific Linux capabilities \
                              with --cap-add where needed"
                    .to_string(),
            });
        }

        // Multiple matching mounts are aggregated into one finding.
        let sensitive = detect_sensitive_mounts(&c.mounts);
        if !sensitive.is_empty() {
            misconfigs.push(Misconfiguration {
                id: RULE_SENSITIVE_MOUNT.to_string(),
                severity: Severity::High,
                title: "Sensitive host paths mounted".to_string(),
                description: format!(
                    "Container '{}' mounts sensitive paths: {}",
                    name,
                    sensitive.join(", ")
                ),
                resource: name.clone(),
                remediation: "Restrict mounts to strictly required directories; \
                              avoid /etc, /var, /root"
                    .to_string(),
            });
        }

        let secrets = detect_secrets_in_env(&c.environment);
        if !secrets.is_empty() {
            misconfigs.push(Misconfiguration {
                id: RULE_SECRET_ENV.to_string(),
                severity: Severity::Critical,
                title: "Potential secrets in environment variables".to_string(),
                description: format!("Suspicious variables detected: {}", secrets.join(", ")),
                resource: name.clone(),
                remediation: "Use a secrets manager (podman secrets, Vault) instead of \
                              environment variables"
                    .to_string(),
            });
        }

        if c.network_mode == "host" {
            misconfigs.push(Misconfiguration {
                id: RULE_HOST_NETWORK.to_string(),
                severity: Severity::Medium,
                title: "Host network mode in use".to_string(),
                description: format!("Container '{}' shares the host network stack", name),
                resource: name.clone(),
                remediation: "Use an isolated bridge network unless host networking \
                              is specifically required"
                    .to_string(),
            });
        }

        misconfigs
    }
}

impl ComplianceChecker for ComplianceInspector {
    async fn check_compliance(&self, details: &ContainerDetails) -> Result<Vec<Misconfiguration>> {
        Ok(self.check(details))
    }
}

// ── 检测逻辑 ────────────────────────────────────────────────────────────────

fn detect_sensitive_mounts(mounts: &[Mount]) -> Vec<String> {
    let mut detected = Vec::new();

    for mount in mounts {
        let hit = SENSITIVE_PATHS.iter().any(|sensitive| {
            mount.source.starts_with(sensitive) || mount.destination.starts_with(sensitive)
        });
        if hit {
            detected.push(format!("{} -> {}", mount.source, mount.destination));
        }
    }

    detected
}

fn detect_secrets_in_env(env: &HashMap<String, String>) -> Vec<String> {
    let mut detected: Vec<String> = env.iter()
        .filter(|(key, value)| {
            let upper = key.to_uppercase();
            !value.is_empty() && SECRET_KEYWORDS.iter().any(|kw| upper.contains(kw))
        })
        .map(|(key, _)| key.clone())
        .collect();

    // HashMap iteration order is arbitrary; keep the description stable
    detected.sort();
    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::container::{Container, ContainerState};

    fn details(
        privileged: bool,
        mounts: Vec<Mount>,
        env: &[(&str, &str)],
        network_mode: &str,
    ) -> ContainerDetails {
        ContainerDetails {
            container: Container {
                id: "abc123def456".to_string(),
                name: "web".to_string(),
                image: "nginx:alpine".to_string(),
                state: ContainerState::Running,
                status: "Up 2 hours".to_string(),
                created: chrono::Utc::now(),
                labels: HashMap::new(),
            },
            privileged,
            mounts,
            network_mode: network_mode.to_string(),
            environment: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            pid: 1234,
        }
    }

    fn mount(source: &str, destination: &str) -> Mount {
        Mount {
            kind: "bind".to_string(),
            source: source.to_string(),
            destination: destination.to_string(),
            mode: "rw".to_string(),
        }
    }

    async fn run(c: &ContainerDetails) -> Vec<Misconfiguration> {
        ComplianceInspector::new().check_compliance(c).await.unwrap()
    }

    #[tokio::test]
    async fn test_clean_container_has_no_findings() {
        let c = details(false, vec![mount("/home/app/data", "/data")], &[("PATH", "/bin")], "bridge");
        assert!(run(&c).await.is_empty());
    }

    #[tokio::test]
    async fn test_reference_scenario_three_findings() {
        let c = details(
            true,
            vec![mount("/etc", "/etc/app")],
            &[("DB_PASSWORD", "x")],
            "bridge",
        );
        let findings = run(&c).await;
        let ids: Vec<&str> = findings.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(findings.len(), 3);
        assert!(ids.contains(&RULE_PRIVILEGED));
        assert!(ids.contains(&RULE_SENSITIVE_MOUNT));
        assert!(ids.contains(&RULE_SECRET_ENV));
    }

    #[tokio::test]
    async fn test_multiple_sensitive_mounts_one_finding() {
        let c = details(
            false,
            vec![mount("/etc", "/host-etc"), mount("/proc", "/host-proc")],
            &[],
            "bridge",
        );
        let findings = run(&c).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, RULE_SENSITIVE_MOUNT);
        assert!(findings[0].description.contains("/etc -> /host-etc"));
        assert!(findings[0].description.contains("/proc -> /host-proc"));
    }

    #[tokio::test]
    async fn test_sensitive_destination_also_triggers() {
        let c = details(false, vec![mount("/srv/data", "/var/lib/data")], &[], "bridge");
        let findings = run(&c).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, RULE_SENSITIVE_MOUNT);
    }

    #[tokio::test]
    async fn test_secret_env_case_insensitive() {
        let c = details(false, vec![], &[("db_password", "hunter2")], "bridge");
        let findings = run(&c).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, RULE_SECRET_ENV);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_empty_secret_value_not_flagged() {
        let c = details(false, vec![], &[("API_KEY", "")], "bridge");
        assert!(run(&c).await.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_secret_keys_one_finding() {
        let c = details(false, vec![], &[("API_KEY", "k"), ("AUTH_TOKEN", "t")], "bridge");
        let findings = run(&c).await;
        assert_eq!(findings.len(), 1);
        assert!(findings[0].description.contains("API_KEY"));
        assert!(findings[0].description.contains("AUTH_TOKEN"));
    }

    #[tokio::test]
    async fn test_host_network_mode() {
        let c = details(false, vec![], &[], "host");
        let findings = run(&c).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, RULE_HOST_NETWORK);
        assert_eq!(findings[0].severity, Severity::Medium);
    }
}
