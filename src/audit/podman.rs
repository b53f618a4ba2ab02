//! Podman runtime adapter
//! 来源：podman version / podman ps / podman inspect（--format json）

use serde::Deserialize;
use std::collections::HashMap;
use tokio::process::Command;

use crate::audit::container::{parse_env_pairs, Container, ContainerDetails, ContainerState, Mount};
use crate::audit::ports::ContainerRuntime;
use crate::utils::{PodguardError, Result};

pub struct PodmanClient {
    program: String,
}

impl PodmanClient {
    pub fn new() -> Self {
        PodmanClient { program: "podman".to_string() }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let out = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| PodguardError::Podman(format!("podman {} failed: {}", args[0], e)))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(PodguardError::Podman(format!(
                "podman {} failed: {}",
                args[0],
                stderr.trim()
            )));
        }

        Ok(out.stdout)
    }
}

impl ContainerRuntime for PodmanClient {
    async fn ping(&self) -> Result<()> {
        self.run(&["version", "--format", "json"]).await?;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let stdout = self.run(&["ps", "--all", "--format", "json"]).await?;

        let raw: Vec<PsEntry> = serde_json::from_slice(&stdout)
            .map_err(|e| PodguardError::Parse(format!("podman ps JSON: {}", e)))?;

        Ok(raw.into_iter().map(PsEntry::into_domain).collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails> {
        let out = Command::new(&self.program)
            .args(["inspect", "--type", "container", "--format", "json", id])
            .output()
            .await
            .map_err(|e| PodguardError::Podman(format!("podman inspect failed: {}", e)))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            if stderr.to_lowercase().contains("no such") {
                return Err(PodguardError::ContainerNotFound(id.to_string()));
            }
            return Err(PodguardError::Podman(format!(
                "podman inspect failed: {}",
                stderr.trim()
            )));
        }

        let raw: Vec<InspectEntry> = serde_json::from_slice(&out.stdout)
            .map_err(|e| PodguardError::Parse(format!("podman inspect JSON: {}", e)))?;

        raw.into_iter()
            .next()
            .map(InspectEntry::into_domain)
            .ok_or_else(|| PodguardError::Parse("empty inspect result".to_string()))
    }
}

// ── podman ps 响应 ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Vec<String>,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Created", default)]
    created: i64,               // unix epoch seconds
    #[serde(rename = "Labels", default)]
    labels: Option<HashMap<String, String>>,
}

impl PsEntry {
    fn into_domain(self) -> Container {
        let name = self.names.first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| "<unnamed>".to_string());

        Container {
            id: short_id(&self.id),
            name,
            image: self.image,
            state: ContainerState::from(self.state.as_str()),
            status: self.status,
            created: chrono::DateTime::from_timestamp(self.created, 0)
                .unwrap_or_default(),
            labels: self.labels.unwrap_or_default(),
        }
    }
}

// ── podman inspect 响应 ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct InspectEntry {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Created", default)]
    created: String,            // RFC 3339
    #[serde(rename = "State", default)]
    state: InspectState,
    #[serde(rename = "Config", default)]
    config: InspectConfig,
    #[serde(rename = "HostConfig", default)]
    host_config: InspectHostConfig,
    #[serde(rename = "Mounts", default)]
    mounts: Vec<InspectMount>,
}

#[derive(Debug, Default, Deserialize)]
struct InspectState {
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Running", default)]
    running: bool,
    #[serde(rename = "Paused", default)]
    paused: bool,
    #[serde(rename = "Restarting", default)]
    restarting: bool,
    #[serde(rename = "Pid", default)]
    pid: i32,
}

#[derive(Debug, Default, Deserialize)]
struct InspectConfig {
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "Labels", default)]
    labels: Option<HashMap<String, String>>,
    #[serde(rename = "Env", default)]
    env: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct InspectHostConfig {
    #[serde(rename = "Privileged", default)]
    privileged: bool,
    #[serde(rename = "NetworkMode", default)]
    network_mode: String,
}

#[derive(Debug, Deserialize)]
struct InspectMount {
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(rename = "Source", default)]
    source: String,
    #[serde(rename = "Destination", default)]
    destination: String,
    #[serde(rename = "RW", default)]
    rw: bool,
}

impl InspectEntry {
    fn into_domain(self) -> ContainerDetails {
        let state = if self.state.running {
            ContainerState::Running
        } else if self.state.paused {
            ContainerState::Paused
        } else if self.state.restarting {
            ContainerState::Restarting
        } else {
            ContainerState::from(self.state.status.as_str())
        };

        let mounts = self.mounts.into_iter()
            .map(|m| Mount {
                kind: m.kind,
                source: m.source,
                destination: m.destination,
                mode: if m.rw { "rw" } else { "ro" }.to_string(),
            })
            .collect();

        ContainerDetails {
            container: Container {
                id: short_id(&self.id),
                name: self.name.trim_start_matches('/').to_string(),
                image: self.config.image,
                state,
                status: self.state.status,
                created: self.created.parse().unwrap_or_default(),
                labels: self.config.labels.unwrap_or_default(),
            },
            privileged: self.host_config.privileged,
            mounts,
            network_mode: self.host_config.network_mode,
            environment: parse_env_pairs(&self.config.env),
            pid: self.state.pid,
        }
    }
}

/// Docker 风格短 ID（前 12 位）
fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}
