//! 容器领域模型
//! 来源：podman ps / podman inspect（由 runtime adapter 构造，core 只读）

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── 基础快照 ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: String,                      // 12 char short id
    pub name: String,
    pub image: String,                   // e.g. nginx:alpine
    pub state: ContainerState,
    pub status: String,                  // free text, e.g. "Up 3 hours"
    pub created: chrono::DateTime<chrono::Utc>,
    pub labels: HashMap<String, String>,
}

impl Container {
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

// ── 生命周期状态 ────────────────────────────────────────────────────────────

/// Coarse lifecycle state. Runtimes may report values outside the usual
/// set, so anything unrecognized is preserved as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Exited,
    Dead,
    Other(String),
}

impl ContainerState {
    pub fn as_str(&self) -> &str {
        match self {
            ContainerState::Created    => "created",
            ContainerState::Running    => "running",
            ContainerState::Paused     => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Exited     => "exited",
            ContainerState::Dead       => "dead",
            ContainerState::Other(s)   => s,
        }
    }
}

impl From<&str> for ContainerState {
    fn from(s: &str) -> Self {
        match s {
            "created"    => ContainerState::Created,
            "running"    => ContainerState::Running,
            "paused"     => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "exited"     => ContainerState::Exited,
            "dead"       => ContainerState::Dead,
            other        => ContainerState::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ContainerState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContainerState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ContainerState::from(s.as_str()))
    }
}

// ── 扩展信息（inspect） ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDetails {
    pub container: Container,
    pub privileged: bool,                // full root access to the host
    pub mounts: Vec<Mount>,
    pub network_mode: String,
    pub environment: HashMap<String, String>,
    pub pid: i32,                        // host pid of the container init
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mount {
    pub kind: String,                    // bind / volume / tmpfs
    pub source: String,
    pub destination: String,
    pub mode: String,                    // ro / rw
}

/// Parses `KEY=VALUE` pairs into a map. Entries with no `=` are dropped.
pub fn parse_env_pairs(pairs: &[String]) -> HashMap<String, String> {
    pairs.iter()
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
