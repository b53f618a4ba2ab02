//! 协作者契约：runtime / 漏洞扫描 / 合规检查
//! 编排器只通过这三个 trait 与外部组件交互，adapter 可替换

use crate::audit::container::{Container, ContainerDetails};
use crate::audit::finding::{Misconfiguration, Vulnerability};
use crate::utils::Result;

/// Interface to a container runtime (Podman, Docker, ...).
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// Checks connectivity with the daemon.
    async fn ping(&self) -> Result<()>;

    /// Returns all containers, running and stopped.
    async fn list_containers(&self) -> Result<Vec<Container>>;

    /// Returns extended details for one container. Fails with
    /// `PodguardError::ContainerNotFound` when the id no longer exists.
    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails>;
}

/// Interface to an image vulnerability scanner.
#[allow(async_fn_in_trait)]
pub trait VulnerabilityScanner {
    /// Whether the scanner can be used at all. When false the audit skips
    /// vulnerability scanning entirely instead of failing per container.
    fn is_available(&self) -> bool;

    /// Scans one image reference for known CVEs.
    async fn scan_image(&self, image: &str) -> Result<Vec<Vulnerability>>;
}

/// Interface to a compliance checker. Pure function of its input.
#[allow(async_fn_in_trait)]
pub trait ComplianceChecker {
    async fn check_compliance(&self, details: &ContainerDetails) -> Result<Vec<Misconfiguration>>;
}

/// Best-effort progress sink: (processed, total, message). Invoked only from
/// the serialized aggregation point, never from concurrent worker code.
pub type ProgressFn<'a> = dyn Fn(usize, usize, &str) + 'a;
