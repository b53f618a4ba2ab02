use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodguardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Podman error: {0}")]
    Podman(String),

    #[error("container {0} not found")]
    ContainerNotFound(String),

    #[error("Trivy error: {0}")]
    Trivy(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("System error: {0}")]
    System(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, PodguardError>;
