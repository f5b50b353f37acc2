use qp_qf::QError;
use thiserror::Error;

/// Errors that end a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("configuration rejected: {0}")]
    InvalidConfig(String),
    #[error("framework error: {0}")]
    Framework(#[from] QError),
}
