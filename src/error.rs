use thiserror::Error;

/// Errors surfaced by the planner, the plan artifact writer and the executor.
///
/// Failing to find a plan is not an error: the planner reports it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Goal parameters were missing or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The world snapshot cannot be turned into an initial state
    #[error("Invalid world snapshot: {0}")]
    InvalidSnapshot(String),

    /// The executor could not issue the next plan step against the simulation
    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
