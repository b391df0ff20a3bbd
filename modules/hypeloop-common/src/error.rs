use thiserror::Error;

/// Session establishment failures. Always fatal — the run never starts
/// without a session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login challenge presented, manual intervention required")]
    Challenge,

    #[error("two-factor verification required, cannot proceed automatically")]
    TwoFactorRequired,

    #[error("session establishment timed out")]
    Timeout,

    #[error("authentication failed: {0}")]
    Other(String),
}

/// Failures of a single actuator action (reply, publish, search).
#[derive(Debug, Error)]
pub enum ActionError {
    /// The target vanished between discovery and action. Skip it.
    #[error("target no longer present")]
    StaleTarget,

    #[error("transient actuator failure: {0}")]
    Transient(String),

    /// Aborts the whole run.
    #[error("fatal actuator failure: {0}")]
    Fatal(String),
}

/// Failures of the external text-generation capability.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation capability is not configured")]
    Unavailable,

    #[error("generation returned no usable text")]
    Empty,

    #[error("generation failed: {0}")]
    Failed(String),
}
