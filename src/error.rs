use thiserror::Error;

/// Why a single integration stopped before reaching the end of its time span.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FailureReason {
    #[error("step size {h:e} fell below the minimum {min_step:e}")]
    StepUnderflow { h: f64, min_step: f64 },
    #[error("step budget of {0} attempts exhausted")]
    MaxStepsExceeded(usize),
    #[error("state became non-finite")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Rejected before any integration started.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("integration failed at t = {t}: {reason}")]
    IntegrationFailure { t: f64, reason: FailureReason },
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
