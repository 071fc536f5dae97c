use thiserror::Error;

/// Failure of a single user action. The display text is what the user sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    /// Missing input or credential, detected before any request is sent.
    #[error("{0}")]
    Validation(String),
    /// Non-2xx, unreachable or undecodable backend response.
    #[error("{0}")]
    Gateway(String),
    /// 2xx response missing a field the workflow depends on.
    #[error("{0}")]
    Postcondition(String),
}

impl StudioError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StudioError::Validation(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        StudioError::Gateway(msg.into())
    }

    pub fn postcondition(msg: impl Into<String>) -> Self {
        StudioError::Postcondition(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StudioError::Validation(_))
    }
}

pub type StudioResult<T> = std::result::Result<T, StudioError>;
