use thiserror::Error;

/// SimError is returned if a session cannot be simulated at all. Sessions without participants
/// or where every car retires are valid outcomes and reported through `SessionStatus` instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown driver id {0}")]
    UnknownDriver(u32),

    #[error("Session store failure: {0}")]
    Store(String),
}

impl SimError {
    pub fn invalid(msg: impl Into<String>) -> SimError {
        SimError::InvalidInput(msg.into())
    }
}
