use thiserror::Error;

#[derive(Debug, Error)]
pub enum GhostError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("aborted — denylisted network context and override refused")]
    Aborted,
}

impl GhostError {
    /// Process exit code for this error. Scripts wrapping ghostmode rely on
    /// abort and identity failure being distinguishable.
    pub fn exit_code(&self) -> i32 {
        match self {
            GhostError::Aborted => 2,
            GhostError::IdentityUnavailable(_) => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, GhostError>;
