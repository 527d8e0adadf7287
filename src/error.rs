use thiserror::Error;

pub type Result<T> = std::result::Result<T, HelixError>;

#[derive(Error, Debug)]
pub enum HelixError {
    #[error("Malformed seed chain: {0}")]
    MalformedChain(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Ledger supply mismatch: journal replays to {journal}, recorded total is {recorded}")]
    SupplyMismatch { journal: f64, recorded: f64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("{0}")]
    Other(String),
}

impl HelixError {
    /// Shorthand for an invalid state transition.
    pub fn rejected(reason: impl Into<String>) -> Self {
        HelixError::Rejected(reason.into())
    }

    /// True for outcomes a caller must not blindly retry.
    pub fn is_rejection(&self) -> bool {
        matches!(self, HelixError::Rejected(_))
    }
}

impl From<String> for HelixError {
    fn from(s: String) -> Self {
        HelixError::Other(s)
    }
}

impl From<&str> for HelixError {
    fn from(s: &str) -> Self {
        HelixError::Other(s.to_string())
    }
}
