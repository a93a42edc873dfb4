use contracts::RevertDebug;

/// An error returned by [`crate::RelayClient`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("relay rejected the request: {0}")]
    BadRequest(String),

    #[error("relay failed to execute the action: {message}")]
    Execution {
        message: String,
        debug: Option<RevertDebug>,
    },

    #[error("unexpected relay response {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("invalid transaction hash from relay: {0}")]
    InvalidTxHash(String),

    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for zk_note::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Execution { message, debug } => Self::LedgerRevert { message, debug },
            err => Self::Relay(err.to_string()),
        }
    }
}
