use std::time::Duration;

use ethereum_types::H256;

use crate::revert::RevertDebug;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transaction {0:?} was not confirmed within {1:?}")]
    Timeout(H256, Duration),

    #[error("transaction {0:?} reverted")]
    TransactionReverted(H256),

    /// The node rejected the call. `debug` holds whatever could be decoded from the revert data
    #[error("{message}")]
    Revert {
        message: String,
        debug: Option<RevertDebug>,
    },

    #[error("invalid contract argument: {0}")]
    InvalidArgument(String),

    #[error("web3 error: {0}")]
    Web3(#[from] web3::Error),

    #[error("web3 contract error: {0}")]
    Web3Contract(#[from] web3::contract::Error),

    #[error("abi error: {0}")]
    Ethabi(#[from] web3::ethabi::Error),

    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a transport failure rather than a rejection by the chain
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            Error::Web3(web3::Error::Transport(_))
                | Error::Web3Contract(web3::contract::Error::Api(web3::Error::Transport(_)))
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
