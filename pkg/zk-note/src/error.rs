use std::time::Duration;

use contracts::{RevertDebug, H256};
use zk_primitives::FieldError;

use crate::store::StorageError;

/// Failure of the proof pipeline. Nothing in the pipeline is retried
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The witness could not be generated, e.g. because the note's commitment does not match
    /// its secrets
    #[error("circuit execution failed: {0}")]
    CircuitExecution(String),

    #[error("proof generation failed: {0}")]
    Proving(String),

    #[error("prover returned {0} public inputs, expected 4 or 5")]
    PublicInputShapeMismatch(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The chain rejected the transaction. `message` is always the raw node message
    #[error("ledger reverted: {message}")]
    LedgerRevert {
        message: String,
        debug: Option<RevertDebug>,
    },

    #[error("transaction {0:?} was not confirmed within {1:?}")]
    LedgerTimeout(H256, Duration),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("ledger error: {0}")]
    Ledger(contracts::Error),

    #[error("relay error: {0}")]
    Relay(String),

    #[error("invalid note: {0}")]
    InvalidNote(String),
}

impl From<contracts::Error> for Error {
    fn from(err: contracts::Error) -> Self {
        match err {
            contracts::Error::Revert { message, debug } => Self::LedgerRevert { message, debug },
            contracts::Error::TransactionReverted(txn_hash) => Self::LedgerRevert {
                message: format!("transaction {txn_hash:?} reverted"),
                debug: None,
            },
            contracts::Error::Timeout(txn_hash, timeout) => Self::LedgerTimeout(txn_hash, timeout),
            err => Self::Ledger(err),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_failures_map_to_ledger_errors() {
        let txn_hash = H256::repeat_byte(1);
        let timeout = Duration::from_secs(120);

        assert!(matches!(
            Error::from(contracts::Error::Timeout(txn_hash, timeout)),
            Error::LedgerTimeout(hash, t) if hash == txn_hash && t == timeout
        ));

        match Error::from(contracts::Error::TransactionReverted(txn_hash)) {
            Error::LedgerRevert { message, debug } => {
                assert_eq!(message, format!("transaction {txn_hash:?} reverted"));
                assert!(debug.is_none());
            }
            err => panic!("unexpected error: {err:?}"),
        }

        let debug = RevertDebug {
            revert_data: "0x12345678".to_owned(),
            outer_selector: "0x12345678".to_owned(),
            ..Default::default()
        };
        match Error::from(contracts::Error::Revert {
            message: "execution reverted".to_owned(),
            debug: Some(debug.clone()),
        }) {
            Error::LedgerRevert { message, debug: d } => {
                assert_eq!(message, "execution reverted");
                assert_eq!(d, Some(debug));
            }
            err => panic!("unexpected error: {err:?}"),
        }
    }

    #[test]
    fn other_contract_errors_stay_ledger_errors() {
        let err = Error::from(contracts::Error::InvalidArgument("root".to_owned()));

        assert!(matches!(err, Error::Ledger(contracts::Error::InvalidArgument(_))));
    }
}
