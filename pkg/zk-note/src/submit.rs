use async_trait::async_trait;
use contracts::{Ledger, ShieldedPoolContract, H256};

use crate::{ciphertext::Ciphertext, pipeline::ProofArtifact, Result};

/// Where a finished withdrawal is sent: straight to the pool, or through a relay
///
/// A returned hash only means the transaction was accepted. The client confirms it through
/// [`contracts::Ledger::wait_for_confirmation`] before treating the note as claimed.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit_withdrawal(
        &self,
        artifact: &ProofArtifact,
        ciphertext: &Ciphertext,
    ) -> Result<H256>;
}

#[async_trait]
impl Submitter for ShieldedPoolContract {
    async fn submit_withdrawal(
        &self,
        artifact: &ProofArtifact,
        ciphertext: &Ciphertext,
    ) -> Result<H256> {
        let txn_hash = self
            .withdraw_v2b(
                &artifact.proof,
                &artifact.public_inputs,
                H256(ciphertext.0),
            )
            .await?;

        Ok(txn_hash)
    }
}
