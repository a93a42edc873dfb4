use async_trait::async_trait;
use ethereum_types::H256;
use zk_primitives::Element;

use crate::Result;

/// The on-chain shielded pool, as seen by a client.
///
/// Writes resolve once the transaction is confirmed, so an `Ok` hash is a successful
/// redemption or deposit rather than merely an accepted submission. Transactions sent by
/// someone else (e.g. a relay) are confirmed with [`Ledger::wait_for_confirmation`].
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn deposit(&self, commitment: Element, amount: Element) -> Result<H256>;

    async fn register_root(&self, root: Element) -> Result<H256>;

    async fn withdraw(&self, proof: &[u8], public_inputs: &[Element]) -> Result<H256>;

    async fn withdraw_v2b(
        &self,
        proof: &[u8],
        public_inputs: &[Element],
        ciphertext: H256,
    ) -> Result<H256>;

    async fn is_nullifier_spent(&self, nullifier: Element) -> Result<bool>;

    async fn current_root(&self) -> Result<Element>;

    async fn is_known_root(&self, root: Element) -> Result<bool>;

    async fn is_commitment_known(&self, commitment: Element) -> Result<bool>;

    /// Wait until `txn_hash` has a successful receipt, failing with [`crate::Error::Timeout`] or
    /// [`crate::Error::TransactionReverted`]
    async fn wait_for_confirmation(&self, txn_hash: H256) -> Result<()>;
}
