use std::sync::Arc;

use contracts::Ledger;
use zk_primitives::Element;

use crate::Result;

/// Pre-flight check that a nullifier has not been spent yet
///
/// Every check reads the ledger; nothing is cached.
#[derive(Clone)]
pub struct NullifierGuard {
    ledger: Arc<dyn Ledger>,
}

impl NullifierGuard {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    #[tracing::instrument(err, ret, skip(self, nullifier), fields(nullifier = %nullifier.to_hex()))]
    pub async fn is_spent(&self, nullifier: Element) -> Result<bool> {
        Ok(self.ledger.is_nullifier_spent(nullifier).await?)
    }
}
