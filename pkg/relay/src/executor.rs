use async_trait::async_trait;
use contracts::{ContractCall, ShieldedPoolContract, H256};
use serde::Deserialize;
use serde_json::Value;

/// Turns a signed action into a submitted transaction
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, signed_action: &Value) -> contracts::Result<H256>;
}

/// Signed actions for the pool are [`ContractCall`]s, signed with the relay key
#[async_trait]
impl ActionExecutor for ShieldedPoolContract {
    async fn execute(&self, signed_action: &Value) -> contracts::Result<H256> {
        let call = ContractCall::deserialize(signed_action)?;
        self.submit_call(&call).await
    }
}
