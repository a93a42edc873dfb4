use std::{
    future::Future,
    time::{Duration, Instant},
};

use crate::{Error, Result};
use ethereum_types::{Address, H256};
use tokio::time::interval;
use web3::{
    contract::{tokens::Tokenize, Contract, Options},
    ethabi,
    signing::SecretKey,
    transports::Http,
    types::{TransactionReceipt, U256, U64},
    Web3,
};

#[derive(Debug, Clone)]
pub struct Client {
    client: Web3<Http>,
    minimum_gas_price: Option<U256>,
}

impl Client {
    pub fn new(rpc: &str, minimum_gas_price_gwei: Option<u64>) -> Result<Client> {
        let client = Web3::new(Http::new(rpc)?);
        let minimum_gas_price = minimum_gas_price_gwei.map(|gwei| U256::from(gwei) * 1_000_000_000);

        Ok(Client {
            client,
            minimum_gas_price,
        })
    }

    /// Build a contract handle from a compiled artifact (a JSON object with an `abi` key)
    pub fn load_contract_from_str(
        &self,
        address: Address,
        contract_json: &str,
    ) -> Result<Contract<Http>> {
        let contract_json_value = serde_json::from_str::<serde_json::Value>(contract_json)?;
        let abi_value = contract_json_value
            .get("abi")
            .ok_or_else(|| Error::InvalidArgument("contract artifact has no `abi` key".to_owned()))?;

        let contract_abi = serde_json::from_value::<ethabi::Contract>(abi_value.clone())?;

        Ok(Contract::new(self.client.eth(), address, contract_abi))
    }

    pub fn client(&self) -> &Web3<Http> {
        &self.client
    }

    pub async fn fast_gas_price(&self) -> Result<U256, web3::Error> {
        let gas_price: U256 =
            retry_on_network_failure(move || self.client.eth().gas_price()).await?;
        let fast_gas_price = gas_price * 2;

        match self.minimum_gas_price {
            Some(minimum_gas_price) if fast_gas_price < minimum_gas_price => Ok(minimum_gas_price),
            _ => Ok(fast_gas_price),
        }
    }

    #[tracing::instrument(err, ret, skip(self))]
    async fn pending_nonce(&self, address: Address) -> Result<U256, web3::Error> {
        retry_on_network_failure(move || {
            self.client
                .eth()
                .transaction_count(address, Some(web3::types::BlockNumber::Pending))
        })
        .await
    }

    pub(crate) async fn options(&self, address: Address) -> Result<Options, web3::Error> {
        let gas_price = self.fast_gas_price().await?;
        let nonce = self.pending_nonce(address).await?;

        Ok(Options {
            gas: Some(10_000_000.into()),
            gas_price: Some(gas_price),
            nonce: Some(nonce),
            ..Default::default()
        })
    }

    /// Estimate gas, then sign and send `func` from `signer_address`
    ///
    /// A revert surfaces here, during estimation, as a [`web3::contract::Error`] carrying the
    /// node's error payload.
    pub async fn call(
        &self,
        contract: &Contract<Http>,
        func: &str,
        params: impl Tokenize + Clone,
        signer: &SecretKey,
        signer_address: Address,
    ) -> Result<H256> {
        let options = self.options(signer_address).await?;
        let gas = retry_on_network_failure(|| {
            contract.estimate_gas(func, params.clone(), signer_address, options.clone())
        })
        .await?;

        let call_tx = retry_on_network_failure(move || {
            contract.signed_call(
                func,
                params,
                web3::contract::Options {
                    gas: Some(gas + gas / 2),
                    ..options
                },
                signer,
            )
        })
        .await?;

        Ok(call_tx)
    }

    pub async fn query<R, A, B, P>(
        &self,
        contract: &Contract<Http>,
        func: &str,
        params: P,
        from: A,
        options: Options,
        block: B,
    ) -> Result<R, web3::contract::Error>
    where
        R: web3::contract::tokens::Detokenize,
        A: Into<Option<Address>> + Clone,
        B: Into<Option<web3::types::BlockId>> + Clone,
        P: Tokenize + Clone,
    {
        let result =
            retry_on_network_failure(move || contract.query(func, params, from, options, block))
                .await?;

        Ok(result)
    }

    /// Wait for a transaction receipt and return it once the transaction is mined successfully.
    ///
    /// Fails with [`Error::Timeout`] if no receipt shows up within `timeout`, and with
    /// [`Error::TransactionReverted`] if the receipt reports a failed execution.
    #[tracing::instrument(err, skip(self))]
    pub async fn wait_for_receipt(
        &self,
        txn_hash: H256,
        interval_period: Duration,
        timeout: Duration,
    ) -> Result<TransactionReceipt> {
        let deadline = Instant::now() + timeout;

        let mut interval = interval(interval_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let receipt = retry_on_network_failure(move || {
                self.client.eth().transaction_receipt(txn_hash)
            })
            .await?;

            match receipt {
                Some(receipt) if receipt.status == Some(U64::zero()) => {
                    return Err(Error::TransactionReverted(txn_hash));
                }
                Some(receipt) => return Ok(receipt),
                None if Instant::now() > deadline => {
                    return Err(Error::Timeout(txn_hash, timeout));
                }
                None => {
                    // Pending or not yet propagated
                }
            }
        }
    }
}

trait IsNetworkFailure {
    fn is_network_failure(&self) -> bool;
}

impl IsNetworkFailure for web3::error::Error {
    fn is_network_failure(&self) -> bool {
        matches!(self, web3::error::Error::Transport(_))
    }
}

impl IsNetworkFailure for web3::contract::Error {
    fn is_network_failure(&self) -> bool {
        matches!(
            self,
            web3::contract::Error::Api(web3::error::Error::Transport(_))
        )
    }
}

/// Run `f`, running it again after 1s, 5s and 10s while it fails at the transport level
async fn retry_on_network_failure<T, E, Fut>(f: impl FnOnce() -> Fut + Clone) -> Result<T, E>
where
    E: IsNetworkFailure,
    Fut: Future<Output = Result<T, E>>,
{
    const DELAYS: [Duration; 3] = [
        Duration::from_secs(1),
        Duration::from_secs(5),
        Duration::from_secs(10),
    ];

    for delay in DELAYS {
        match (f.clone())().await {
            Err(err) if err.is_network_failure() => {
                tracing::warn!(?delay, "rpc transport failure, retrying");
                tokio::time::sleep(delay).await;
            }
            res => return res,
        }
    }

    f().await
}
