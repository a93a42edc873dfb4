use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use ethereum_types::{Address, H256, U256};
use web3::{
    contract::{tokens::Tokenize, Contract},
    ethabi::Token,
    signing::{Key, SecretKey, SecretKeyRef},
    transports::Http,
};
use zk_primitives::Element;

use crate::{
    constants::{CONFIRMATION_TIMEOUT, POOL_CONTRACT_JSON, RECEIPT_POLL_INTERVAL},
    error::Result,
    revert::{build_revert_debug, error_graph},
    util::{convert_element_to_h256, convert_element_to_u256, convert_h256_to_element},
    Client, ContractCall, Error, Ledger, SelectorTable,
};

#[derive(Clone, Debug)]
pub struct ShieldedPoolContract {
    pub client: Client,
    pub contract: Contract<Http>,
    signer: SecretKey,
    signer_address: Address,
    address: Address,
    selectors: Arc<SelectorTable>,
    confirmation_timeout: Duration,
}

impl ShieldedPoolContract {
    pub fn new(
        client: Client,
        contract: Contract<Http>,
        signer: SecretKey,
        address: Address,
        selectors: SelectorTable,
    ) -> Self {
        let signer_address = Key::address(&SecretKeyRef::new(&signer));

        Self {
            client,
            contract,
            signer,
            signer_address,
            address,
            selectors: Arc::new(selectors),
            confirmation_timeout: CONFIRMATION_TIMEOUT,
        }
    }

    /// Bind to a deployed pool. The pool's own errors are always decodable
    pub fn load(client: Client, pool_contract_addr: &str, signer: SecretKey) -> Result<Self> {
        let address = pool_contract_addr
            .trim_start_matches("0x")
            .parse::<Address>()
            .map_err(|err| {
                Error::InvalidArgument(format!("pool address {pool_contract_addr:?}: {err}"))
            })?;

        let contract = client.load_contract_from_str(address, POOL_CONTRACT_JSON)?;
        let selectors =
            SelectorTable::from_abi(&serde_json::from_str::<serde_json::Value>(POOL_CONTRACT_JSON)?)?;

        Ok(Self::new(client, contract, signer, address, selectors))
    }

    /// Add more error signatures (e.g. from contracts the pool calls into)
    pub fn with_selectors(self, extra: SelectorTable) -> Self {
        let mut selectors = (*self.selectors).clone();
        selectors.extend(extra);

        Self {
            selectors: Arc::new(selectors),
            ..self
        }
    }

    pub fn with_confirmation_timeout(self, confirmation_timeout: Duration) -> Self {
        Self {
            confirmation_timeout,
            ..self
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    pub fn selectors(&self) -> &SelectorTable {
        &self.selectors
    }

    /// Sign and send `func`, turning a node rejection into [`Error::Revert`]
    pub async fn call(&self, func: &str, params: impl Tokenize + Clone) -> Result<H256> {
        self.client
            .call(
                &self.contract,
                func,
                params,
                &self.signer,
                self.signer_address,
            )
            .await
            .map_err(|err| self.decode_failure(err))
    }

    /// [`Self::call`], then wait for the transaction to be confirmed
    async fn send(&self, func: &str, params: impl Tokenize + Clone) -> Result<H256> {
        let txn_hash = self.call(func, params).await?;
        self.wait_for_confirmation(txn_hash).await?;

        Ok(txn_hash)
    }

    /// Submit a call described as JSON, e.g. a signed action forwarded by the relay.
    ///
    /// Resolves as soon as the node accepts the transaction.
    #[tracing::instrument(err, ret, skip(self))]
    pub async fn submit_call(&self, call: &ContractCall) -> Result<H256> {
        let function = self.contract.abi().function(&call.function_name)?;
        let tokens = call.tokens(function)?;

        self.call(&call.function_name, tokens.as_slice()).await
    }

    fn decode_failure(&self, err: Error) -> Error {
        if err.is_network_failure() {
            return err;
        }

        match err {
            Error::Web3(_) | Error::Web3Contract(_) => {
                let debug = build_revert_debug(&error_graph(&err), &self.selectors);
                Error::Revert {
                    message: err.to_string(),
                    debug,
                }
            }
            err => err,
        }
    }

    async fn query_bool(&self, func: &str, key: &Element) -> Result<bool> {
        let result = self
            .client
            .query(
                &self.contract,
                func,
                (convert_element_to_h256(key),),
                None,
                Default::default(),
                None,
            )
            .await?;

        Ok(result)
    }
}

fn public_inputs_token(public_inputs: &[Element]) -> Token {
    Token::Array(
        public_inputs
            .iter()
            .map(convert_element_to_h256)
            .map(|x| Token::FixedBytes(x.as_bytes().to_vec()))
            .collect(),
    )
}

#[async_trait]
impl Ledger for ShieldedPoolContract {
    #[tracing::instrument(err, ret, skip(self))]
    async fn deposit(&self, commitment: Element, amount: Element) -> Result<H256> {
        let amount: U256 = convert_element_to_u256(&amount);
        self.send("deposit", (convert_element_to_h256(&commitment), amount))
            .await
    }

    #[tracing::instrument(err, ret, skip(self))]
    async fn register_root(&self, root: Element) -> Result<H256> {
        self.send("registerRoot", (convert_element_to_h256(&root),))
            .await
    }

    #[tracing::instrument(err, ret, skip(self, proof))]
    async fn withdraw(&self, proof: &[u8], public_inputs: &[Element]) -> Result<H256> {
        self.send(
            "withdraw",
            (
                Token::Bytes(proof.to_vec()),
                public_inputs_token(public_inputs),
            ),
        )
        .await
    }

    #[tracing::instrument(err, ret, skip(self, proof))]
    async fn withdraw_v2b(
        &self,
        proof: &[u8],
        public_inputs: &[Element],
        ciphertext: H256,
    ) -> Result<H256> {
        self.send(
            "withdrawV2b",
            (
                Token::Bytes(proof.to_vec()),
                public_inputs_token(public_inputs),
                Token::FixedBytes(ciphertext.as_bytes().to_vec()),
            ),
        )
        .await
    }

    #[tracing::instrument(err, ret, skip(self))]
    async fn is_nullifier_spent(&self, nullifier: Element) -> Result<bool> {
        self.query_bool("nullifiers", &nullifier).await
    }

    #[tracing::instrument(err, ret, skip(self))]
    async fn current_root(&self) -> Result<Element> {
        let root: H256 = self
            .client
            .query(
                &self.contract,
                "getCurrentRoot",
                (),
                None,
                Default::default(),
                None,
            )
            .await?;

        Ok(convert_h256_to_element(&root))
    }

    #[tracing::instrument(err, ret, skip(self))]
    async fn is_known_root(&self, root: Element) -> Result<bool> {
        self.query_bool("merkleRoots", &root).await
    }

    #[tracing::instrument(err, ret, skip(self))]
    async fn is_commitment_known(&self, commitment: Element) -> Result<bool> {
        self.query_bool("commitments", &commitment).await
    }

    #[tracing::instrument(err, skip(self))]
    async fn wait_for_confirmation(&self, txn_hash: H256) -> Result<()> {
        self.client
            .wait_for_receipt(txn_hash, RECEIPT_POLL_INTERVAL, self.confirmation_timeout)
            .await?;

        Ok(())
    }
}
