//! In-memory doubles for the prover and the pool contract

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use contracts::{Ledger, CONFIRMATION_TIMEOUT, H256};
use parking_lot::Mutex;
use sha3::{Digest, Keccak256};
use zk_primitives::{Element, FieldHasher, FieldValue};

use crate::{
    ciphertext::Ciphertext,
    commitment::CommitmentScheme,
    constants::{MERKLE_DEPTH, PUBLIC_INPUTS},
    note::MerklePath,
    pipeline::ProofArtifact,
    prover::{CircuitInputs, InputValue, ProofData, Prover, Witness},
    submit::Submitter,
    PipelineError,
};

/// A prover that checks the withdrawal constraints natively instead of proving them
pub struct MockProver<H> {
    scheme: CommitmentScheme<H>,
    omit_merkle_proof_length: bool,
    calls: Arc<AtomicUsize>,
}

impl<H: FieldHasher> MockProver<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            scheme: CommitmentScheme::new(hasher),
            omit_merkle_proof_length: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return 4 public inputs, leaving out the merkle proof length
    pub fn omit_merkle_proof_length(self) -> Self {
        Self {
            omit_merkle_proof_length: true,
            ..self
        }
    }

    /// Number of `execute` plus `prove` calls so far
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

fn field(inputs: &CircuitInputs, name: &str) -> Result<Element, PipelineError> {
    match inputs.get(name) {
        Some(InputValue::Field(element)) => Ok(*element),
        other => Err(PipelineError::CircuitExecution(format!(
            "missing field input `{name}`: {other:?}"
        ))),
    }
}

fn path(inputs: &CircuitInputs) -> Result<MerklePath, PipelineError> {
    let length = match inputs.get("merkle_proof_length") {
        Some(InputValue::U32(length)) => *length,
        other => {
            return Err(PipelineError::CircuitExecution(format!(
                "missing merkle_proof_length: {other:?}"
            )))
        }
    };

    let indices = match inputs.get("merkle_proof_indices") {
        Some(InputValue::U32s(indices)) => <[u32; MERKLE_DEPTH]>::try_from(indices.as_slice()),
        _ => return Err(PipelineError::CircuitExecution("missing merkle_proof_indices".into())),
    }
    .map_err(|err| PipelineError::CircuitExecution(err.to_string()))?;

    let siblings = match inputs.get("merkle_proof_siblings") {
        Some(InputValue::Fields(siblings)) => {
            <[Element; MERKLE_DEPTH]>::try_from(siblings.as_slice())
        }
        _ => return Err(PipelineError::CircuitExecution("missing merkle_proof_siblings".into())),
    }
    .map_err(|err| PipelineError::CircuitExecution(err.to_string()))?;

    Ok(MerklePath {
        length,
        indices,
        siblings,
    })
}

fn constraint(holds: bool, name: &str) -> Result<(), PipelineError> {
    match holds {
        true => Ok(()),
        false => Err(PipelineError::CircuitExecution(format!(
            "Cannot satisfy constraint: {name}"
        ))),
    }
}

#[async_trait]
impl<H: FieldHasher> Prover for MockProver<H> {
    async fn execute(&self, inputs: &CircuitInputs) -> Result<Witness, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let nullifier = field(inputs, "nullifier")?;
        let root = field(inputs, "expected_merkle_root")?;
        let recipient = field(inputs, "recipient")?;
        let commitment = field(inputs, "commitment")?;
        let value = field(inputs, "value")?;
        let secret = field(inputs, "pk_b")?;
        let random = field(inputs, "random")?;
        let path = path(inputs)?;

        constraint(
            self.scheme.nullifier(random, secret) == nullifier,
            "nullifier",
        )?;
        constraint(
            self.scheme.commitment(value, nullifier) == commitment,
            "commitment",
        )?;

        let entry = self.scheme.entry(value, secret, random, nullifier);
        constraint(self.scheme.root(entry, &path) == root, "merkle root")?;

        let mut witness = Vec::with_capacity(4 * 32 + 4);
        for element in [nullifier, root, recipient, commitment] {
            witness.extend(element.to_be_bytes());
        }
        witness.extend(path.length.to_be_bytes());

        Ok(Witness(witness))
    }

    async fn prove(&self, witness: Witness) -> Result<ProofData, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let bytes = witness.0;
        if bytes.len() != 4 * 32 + 4 {
            return Err(PipelineError::Proving("malformed witness".to_owned()));
        }

        let word = |i: usize| FieldValue::Hex(format!("0x{}", hex::encode(&bytes[i * 32..(i + 1) * 32])));
        let length = FieldValue::Bytes(bytes[128..].to_vec());

        let mut public_inputs = vec![word(0), length, word(1), word(2), word(3)];
        if self.omit_merkle_proof_length {
            public_inputs.remove(1);
        }

        Ok(ProofData {
            proof: Keccak256::digest(&bytes).to_vec(),
            public_inputs,
        })
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    nullifiers: HashSet<Element>,
    roots: HashSet<Element>,
    commitments: HashSet<Element>,
    current_root: Element,
    deposits: usize,
    transactions: u64,
    confirmed: HashSet<H256>,
    reject_withdrawals: Option<String>,
    confirmation_failure: Option<ConfirmationFailure>,
}

impl LedgerState {
    fn next_tx(&mut self) -> H256 {
        self.transactions += 1;
        let txn_hash = H256::from_low_u64_be(self.transactions);
        self.confirmed.insert(txn_hash);
        txn_hash
    }
}

/// How [`MockLedger::wait_for_confirmation`] fails after [`MockLedger::fail_confirmations`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationFailure {
    /// No receipt within the confirmation timeout
    Timeout,
    /// The receipt reports a failed execution
    Reverted,
}

/// A pool contract held in memory
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

fn revert(message: impl Into<String>) -> contracts::Error {
    contracts::Error::Revert {
        message: message.into(),
        debug: None,
    }
}

impl MockLedger {
    pub fn spend(&self, nullifier: Element) {
        self.state.lock().nullifiers.insert(nullifier);
    }

    /// Make every following withdrawal revert with `message`
    pub fn reject_withdrawals(&self, message: impl Into<String>) {
        self.state.lock().reject_withdrawals = Some(message.into());
    }

    /// Make every following confirmation fail. Transactions this ledger never sent always time out
    pub fn fail_confirmations(&self, failure: ConfirmationFailure) {
        self.state.lock().confirmation_failure = Some(failure);
    }

    pub fn deposits(&self) -> usize {
        self.state.lock().deposits
    }

    pub fn has_commitment(&self, commitment: Element) -> bool {
        self.state.lock().commitments.contains(&commitment)
    }

    pub fn has_root(&self, root: Element) -> bool {
        self.state.lock().roots.contains(&root)
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn deposit(&self, commitment: Element, amount: Element) -> contracts::Result<H256> {
        let mut state = self.state.lock();
        if amount.is_zero() {
            return Err(revert("ZeroAmount()"));
        }
        if !state.commitments.insert(commitment) {
            return Err(revert(format!("CommitmentAlreadyExists({})", commitment.to_hex())));
        }

        state.deposits += 1;
        Ok(state.next_tx())
    }

    async fn register_root(&self, root: Element) -> contracts::Result<H256> {
        let mut state = self.state.lock();
        state.roots.insert(root);
        state.current_root = root;
        Ok(state.next_tx())
    }

    async fn withdraw(&self, _proof: &[u8], public_inputs: &[Element]) -> contracts::Result<H256> {
        let mut state = self.state.lock();
        if let Some(message) = &state.reject_withdrawals {
            return Err(revert(message.clone()));
        }

        if public_inputs.len() != PUBLIC_INPUTS {
            return Err(revert(format!(
                "InvalidPublicInputsLength({PUBLIC_INPUTS}, {})",
                public_inputs.len()
            )));
        }

        let (nullifier, root) = (public_inputs[0], public_inputs[2]);
        if !state.roots.contains(&root) {
            return Err(revert(format!("UnknownMerkleRoot({})", root.to_hex())));
        }
        if !state.nullifiers.insert(nullifier) {
            return Err(revert(format!("NullifierAlreadySpent({})", nullifier.to_hex())));
        }

        Ok(state.next_tx())
    }

    async fn withdraw_v2b(
        &self,
        proof: &[u8],
        public_inputs: &[Element],
        _ciphertext: H256,
    ) -> contracts::Result<H256> {
        self.withdraw(proof, public_inputs).await
    }

    async fn is_nullifier_spent(&self, nullifier: Element) -> contracts::Result<bool> {
        Ok(self.state.lock().nullifiers.contains(&nullifier))
    }

    async fn current_root(&self) -> contracts::Result<Element> {
        Ok(self.state.lock().current_root)
    }

    async fn is_known_root(&self, root: Element) -> contracts::Result<bool> {
        Ok(self.has_root(root))
    }

    async fn is_commitment_known(&self, commitment: Element) -> contracts::Result<bool> {
        Ok(self.has_commitment(commitment))
    }

    async fn wait_for_confirmation(&self, txn_hash: H256) -> contracts::Result<()> {
        let state = self.state.lock();
        match state.confirmation_failure {
            Some(ConfirmationFailure::Reverted) => {
                Err(contracts::Error::TransactionReverted(txn_hash))
            }
            None if state.confirmed.contains(&txn_hash) => Ok(()),
            Some(ConfirmationFailure::Timeout) | None => {
                Err(contracts::Error::Timeout(txn_hash, CONFIRMATION_TIMEOUT))
            }
        }
    }
}

#[async_trait]
impl Submitter for MockLedger {
    async fn submit_withdrawal(
        &self,
        artifact: &ProofArtifact,
        ciphertext: &Ciphertext,
    ) -> crate::Result<H256> {
        Ok(self
            .withdraw_v2b(&artifact.proof, &artifact.public_inputs, H256(ciphertext.0))
            .await?)
    }
}
