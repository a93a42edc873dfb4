use tokio::sync::watch;
use tracing::{info, warn};
use zk_primitives::{Element, FieldValue};

use crate::{
    constants::PUBLIC_INPUTS,
    prover::{Prover, WithdrawInputs},
    PipelineError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Executing,
    Proving,
    Reconciling,
    Done,
    Failed,
}

/// A proof ready for the pool verifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofArtifact {
    pub proof: Vec<u8>,
    /// `[nullifier, merkle_proof_length, expected_merkle_root, recipient, commitment]`
    pub public_inputs: [Element; PUBLIC_INPUTS],
}

impl ProofArtifact {
    pub fn proof_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.proof))
    }

    pub fn nullifier(&self) -> Element {
        self.public_inputs[0]
    }

    pub fn recipient(&self) -> Element {
        self.public_inputs[3]
    }
}

/// Bring the backend's public inputs into verifier order.
///
/// Some backends omit the `u32` merkle proof length, returning 4 inputs; it is re-inserted at
/// index 1. Five inputs pass through unchanged.
pub fn reconcile_public_inputs(
    public_inputs: &[FieldValue],
    merkle_proof_length: u32,
) -> Result<[Element; PUBLIC_INPUTS], PipelineError> {
    let mut elements = public_inputs
        .iter()
        .map(FieldValue::normalize)
        .collect::<Result<Vec<_>, _>>()?;

    match elements.len() {
        4 => elements.insert(1, Element::from(merkle_proof_length)),
        5 => {}
        n => return Err(PipelineError::PublicInputShapeMismatch(n)),
    }

    elements
        .try_into()
        .map_err(|v: Vec<Element>| PipelineError::PublicInputShapeMismatch(v.len()))
}

/// `execute` then `prove` then reconcile, publishing each transition
#[derive(Debug)]
pub struct ProofPipeline<P> {
    prover: P,
    state: watch::Sender<PipelineState>,
}

impl<P: Prover> ProofPipeline<P> {
    pub fn new(prover: P) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self { prover, state }
    }

    pub fn prover(&self) -> &P {
        &self.prover
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    fn transition(&self, state: PipelineState) {
        info!(?state, "proof pipeline");
        self.state.send_replace(state);
    }

    pub async fn run(&self, inputs: &WithdrawInputs) -> Result<ProofArtifact, PipelineError> {
        let result = self.run_inner(inputs).await;

        match &result {
            Ok(_) => self.transition(PipelineState::Done),
            Err(err) => {
                warn!(%err, "proof pipeline failed");
                self.transition(PipelineState::Failed);
            }
        }

        result
    }

    async fn run_inner(&self, inputs: &WithdrawInputs) -> Result<ProofArtifact, PipelineError> {
        self.transition(PipelineState::Executing);
        let circuit_inputs = inputs.to_circuit_inputs()?;
        let witness = self.prover.execute(&circuit_inputs).await?;

        self.transition(PipelineState::Proving);
        let proof = self.prover.prove(witness).await?;

        self.transition(PipelineState::Reconciling);
        let public_inputs =
            reconcile_public_inputs(&proof.public_inputs, inputs.merkle_proof_length)?;

        Ok(ProofArtifact {
            proof: proof.proof,
            public_inputs,
        })
    }
}
