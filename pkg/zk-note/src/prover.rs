use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use zk_primitives::{Element, FieldError, FieldValue};

use crate::{constants::MERKLE_DEPTH, note::Note, PipelineError};

/// One named circuit input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InputValue {
    Field(Element),
    U32(u32),
    Fields(Vec<Element>),
    U32s(Vec<u32>),
}

pub type CircuitInputs = BTreeMap<String, InputValue>;

/// Opaque witness produced by [`Prover::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness(pub Vec<u8>);

/// A proof and the public inputs exactly as the backend returned them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofData {
    pub proof: Vec<u8>,
    pub public_inputs: Vec<FieldValue>,
}

/// A proving backend for the withdrawal circuit
#[async_trait]
pub trait Prover: Send + Sync {
    /// Solve the circuit for `inputs`. Unsatisfiable inputs are
    /// [`PipelineError::CircuitExecution`]
    async fn execute(&self, inputs: &CircuitInputs) -> Result<Witness, PipelineError>;

    async fn prove(&self, witness: Witness) -> Result<ProofData, PipelineError>;
}

/// Inputs of the withdrawal circuit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawInputs {
    pub nullifier: FieldValue,
    pub merkle_proof_length: u32,
    pub expected_merkle_root: FieldValue,
    pub recipient: FieldValue,
    pub commitment: FieldValue,
    pub value: FieldValue,
    pub pk_b: FieldValue,
    pub random: FieldValue,
    pub merkle_proof_indices: [u32; MERKLE_DEPTH],
    pub merkle_proof_siblings: [FieldValue; MERKLE_DEPTH],
}

impl WithdrawInputs {
    /// `recipient` is the 20-byte address left-padded to a field element
    pub fn from_note(note: &Note, recipient: Element) -> Self {
        Self {
            nullifier: note.nullifier.into(),
            merkle_proof_length: note.merkle_path.length,
            expected_merkle_root: note.root.into(),
            recipient: recipient.into(),
            commitment: note.commitment.into(),
            value: note.value.into(),
            pk_b: note.secret.into(),
            random: note.random.into(),
            merkle_proof_indices: note.merkle_path.indices,
            merkle_proof_siblings: note.merkle_path.siblings.map(FieldValue::from),
        }
    }

    /// Normalize every field into the named input map
    pub fn to_circuit_inputs(&self) -> Result<CircuitInputs, FieldError> {
        if self.merkle_proof_length as usize > MERKLE_DEPTH {
            return Err(FieldError::MalformedField(format!(
                "merkle_proof_length {} exceeds {MERKLE_DEPTH}",
                self.merkle_proof_length
            )));
        }

        let siblings = self
            .merkle_proof_siblings
            .iter()
            .map(FieldValue::normalize)
            .collect::<Result<Vec<_>, _>>()?;

        let inputs = [
            ("nullifier", InputValue::Field(self.nullifier.normalize()?)),
            (
                "merkle_proof_length",
                InputValue::U32(self.merkle_proof_length),
            ),
            (
                "expected_merkle_root",
                InputValue::Field(self.expected_merkle_root.normalize()?),
            ),
            ("recipient", InputValue::Field(self.recipient.normalize()?)),
            ("commitment", InputValue::Field(self.commitment.normalize()?)),
            ("value", InputValue::Field(self.value.normalize()?)),
            ("pk_b", InputValue::Field(self.pk_b.normalize()?)),
            ("random", InputValue::Field(self.random.normalize()?)),
            (
                "merkle_proof_indices",
                InputValue::U32s(self.merkle_proof_indices.to_vec()),
            ),
            ("merkle_proof_siblings", InputValue::Fields(siblings)),
        ];

        Ok(inputs
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::note::MerklePath;

    #[test]
    fn inputs_have_all_ten_fields() {
        let note = Note {
            value: Element::new(500),
            secret: Element::new(0x456),
            random: Element::new(0xdef456),
            nullifier: Element::new(1),
            commitment: Element::new(2),
            entry: Element::new(3),
            root: Element::new(4),
            merkle_path: MerklePath::single_leaf(),
            claimed: false,
            claimed_tx_hash: None,
        };

        let inputs = WithdrawInputs::from_note(&note, Element::new(0xbeef))
            .to_circuit_inputs()
            .unwrap();

        assert_eq!(inputs.len(), 10);
        assert_eq!(inputs["merkle_proof_length"], InputValue::U32(1));
        assert_eq!(inputs["recipient"], InputValue::Field(Element::new(0xbeef)));
        assert_eq!(
            serde_json::to_value(&inputs["value"]).unwrap(),
            json!(Element::new(500).to_hex())
        );
    }

    #[test]
    fn malformed_inputs_fail_before_execution() {
        let mut inputs = WithdrawInputs::from_note(
            &Note {
                value: Element::new(1),
                secret: Element::new(1),
                random: Element::new(1),
                nullifier: Element::new(1),
                commitment: Element::new(1),
                entry: Element::new(1),
                root: Element::new(1),
                merkle_path: MerklePath::single_leaf(),
                claimed: false,
                claimed_tx_hash: None,
            },
            Element::new(1),
        );
        inputs.value = FieldValue::Hex("0xzz".to_owned());

        assert!(matches!(
            inputs.to_circuit_inputs(),
            Err(FieldError::MalformedField(_))
        ));

        inputs.value = FieldValue::Integer(1);
        inputs.merkle_proof_length = 11;
        assert!(inputs.to_circuit_inputs().is_err());
    }
}
