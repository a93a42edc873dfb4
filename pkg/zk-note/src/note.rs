use serde::{Deserialize, Serialize};
use serde_json::Value;
use zk_primitives::{compute_merkle_root, Element, FieldError, FieldHasher, FieldValue};

use crate::{constants::MERKLE_DEPTH, Error, Result};

/// A fixed-capacity Merkle path, zero padded beyond `length`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerklePath {
    pub length: u32,
    pub indices: [u32; MERKLE_DEPTH],
    pub siblings: [Element; MERKLE_DEPTH],
}

impl MerklePath {
    /// The path of the only leaf in a tree: one level, empty right sibling
    pub fn single_leaf() -> Self {
        Self {
            length: 1,
            indices: [0; MERKLE_DEPTH],
            siblings: [Element::ZERO; MERKLE_DEPTH],
        }
    }

    /// The `(sibling, is_right)` levels actually in use
    pub fn levels(&self) -> impl Iterator<Item = (Element, bool)> + '_ {
        self.siblings
            .iter()
            .zip(self.indices)
            .take(self.length as usize)
            .map(|(sibling, index)| (*sibling, index & 1 == 1))
    }

    pub fn root<H: FieldHasher + ?Sized>(&self, hasher: &H, leaf: Element) -> Element {
        compute_merkle_root(hasher, leaf, self.levels())
    }
}

/// A bearer note: the secrets needed to redeem a deposit, plus everything derived from them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NoteRecord", into = "NoteRecord")]
pub struct Note {
    pub value: Element,
    /// `pk_b`, either a wallet address cast to a field element or an independent secret
    pub secret: Element,
    pub random: Element,
    pub nullifier: Element,
    pub commitment: Element,
    pub entry: Element,
    pub root: Element,
    pub merkle_path: MerklePath,
    pub claimed: bool,
    pub claimed_tx_hash: Option<String>,
}

impl Note {
    /// Parse a note pasted by a user, e.g. one exported from another device
    pub fn parse_json(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| Error::InvalidNote(err.to_string()))?;

        for field in ["nullifier", "commitment", "expected_merkle_root"] {
            let present = match value.get(field) {
                Some(Value::String(s)) => !s.is_empty(),
                Some(Value::Null) | None => false,
                Some(_) => true,
            };

            if !present {
                return Err(Error::InvalidNote(format!("missing `{field}`")));
            }
        }

        serde_json::from_value(value).map_err(|err| Error::InvalidNote(err.to_string()))
    }

    /// Record a confirmed redemption. Returns `false` (and changes nothing) if the note was
    /// already claimed
    pub fn mark_claimed(&mut self, tx_hash: impl Into<String>) -> bool {
        if self.claimed {
            return false;
        }

        self.claimed = true;
        self.claimed_tx_hash = Some(tx_hash.into());
        true
    }
}

/// The persisted form of a [`Note`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub pk_b: String,
    pub random: String,
    pub nullifier: String,
    pub commitment: String,
    pub value: String,
    pub entry: String,
    pub expected_merkle_root: String,
    pub merkle_proof_length: u32,
    pub merkle_proof_indices: Vec<u32>,
    pub merkle_proof_siblings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed: Option<bool>,
    #[serde(
        rename = "claimedTxHash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub claimed_tx_hash: Option<String>,
}

fn decimal(element: Element) -> String {
    element.to_u256().to_string()
}

/// Stored notes and prover outputs use loose shapes (`0x0`, decimal addresses)
fn field(name: &str, s: &str) -> Result<Element, FieldError> {
    FieldValue::from_text(s)
        .normalize()
        .map_err(|err| FieldError::MalformedField(format!("{name}: {err}")))
}

impl From<Note> for NoteRecord {
    fn from(note: Note) -> Self {
        Self {
            pk_b: decimal(note.secret),
            random: decimal(note.random),
            nullifier: note.nullifier.to_hex(),
            commitment: note.commitment.to_hex(),
            value: decimal(note.value),
            entry: note.entry.to_hex(),
            expected_merkle_root: note.root.to_hex(),
            merkle_proof_length: note.merkle_path.length,
            merkle_proof_indices: note.merkle_path.indices.to_vec(),
            merkle_proof_siblings: note
                .merkle_path
                .siblings
                .iter()
                .map(|s| s.to_hex())
                .collect(),
            claimed: note.claimed.then_some(true),
            claimed_tx_hash: note.claimed_tx_hash,
        }
    }
}

impl TryFrom<NoteRecord> for Note {
    type Error = FieldError;

    fn try_from(record: NoteRecord) -> Result<Self, Self::Error> {
        if record.merkle_proof_length as usize > MERKLE_DEPTH {
            return Err(FieldError::MalformedField(format!(
                "merkle_proof_length {} exceeds {MERKLE_DEPTH}",
                record.merkle_proof_length
            )));
        }

        let indices: [u32; MERKLE_DEPTH] =
            record.merkle_proof_indices.try_into().map_err(|v: Vec<u32>| {
                FieldError::MalformedField(format!(
                    "expected {MERKLE_DEPTH} merkle_proof_indices, got {}",
                    v.len()
                ))
            })?;

        if record.merkle_proof_siblings.len() != MERKLE_DEPTH {
            return Err(FieldError::MalformedField(format!(
                "expected {MERKLE_DEPTH} merkle_proof_siblings, got {}",
                record.merkle_proof_siblings.len()
            )));
        }

        let mut siblings = [Element::ZERO; MERKLE_DEPTH];
        for (slot, s) in siblings.iter_mut().zip(&record.merkle_proof_siblings) {
            *slot = field("merkle_proof_siblings", s)?;
        }

        Ok(Note {
            value: field("value", &record.value)?,
            secret: field("pk_b", &record.pk_b)?,
            random: field("random", &record.random)?,
            nullifier: field("nullifier", &record.nullifier)?,
            commitment: field("commitment", &record.commitment)?,
            entry: field("entry", &record.entry)?,
            root: field("expected_merkle_root", &record.expected_merkle_root)?,
            merkle_path: MerklePath {
                length: record.merkle_proof_length,
                indices,
                siblings,
            },
            claimed: record.claimed.unwrap_or(false),
            claimed_tx_hash: record.claimed_tx_hash,
        })
    }
}
