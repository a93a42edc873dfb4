//! Client side of the shielded pool: notes, their derivations, the withdrawal proof pipeline
//! and the flows that tie them to the pool contract.

pub mod ciphertext;
mod client;
mod commitment;
pub mod constants;
mod error;
mod guard;
mod note;
mod pipeline;
mod prover;
mod store;
mod submit;

#[cfg(any(test, feature = "test-api"))]
pub mod test_api;

pub use ciphertext::Ciphertext;
pub use client::{Deposit, ShieldedClient, WithdrawOutcome};
pub use commitment::{CommitmentScheme, Derived};
pub use error::{Error, PipelineError, Result};
pub use guard::NullifierGuard;
pub use note::{MerklePath, Note, NoteRecord};
pub use pipeline::{reconcile_public_inputs, PipelineState, ProofArtifact, ProofPipeline};
pub use prover::{CircuitInputs, InputValue, ProofData, Prover, Witness, WithdrawInputs};
pub use store::{create_note, CreatedNote, FileNoteStore, MemoryNoteStore, NoteStore, StorageError};
pub use submit::Submitter;
