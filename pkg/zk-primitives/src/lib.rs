#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_bool)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![deny(missing_docs)]

//! Field primitives for the shielded pool client
//!
//! Everything that crosses the circuit or contract boundary is an [`Element`] of the BN254 scalar
//! field. This crate owns its canonical hex form, the adapter that accepts the looser shapes a
//! proving backend hands back ([`FieldValue`]), and the 2-to-1 hash seam ([`FieldHasher`]) the
//! note derivations are built on.

mod codec;
mod element;
mod hash;
mod path;
mod poseidon2;

pub use codec::{FieldError, FieldValue};
pub use element::Element;
pub use hash::{hash_merge, FieldHasher, PoseidonHasher};
pub use path::compute_merkle_root;
pub use poseidon2::{permutation as poseidon2_permutation, poseidon2_hash, Poseidon2Hasher};

/// The base element used by cryptographic operations
///
/// This is (roughly) an integer modulo `p` where `p` is [`Element::MODULUS`]
pub type Base = poseidon_circuit::Bn256Fr;
