//! Poseidon2 over BN254 with a width-4 state, matching barretenberg and Noir's
//! `std::hash::poseidon2`.

mod constants;

use ff::Field;
use once_cell::sync::Lazy;

use crate::{Base, Element, FieldHasher};

const WIDTH: usize = 4;
const RATE: usize = 3;
const FULL_ROUNDS: usize = 8;
const PARTIAL_ROUNDS: usize = 56;

struct Params {
    round_constants: [[Base; WIDTH]; FULL_ROUNDS + PARTIAL_ROUNDS],
    internal_diagonal: [Base; WIDTH],
}

static PARAMS: Lazy<Params> = Lazy::new(|| Params {
    round_constants: constants::ROUND_CONSTANTS.map(|row| row.map(Base::from_raw)),
    internal_diagonal: constants::INTERNAL_DIAGONAL.map(Base::from_raw),
});

/// The hash the note derivations use by default
///
/// ```rust
/// # use zk_primitives::*;
/// let a = Element::new(1);
/// let b = Element::new(2);
///
/// assert_eq!(Poseidon2Hasher.hash2(a, b), poseidon2_hash(&[a, b]));
/// assert_ne!(Poseidon2Hasher.hash2(a, b), Poseidon2Hasher.hash2(b, a));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Poseidon2Hasher;

impl FieldHasher for Poseidon2Hasher {
    #[inline]
    fn hash2(&self, left: Element, right: Element) -> Element {
        poseidon2_hash(&[left, right])
    }
}

/// Fixed-length Poseidon2 sponge: rate 3, capacity 1, the capacity seeded with `len << 64`
#[must_use]
pub fn poseidon2_hash(inputs: &[Element]) -> Element {
    let two_pow_64 = Base::from_raw([0, 1, 0, 0]);

    let mut state = [Base::zero(); WIDTH];
    state[RATE] = Base::from(inputs.len() as u64) * two_pow_64;

    if inputs.is_empty() {
        state = permutation(state);
    }

    for chunk in inputs.chunks(RATE) {
        for (cell, input) in state.iter_mut().zip(chunk) {
            *cell += input.to_base();
        }
        state = permutation(state);
    }

    Element::from_base(state[0])
}

/// The Poseidon2 permutation
#[must_use]
pub fn permutation(mut state: [Base; WIDTH]) -> [Base; WIDTH] {
    let params = &*PARAMS;

    external_layer(&mut state);

    for (round, constants) in params.round_constants.iter().enumerate() {
        if is_partial(round) {
            state[0] = sbox(state[0] + constants[0]);
            internal_layer(&mut state, &params.internal_diagonal);
        } else {
            for (cell, constant) in state.iter_mut().zip(constants) {
                *cell = sbox(*cell + *constant);
            }
            external_layer(&mut state);
        }
    }

    state
}

fn is_partial(round: usize) -> bool {
    (FULL_ROUNDS / 2..FULL_ROUNDS / 2 + PARTIAL_ROUNDS).contains(&round)
}

#[inline]
fn sbox(x: Base) -> Base {
    x.square().square() * x
}

/// Multiply by the circulant-like matrix `[[5,7,1,3],[4,6,1,1],[1,3,5,7],[1,1,4,6]]`
fn external_layer(state: &mut [Base; WIDTH]) {
    let t0 = state[0] + state[1];
    let t1 = state[2] + state[3];
    let t2 = state[1].double() + t1;
    let t3 = state[3].double() + t0;
    let t4 = t1.double().double() + t3;
    let t5 = t0.double().double() + t2;
    let t6 = t3 + t5;
    let t7 = t2 + t4;

    *state = [t6, t5, t7, t4];
}

/// Multiply by `diag(d) + 1`
fn internal_layer(state: &mut [Base; WIDTH], diagonal: &[Base; WIDTH]) {
    let sum = state.iter().fold(Base::zero(), |acc, cell| acc + *cell);

    for (cell, d) in state.iter_mut().zip(diagonal) {
        *cell = *cell * *d + sum;
    }
}
