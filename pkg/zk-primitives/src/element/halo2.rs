use ethnum::{uint, U256};
use ff::PrimeField;

use crate::{Base, Element};

impl Element {
    /// The BN254 scalar field modulus
    ///
    /// `21888242871839275222246405745257275088548364400416034343698204186575808495617`
    pub const MODULUS: Element = Element(uint!(
        "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001"
    ));

    /// Convert this [`Element`] to its equivalent [`Base`] representation
    #[inline]
    #[must_use]
    pub fn to_base(self) -> Base {
        let u8s = self.0.to_le_bytes();
        Base::from_raw(u8s_to_u64(u8s))
    }

    /// Create an [`Element`] from a [`Base`]
    #[inline]
    #[must_use]
    pub fn from_base(base: Base) -> Element {
        let u8s = base.to_repr();
        Self(U256::from_le_bytes(u8s))
    }

    /// Reduce this element modulo [`Element::MODULUS`]
    ///
    /// Elements in canonical form are unchanged when converting to/from a [`Base`]
    #[inline]
    pub fn canonicalize(&mut self) {
        self.0 %= Self::MODULUS.0;
    }

    /// Whether this [`Element`] is strictly less than [`Element::MODULUS`]
    #[inline]
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.0 < Self::MODULUS.0
    }
}

impl From<Base> for Element {
    fn from(value: Base) -> Self {
        Element::from_base(value)
    }
}

impl From<Element> for Base {
    fn from(value: Element) -> Self {
        value.to_base()
    }
}

fn u8s_to_u64(u8s: [u8; 32]) -> [u64; 4] {
    core::array::from_fn(|i| {
        let mut word = [0; 8];
        word.copy_from_slice(&u8s[i * 8..(i + 1) * 8]);
        u64::from_le_bytes(word)
    })
}
