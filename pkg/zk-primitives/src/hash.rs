use poseidon_circuit::poseidon::primitives::{ConstantLength, Hash, P128Pow5T3};

use crate::{Base, Element};

/// A 2-to-1 compression function over the BN254 scalar field
///
/// Every note derivation (nullifier, commitment, entry, Merkle path) goes through this trait. The
/// deployed circuit hashes with [`Poseidon2Hasher`](crate::Poseidon2Hasher); [`PoseidonHasher`]
/// is kept for fixtures produced with the older Poseidon permutation.
pub trait FieldHasher: Send + Sync {
    /// Hash `left` and `right` together; the operation is not symmetric
    fn hash2(&self, left: Element, right: Element) -> Element;
}

impl<H: FieldHasher + ?Sized> FieldHasher for &H {
    fn hash2(&self, left: Element, right: Element) -> Element {
        (**self).hash2(left, right)
    }
}

impl<H: FieldHasher + ?Sized> FieldHasher for std::sync::Arc<H> {
    fn hash2(&self, left: Element, right: Element) -> Element {
        (**self).hash2(left, right)
    }
}

/// Original Poseidon (`P128Pow5T3`) over BN254
///
/// Not interchangeable with [`Poseidon2Hasher`](crate::Poseidon2Hasher): notes derived with one
/// never match commitments derived with the other.
///
/// ```rust
/// # use zk_primitives::*;
/// let hasher = PoseidonHasher;
/// let a = Element::new(1);
/// let b = Element::new(2);
///
/// assert_eq!(hasher.hash2(a, b), hash_merge([a, b]));
/// assert_ne!(hasher.hash2(a, b), hasher.hash2(b, a));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseidonHasher;

impl FieldHasher for PoseidonHasher {
    #[inline]
    fn hash2(&self, left: Element, right: Element) -> Element {
        hash_merge([left, right])
    }
}

/// Hash `N` elements together with Poseidon
///
/// ```rust
/// # use zk_primitives::*;
/// let a = hash_merge([Element::new(1), Element::new(2)]);
/// let b = hash_merge([Element::new(1), Element::new(3)]);
/// let c = hash_merge([Element::new(2), Element::new(3)]);
///
/// assert_ne!(a, b);
/// assert_ne!(a, c);
/// assert_ne!(b, c);
/// ```
#[inline]
#[must_use]
pub fn hash_merge<const N: usize>(elements: [Element; N]) -> Element {
    type H<const N: usize> = Hash<Base, P128Pow5T3<Base>, ConstantLength<N>, 3, 2>;

    let hash = H::<N>::init().hash(elements.map(Element::to_base));
    Element::from_base(hash)
}
