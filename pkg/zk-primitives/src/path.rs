use crate::{Element, FieldHasher};

/// Compute the root hash of a Merkle tree from a leaf and its path
///
/// `siblings` yields `(sibling, bit)` tuples in deepest-first order. A `false` bit means the
/// running hash is the left child (`hash2(current, sibling)`), `true` means it is the right child
/// (`hash2(sibling, current)`). Only the levels that are actually yielded are hashed, so callers
/// holding a fixed-capacity, zero-padded path must truncate it to its real length first.
///
/// ```rust
/// # use zk_primitives::*;
/// let h = Poseidon2Hasher;
/// let a = h.hash2(Element::new(0), Element::new(1));
/// let b = h.hash2(Element::new(2), Element::new(3));
/// let c = h.hash2(a, b);
///
/// let siblings = [(Element::new(3), false), (a, true)];
///
/// assert_eq!(compute_merkle_root(&h, Element::new(2), siblings), c);
///
/// // a single-leaf tree with an empty right sibling
/// let leaf = Element::new(9);
/// assert_eq!(
///     compute_merkle_root(&h, leaf, [(Element::ZERO, false)]),
///     h.hash2(leaf, Element::ZERO),
/// );
/// ```
pub fn compute_merkle_root<H, I>(hasher: &H, mut leaf: Element, siblings: I) -> Element
where
    H: FieldHasher + ?Sized,
    I: IntoIterator<Item = (Element, bool)>,
{
    for (sibling, bit) in siblings {
        leaf = match bit {
            false => hasher.hash2(leaf, sibling),
            true => hasher.hash2(sibling, leaf),
        };
    }

    leaf
}
