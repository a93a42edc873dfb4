use zk_primitives::{Element, FieldHasher, Poseidon2Hasher};

use crate::note::MerklePath;

/// Everything derived from a note's secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derived {
    pub nullifier: Element,
    pub commitment: Element,
    pub entry: Element,
    pub root: Element,
}

/// The note derivations, over an injected 2-to-1 hash
///
/// ```rust
/// # use zk_note::*;
/// # use zk_primitives::*;
/// let scheme = CommitmentScheme::new(Poseidon2Hasher);
/// let d = scheme.derive(Element::new(500), Element::new(0x456), Element::new(0xdef456));
///
/// assert_eq!(d.nullifier, Poseidon2Hasher.hash2(Element::new(0xdef456), Element::new(0x456)));
/// assert_eq!(d.root, Poseidon2Hasher.hash2(d.entry, Element::ZERO));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommitmentScheme<H = Poseidon2Hasher> {
    hasher: H,
}

impl<H: FieldHasher> CommitmentScheme<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// `H(random, secret)`
    pub fn nullifier(&self, random: Element, secret: Element) -> Element {
        self.hasher.hash2(random, secret)
    }

    /// `H(value, nullifier)`
    pub fn commitment(&self, value: Element, nullifier: Element) -> Element {
        self.hasher.hash2(value, nullifier)
    }

    /// `H(H(value, secret), H(random, nullifier))`
    pub fn entry(
        &self,
        value: Element,
        secret: Element,
        random: Element,
        nullifier: Element,
    ) -> Element {
        let left = self.hasher.hash2(value, secret);
        let right = self.hasher.hash2(random, nullifier);
        self.hasher.hash2(left, right)
    }

    /// Root of the tree containing `entry` at `path`
    pub fn root(&self, entry: Element, path: &MerklePath) -> Element {
        path.root(&self.hasher, entry)
    }

    /// Derive a fresh single-leaf note's values
    pub fn derive(&self, value: Element, secret: Element, random: Element) -> Derived {
        let nullifier = self.nullifier(random, secret);
        let commitment = self.commitment(value, nullifier);
        let entry = self.entry(value, secret, random, nullifier);
        let root = self.root(entry, &MerklePath::single_leaf());

        Derived {
            nullifier,
            commitment,
            entry,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_strategy::proptest;
    use zk_primitives::Poseidon2Hasher;

    use super::*;

    #[proptest]
    fn derivations_are_deterministic(value: u64, secret: u64, random: u64) {
        let scheme = CommitmentScheme::new(Poseidon2Hasher);
        let (value, secret, random) = (Element::new(value), Element::new(secret), Element::new(random));

        let a = scheme.derive(value, secret, random);
        let b = scheme.derive(value, secret, random);

        assert_eq!(a, b);
        assert_eq!(a.commitment, scheme.commitment(value, scheme.nullifier(random, secret)));
    }

    #[test]
    fn salt_separates_identical_notes() {
        let scheme = CommitmentScheme::new(Poseidon2Hasher);
        let value = Element::new(500);
        let secret = Element::new(0x456);

        let a = scheme.derive(value, secret, Element::new(1));
        let b = scheme.derive(value, secret, Element::new(2));

        assert_ne!(a.nullifier, b.nullifier);
        assert_ne!(a.commitment, b.commitment);
        assert_ne!(a.entry, b.entry);
    }

    #[test]
    fn argument_order_matters() {
        let scheme = CommitmentScheme::new(Poseidon2Hasher);

        assert_ne!(
            scheme.nullifier(Element::new(1), Element::new(2)),
            scheme.nullifier(Element::new(2), Element::new(1))
        );
    }
}
