use ethnum::U256;
use rand::{CryptoRng, RngCore};

use crate::Element;

impl Element {
    /// Draw a uniformly random 256-bit value from `rng` and reduce it modulo
    /// [`Element::MODULUS`]
    ///
    /// Note salts drawn from a predictable source let two notes share a nullifier, hence the
    /// `CryptoRng` bound.
    #[must_use]
    pub fn secure_random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0; 32];
        rng.fill_bytes(&mut bytes);

        Self(U256::from_be_bytes(bytes) % Self::MODULUS.0)
    }
}

#[cfg(test)]
mod tests {
    use rand_chacha::{rand_core::SeedableRng, ChaChaRng};

    use super::*;

    #[test]
    fn random_elements_are_canonical_and_distinct() {
        let mut rng = ChaChaRng::from_seed([7; 32]);

        let elements: Vec<_> = (0..64).map(|_| Element::secure_random(&mut rng)).collect();

        assert!(elements.iter().all(Element::is_canonical));

        let mut deduped = elements.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), elements.len());
    }
}
