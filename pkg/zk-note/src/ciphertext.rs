use ethnum::U256;
use sha3::{Digest, Keccak256};
use zk_primitives::Element;

use crate::constants::CIPHERTEXT_DOMAIN;

/// The redemption amount hidden under a keystream bound to the nullifier and recipient
///
/// This is a raw 32-byte word, not a field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ciphertext(pub [u8; 32]);

impl Ciphertext {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

fn keccak(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

pub fn domain_salt() -> [u8; 32] {
    keccak(&[CIPHERTEXT_DOMAIN.as_bytes()])
}

/// `keccak(keccak(nullifier || recipient || salt) || uint256(0))`
///
/// `recipient` is the address left-padded to 32 bytes, as it appears in the public inputs.
pub fn keystream(nullifier: Element, recipient: Element) -> [u8; 32] {
    let key = keccak(&[
        &nullifier.to_be_bytes(),
        &recipient.to_be_bytes(),
        &domain_salt(),
    ]);

    keccak(&[&key, &[0u8; 32]])
}

fn xor(word: [u8; 32], stream: [u8; 32]) -> [u8; 32] {
    std::array::from_fn(|i| word[i] ^ stream[i])
}

pub fn encrypt(value: Element, nullifier: Element, recipient: Element) -> Ciphertext {
    Ciphertext(xor(value.to_be_bytes(), keystream(nullifier, recipient)))
}

/// The inverse of [`encrypt`]. A wrong key yields an arbitrary 256-bit value
pub fn decrypt(ciphertext: &Ciphertext, nullifier: Element, recipient: Element) -> U256 {
    U256::from_be_bytes(xor(ciphertext.0, keystream(nullifier, recipient)))
}

#[cfg(test)]
mod tests {
    use test_strategy::proptest;

    use super::*;

    #[proptest]
    fn decrypt_inverts_encrypt(value: u128, nullifier: Element, recipient: [u8; 20]) {
        let mut padded = [0u8; 32];
        padded[12..].copy_from_slice(&recipient);
        let recipient = Element::from_be_bytes(padded);

        let ciphertext = encrypt(Element::from(value), nullifier, recipient);
        assert_eq!(decrypt(&ciphertext, nullifier, recipient), U256::from(value));
    }

    #[test]
    fn salt_is_keccak_of_domain() {
        assert_eq!(
            domain_salt().to_vec(),
            Keccak256::digest(b"ShieldedPool.v2b").to_vec()
        );
    }

    #[test]
    fn key_binds_recipient() {
        let value = Element::new(500);
        let nullifier = Element::new(1);

        let a = encrypt(value, nullifier, Element::new(2));
        let b = encrypt(value, nullifier, Element::new(3));

        assert_ne!(a, b);
        assert_ne!(decrypt(&a, nullifier, Element::new(3)), U256::new(500));
    }

    #[test]
    fn matches_manual_keystream() {
        let nullifier = Element::new(0xaa);
        let recipient = Element::new(0xbb);

        let mut key_input = Vec::new();
        key_input.extend(nullifier.to_be_bytes());
        key_input.extend(recipient.to_be_bytes());
        key_input.extend(Keccak256::digest(b"ShieldedPool.v2b"));
        let key = Keccak256::digest(&key_input);

        let mut stream_input = key.to_vec();
        stream_input.extend([0u8; 32]);
        let stream = U256::from_be_bytes(Keccak256::digest(&stream_input).into());

        let ciphertext = encrypt(Element::new(500), nullifier, recipient);
        assert_eq!(
            U256::from_be_bytes(ciphertext.0),
            U256::new(500) ^ stream
        );
    }
}
