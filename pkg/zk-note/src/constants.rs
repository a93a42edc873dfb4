/// Capacity of a note's Merkle path
pub const MERKLE_DEPTH: usize = 10;

/// Number of public inputs the pool verifier expects
pub const PUBLIC_INPUTS: usize = 5;

/// Domain tag hashed into every amount ciphertext key
pub const CIPHERTEXT_DOMAIN: &str = "ShieldedPool.v2b";

/// Claimed marker for a note whose nullifier was found spent without a known transaction
pub const UNKNOWN_CLAIM_TX: &str = "unknown";
