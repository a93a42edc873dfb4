use std::time::Duration;

/// Upper bound on how long a submitted transaction may stay unconfirmed
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// How often the receipt is polled while waiting for confirmation
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Artifact (with an `abi` key) of the shielded pool contract
pub const POOL_CONTRACT_JSON: &str = include_str!("../abi/ShieldedPool.json");

/// Outer revert selectors whose single `bytes` argument wraps the real revert reason
pub const WRAPPED_REASON_SELECTORS: [&str; 2] = ["0xbc92d5bc", "0xe2bbc03d"];

/// Number of hex candidates echoed back for debugging
pub(crate) const MAX_REPORTED_CANDIDATES: usize = 5;
