#![deny(clippy::disallowed_methods)]

mod abi_args;
mod client;
mod constants;
mod error;
mod ledger;
mod pool;
pub mod revert;
pub mod selectors;
pub mod util;

pub use abi_args::ContractCall;
pub use client::Client;
pub use constants::{CONFIRMATION_TIMEOUT, POOL_CONTRACT_JSON, RECEIPT_POLL_INTERVAL};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use pool::ShieldedPoolContract;
pub use revert::RevertDebug;
pub use selectors::SelectorTable;

pub use web3::{
    signing::SecretKey,
    types::{Address, H256, U256},
};
