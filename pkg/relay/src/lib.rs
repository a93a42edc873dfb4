//! HTTP relay that submits signed actions to the pool contract on behalf of clients, and
//! the client used to reach it.

mod client;
pub mod config;
mod error;
mod executor;
pub mod server;

pub use client::{withdraw_action, RelayClient};
pub use config::Config;
pub use error::{Error, Result};
pub use executor::ActionExecutor;
pub use server::{serve, AppState};
