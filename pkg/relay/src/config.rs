use std::{path::PathBuf, time::Duration};

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[clap(author, version, about = "Submits signed shielded pool actions")]
pub struct Config {
    #[clap(long, env = "RELAY_PORT", default_value = "8787")]
    pub port: u16,

    /// JSON-RPC endpoint of the chain the pool lives on
    #[clap(long, env = "RPC_URL")]
    pub rpc_url: String,

    /// Hex key the relay signs transactions with
    #[clap(long, env = "RELAY_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    #[clap(long, env = "POOL_CONTRACT_ADDR")]
    pub pool_contract_addr: String,

    /// ABI (or compiled artifact) whose errors are used to decode reverts
    #[clap(long, env = "ERROR_ABI_PATH")]
    pub error_abi_path: Option<PathBuf>,

    #[clap(long, env = "MINIMUM_GAS_PRICE_GWEI")]
    pub minimum_gas_price_gwei: Option<u64>,

    #[clap(long, env = "CONFIRMATION_TIMEOUT_SECS", default_value = "120")]
    pub confirmation_timeout_secs: u64,

    #[clap(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = [
        "relay",
        "--rpc-url",
        "http://localhost:8545",
        "--private-key",
        "0x0707070707070707070707070707070707070707070707070707070707070707",
        "--pool-contract-addr",
        "0x5FbDB2315678afecb367f032d93F642f64180aa3",
    ];

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(REQUIRED).unwrap();

        assert_eq!(config.port, 8787);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(120));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.error_abi_path, None);
        assert_eq!(config.minimum_gas_price_gwei, None);
    }

    #[test]
    fn overrides() {
        let args = REQUIRED
            .into_iter()
            .chain(["--port", "9000", "--error-abi-path", "abi/Errors.json"]);
        let config = Config::try_parse_from(args).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.error_abi_path, Some(PathBuf::from("abi/Errors.json")));
    }
}
