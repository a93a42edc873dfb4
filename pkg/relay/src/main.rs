use std::sync::Arc;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use contracts::{Client, SecretKey, SelectorTable, ShieldedPoolContract};
use relay::{serve, AppState, Config};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn signer(private_key: &str) -> Result<SecretKey> {
    let bytes = hex::decode(private_key.trim_start_matches("0x"))?;
    SecretKey::from_slice(&bytes).map_err(|err| eyre!("invalid relay private key: {err}"))
}

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let config = Config::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    fmt::fmt().with_env_filter(filter).with_target(false).init();

    let client = Client::new(&config.rpc_url, config.minimum_gas_price_gwei)?;
    let mut pool = ShieldedPoolContract::load(
        client,
        &config.pool_contract_addr,
        signer(&config.private_key)?,
    )?
    .with_confirmation_timeout(config.confirmation_timeout());

    if let Some(path) = &config.error_abi_path {
        pool = pool.with_selectors(SelectorTable::load(path));
    }

    info!(
        pool = ?pool.address(),
        relayer = ?pool.signer_address(),
        selectors = pool.selectors().len(),
        "relay configured"
    );

    let selectors = Arc::new(pool.selectors().clone());
    let state = AppState {
        executor: Arc::new(pool),
        selectors,
    };

    serve(state, config.port).await?;
    Ok(())
}
