//! XClaim wallet command line
//!
//! Usage:
//! ```bash
//! xclaim mnid-encode <address> [chain-id-hex]
//! xclaim mnid-decode <mnid>
//! xclaim snapshot [network-id]
//! xclaim accounts
//! ```
//!
//! Configuration comes from the environment (and `.env`), see `WalletConfig::from_env`.
use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use xclaim_wallet::account::AccountStore;
use xclaim_wallet::{mnid, Address, EventHub, FileStore, JsonRpcClient, NetworkClient, NetworkId, WalletConfig};

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  xclaim mnid-encode <address> [chain-id-hex]");
    eprintln!("  xclaim mnid-decode <mnid>");
    eprintln!("  xclaim snapshot [network-id]");
    eprintln!("  xclaim accounts");
    std::process::exit(1);
}

fn open_store(config: &WalletConfig) -> anyhow::Result<AccountStore> {
    let store = FileStore::open(&config.store_dir, &config.wallet_key)
        .with_context(|| format!("opening store in {}", config.store_dir.display()))?;
    let accounts = AccountStore::new(Arc::new(store), EventHub::new());
    accounts.load();
    Ok(accounts)
}

async fn snapshot(config: &WalletConfig, network: NetworkId) -> anyhow::Result<()> {
    let client = JsonRpcClient::new(config.rpc_endpoints());
    let store = open_store(config)?;

    let block = client.get_block_number(network).await?;
    let gas_price = client.get_gas_price(network).await?;
    store.set_block_number(network, block)?;
    store.set_gas_price(network, gas_price)?;
    store.set_sync_date(Utc::now())?;

    let snapshot = store.network_snapshot(network);
    println!("\n📊 Network {}", network);
    println!("{}", "=".repeat(70));
    println!("  Block number: {}", snapshot.block_number);
    println!("  Gas price:    {} wei", snapshot.gas_price);
    println!("  Quote price:  {}", snapshot.quote_price);
    if let Some(date) = snapshot.sync_date {
        println!("  Synced at:    {}", date.to_rfc3339());
    }
    Ok(())
}

fn list_accounts(config: &WalletConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let addresses = store.addresses();
    if addresses.is_empty() {
        println!("No accounts in {}", config.store_dir.display());
        return Ok(());
    }

    let active = store.stored_active_account();
    for address in addresses {
        let marker = if Some(address) == active { "*" } else { " " };
        println!(
            "{} {} {:<16} balance {} nonce {}",
            marker,
            address,
            store.nickname(&address),
            store.balance(&address),
            store.nonce(&address)
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or_else(|| usage());

    match command {
        "mnid-encode" => {
            let address: Address = match args.get(2) {
                Some(raw) => raw.parse()?,
                None => usage(),
            };
            let chain = args.get(3).map(String::as_str).unwrap_or("0x00");
            println!("{}", mnid::encode_hex(&address, chain)?);
        }
        "mnid-decode" => {
            let id = args.get(2).unwrap_or_else(|| usage());
            let parts = mnid::decode(id)?;
            println!("chain:   {}", parts.chain_id_hex());
            println!("address: {}", parts.address);
        }
        "snapshot" => {
            let config = WalletConfig::from_env();
            let network = match args.get(2) {
                Some(raw) => raw.parse()?,
                None => config.default_network,
            };
            snapshot(&config, network).await?;
        }
        "accounts" => {
            let config = WalletConfig::from_env();
            list_accounts(&config)?;
        }
        other => bail!("unknown command: {}", other),
    }

    Ok(())
}
