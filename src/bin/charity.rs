//! Command-line client for the charity ledger.
//!
//! Talks to a JSON-RPC node whose unlocked account acts as the wallet (a dev
//! node, or a node fronting a signer). Settings come from `charity.toml`,
//! `CHARITY_*` variables and `.env`.

use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::Context;
use charity_ledger::{
    CharityClient, ClientConfig, Error, HttpWalletProvider, Notice, TransactionReceipt, ViewState,
};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "charity", version, about = "Transparent charity ledger client")]
struct Cli {
    /// Configuration file to use instead of the search path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint, overriding the configuration
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Print the view as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show balance, owner, donations and spending requests
    Status,
    /// Donate an amount in the native unit (e.g. 0.1)
    Donate { amount: String },
    /// Manage spending requests (owner only)
    #[command(subcommand)]
    Request(RequestCommand),
    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum RequestCommand {
    /// Propose a withdrawal
    Create {
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        recipient: String,
        /// Content identifier of the receipt
        #[arg(long)]
        receipt: Option<String>,
    },
    /// Pay out a pending request
    Execute { id: u64 },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default configuration
    Init {
        /// Target file; defaults to the user configuration directory
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // Load optional .env file (ignored if missing).
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        if let Some(error) = e.downcast_ref::<Error>() {
            if error.is_retryable() {
                eprintln!("This may succeed if you retry once the cause is fixed.");
            }
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Config(ConfigCommand::Init { path, force }) = &cli.command {
        return init_config(path.clone(), *force);
    }

    let mut config = match &cli.config {
        Some(path) => ClientConfig::load_from_file(path)?,
        None => ClientConfig::load()?,
    };
    if let Some(rpc_url) = &cli.rpc_url {
        config.network.rpc_url = rpc_url.clone();
        config.validate()?;
    }
    init_logging(&config);
    debug!("Loaded configuration from {:?}", config.loaded_files);

    let provider = HttpWalletProvider::new(&config.network.rpc_url)?;
    info!("Using RPC endpoint {}", provider.rpc_url());

    let mut client = CharityClient::builder()
        .with_config(config)
        .with_provider(Arc::new(provider))
        .build()?;
    client.connect().await?;

    match cli.command {
        Command::Status | Command::Config(_) => {}
        Command::Donate { amount } => {
            let receipt = client.donate(&amount).await?;
            report_receipt(&receipt);
        }
        Command::Request(RequestCommand::Create {
            description,
            amount,
            recipient,
            receipt,
        }) => {
            let receipt = client
                .create_spending_request(&description, &amount, &recipient, receipt.as_deref())
                .await?;
            report_receipt(&receipt);
        }
        Command::Request(RequestCommand::Execute { id }) => {
            let receipt = client.execute_spending_request(id).await?;
            report_receipt(&receipt);
        }
    }

    let view = client.view();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&client, &view);
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(ClientConfig::default_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    ClientConfig::default()
        .save_to_file(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn init_logging(config: &ClientConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format.as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
}

fn report_receipt(receipt: &TransactionReceipt) {
    println!(
        "Transaction {} confirmed in block {}",
        receipt.transaction_hash,
        receipt.block()
    );
}

fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

fn print_view(client: &CharityClient, view: &ViewState) {
    if let Some(notice) = &view.last_notice {
        match notice {
            Notice::Success(message) => println!("{}\n", message),
            Notice::Failure(message) => println!("Failed: {}\n", message),
        }
    }

    match view.account {
        Some(account) if view.is_owner() => println!("Account:  {} (owner)", short_address(&account)),
        Some(account) => println!("Account:  {}", short_address(&account)),
        None => println!("Account:  not connected"),
    }
    if let Some(network_id) = view.network_id {
        let status = if view.network_valid { "ok" } else { "wrong network" };
        println!("Network:  {} ({})", network_id, status);
    }
    println!("Contract: {}", client.contract_address());
    if let Some(owner) = view.owner() {
        println!("Owner:    {}", owner);
    }
    println!("Balance:  {} ETH", view.balance());

    println!("\nDonations ({})", view.donations().len());
    for donation in view.donations() {
        println!(
            "  {}  {:>12} ETH  {}",
            short_address(&donation.donor),
            donation.amount,
            donation.timestamp
        );
    }

    println!("\nSpending requests ({})", view.requests().len());
    for request in view.requests() {
        let status = if request.is_complete { "executed" } else { "pending" };
        println!(
            "  #{} [{}] {}  {} ETH -> {}",
            request.id,
            status,
            request.description,
            request.amount,
            short_address(&request.recipient)
        );
        if let Some(url) = client.receipt_url(request) {
            println!("      receipt: {}", url);
        }
    }

    let actions = view.available_actions();
    if !actions.is_empty() {
        let names: Vec<String> = actions.iter().map(|action| format!("{:?}", action)).collect();
        println!("\nAvailable: {}", names.join(", "));
    }
}
