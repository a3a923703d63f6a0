//! nft-batch
//!
//! Batch mint and transfer of counterfactual NFTs on a layer-2 exchange.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI args + config file + environment
//!        │
//!        ▼
//!   ┌──────────┐   ┌──────────────┐   ┌──────────────────────────────┐
//!   │  config  │──▶│ batch source │──▶│       BatchOrchestrator      │
//!   │ + secrets│   │ + range      │   │  ItemFlow (mint | transfer)  │
//!   └──────────┘   └──────────────┘   │    ├─ ExchangeClient (REST)  │
//!                                     │    ├─ SignatureEngine        │
//!                                     │    └─ RetryPolicy            │
//!                                     │  Confirmer (fee gate)        │
//!                                     └──────────────┬───────────────┘
//!                                                    │
//!                                  ┌─────────────────┴──────────────┐
//!                                  ▼                                ▼
//!                          audit file (JSON)               summary on stdout
//! ```

use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Args, Parser, Subcommand};
use serde::Serialize;

use nft_batch::audit::{BatchHeader, JsonFileSink};
use nft_batch::batch::{
    resolve_source, BatchOrchestrator, BatchReport, BatchSource, ItemFlow, ItemOutcome, MintFlow, Operation,
    RangeFilter, SourceEntry, Subject, TerminalConfirmer, TransferFlow,
};
use nft_batch::config::{load_config, validate_config, BatchConfig, ConfigError, Secrets};
use nft_batch::content::generator::DEFAULT_PORT;
use nft_batch::content::{CidGenerator, NftId};
use nft_batch::exchange::{ExchangeClient, RestExchangeClient};
use nft_batch::lifecycle::{spawn_interrupt_listener, Shutdown};
use nft_batch::observability::{logging, metrics};
use nft_batch::signing::{KeccakFieldHasher, L2KeyPair, SignatureEngine};

#[derive(Parser)]
#[command(name = "nft-batch")]
#[command(about = "Batch mint and transfer NFTs on a layer-2 exchange", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short = 'V', long, global = true)]
    verbose: bool,

    /// Approve fees without prompting
    #[arg(long, global = true)]
    noprompt: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint one NFT per CID
    Mint(MintArgs),
    /// Transfer a held NFT to one or many recipients
    Transfer(TransferArgs),
    /// Print the NFT id of a CIDv0
    NftId {
        #[arg(long)]
        cid: String,
    },
    /// Compute the CIDv0 of a file with the hashing container
    Cid {
        #[arg(long)]
        file: PathBuf,

        /// Local port of the hashing container
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Seconds to wait for the container
        #[arg(long, default_value_t = 60)]
        ready_timeout: u64,
    },
}

#[derive(Args, Serialize)]
#[command(group(ArgGroup::new("source").required(true).args(["cid", "json"])))]
struct MintArgs {
    /// Single CIDv0
    #[arg(short, long)]
    cid: Option<String>,

    /// JSON list of {"ID", "CID"} objects
    #[arg(short, long)]
    json: Option<PathBuf>,

    /// Amount per item
    #[arg(short = 'n', long)]
    amount: Option<u64>,

    /// First id to process
    #[arg(short, long)]
    start: Option<u64>,

    /// Last id to process
    #[arg(short, long)]
    end: Option<u64>,
}

#[derive(Args, Serialize)]
#[command(group(ArgGroup::new("recipients").required(true).args(["to", "tofile"])))]
struct TransferArgs {
    /// NFT id held by the sender
    #[arg(long)]
    nft: String,

    /// Single recipient (address, ENS name or account id)
    #[arg(long)]
    to: Option<String>,

    /// File with one recipient per line
    #[arg(long)]
    tofile: Option<PathBuf>,

    /// Amount per item
    #[arg(short = 'n', long)]
    amount: Option<u64>,

    /// Sign everything but do not submit
    #[arg(long)]
    test: bool,

    /// Memo attached to every transfer
    #[arg(long)]
    memo: Option<String>,

    /// First line to process
    #[arg(short, long)]
    start: Option<u64>,

    /// Last line to process
    #[arg(short, long)]
    end: Option<u64>,
}

/// Shared pieces of a mint or transfer run.
struct RunContext {
    config: BatchConfig,
    secrets: Secrets,
    exchange: Arc<dyn ExchangeClient>,
    engine: SignatureEngine,
    valid_until: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::NftId { cid } => {
            logging::init_logging("warn", cli.verbose);
            println!("{}", NftId::from_cid(&cid)?);
            Ok(())
        }
        Commands::Cid {
            file,
            port,
            ready_timeout,
        } => {
            logging::init_logging("info", cli.verbose);
            let generator = CidGenerator::start(port, Duration::from_secs(ready_timeout)).await?;
            let result = generator.cid_for_file(&file).await;
            generator.shutdown().await?;
            println!("{}", result?);
            Ok(())
        }
        Commands::Mint(args) => {
            let ctx = prepare(config_path, Operation::Mint, cli.verbose)?;
            let amount = args.amount.unwrap_or(ctx.config.batch.default_amount);
            let source = match (&args.cid, &args.json) {
                (Some(cid), _) => BatchSource::Single(Subject::Cid(cid.clone())),
                (None, Some(path)) => BatchSource::JsonList(path.clone()),
                (None, None) => return Err("either --cid or --json is required".into()),
            };
            let entries = resolve_source(
                &source,
                Operation::Mint,
                RangeFilter::new(args.start, args.end)?,
                amount,
            )?;

            let flow = MintFlow::new(
                &ctx.config,
                &ctx.secrets,
                ctx.exchange.clone(),
                ctx.engine.clone(),
                ctx.valid_until,
            )?;
            let header = BatchHeader::new(
                Operation::Mint,
                serde_json::to_value(&args)?,
                serde_json::to_value(&ctx.config)?,
            );
            execute(flow, &ctx.config, cli.noprompt, header, entries).await
        }
        Commands::Transfer(args) => {
            let mut ctx = prepare(config_path, Operation::Transfer, cli.verbose)?;
            if let Some(memo) = &args.memo {
                ctx.config.transfer.memo = memo.clone();
            }
            let amount = args.amount.unwrap_or(ctx.config.batch.default_amount);
            let source = match (&args.to, &args.tofile) {
                (Some(to), _) => BatchSource::Single(Subject::To(to.clone())),
                (None, Some(path)) => BatchSource::RecipientFile(path.clone()),
                (None, None) => return Err("either --to or --tofile is required".into()),
            };
            let entries = resolve_source(
                &source,
                Operation::Transfer,
                RangeFilter::new(args.start, args.end)?,
                amount,
            )?;

            let flow = TransferFlow::new(
                &ctx.config,
                ctx.exchange.clone(),
                ctx.engine.clone(),
                &args.nft,
                args.test,
                ctx.valid_until,
            )?;
            let header = BatchHeader::new(
                Operation::Transfer,
                serde_json::to_value(&args)?,
                serde_json::to_value(&ctx.config)?,
            );
            execute(flow, &ctx.config, cli.noprompt, header, entries).await
        }
    }
}

/// Config, logging, secrets, metrics, exchange client and signer, in order.
fn prepare(config_path: Option<&Path>, operation: Operation, verbose: bool) -> Result<RunContext, Box<dyn Error>> {
    let config = load_config(config_path)?;
    logging::init_logging(&config.observability.log_level, verbose);
    tracing::info!(operation = operation.as_str(), "nft-batch v{} starting", env!("CARGO_PKG_VERSION"));

    validate_config(&config, operation).map_err(ConfigError::Validation)?;
    let secrets = Secrets::from_env(operation == Operation::Mint)?;

    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::warn!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(metrics_address = %address, "Failed to parse metrics address");
            }
        }
    }

    let exchange: Arc<dyn ExchangeClient> = Arc::new(RestExchangeClient::new(&config.exchange)?);
    let signer = L2KeyPair::from_secrets(&secrets)?;
    let engine = SignatureEngine::new(Arc::new(KeccakFieldHasher), Arc::new(signer));
    let valid_until = config.resolve_valid_until();

    tracing::info!(
        base_url = %config.exchange.base_url,
        valid_until,
        attempts = config.retries.attempts,
        timeout_ms = config.retries.timeout_ms,
        "Configuration loaded"
    );

    Ok(RunContext {
        config,
        secrets,
        exchange,
        engine,
        valid_until,
    })
}

async fn execute<F: ItemFlow>(
    flow: F,
    config: &BatchConfig,
    noprompt: bool,
    header: BatchHeader,
    entries: Vec<SourceEntry>,
) -> Result<(), Box<dyn Error>> {
    let operation = flow.operation();
    let sink = JsonFileSink::in_directory(Path::new(&config.audit.directory), operation.audit_file_name())?;

    let shutdown = Arc::new(Shutdown::new());
    let listener = spawn_interrupt_listener(shutdown.clone());

    let orchestrator = BatchOrchestrator::new(flow, Arc::new(TerminalConfirmer), Arc::new(sink), shutdown.subscribe())
        .skip_prompt(noprompt);
    let result = orchestrator.run(header, entries).await;
    listener.abort();

    let report = result?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &BatchReport) {
    for item in &report.items {
        match &item.detail {
            Some(detail) => println!("{:>5}  {:<10} {}  ({})", item.id, item.outcome.as_str(), item.subject, detail),
            None => println!("{:>5}  {:<10} {}", item.id, item.outcome.as_str(), item.subject),
        }
    }
    println!(
        "{}: {} succeeded, {} exist, {} failed, {} skipped, {} simulated",
        report.operation.as_str(),
        report.count(ItemOutcome::Succeeded),
        report.count(ItemOutcome::Exists),
        report.count(ItemOutcome::Failed),
        report.count(ItemOutcome::Skipped),
        report.count(ItemOutcome::Simulated),
    );
}
