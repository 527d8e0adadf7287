// Helix node CLI: run a gossiping node or inspect its on-disk state.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use helix_core::blockchain::{load_chain, replay_chain, validate_chain};
use helix_core::crypto::{generate_signing_key, signing_key_from_seed};
use helix_core::event::EventStore;
use helix_core::ledger::{read_entries, replay_supply, verify_journal_file};
use helix_core::network::{GossipNode, TcpTransport};
use helix_core::{HelixConfig, HelixError, HelixNode};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "helix-node", author, version, about = "Helix proof-of-compression node", long_about = None)]
struct Cli {
    /// JSON config file; missing fields take defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the node and gossip until interrupted
    Start {
        /// Address to accept gossip peers on
        #[arg(long)]
        listen: Option<String>,
        /// Peer addresses to dial (repeatable)
        #[arg(long = "peer")]
        peers: Vec<String>,
        /// Statements to originate once running (repeatable)
        #[arg(long = "statement")]
        statements: Vec<String>,
        /// Hex ed25519 seed used to sign originated statements
        #[arg(long)]
        signing_seed: Option<String>,
    },
    /// Write the effective configuration to a file
    InitConfig {
        #[arg(default_value = "helix.json")]
        output: PathBuf,
    },
    /// Replay the journal and check it against a declared supply
    VerifyLedger {
        #[arg(long)]
        supply: Option<f64>,
    },
    /// Validate the block chain and regenerate every finalized statement
    ReplayChain,
}

fn load_config(cli: &Cli) -> Result<HelixConfig> {
    let mut config = match &cli.config {
        Some(path) => HelixConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => HelixConfig::default(),
    };
    config.apply_env()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Start {
            listen,
            peers,
            statements,
            signing_seed,
        } => {
            if listen.is_some() {
                config.listen_addr = listen;
            }
            config.peers.extend(peers);
            let validation = config.validate();
            validation.print_summary();
            validation.into_result()?;

            let key = match signing_seed {
                Some(seed) => {
                    let bytes = hex::decode(seed.trim()).context("signing seed is not hex")?;
                    Some(signing_key_from_seed(&bytes).context("signing seed must be 32 bytes")?)
                }
                None if !statements.is_empty() => Some(generate_signing_key()),
                None => None,
            };
            run_node(config, statements, key).await
        }
        Commands::InitConfig { output } => {
            config.save(&output)?;
            info!("wrote config to {}", output.display());
            Ok(())
        }
        Commands::VerifyLedger { supply } => {
            let path = config.journal_path();
            let entries = read_entries(&path)?;
            let replayed = replay_supply(&entries);
            println!("entries: {}", entries.len());
            println!("supply:  {:.6}", replayed);
            if let Some(declared) = supply {
                match verify_journal_file(&path, declared) {
                    Ok(()) => println!("declared supply matches"),
                    Err(e @ HelixError::SupplyMismatch { .. }) => {
                        eprintln!("{}", e);
                        std::process::exit(2);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(())
        }
        Commands::ReplayChain => {
            let blocks = load_chain(&config.chain_path())?;
            validate_chain(&blocks, &config.genesis_hash)?;
            let store = EventStore::open(config.events_dir())?;
            let summary = replay_chain(&blocks, &config.genesis_hash, |id| store.load(id))?;
            println!("blocks: {}", summary.blocks);
            println!("events: {}", summary.events);
            println!("tip:    {}", summary.tip);
            Ok(())
        }
    }
}

async fn run_node(
    config: HelixConfig,
    statements: Vec<String>,
    key: Option<ed25519_dalek::SigningKey>,
) -> Result<()> {
    let (transport, inbox) = TcpTransport::new();
    if let Some(addr) = &config.listen_addr {
        let bound = transport.listen(addr).await?;
        info!(%bound, "listening for peers");
    }
    for peer in &config.peers {
        if let Err(e) = transport.connect(peer).await {
            warn!(%peer, "could not reach peer: {}", e);
        }
    }

    let gossip = GossipNode::new(
        config.node_id.clone(),
        Arc::clone(&transport) as Arc<dyn helix_core::network::GossipTransport>,
        inbox,
        config.seen_ttl(),
    );
    let mut node = HelixNode::open(config, gossip)?;
    for text in &statements {
        match node.create_statement(text, key.as_ref()) {
            Ok(id) => info!(statement_id = %id, "statement originated"),
            Err(e) => warn!("statement not created: {}", e),
        }
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    };

    match node.run(shutdown).await {
        Ok(node) => {
            info!(
                blocks = node.chain().len(),
                supply = node.ledger().total_supply(),
                "node exited cleanly"
            );
            Ok(())
        }
        Err(e @ HelixError::SupplyMismatch { .. }) => {
            eprintln!("ledger integrity failure: {}", e);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
