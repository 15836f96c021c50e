#![forbid(unsafe_code)]
//! In-process gossipcoin network driver

use clap::Parser;
use gossipcoin::config::load_config;
use gossipcoin::crypto::{address_from_string, address_to_hex};
use gossipcoin::network::Network;
use gossipcoin::node::{settle, Peer};
use gossipcoin::puzzle::{PuzzleOracle, Solution};
use gossipcoin::transaction::{Amount, Transaction};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Debug, Clone)]
struct Transfer {
    from: String,
    to: String,
    amount: Amount,
}

fn parse_transfer(s: &str) -> Result<Transfer, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("expected from:to:amount, got '{}'", s));
    }
    let amount = parts[2]
        .parse::<Amount>()
        .map_err(|e| format!("invalid amount '{}': {}", parts[2], e))?;
    Ok(Transfer {
        from: parts[0].to_string(),
        to: parts[1].to_string(),
        amount,
    })
}

#[derive(Parser, Debug)]
#[command(name = "gossipcoin-sim", about = "Run a gossipcoin network in-process")]
struct Args {
    /// Path to the TOML config (defaults apply when absent)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Transfer to broadcast, as from:to:amount (repeatable)
    #[arg(long = "give", value_parser = parse_transfer)]
    gives: Vec<Transfer>,

    /// Peer that mines after the transfers (repeatable)
    #[arg(long)]
    mine: Vec<String>,

    /// Print balances as JSON
    #[arg(long)]
    json: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct PeerReport {
    peer: String,
    address: String,
    balance: Amount,
    unspent: usize,
    pending: usize,
}

fn find<'a>(peers: &'a [Arc<Peer>], label: &str) -> Result<&'a Arc<Peer>, String> {
    peers
        .iter()
        .find(|p| p.label() == label)
        .ok_or_else(|| format!("unknown peer '{}'", label))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let config = load_config(&args.config)?;
    let oracle: Arc<dyn PuzzleOracle> = Arc::new(config.puzzle.oracle()?);
    let network = Network::new(config.network.network_id.clone());

    let mut peers = Vec::new();
    for label in &config.network.peers {
        peers.push(Peer::spawn(label.clone(), Arc::clone(&network), Arc::clone(&oracle), &config.miner)?);
    }

    // Every peer starts from the same genesis reward
    let genesis = Arc::new(Transaction::reward(
        Solution::new(0),
        address_from_string(&config.genesis.beneficiary),
        config.genesis.amount,
    ));
    for peer in &peers {
        peer.seed(Arc::clone(&genesis));
    }
    info!(
        "{} given initial amount {} via {}",
        config.genesis.beneficiary,
        config.genesis.amount,
        genesis.id_str()
    );

    if args.gives.is_empty() && args.mine.is_empty() {
        let first = config.network.peers.first().cloned().unwrap_or_default();
        let second = config.network.peers.get(1).cloned().unwrap_or_else(|| first.clone());
        let last = config.network.peers.last().cloned().unwrap_or_default();
        args.gives.push(Transfer {
            from: first,
            to: second,
            amount: 1,
        });
        args.mine.push(last);
    }

    for transfer in &args.gives {
        let from = find(&peers, &transfer.from)?;
        from.give(address_from_string(&transfer.to), transfer.amount)?;
    }
    settle(&peers).await?;

    for label in &args.mine {
        let miner = find(&peers, label)?;
        match miner.mine().await {
            Ok(solution) => info!("{} mined {}", label, solution),
            Err(e) => warn!("{} did not mine: {}", label, e),
        }
        settle(&peers).await?;
    }

    let reports: Vec<PeerReport> = peers
        .iter()
        .map(|p| {
            let ledger = p.ledger_snapshot();
            PeerReport {
                peer: p.label().to_string(),
                address: address_to_hex(p.address()),
                balance: ledger.balance(),
                unspent: ledger.utxo_set().len(),
                pending: ledger.pending().len(),
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for r in &reports {
            println!(
                "{:<10} balance {:>6}  unspent {:>3}  pending {:>3}",
                r.peer, r.balance, r.unspent, r.pending
            );
        }
    }

    for peer in &peers {
        peer.shutdown()?;
    }
    Ok(())
}
