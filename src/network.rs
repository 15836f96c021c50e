//! In-process gossip network
//!
//! The `Network` is an explicit peer registry handed to every peer at
//! construction. Each registered peer gets one unbounded inbox; broadcasting
//! clones the message into every inbox, the sender's own included. Delivery
//! is reliable with no acknowledgement, retry or backpressure.

use crate::crypto::{short_hex, Address};
use crate::error::ChainError;
use crate::puzzle::Solution;
use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionMessage {
    pub transaction: Arc<Transaction>,
    pub sender: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionMessage {
    pub solution: Solution,
    pub transactions: Vec<Arc<Transaction>>,
    pub solver: Address,
}

/// Peer-to-peer gossip payloads
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Transaction(TransactionMessage),
    Solution(SolutionMessage),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Transaction(_) => "transaction",
            Message::Solution(_) => "solution",
        }
    }
}

/// What a peer's inbox carries: gossip plus local control signals.
#[derive(Debug)]
pub enum Envelope {
    Gossip(Message),
    /// Answered once every envelope queued before it has been handled.
    Flush(oneshot::Sender<()>),
    Shutdown,
}

struct PeerEntry {
    address: Address,
    inbox: mpsc::UnboundedSender<Envelope>,
}

pub struct Network {
    network_id: String,
    peers: RwLock<Vec<PeerEntry>>,
}

impl Network {
    pub fn new(network_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            network_id: network_id.into(),
            peers: RwLock::new(Vec::new()),
        })
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Register `address` and return the receiving end of its inbox.
    pub fn register(&self, address: Address) -> Result<mpsc::UnboundedReceiver<Envelope>, ChainError> {
        let mut peers = self.peers.write();
        if peers.iter().any(|p| p.address == address) {
            return Err(ChainError::NetworkError(format!(
                "Peer {} already registered",
                short_hex(&address)
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        peers.push(PeerEntry { address, inbox: tx });
        Ok(rx)
    }

    pub fn unregister(&self, address: &Address) -> bool {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|p| &p.address != address);
        peers.len() != before
    }

    /// Registered addresses in registration order.
    pub fn peers(&self) -> Vec<Address> {
        self.peers.read().iter().map(|p| p.address).collect()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Deliver `message` to every registered peer. Returns how many inboxes
    /// accepted it; closed inboxes are skipped.
    pub fn broadcast(&self, message: Message) -> usize {
        let peers = self.peers.read();
        let mut delivered = 0;
        for peer in peers.iter() {
            match peer.inbox.send(Envelope::Gossip(message.clone())) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(
                    "inbox of {} is closed, dropping {}",
                    short_hex(&peer.address),
                    message.kind()
                ),
            }
        }
        debug!("broadcast {} to {}/{} peers", message.kind(), delivered, peers.len());
        delivered
    }

    pub fn broadcast_transaction(&self, transaction: Arc<Transaction>, sender: Address) -> usize {
        self.broadcast(Message::Transaction(TransactionMessage { transaction, sender }))
    }

    /// Broadcast a bundle. `transactions` is copied, so later changes to the
    /// solver's pending pool cannot affect what peers received.
    pub fn broadcast_solution(
        &self,
        solution: Solution,
        transactions: &[Arc<Transaction>],
        solver: Address,
    ) -> usize {
        self.broadcast(Message::Solution(SolutionMessage {
            solution,
            transactions: transactions.to_vec(),
            solver,
        }))
    }

    /// Send a control envelope to a single peer.
    pub fn send_to(&self, address: &Address, envelope: Envelope) -> Result<(), ChainError> {
        let peers = self.peers.read();
        let peer = peers
            .iter()
            .find(|p| &p.address == address)
            .ok_or_else(|| ChainError::NetworkError(format!("Unknown peer {}", short_hex(address))))?;
        peer.inbox
            .send(envelope)
            .map_err(|_| ChainError::NetworkError(format!("Inbox of {} is closed", short_hex(address))))
    }
}
