//! A peer: one ledger, one inbox, one handling task
//!
//! Gossip for a peer is handled strictly one envelope at a time on its own
//! task, which makes that task the single writer of the ledger. The ledger
//! sits behind a read/write lock so `balance` and `verify` style reads from
//! the driver never observe a half-applied bundle.

use crate::config::MinerConfig;
use crate::crypto::{address_from_string, short_hex, Address};
use crate::error::ChainError;
use crate::ledger::{Admission, BundleOutcome, Ledger};
use crate::miner::{CancelToken, Miner};
use crate::network::{Envelope, Message, Network, SolutionMessage, TransactionMessage};
use crate::puzzle::{PuzzleOracle, Solution};
use crate::transaction::{Amount, Transaction, TxId};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerState {
    Idle,
    Searching,
    Broadcasting,
}

pub struct Peer {
    label: String,
    address: Address,
    ledger: RwLock<Ledger>,
    network: Arc<Network>,
    oracle: Arc<dyn PuzzleOracle>,
    miner: Miner,
    reward: Amount,
    cancel: CancelToken,
    miner_state: Mutex<MinerState>,
}

impl Peer {
    /// Register a peer on `network` and start its handling task.
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        label: impl Into<String>,
        network: Arc<Network>,
        oracle: Arc<dyn PuzzleOracle>,
        config: &MinerConfig,
    ) -> Result<Arc<Self>, ChainError> {
        let label = label.into();
        let address = address_from_string(&label);
        let inbox = network.register(address)?;

        let peer = Arc::new(Self {
            label,
            address,
            ledger: RwLock::new(Ledger::new(address)),
            network,
            oracle,
            miner: Miner::new(config.max_attempts),
            reward: config.reward,
            cancel: CancelToken::new(),
            miner_state: Mutex::new(MinerState::Idle),
        });

        info!("{} joined {} as {}", peer.label, peer.network.network_id(), short_hex(&address));
        tokio::spawn(Arc::clone(&peer).run(inbox));
        Ok(peer)
    }

    async fn run(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(envelope) = inbox.recv().await {
            match envelope {
                Envelope::Gossip(Message::Transaction(message)) => {
                    self.on_receiving_transaction(message);
                }
                Envelope::Gossip(Message::Solution(message)) => {
                    self.on_receiving_solution(message);
                }
                Envelope::Flush(done) => {
                    let _ = done.send(());
                }
                Envelope::Shutdown => break,
            }
        }
        self.network.unregister(&self.address);
        info!("{} left the network", self.label);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn balance(&self) -> Amount {
        self.ledger.read().balance()
    }

    pub fn verify(&self, tx: &Transaction) -> bool {
        self.ledger.read().verify(tx)
    }

    pub fn pending_len(&self) -> usize {
        self.ledger.read().pending().len()
    }

    /// Ids of every transaction this peer considers unspent, sorted.
    pub fn utxo_ids(&self) -> Vec<TxId> {
        let mut ids: Vec<TxId> = self.ledger.read().utxo_set().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.ledger.read().contains(id)
    }

    /// A copy of the ledger, taken under one read lock.
    pub fn ledger_snapshot(&self) -> Ledger {
        self.ledger.read().clone()
    }

    pub fn miner_state(&self) -> MinerState {
        *self.miner_state.lock()
    }

    pub fn seed(&self, tx: Arc<Transaction>) {
        self.ledger.write().seed(tx);
    }

    /// Build a transfer from this peer's ledger and broadcast it to every peer.
    pub fn give(&self, destination: Address, amount: Amount) -> Result<Arc<Transaction>, ChainError> {
        let tx = {
            let ledger = self.ledger.read();
            let balance = ledger.balance();
            if amount > balance || amount < 0 {
                warn!(
                    "{} gives {} to {} with balance {}; peers will reject it",
                    self.label,
                    amount,
                    short_hex(&destination),
                    balance
                );
            }
            Arc::new(ledger.build_give(destination, amount))
        };

        info!("{} broadcasts transaction {}", self.label, short_hex(tx.id()));
        let delivered = self.network.broadcast_transaction(Arc::clone(&tx), self.address);
        if delivered == 0 {
            return Err(ChainError::NetworkError(format!(
                "{} could not deliver transaction {} to any peer",
                self.label,
                short_hex(tx.id())
            )));
        }
        Ok(tx)
    }

    /// Search for a solution, then broadcast it with a snapshot of the
    /// pending pool. Gives up without broadcasting if a competing bundle is
    /// accepted while searching.
    pub async fn mine(&self) -> Result<Solution, ChainError> {
        let ticket = self.cancel.ticket();
        self.set_miner_state(MinerState::Searching);
        info!("{} starts mining", self.label);

        let oracle = Arc::clone(&self.oracle);
        let miner = self.miner;
        let search_ticket = ticket.clone();
        let searched = tokio::task::spawn_blocking(move || {
            let mut rng = rand::thread_rng();
            miner.search(oracle.as_ref(), &mut rng, &search_ticket)
        })
        .await
        .map_err(|e| ChainError::WorkerError(e.to_string()))
        .and_then(|result| result);

        let solution = match searched {
            Ok(solution) => solution,
            Err(e) => {
                self.set_miner_state(MinerState::Idle);
                warn!("{} stopped mining: {}", self.label, e);
                return Err(e);
            }
        };

        if ticket.is_cancelled() {
            self.set_miner_state(MinerState::Idle);
            info!("{} found {} but a competing bundle was accepted first", self.label, solution);
            return Err(ChainError::StaleSolution(format!(
                "{} superseded before broadcast",
                solution
            )));
        }

        self.set_miner_state(MinerState::Broadcasting);
        let snapshot = self.ledger.read().pending().to_vec();
        info!(
            "{} broadcasts solution {} to validate {} transactions",
            self.label,
            solution,
            snapshot.len()
        );
        self.network.broadcast_solution(solution, &snapshot, self.address);
        self.set_miner_state(MinerState::Idle);
        Ok(solution)
    }

    pub fn on_receiving_transaction(&self, message: TransactionMessage) -> Admission {
        let TransactionMessage { transaction, sender } = message;
        let tx_id = *transaction.id();
        let admission = self.ledger.write().on_transaction(transaction);
        match &admission {
            Admission::Accepted => info!(
                "{} accepts transaction {} from {}",
                self.label,
                short_hex(&tx_id),
                short_hex(&sender)
            ),
            Admission::Rejected(e) => warn!(
                "{} rejects transaction {} from {}: {}",
                self.label,
                short_hex(&tx_id),
                short_hex(&sender),
                e
            ),
        }
        admission
    }

    pub fn on_receiving_solution(&self, message: SolutionMessage) -> BundleOutcome {
        let SolutionMessage {
            solution,
            transactions,
            solver,
        } = message;
        let outcome = self.ledger.write().accept_solution(
            solution,
            transactions,
            solver,
            self.oracle.as_ref(),
            self.reward,
        );
        match &outcome {
            BundleOutcome::Accepted { reward, applied } => {
                info!(
                    "{} accepts solution {} from {} ({} transactions, reward {})",
                    self.label,
                    solution,
                    short_hex(&solver),
                    applied,
                    short_hex(reward.id())
                );
                self.cancel.cancel();
            }
            BundleOutcome::Rejected(e) => warn!(
                "{} rejects solution {} from {}: {}",
                self.label,
                solution,
                short_hex(&solver),
                e
            ),
        }
        outcome
    }

    /// Resolve once every envelope queued before this call has been handled.
    pub async fn flush(&self) -> Result<(), ChainError> {
        let (done, wait) = oneshot::channel();
        self.network.send_to(&self.address, Envelope::Flush(done))?;
        wait.await
            .map_err(|_| ChainError::NetworkError(format!("{} stopped before flushing", self.label)))
    }

    pub fn shutdown(&self) -> Result<(), ChainError> {
        self.cancel.cancel();
        self.network.send_to(&self.address, Envelope::Shutdown)
    }

    fn set_miner_state(&self, state: MinerState) {
        *self.miner_state.lock() = state;
    }
}

/// Flush every peer in turn. Handling gossip never produces new gossip, so
/// one pass drains everything broadcast before the call.
pub async fn settle(peers: &[Arc<Peer>]) -> Result<(), ChainError> {
    for peer in peers {
        peer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::ThresholdOracle;
    use std::time::Duration;

    fn spawn_peers(labels: &[&str]) -> (Arc<Network>, Vec<Arc<Peer>>) {
        let network = Network::new("test");
        let oracle: Arc<dyn PuzzleOracle> = Arc::new(ThresholdOracle::default());
        let peers = labels
            .iter()
            .map(|l| Peer::spawn(*l, Arc::clone(&network), Arc::clone(&oracle), &MinerConfig::default()).unwrap())
            .collect();
        (network, peers)
    }

    #[tokio::test]
    async fn test_give_reaches_every_pending_pool() {
        tokio::time::timeout(Duration::from_secs(5), async {
            let (_network, peers) = spawn_peers(&["alice", "bob"]);
            let genesis = Arc::new(Transaction::reward(Solution::new(0), *peers[0].address(), 10));
            for peer in &peers {
                peer.seed(Arc::clone(&genesis));
            }

            peers[0].give(*peers[1].address(), 4).unwrap();
            settle(&peers).await.unwrap();

            for peer in &peers {
                assert_eq!(peer.pending_len(), 1);
            }
            // Nothing is confirmed yet
            assert_eq!(peers[0].balance(), 10);
            assert_eq!(peers[1].balance(), 0);
        })
        .await
        .expect("test_give_reaches_every_pending_pool timed out");
    }

    #[tokio::test]
    async fn test_mine_returns_to_idle() {
        tokio::time::timeout(Duration::from_secs(5), async {
            let (_network, peers) = spawn_peers(&["carl"]);

            let solution = peers[0].mine().await.unwrap();
            assert!(ThresholdOracle::default().validate(&solution));
            assert_eq!(peers[0].miner_state(), MinerState::Idle);

            settle(&peers).await.unwrap();
            assert_eq!(peers[0].balance(), 10);
        })
        .await
        .expect("test_mine_returns_to_idle timed out");
    }

    #[tokio::test]
    async fn test_shutdown_unregisters() {
        tokio::time::timeout(Duration::from_secs(5), async {
            let (network, peers) = spawn_peers(&["alice", "bob"]);
            peers[1].shutdown().unwrap();

            while network.peer_count() != 1 {
                tokio::task::yield_now().await;
            }
            assert_eq!(network.peers(), vec![*peers[0].address()]);
            assert!(peers[1].flush().await.is_err());
        })
        .await
        .expect("test_shutdown_unregisters timed out");
    }
}
