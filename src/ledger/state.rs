use crate::crypto::Address;
use crate::transaction::{Amount, Transaction, TxId};
use std::collections::HashMap;
use std::sync::Arc;

/// Unspent transactions keyed by id.
pub type UtxoSet = HashMap<TxId, Arc<Transaction>>;

/// A node's local view: what it considers unspent, and what it has
/// verified but not yet seen confirmed.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub utxo_set: UtxoSet,
    pub pending: Vec<Arc<Transaction>>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of every unspent output destined to `address`. Recomputed on each call.
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.utxo_set
            .values()
            .fold(0, |sum: Amount, tx| sum.saturating_add(tx.sum_to_destination(address)))
    }

    /// Unspent transactions that grant `address` positive value, in id order
    /// so that transactions built from them are reproducible.
    pub fn spendable_for(&self, address: &Address) -> Vec<Arc<Transaction>> {
        let mut spendable: Vec<_> = self
            .utxo_set
            .values()
            .filter(|tx| tx.sum_to_destination(address) > 0)
            .cloned()
            .collect();
        spendable.sort_by(|a, b| a.id().cmp(b.id()));
        spendable
    }

    /// Consume the inputs of `tx`, record `tx` as unspent and drop it from
    /// the pending pool.
    pub fn apply_transaction(&mut self, tx: &Arc<Transaction>) {
        for input_id in tx.input_ids() {
            self.utxo_set.remove(input_id);
        }
        self.utxo_set.insert(*tx.id(), Arc::clone(tx));
        self.pending.retain(|pending| pending.id() != tx.id());
    }

    pub fn insert_unspent(&mut self, tx: Arc<Transaction>) {
        self.utxo_set.insert(*tx.id(), tx);
    }

    pub fn push_pending(&mut self, tx: Arc<Transaction>) {
        self.pending.push(tx);
    }
}
