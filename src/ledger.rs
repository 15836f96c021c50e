//! Per-node ledger: UTXO set, pending pool, balance and bundle application
//!
//! Each peer owns one `Ledger` and builds it solely from messages it has
//! validated itself. Nothing here reconciles one peer's view with another's.

pub mod state;
pub mod validation;

pub use state::*;
pub use validation::*;

use crate::crypto::Address;
use crate::error::ChainError;
use crate::puzzle::{PuzzleOracle, Solution};
use crate::transaction::{Amount, Transaction, TransactionBuilder, TxId};
use std::sync::Arc;

/// Result of offering a single transaction to a ledger.
#[derive(Debug, Clone)]
pub enum Admission {
    Accepted,
    Rejected(ChainError),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted)
    }
}

/// Result of offering a solution bundle to a ledger.
#[derive(Debug, Clone)]
pub enum BundleOutcome {
    /// Every transaction plus the minted reward was applied.
    Accepted { reward: Arc<Transaction>, applied: usize },
    /// Nothing was applied.
    Rejected(ChainError),
}

impl BundleOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, BundleOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    address: Address,
    state: LedgerState,
}

impl Ledger {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: LedgerState::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn balance(&self) -> Amount {
        self.state.balance_of(&self.address)
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.state.utxo_set
    }

    pub fn pending(&self) -> &[Arc<Transaction>] {
        &self.state.pending
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.state.utxo_set.contains_key(id)
    }

    /// Insert a transaction as unspent without validation. Used to hand every
    /// peer the same genesis reward before the network starts.
    pub fn seed(&mut self, tx: Arc<Transaction>) {
        self.state.insert_unspent(tx);
    }

    /// Build a transfer of `amount` to `destination` that spends every unspent
    /// transaction paying this node and returns `balance() - amount` to itself.
    ///
    /// `amount` is not bounded by the balance: an over-spend produces a
    /// transaction with a negative change output which fails `outputs_valid`.
    pub fn build_give(&self, destination: Address, amount: Amount) -> Transaction {
        let mut builder = TransactionBuilder::new(self.address);
        for input in self.state.spendable_for(&self.address) {
            builder.add_input(input);
        }
        builder
            .add_output(destination, amount)
            .add_output(self.address, self.balance().saturating_sub(amount));
        builder.build()
    }

    pub fn check(&self, tx: &Transaction) -> Result<(), ChainError> {
        tx.validate(&self.state.utxo_set)
    }

    pub fn verify(&self, tx: &Transaction) -> bool {
        self.check(tx).is_ok()
    }

    /// Queue `tx` in the pending pool if it verifies against this view.
    pub fn on_transaction(&mut self, tx: Arc<Transaction>) -> Admission {
        match self.check(&tx) {
            Ok(()) => {
                self.state.push_pending(tx);
                Admission::Accepted
            }
            Err(e) => Admission::Rejected(e),
        }
    }

    /// Apply `transactions` in order. The only UTXO mutator after seeding.
    pub fn apply_bundle(&mut self, transactions: &[Arc<Transaction>]) {
        for tx in transactions {
            self.state.apply_transaction(tx);
        }
    }

    /// Check a solution bundle without touching state.
    pub fn check_bundle(
        &self,
        solution: &Solution,
        transactions: &[Arc<Transaction>],
        oracle: &dyn PuzzleOracle,
    ) -> Result<(), ChainError> {
        if !oracle.validate(solution) {
            return Err(ChainError::InvalidSolution(format!(
                "{} does not solve the puzzle",
                solution
            )));
        }
        for tx in transactions {
            self.check(tx)?;
        }
        validate_no_double_spend(transactions)
    }

    /// Accept a bundle only if the solution and every transaction are valid,
    /// then mint the solver's reward and apply everything. On any failure the
    /// ledger is left untouched.
    pub fn accept_solution(
        &mut self,
        solution: Solution,
        mut transactions: Vec<Arc<Transaction>>,
        solver: Address,
        oracle: &dyn PuzzleOracle,
        reward_amount: Amount,
    ) -> BundleOutcome {
        if let Err(e) = self.check_bundle(&solution, &transactions, oracle) {
            return BundleOutcome::Rejected(e);
        }

        let reward = Arc::new(Transaction::reward(solution, solver, reward_amount));
        transactions.push(Arc::clone(&reward));
        self.apply_bundle(&transactions);

        BundleOutcome::Accepted {
            reward,
            applied: transactions.len(),
        }
    }
}
