/// Validation logic for transactions separated from type definitions
use crate::crypto::{short_hex, Address};
use crate::error::ChainError;
use crate::ledger::UtxoSet;
use crate::transaction::types::{Amount, Transaction};
use std::collections::HashSet;
use std::sync::Arc;

impl Transaction {
    /// Sum of this transaction's own outputs destined to `address`.
    pub fn sum_to_destination(&self, address: &Address) -> Amount {
        self.outputs()
            .iter()
            .filter(|output| &output.destination == address)
            .fold(0, |sum: Amount, output| sum.saturating_add(output.amount))
    }

    /// Total value this transaction's inputs grant to `address`.
    pub fn inputs_sum_to_sender(&self, address: &Address) -> Amount {
        self.inputs()
            .iter()
            .fold(0, |sum: Amount, input| sum.saturating_add(input.sum_to_destination(address)))
    }

    /// Value the inputs grant to this transaction's own sender. Zero for coinbase.
    pub fn input_value(&self) -> Amount {
        match self.sender().address() {
            Some(sender) => self.inputs_sum_to_sender(sender),
            None => 0,
        }
    }

    /// Outputs must be non-negative and may not exceed what the inputs grant
    /// the sender. A surplus is allowed and is not routed anywhere.
    pub fn outputs_valid(&self) -> bool {
        self.check_outputs().is_ok()
    }

    /// Every input must be distinct, unspent in `utxo_set` and pay the sender
    /// something. Coinbase transactions never pass.
    pub fn inputs_valid(&self, utxo_set: &UtxoSet) -> bool {
        self.check_inputs(utxo_set).is_ok()
    }

    pub fn check_outputs(&self) -> Result<(), ChainError> {
        if let Some(negative) = self.outputs().iter().find(|o| o.amount < 0) {
            return Err(ChainError::InvalidTransaction(format!(
                "Output to {} has negative amount {}",
                short_hex(&negative.destination),
                negative.amount
            )));
        }

        let available = i128::from(self.input_value());
        let spent: i128 = self.outputs().iter().map(|o| i128::from(o.amount)).sum();

        if available - spent < 0 {
            return Err(ChainError::InvalidTransaction(format!(
                "Outputs total {} but inputs grant the sender only {}",
                spent, available
            )));
        }
        Ok(())
    }

    pub fn check_inputs(&self, utxo_set: &UtxoSet) -> Result<(), ChainError> {
        // Rewards enter a ledger only by minting or seeding
        if self.is_coinbase() {
            return Err(ChainError::InvalidTransaction(format!(
                "Coinbase {} is only valid as a minted reward",
                short_hex(self.id())
            )));
        }

        let mut seen = HashSet::new();
        for input in self.inputs() {
            if !seen.insert(*input.id()) {
                return Err(ChainError::DoubleSpendDetected(format!(
                    "Input {} is listed more than once",
                    short_hex(input.id())
                )));
            }

            // Value is read from this node's own copy, not the carried one
            let unspent = utxo_set.get(input.id()).ok_or_else(|| {
                ChainError::InputNotFound(format!("Input {} is spent or unknown", short_hex(input.id())))
            })?;
            if !Arc::ptr_eq(unspent, input) && unspent.as_ref() != input.as_ref() {
                return Err(ChainError::InvalidTransaction(format!(
                    "Input {} does not match the unspent transaction with that id",
                    short_hex(input.id())
                )));
            }

            let granted = self
                .sender()
                .address()
                .map_or(0, |sender| unspent.sum_to_destination(sender));
            if granted <= 0 {
                return Err(ChainError::InvalidTransaction(format!(
                    "Input {} grants nothing to the sender",
                    short_hex(input.id())
                )));
            }
        }
        Ok(())
    }

    /// Transactions arriving off the wire carry their id; it must match.
    pub fn check_id(&self) -> Result<(), ChainError> {
        if self.computed_id() != *self.id() {
            return Err(ChainError::InvalidTransaction(format!(
                "Id {} does not match transaction content",
                short_hex(self.id())
            )));
        }
        Ok(())
    }

    /// Full validation against a UTXO view: id, inputs, then outputs.
    pub fn validate(&self, utxo_set: &UtxoSet) -> Result<(), ChainError> {
        self.check_id()?;
        self.check_inputs(utxo_set)?;
        self.check_outputs()
    }
}
