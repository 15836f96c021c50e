use crate::crypto::short_hex;
use crate::error::ChainError;
use crate::transaction::Transaction;
use std::collections::HashMap;
use std::sync::Arc;

/// Reject bundles in which two transactions consume the same input.
///
/// Each transaction is verified against the pre-bundle UTXO view, so two
/// spends of one input would both pass individually.
pub fn validate_no_double_spend(transactions: &[Arc<Transaction>]) -> Result<(), ChainError> {
    let mut seen_inputs = HashMap::new();
    for tx in transactions {
        for input_id in tx.input_ids() {
            if let Some(conflicting) = seen_inputs.get(input_id) {
                return Err(ChainError::DoubleSpendDetected(format!(
                    "Input {} is spent by both {} and {}",
                    short_hex(input_id),
                    short_hex(conflicting),
                    short_hex(tx.id())
                )));
            }
            seen_inputs.insert(*input_id, *tx.id());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address_from_string;
    use crate::puzzle::Solution;
    use crate::transaction::TransactionBuilder;

    #[test]
    fn test_conflicting_spends_detected() {
        let alice = address_from_string("alice");
        let r = Arc::new(Transaction::reward(Solution::new(1), alice, 10));

        let mut to_bob = TransactionBuilder::new(alice);
        to_bob.add_input(Arc::clone(&r)).add_output(address_from_string("bob"), 10);
        let mut to_carl = TransactionBuilder::new(alice);
        to_carl.add_input(Arc::clone(&r)).add_output(address_from_string("carl"), 10);

        let bundle = vec![Arc::new(to_bob.build()), Arc::new(to_carl.build())];
        assert!(matches!(
            validate_no_double_spend(&bundle),
            Err(ChainError::DoubleSpendDetected(_))
        ));
        assert!(validate_no_double_spend(&bundle[..1]).is_ok());
    }
}
