/// Transaction types for gossipcoin
use crate::crypto::{Address, Sha256Hash};
use crate::puzzle::Solution;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Value carried by an output. Signed so that construction never has to
/// reject anything; validity is a separate predicate.
pub type Amount = i64;

/// Transaction identifier (SHA-256 content hash)
pub type TxId = Sha256Hash;

/// Who is spending. Reward transactions have no spending address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    Coinbase,
    Address(Address),
}

impl Sender {
    pub fn address(&self) -> Option<&Address> {
        match self {
            Sender::Coinbase => None,
            Sender::Address(addr) => Some(addr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub destination: Address,
    pub amount: Amount,
}

/// A sealed value-transfer record.
///
/// Fields are private, so a transaction cannot change after
/// [`TransactionBuilder::build`]. Deserialized transactions keep the id they
/// were sent with; `check_id` recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TxId,
    sender: Sender,
    inputs: Vec<Arc<Transaction>>,
    outputs: Vec<Output>,
    nonce: u64,
}

impl Transaction {
    /// Mint a reward paying `amount` to `beneficiary` for `solution`.
    /// Every peer calling this with the same arguments gets an identical transaction.
    pub fn reward(solution: Solution, beneficiary: Address, amount: Amount) -> Self {
        let mut builder = TransactionBuilder::coinbase(solution);
        builder.add_output(beneficiary, amount);
        builder.build()
    }

    pub fn id(&self) -> &TxId {
        &self.id
    }

    pub fn id_str(&self) -> String {
        hex::encode(self.id)
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn inputs(&self) -> &[Arc<Transaction>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == Sender::Coinbase
    }

    pub fn input_ids(&self) -> impl Iterator<Item = &TxId> + '_ {
        self.inputs.iter().map(|input| input.id())
    }

    pub fn computed_id(&self) -> TxId {
        compute_id(&self.sender, &self.inputs, &self.outputs, self.nonce)
    }

    pub fn total_output(&self) -> Amount {
        self.outputs
            .iter()
            .fold(0, |sum: Amount, output| sum.saturating_add(output.amount))
    }
}

/// Accumulates inputs and outputs, then seals them into a [`Transaction`].
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    sender: Sender,
    inputs: Vec<Arc<Transaction>>,
    outputs: Vec<Output>,
    nonce: u64,
}

impl TransactionBuilder {
    /// Start a transfer spent by `sender`, with a random nonce.
    pub fn new(sender: Address) -> Self {
        Self {
            sender: Sender::Address(sender),
            inputs: Vec::new(),
            outputs: Vec::new(),
            nonce: rand::random(),
        }
    }

    /// Start a reward transaction. The nonce is the solution itself, so the
    /// id depends only on the solution and the reward outputs, never on
    /// which peer mints it. Inputs are not hashed for coinbase.
    pub fn coinbase(solution: Solution) -> Self {
        Self {
            sender: Sender::Coinbase,
            inputs: Vec::new(),
            outputs: Vec::new(),
            nonce: solution.value(),
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Reference a previously seen transaction. Not validated here.
    pub fn add_input(&mut self, input: Arc<Transaction>) -> &mut Self {
        self.inputs.push(input);
        self
    }

    /// Append an output. Any amount is accepted, including zero and negative.
    pub fn add_output(&mut self, destination: Address, amount: Amount) -> &mut Self {
        self.outputs.push(Output { destination, amount });
        self
    }

    pub fn build(self) -> Transaction {
        let id = compute_id(&self.sender, &self.inputs, &self.outputs, self.nonce);
        Transaction {
            id,
            sender: self.sender,
            inputs: self.inputs,
            outputs: self.outputs,
            nonce: self.nonce,
        }
    }
}

fn compute_id(sender: &Sender, inputs: &[Arc<Transaction>], outputs: &[Output], nonce: u64) -> TxId {
    let mut hasher = Sha256::new();
    match sender {
        Sender::Coinbase => {
            hasher.update("coinbase".as_bytes());
        }
        Sender::Address(addr) => {
            hasher.update("transfer".as_bytes());
            hasher.update(addr);
            hasher.update((inputs.len() as u64).to_le_bytes());
            for input in inputs {
                hasher.update(input.id());
            }
        }
    }
    hasher.update((outputs.len() as u64).to_le_bytes());
    for output in outputs {
        hasher.update(output.destination);
        hasher.update(output.amount.to_le_bytes());
    }
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}
