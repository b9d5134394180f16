// src/models.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw address record as returned by `GET /rawaddr/{address}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAddress {
    pub n_tx: u64,
    pub total_received: u64,
    pub total_sent: u64,
    pub txs: Vec<RawTx>,
}

/// Raw block record as returned by `GET /rawblock/{hash}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBlock {
    #[serde(default)]
    pub hash: Option<String>,
    pub n_tx: u64,
    pub tx: Vec<RawTx>,
}

/// One blockchain transaction. Inputs reference a previous output's address
/// and value; outputs may omit an address (burn / OP_RETURN outputs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTx {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    #[serde(default)]
    pub out: Vec<TxOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxInput {
    // Coinbase inputs carry no prev_out.
    #[serde(default)]
    pub prev_out: Option<PrevOut>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrevOut {
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOutput {
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub value: u64,
}

/// Listing returned by `GET /blocks/{ms}?format=json`.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockListing {
    pub blocks: Vec<BlockSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockSummary {
    pub hash: String,
}

/// One side of a flattened transaction: an address plus the value moved
/// through it, in satoshi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParty {
    pub addr: String,
    pub value: u64,
}

/// A transaction flattened into parallel sender/receiver lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatTx {
    pub senders: Vec<TxParty>,
    pub receivers: Vec<TxParty>,
}

/// One sender-to-receiver association within a single transaction. Repeated
/// pairs and self-loops are kept as-is (multigraph semantics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub sender: String,
    pub sent: u64,
    pub receiver: String,
    pub received: u64,
}

impl Edge {
    /// Received amount in BTC (satoshi × 10⁻⁸).
    pub fn received_btc(&self) -> Decimal {
        Decimal::from(self.received) / Decimal::from(100_000_000u64)
    }
}
