// src/flatten.rs
use tracing::debug;

use crate::error::GraphError;
use crate::models::{Edge, FlatTx, RawTx, TxParty};

/// Flatten one transaction into parallel sender/receiver lists.
///
/// Every input must reference a previous output with an address; a coinbase
/// or otherwise address-less input fails the whole transaction. Outputs
/// without an address (burn / OP_RETURN) are silently excluded, by policy.
pub fn flatten_tx(tx: &RawTx) -> Result<FlatTx, GraphError> {
    let mut senders = Vec::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        let prev = input
            .prev_out
            .as_ref()
            .ok_or(GraphError::MissingField("prev_out"))?;
        let addr = prev
            .addr
            .as_ref()
            .ok_or(GraphError::MissingField("prev_out.addr"))?;
        senders.push(TxParty {
            addr: addr.clone(),
            value: prev.value,
        });
    }

    let receivers = tx
        .out
        .iter()
        .filter_map(|o| {
            o.addr.as_ref().map(|a| TxParty {
                addr: a.clone(),
                value: o.value,
            })
        })
        .collect();

    Ok(FlatTx { senders, receivers })
}

/// Collapse the side of a transaction the target address appears on.
///
/// If `target` is among the receivers, the receiver list becomes just the
/// target (its received values summed); otherwise, if it is among the
/// senders, the sender list collapses the same way. Models "this tx is
/// really about the target" and is idempotent.
pub fn wallet_filter(target: &str, flat: &mut FlatTx) {
    if flat.receivers.iter().any(|p| p.addr == target) {
        let value: u64 = flat
            .receivers
            .iter()
            .filter(|p| p.addr == target)
            .map(|p| p.value)
            .sum();
        flat.receivers = vec![TxParty {
            addr: target.to_string(),
            value,
        }];
    } else if flat.senders.iter().any(|p| p.addr == target) {
        let value: u64 = flat
            .senders
            .iter()
            .filter(|p| p.addr == target)
            .map(|p| p.value)
            .sum();
        flat.senders = vec![TxParty {
            addr: target.to_string(),
            value,
        }];
    }
}

/// Expand flattened transactions into the per-transaction senders × receivers
/// cross product. Duplicate pairs across transactions are kept (the graph is
/// a multigraph) and no dedup happens here.
pub fn build_edges(flats: &[FlatTx]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for flat in flats {
        for s in &flat.senders {
            for r in &flat.receivers {
                edges.push(Edge {
                    sender: s.addr.clone(),
                    sent: s.value,
                    receiver: r.addr.clone(),
                    received: r.value,
                });
            }
        }
    }
    edges
}

/// Edge list for one address's transaction history, wallet-filtered around
/// that address. Transactions that fail to flatten are skipped.
pub fn neighborhood_edges(target: &str, txs: &[RawTx]) -> Vec<Edge> {
    let mut flats = Vec::with_capacity(txs.len());
    for tx in txs {
        match flatten_tx(tx) {
            Ok(mut flat) => {
                wallet_filter(target, &mut flat);
                flats.push(flat);
            }
            Err(e) => {
                debug!("skipping tx {:?}: {}", tx.hash, e);
            }
        }
    }
    build_edges(&flats)
}

/// Edge list for a whole block: no wallet filter, every flattenable
/// transaction contributes its full cross product.
pub fn block_edges(txs: &[RawTx]) -> Vec<Edge> {
    let mut flats = Vec::with_capacity(txs.len());
    for tx in txs {
        match flatten_tx(tx) {
            Ok(flat) => flats.push(flat),
            Err(e) => debug!("skipping tx {:?}: {}", tx.hash, e),
        }
    }
    build_edges(&flats)
}
