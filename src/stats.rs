// src/stats.rs
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::flatten::flatten_tx;
use crate::models::RawAddress;

/// Statistics look at no more than this many of an address's transactions,
/// taken in upstream response order (which is not guaranteed chronological).
pub const STATS_WINDOW: usize = 50;

pub const FEATURE_COUNT: usize = 8;

/// Derived per-address feature vector, in the fixed order used by the
/// snapshot file and the classifier: n_tx, total_received, total_sent,
/// n_senders, n_receivers, avg_gap, max_gap, min_gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressStats {
    pub n_tx: u64,
    pub total_received: u64,
    pub total_sent: u64,
    pub n_senders: usize,
    pub n_receivers: usize,
    pub avg_gap: f64,
    pub max_gap: i64,
    pub min_gap: i64,
}

impl AddressStats {
    pub fn compute(address: &str, raw: &RawAddress) -> Self {
        let window = &raw.txs[..raw.txs.len().min(STATS_WINDOW)];

        let mut flats = Vec::with_capacity(window.len());
        for tx in window {
            match flatten_tx(tx) {
                Ok(flat) => flats.push(flat),
                Err(e) => debug!("stats for {}: skipping tx {:?}: {}", address, tx.hash, e),
            }
        }
        let mut senders: HashSet<&str> = HashSet::new();
        let mut receivers: HashSet<&str> = HashSet::new();
        for flat in &flats {
            for p in &flat.senders {
                senders.insert(&p.addr);
            }
            for p in &flat.receivers {
                receivers.insert(&p.addr);
            }
        }
        senders.remove(address);
        receivers.remove(address);

        let mut times: Vec<i64> = window.iter().map(|tx| tx.time).collect();
        times.sort_unstable();
        let gaps: Vec<i64> = times.windows(2).map(|w| w[1] - w[0]).collect();
        let (avg_gap, max_gap, min_gap) = if gaps.is_empty() {
            // Zero or one transaction: all gap statistics are 0 by convention.
            (0.0, 0, 0)
        } else {
            let sum: i64 = gaps.iter().sum();
            let avg = sum as f64 / gaps.len().max(1) as f64;
            (
                avg,
                *gaps.iter().max().unwrap_or(&0),
                *gaps.iter().min().unwrap_or(&0),
            )
        };

        AddressStats {
            n_tx: raw.n_tx,
            total_received: raw.total_received,
            total_sent: raw.total_sent,
            n_senders: senders.len(),
            n_receivers: receivers.len(),
            avg_gap,
            max_gap,
            min_gap,
        }
    }

    /// The vector handed to the classifier, same order as the fields.
    pub fn as_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.n_tx as f64,
            self.total_received as f64,
            self.total_sent as f64,
            self.n_senders as f64,
            self.n_receivers as f64,
            self.avg_gap,
            self.max_gap as f64,
            self.min_gap as f64,
        ]
    }

    /// One whitespace-joined line, the snapshot file format.
    pub fn line(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {}",
            self.n_tx,
            self.total_received,
            self.total_sent,
            self.n_senders,
            self.n_receivers,
            self.avg_gap,
            self.max_gap,
            self.min_gap
        )
    }
}
