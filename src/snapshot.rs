// src/snapshot.rs
//! Bulk data collection: sample recent blocks, persist their raw JSON and the
//! raw JSON of a fraction of the addresses they touch, and append one
//! statistics line per address to a flat `stats.txt`.

use chrono::Utc;
use eyre::Result;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::explorer::ChainSource;
use crate::flatten::flatten_tx;
use crate::models::RawBlock;
use crate::stats::AddressStats;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// How many 24h windows back from now to sample.
    pub day_range: u32,
    /// Blocks sampled per day window.
    pub blocks_per_day: usize,
    /// Fraction of each block's addresses to fetch stats for.
    pub address_fraction: f64,
    pub out_dir: PathBuf,
    pub fetch_pause: Duration,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            day_range: 7,
            blocks_per_day: 3,
            address_fraction: 0.15,
            out_dir: PathBuf::from("data"),
            fetch_pause: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Default)]
pub struct SnapshotSummary {
    pub blocks_written: usize,
    pub addresses_written: usize,
    pub failures: usize,
}

/// Distinct addresses appearing in a block, in sorted order. Transactions
/// that fail to flatten (coinbase included) are skipped.
fn block_addresses(block: &RawBlock) -> Vec<String> {
    let mut addrs = BTreeSet::new();
    for tx in &block.tx {
        if let Ok(flat) = flatten_tx(tx) {
            for p in flat.senders.into_iter().chain(flat.receivers) {
                addrs.insert(p.addr);
            }
        }
    }
    addrs.into_iter().collect()
}

/// Run the snapshot job. Every per-day, per-block and per-address failure is
/// logged, counted and skipped; only filesystem problems are terminal.
pub async fn run<S: ChainSource + ?Sized>(
    source: &S,
    cfg: &SnapshotConfig,
    rng_seed: Option<u64>,
) -> Result<SnapshotSummary> {
    fs::create_dir_all(&cfg.out_dir)?;
    let mut rng = match rng_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut summary = SnapshotSummary::default();
    let mut stats_lines: Vec<String> = Vec::new();

    let now_ms = Utc::now().timestamp_millis();
    let days: Vec<i64> = (0..cfg.day_range).map(|n| now_ms - n as i64 * DAY_MS).collect();

    let mut sampled_hashes = Vec::new();
    for day in days {
        match source.blocks_for_day(day).await {
            Ok(mut hashes) => {
                hashes.shuffle(&mut rng);
                hashes.truncate(cfg.blocks_per_day);
                sampled_hashes.extend(hashes);
            }
            Err(e) => {
                summary.failures += 1;
                warn!("could not obtain blocks for {}: {}", day, e);
            }
        }
        sleep(cfg.fetch_pause).await;
    }

    for hash in sampled_hashes {
        info!("scouring {} for addresses...", hash);
        let block = match source.fetch_block(&hash).await {
            Ok(block) => block,
            Err(e) => {
                summary.failures += 1;
                warn!("failed to obtain block {}: {}", hash, e);
                continue;
            }
        };
        fs::write(
            cfg.out_dir.join(format!("block_{}.json", hash)),
            serde_json::to_string(&block)?,
        )?;
        summary.blocks_written += 1;

        let mut addrs = block_addresses(&block);
        addrs.shuffle(&mut rng);
        let keep = (addrs.len() as f64 * cfg.address_fraction).ceil() as usize;
        addrs.truncate(keep);

        for addr in addrs {
            sleep(cfg.fetch_pause).await;
            info!("getting data for {} ...", addr);
            match source.fetch_address(&addr).await {
                Ok(raw) => {
                    fs::write(
                        cfg.out_dir.join(format!("address_{}.json", addr)),
                        serde_json::to_string(&raw)?,
                    )?;
                    stats_lines.push(AddressStats::compute(&addr, &raw).line());
                    summary.addresses_written += 1;
                }
                Err(e) => {
                    summary.failures += 1;
                    warn!("...failed for {}: {}", addr, e);
                }
            }
        }
    }

    let mut body = stats_lines.join("\n");
    body.push('\n');
    fs::write(cfg.out_dir.join("stats.txt"), body)?;
    info!(
        "💾 snapshot done: {} blocks, {} addresses, {} failures",
        summary.blocks_written, summary.addresses_written, summary.failures
    );
    Ok(summary)
}
