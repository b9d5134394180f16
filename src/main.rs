use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::time::Duration;
use tracing::{error, info};

use btc_netgraph::classify::KMeansModel;
use btc_netgraph::config;
use btc_netgraph::crawler::{CrawlConfig, CrawlSession};
use btc_netgraph::explorer::{ChainSource, Explorer};
use btc_netgraph::flatten::block_edges;
use btc_netgraph::graph;
use btc_netgraph::snapshot::{self, SnapshotConfig};
use btc_netgraph::stats::AddressStats;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the neighborhood of an address and emit its edge list.
    Crawl {
        address: String,

        #[arg(short, long)]
        depth: Option<u32>,

        #[arg(short, long)]
        sample_size: Option<usize>,

        /// Global edge ceiling; 0 disables it.
        #[arg(long)]
        edge_ceiling: Option<usize>,

        /// Seed for the sampling RNG, for reproducible walks.
        #[arg(long)]
        rng_seed: Option<u64>,

        /// Write a Graphviz DOT file instead of printing edges.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Fetch one block ("latest" allowed) and emit its transaction graph.
    Block {
        hash: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the statistics vector for an address.
    Stats { address: String },
    /// Classify an address against the pre-trained clustering model.
    Classify {
        address: String,

        #[arg(short, long)]
        model: Option<PathBuf>,
    },
    /// Sample recent blocks and persist raw JSON plus a stats.txt.
    Snapshot {
        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        blocks_per_day: Option<usize>,

        #[arg(long)]
        fraction: Option<f64>,

        #[arg(long)]
        out_dir: Option<PathBuf>,

        #[arg(long)]
        rng_seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load()?;
    let explorer = Explorer::new(&cfg)?;

    match cli.command {
        Command::Crawl {
            address,
            depth,
            sample_size,
            edge_ceiling,
            rng_seed,
            out,
        } => {
            let crawl_cfg = CrawlConfig {
                depth: depth.unwrap_or(cfg.crawl_depth),
                sample_size: sample_size.unwrap_or(cfg.crawl_sample_size),
                edge_ceiling: match edge_ceiling {
                    Some(0) => None,
                    Some(n) => Some(n),
                    None => cfg.crawl_edge_ceiling,
                },
                fetch_pause: Duration::from_millis(200),
            };
            let session = match rng_seed {
                Some(seed) => CrawlSession::with_seed(&explorer, crawl_cfg, seed),
                None => CrawlSession::new(&explorer, crawl_cfg),
            };
            let report = match session.run(&address).await {
                Ok(report) => report,
                Err(e) => {
                    error!("could not retrieve data for {}: {}", address, e);
                    std::process::exit(1);
                }
            };
            info!(
                "crawled {}: {} edges, {} addresses visited, {} failures",
                report.seed,
                report.edges.len(),
                report.visited,
                report.failures
            );
            emit_edges(&report.edges, Some(&address), out.as_deref())?;
        }

        Command::Block { hash, out } => {
            let block = match explorer.fetch_block(&hash).await {
                Ok(block) => block,
                Err(e) => {
                    error!("could not retrieve block {} ({})", hash, e);
                    std::process::exit(1);
                }
            };
            let edges = block_edges(&block.tx);
            if let Some((addr, n)) = graph::most_active(&edges) {
                info!(
                    "{} transactions total; most active transactor {} was involved in {} edges",
                    block.n_tx, addr, n
                );
            }
            emit_edges(&edges, None, out.as_deref())?;
        }

        Command::Stats { address } => {
            let raw = match explorer.fetch_address(&address).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!("could not retrieve address {} ({})", address, e);
                    std::process::exit(1);
                }
            };
            let stats = AddressStats::compute(&address, &raw);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Command::Classify { address, model } => {
            let model_path = model.unwrap_or_else(|| PathBuf::from(&cfg.model_path));
            let model = KMeansModel::load(&model_path)?;
            let raw = match explorer.fetch_address(&address).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!("could not retrieve address {} ({})", address, e);
                    std::process::exit(1);
                }
            };
            let stats = AddressStats::compute(&address, &raw);
            match model.predict(&stats.as_features()) {
                Ok(label) => println!("{} => cluster {}", address, label),
                Err(e) => {
                    error!("could not classify {}: {}", address, e);
                    std::process::exit(1);
                }
            }
        }

        Command::Snapshot {
            days,
            blocks_per_day,
            fraction,
            out_dir,
            rng_seed,
        } => {
            let defaults = SnapshotConfig::default();
            let snap_cfg = SnapshotConfig {
                day_range: days.unwrap_or(defaults.day_range),
                blocks_per_day: blocks_per_day.unwrap_or(defaults.blocks_per_day),
                address_fraction: fraction.unwrap_or(defaults.address_fraction),
                out_dir: out_dir.unwrap_or_else(|| PathBuf::from(&cfg.snapshot_dir)),
                fetch_pause: defaults.fetch_pause,
            };
            let summary = snapshot::run(&explorer, &snap_cfg, rng_seed).await?;
            info!(
                "snapshot wrote {} blocks and {} addresses ({} failures) to {}",
                summary.blocks_written,
                summary.addresses_written,
                summary.failures,
                snap_cfg.out_dir.display()
            );
        }
    }

    Ok(())
}

fn emit_edges(
    edges: &[btc_netgraph::models::Edge],
    origin: Option<&str>,
    out: Option<&Path>,
) -> eyre::Result<()> {
    match out {
        Some(path) => {
            graph::write_dot(path, edges, origin)?;
            info!("wrote {} edges to {}", edges.len(), path.display());
        }
        None => {
            for edge in edges {
                println!("Edge:{}", serde_json::to_string(edge)?);
            }
        }
    }
    Ok(())
}
