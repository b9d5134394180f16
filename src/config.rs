use dotenvy::dotenv;
use eyre::Result;
use std::env;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub explorer_base_url: String,
    pub http_timeout_secs: u64,
    pub crawl_depth: u32,
    pub crawl_sample_size: usize,
    /// Global edge ceiling for the strict crawl variant. `None` disables it.
    pub crawl_edge_ceiling: Option<usize>,
    pub model_path: String,
    pub snapshot_dir: String,
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    let explorer_base_url =
        env::var("EXPLORER_BASE_URL").unwrap_or_else(|_| "https://blockchain.info".to_string());

    let http_timeout_secs = env::var("HTTP_TIMEOUT_SECS")
        .unwrap_or_else(|_| "15".to_string())
        .parse()
        .unwrap_or(15);

    let crawl_depth = env::var("CRAWL_DEPTH")
        .unwrap_or_else(|_| "1".to_string())
        .parse()
        .unwrap_or(1);

    let crawl_sample_size = env::var("CRAWL_SAMPLE_SIZE")
        .unwrap_or_else(|_| "20".to_string())
        .parse()
        .unwrap_or(20);

    // 0 disables the ceiling (the unbounded crawl variant).
    let crawl_edge_ceiling = match env::var("CRAWL_EDGE_CEILING")
        .unwrap_or_else(|_| "500".to_string())
        .parse()
        .unwrap_or(500)
    {
        0 => None,
        n => Some(n),
    };

    let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "model.json".to_string());

    let snapshot_dir = env::var("SNAPSHOT_DIR").unwrap_or_else(|_| "data".to_string());

    let cfg = Config {
        explorer_base_url,
        http_timeout_secs,
        crawl_depth,
        crawl_sample_size,
        crawl_edge_ceiling,
        model_path,
        snapshot_dir,
    };

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}
