//! Icebox demo - fetch URLs through the response cache
//!
//! Each URL is requested `--repeat` times so the second and later requests
//! show cache hits.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use icebox::config::parse_timeout;
use icebox::{Cache, CacheConfig, CachedClient, HttpRequest, ReqwestTransport};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch URLs through a TTL response cache.
///
/// Flags override the ICEBOX_* environment variables.
#[derive(Debug, Parser)]
#[command(name = "icebox", version, about)]
struct Args {
    /// URLs to fetch with GET
    #[arg(required = true)]
    urls: Vec<String>,

    /// Store backend: memory, file or memcached
    #[arg(short, long)]
    store: Option<String>,

    /// Entry TTL in seconds (fractions allowed)
    #[arg(short, long, value_parser = parse_timeout_arg)]
    timeout: Option<Duration>,

    /// Directory for the file store
    #[arg(short, long)]
    location: Option<PathBuf>,

    /// Cache log target: stdout, off, tracing or a file path
    #[arg(long)]
    log: Option<String>,

    /// Memcached address for the memcached store
    #[arg(long)]
    memcached: Option<String>,

    /// Extra query parameter, NAME=VALUE (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// How many times to request each URL
    #[arg(short, long, default_value_t = 2)]
    repeat: usize,

    /// Print response bodies
    #[arg(long)]
    body: bool,
}

fn parse_timeout_arg(raw: &str) -> std::result::Result<Duration, String> {
    parse_timeout(raw).ok_or_else(|| format!("invalid timeout: {}", raw))
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got {}", raw))
}

fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "icebox=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = merge_config(CacheConfig::from_env(), &args);
    info!(
        "Configuration loaded: store={}, timeout={:?}, location={:?}",
        config.store, config.timeout, config.location
    );

    let cache = Cache::from_config(&config).context("failed to configure cache")?;
    let transport = ReqwestTransport::new(REQUEST_TIMEOUT).context("failed to build HTTP client")?;
    let client = CachedClient::new(transport, cache);

    for url in &args.urls {
        let request = HttpRequest::get(url.as_str()).params(args.params.iter().cloned());
        for _ in 0..args.repeat {
            let exchange = client
                .request(&request)
                .with_context(|| format!("request to {} failed", url))?;
            println!(
                "{} {} bytes [{}] {}",
                exchange.response.status,
                exchange.response.body.len(),
                exchange.outcome,
                url
            );
            if args.body {
                println!("{}", exchange.response.text());
            }
        }
    }

    let stats = client.cache().stats();
    info!(
        "Cache stats: hits={}, misses={}, sets={}, hit_rate={:.2}",
        stats.hits,
        stats.misses,
        stats.sets,
        stats.hit_rate()
    );
    Ok(())
}

fn merge_config(mut config: CacheConfig, args: &Args) -> CacheConfig {
    if let Some(store) = &args.store {
        config.store = store.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if let Some(location) = &args.location {
        config.location = Some(location.clone());
    }
    if let Some(log) = &args.log {
        config.log = Some(log.clone());
    }
    if let Some(memcached) = &args.memcached {
        config.memcached = Some(memcached.clone());
    }
    config
}
