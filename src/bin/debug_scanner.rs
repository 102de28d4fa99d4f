use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use pairscanner::arguments::print_debug_info;
use pairscanner::config::{get_config_clone, load_config, load_config_from_path, save_config};
use pairscanner::logger::{self, LogTag};
use pairscanner::scanner::filters::passes_at;
use pairscanner::scanner::format::{format_age_at, format_change, format_usd};
use pairscanner::scanner::{Chain, ScannerApiClient, SnapshotSource};
use std::path::Path;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListArg {
    Trending,
    New,
}

/// Fetch one snapshot page with a list's configured filter and print it.
///
/// Useful for checking what the scanner API returns for a filter before the
/// live session merges anything into it.
#[derive(Parser, Debug)]
#[command(name = "debug_scanner", about = "Fetch and print one scanner snapshot page")]
struct Args {
    /// Which list's filter to use
    #[arg(long, value_enum, default_value_t = ListArg::Trending)]
    list: ListArg,

    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Override the filter chain (ETH, BSC, BASE, SOL)
    #[arg(long)]
    chain: Option<Chain>,

    /// Override the API base URL from config
    #[arg(long)]
    base_url: Option<String>,

    /// Config file path (default data/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Maximum rows to print
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Write the effective config (file plus --base-url) to this path and exit
    #[arg(long)]
    write_config: Option<String>,

    /// Print records as JSON instead of a text listing
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log each request
    #[arg(long, default_value_t = false)]
    debug_api: bool,

    /// Log every filter rejection
    #[arg(long, default_value_t = false)]
    debug_filtering: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    pairscanner::paths::ensure_all_directories().map_err(|e| anyhow!(e))?;
    logger::init();
    if args.debug_api || args.debug_filtering {
        print_debug_info();
    }

    let loaded = match &args.config {
        Some(path) => load_config_from_path(Path::new(path)),
        None => load_config(),
    };
    loaded
        .map_err(|e| anyhow!(e))
        .context("Failed to load configuration")?;
    let mut config = get_config_clone();
    if let Some(base_url) = &args.base_url {
        config.api.base_url = base_url.clone();
    }

    if let Some(path) = &args.write_config {
        config.validate().map_err(|e| anyhow!(e)).context("Refusing to write invalid config")?;
        save_config(&config, Path::new(path))
            .map_err(|e| anyhow!(e))
            .context("Failed to write config")?;
        logger::flush();
        return Ok(());
    }

    let mut spec = match args.list {
        ListArg::Trending => config.lists.trending_filter.clone(),
        ListArg::New => config.lists.new_filter.clone(),
    };
    if let Some(chain) = args.chain {
        spec.chain = Some(chain);
    }

    let client = ScannerApiClient::new(&config.api.base_url, config.api.timeout_secs)
        .context("Failed to build scanner API client")?;

    logger::info(
        LogTag::Api,
        &format!(
            "Fetching {:?} page {} from {} ({})",
            args.list,
            args.page,
            client.base_url(),
            spec.summary()
        ),
    );

    let page = client
        .fetch_page(&spec, args.page)
        .await
        .with_context(|| format!("Snapshot fetch for page {} failed", args.page))?;

    let now = Utc::now();
    let accepted = page
        .records
        .iter()
        .filter(|record| passes_at(record, &spec, now))
        .count();

    logger::info(
        LogTag::Api,
        &format!(
            "Received {} pairs ({} pass the local filter){}",
            page.records.len(),
            accepted,
            if page.is_last_page { ", last page" } else { "" }
        ),
    );

    let shown: Vec<_> = page.records.iter().take(args.limit).collect();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&shown).context("Failed to serialize records")?
        );
        return Ok(());
    }

    for record in shown {
        let volume = record
            .volume_usd
            .map(format_usd)
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:<12} {:<5} price {:<12} vol {:<10} mcap {:<10} 24h {:<6} B/S {}/{} age {:<4} {}",
            record.token_symbol,
            record.chain,
            format_usd(record.price_usd),
            volume,
            format_usd(record.mcap),
            format_change(record.price_change.h24),
            record.transactions.buys,
            record.transactions.sells,
            format_age_at(record.created_at, now),
            record.id
        );
    }

    logger::flush();
    Ok(())
}
