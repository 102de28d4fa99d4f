/// Periodic console summary of both scanner lists
///
/// Renders the top rows of each list as a table, the way the console
/// dashboard shows them, and logs a one-line status per list.
use chrono::{DateTime, Utc};
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tokio::sync::watch;

use crate::arguments::is_quiet_enabled;
use crate::config::DisplayConfig;
use crate::logger::{self, LogTag};
use crate::scanner::format::{format_age_at, format_change, format_usd};
use crate::scanner::{AssetRecord, ListKind, ListView, ScannerHandle, ScannerViews};

/// One table row per pair
#[derive(Tabled)]
pub struct PairRowDisplay {
    #[tabled(rename = "🏷️ Token")]
    token: String,
    #[tabled(rename = "⛓️ Chain")]
    chain: String,
    #[tabled(rename = "💲 Price")]
    price: String,
    #[tabled(rename = "📊 Volume")]
    volume: String,
    #[tabled(rename = "🏦 MCap")]
    mcap: String,
    #[tabled(rename = "💧 Liq")]
    liquidity: String,
    #[tabled(rename = "5m")]
    change_5m: String,
    #[tabled(rename = "1h")]
    change_1h: String,
    #[tabled(rename = "24h")]
    change_24h: String,
    #[tabled(rename = "B/S")]
    buys_sells: String,
    #[tabled(rename = "⏱️ Age")]
    age: String,
    #[tabled(rename = "🔍 Audit")]
    audit: String,
}

impl PairRowDisplay {
    pub fn from_record(record: &AssetRecord, now: DateTime<Utc>) -> Self {
        let volume = match record.volume_usd {
            Some(v) => format_usd(v),
            None => "?".to_string(),
        };

        Self {
            token: format!("{}/{}", record.token_symbol, record.chain),
            chain: record.chain.to_string(),
            price: format_usd(record.price_usd),
            volume,
            mcap: format_usd(record.mcap),
            liquidity: format_usd(record.liquidity.current),
            change_5m: format_change(record.price_change.m5),
            change_1h: format_change(record.price_change.h1),
            change_24h: format_change(record.price_change.h24),
            buys_sells: format!("{}/{}", record.transactions.buys, record.transactions.sells),
            age: format_age_at(record.created_at, now),
            audit: audit_label(record),
        }
    }
}

/// `HP` for honeypots, `✓` for verified contracts, `?` while unknown
fn audit_label(record: &AssetRecord) -> String {
    let audit = &record.audit;
    if audit.is_empty() {
        return "?".to_string();
    }
    if audit.is_honeypot() {
        return "HP".to_string();
    }
    if audit.is_verified() {
        return "✓".to_string();
    }
    "-".to_string()
}

/// Status line for one list
pub fn list_status_line(view: &ListView) -> String {
    let mut line = format!(
        "{}: {} pairs, page {}, sort {} {}",
        view.kind.label().to_uppercase(),
        view.total,
        view.page,
        view.sort.key,
        view.sort.direction
    );
    if view.loading {
        line.push_str(", loading");
    }
    if view.exhausted {
        line.push_str(", exhausted");
    }
    if let Some(error) = &view.error {
        line.push_str(&format!(", error: {}", error));
    }
    line
}

/// Table of the first `rows` records of a list
pub fn render_list(view: &ListView, rows: usize, now: DateTime<Utc>) -> String {
    let displays: Vec<PairRowDisplay> = view
        .rows
        .iter()
        .take(rows)
        .map(|record| PairRowDisplay::from_record(record, now))
        .collect();

    if displays.is_empty() {
        return "  (no pairs)\n".to_string();
    }

    let mut table = Table::new(displays);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::center()));
    format!("{}\n", table)
}

/// Full summary for both lists
pub fn render_summary(views: &ScannerViews, rows: usize, now: DateTime<Utc>) -> String {
    let mut output = format!("\n📡 Session: {:?}\n", views.session);
    for kind in ListKind::ALL {
        let view = views.list(kind);
        output.push_str(&format!("\n{}\n", list_status_line(view)));
        output.push_str(&render_list(view, rows, now));
    }
    output
}

/// Print a summary every `summary_interval_secs` until shutdown
pub async fn run_summary_loop(
    handle: ScannerHandle,
    display: DisplayConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval_secs = display.summary_interval_secs.max(1);
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // first tick fires immediately and the lists are still loading
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let views = handle.views();
                let now = Utc::now();

                for kind in ListKind::ALL {
                    logger::info(LogTag::Summary, &list_status_line(views.list(kind)));
                }
                if !is_quiet_enabled() {
                    print!("{}", render_summary(&views, display.summary_rows, now));
                }
            }
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
