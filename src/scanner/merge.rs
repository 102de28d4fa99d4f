/// Record merge and incremental event application
///
/// Snapshot data and live updates race each other: a page fetched a few seconds
/// ago must not roll back prices, volume or audit flags the live stream already
/// delivered. The per-pair rule below is shared by full replacements and
/// follow-up pages.
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::filters::{passes_at, FilterSpec};
use super::types::{AssetRecord, AuditFlags};

/// Latest usable trade of a tick event
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTick {
    pub pair_id: String,
    pub price_usd: f64,
    /// amount x price, in USD
    pub notional_usd: f64,
    pub is_buy: bool,
}

/// Audit flags pushed by a `pair-stats` event
#[derive(Debug, Clone, PartialEq)]
pub struct PairStatsUpdate {
    pub pair_id: String,
    pub audit: AuditFlags,
}

/// Counts of what an upsert did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

fn max_volume(incoming: Option<f64>, existing: Option<f64>) -> Option<f64> {
    match (incoming, existing) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Combine a fresh snapshot record with the held one for the same pair
pub fn merge_pair(existing: &AssetRecord, incoming: AssetRecord) -> AssetRecord {
    let mut merged = incoming;

    merged.price_usd = existing.price_usd;
    merged.mcap = existing.mcap;
    merged.volume_usd = max_volume(merged.volume_usd, existing.volume_usd);
    merged.transactions.buys = merged.transactions.buys.max(existing.transactions.buys);
    merged.transactions.sells = merged.transactions.sells.max(existing.transactions.sells);
    merged.liquidity.current = merged.liquidity.current.max(existing.liquidity.current);
    if !existing.audit.is_empty() {
        merged.audit = existing.audit;
    }

    merged
}

/// Authoritative replacement: the result holds exactly the incoming records
/// that pass `spec`, each merged with its held counterpart
pub fn merge_records(
    existing: &[AssetRecord],
    incoming: Vec<AssetRecord>,
    spec: &FilterSpec,
    now: DateTime<Utc>,
) -> Vec<AssetRecord> {
    let by_id: HashMap<&str, &AssetRecord> =
        existing.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut result: Vec<AssetRecord> = Vec::with_capacity(incoming.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in incoming {
        if !passes_at(&record, spec, now) {
            continue;
        }

        let merged = match by_id.get(record.id.as_str()) {
            Some(held) => merge_pair(held, record),
            None => record,
        };

        // Duplicate ids within one batch: last one wins, first position kept
        match positions.get(&merged.id) {
            Some(&idx) => result[idx] = merged,
            None => {
                positions.insert(merged.id.clone(), result.len());
                result.push(merged);
            }
        }
    }

    result
}

/// Follow-up page: same per-pair rule, but held records missing from the
/// page stay in the list and new ones are appended
pub fn upsert_records(
    existing: &mut Vec<AssetRecord>,
    incoming: Vec<AssetRecord>,
    spec: &FilterSpec,
    now: DateTime<Utc>,
) -> UpsertStats {
    let mut stats = UpsertStats::default();
    let mut positions: HashMap<String, usize> = existing
        .iter()
        .enumerate()
        .map(|(idx, r)| (r.id.clone(), idx))
        .collect();

    for record in incoming {
        if !passes_at(&record, spec, now) {
            stats.rejected += 1;
            continue;
        }

        match positions.get(&record.id) {
            Some(&idx) => {
                existing[idx] = merge_pair(&existing[idx], record);
                stats.updated += 1;
            }
            None => {
                positions.insert(record.id.clone(), existing.len());
                existing.push(record);
                stats.inserted += 1;
            }
        }
    }

    stats
}

/// Apply a trade in place; false when the pair is not held
pub fn apply_tick(records: &mut [AssetRecord], tick: &TradeTick) -> bool {
    let Some(record) = records.iter_mut().find(|r| r.id == tick.pair_id) else {
        return false;
    };

    record.price_usd = tick.price_usd;
    record.volume_usd = Some(record.volume_or_zero() + tick.notional_usd);
    if tick.is_buy {
        record.transactions.buys += 1;
    } else {
        record.transactions.sells += 1;
    }
    true
}

/// Overwrite audit flags in place; false when the pair is not held
pub fn apply_pair_stats(records: &mut [AssetRecord], update: &PairStatsUpdate) -> bool {
    let Some(record) = records.iter_mut().find(|r| r.id == update.pair_id) else {
        return false;
    };

    record.audit = update.audit;
    true
}
