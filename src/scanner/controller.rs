/// Per-list state machine: one filter spec, one record set
///
/// The controller is purely synchronous. The service owns both controllers,
/// runs the fetches they ask for and feeds results and live events back in.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use super::api::SnapshotPage;
use super::filters::FilterSpec;
use super::merge::{
    apply_pair_stats, apply_tick, merge_records, upsert_records, PairStatsUpdate, TradeTick,
};
use super::messages::{OutgoingMessage, PairSubscription};
use super::pager::{FetchTicket, SnapshotPager};
use super::sort::{sorted, SortConfig, SortField};
use super::types::AssetRecord;
use crate::arguments::is_debug_scanner_enabled;
use crate::errors::FetchError;
use crate::logger::{self, LogTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Trending,
    New,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Trending, ListKind::New];

    pub fn label(&self) -> &'static str {
        match self {
            ListKind::Trending => "trending",
            ListKind::New => "new",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happened to a finished fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied { page: u32, records: usize },
    Stale,
    Failed,
}

/// Read-only snapshot of a list for presentation
#[derive(Debug, Clone, Serialize)]
pub struct ListView {
    pub kind: ListKind,
    pub spec: FilterSpec,
    pub sort: SortConfig,
    /// Sorted, possibly truncated
    pub rows: Vec<AssetRecord>,
    pub total: usize,
    pub page: u32,
    pub loading: bool,
    pub exhausted: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListController {
    kind: ListKind,
    spec: FilterSpec,
    records: Vec<AssetRecord>,
    sort: SortConfig,
    pager: SnapshotPager,
    last_error: Option<FetchError>,
    subscribed: HashSet<String>,
}

impl ListController {
    pub fn new(kind: ListKind, spec: FilterSpec, sort: SortConfig) -> Self {
        Self {
            kind,
            spec,
            records: Vec::new(),
            sort,
            pager: SnapshotPager::new(),
            last_error: None,
            subscribed: HashSet::new(),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn sort_config(&self) -> SortConfig {
        self.sort
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pager.is_loading()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pager.is_exhausted()
    }

    pub fn contains(&self, pair_id: &str) -> bool {
        self.records.iter().any(|r| r.id == pair_id)
    }

    /// Restart from page 1 with the current filter
    pub fn begin_refresh(&mut self) -> FetchTicket {
        self.pager.begin_refresh(&self.spec)
    }

    /// Next page, if not loading and not exhausted
    pub fn begin_load_more(&mut self) -> Option<FetchTicket> {
        self.pager.begin_next(&self.spec)
    }

    /// Replace the filter wholesale; results of older fetches become stale
    pub fn set_filter(&mut self, spec: FilterSpec) -> FetchTicket {
        logger::info(
            LogTag::Scanner,
            &format!("{} filter changed: {}", self.kind, spec.summary()),
        );
        self.spec = spec;
        self.begin_refresh()
    }

    pub fn toggle_sort(&mut self, field: SortField) -> SortConfig {
        self.sort.toggle(field);
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortConfig) {
        self.sort = sort;
    }

    /// Feed back the result of a fetch this controller issued
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<SnapshotPage, FetchError>,
        now: DateTime<Utc>,
    ) -> FetchOutcome {
        if !self.pager.is_current(ticket) {
            if is_debug_scanner_enabled() {
                logger::debug(
                    LogTag::Scanner,
                    &format!(
                        "{} dropped stale page {} (generation {} != {})",
                        self.kind,
                        ticket.page,
                        ticket.generation,
                        self.pager.generation()
                    ),
                );
            }
            return FetchOutcome::Stale;
        }

        match result {
            Ok(page) => {
                if ticket.is_replacement() {
                    self.records = merge_records(&self.records, page.records, &self.spec, now);
                } else {
                    let stats = upsert_records(&mut self.records, page.records, &self.spec, now);
                    if is_debug_scanner_enabled() {
                        logger::debug(
                            LogTag::Scanner,
                            &format!(
                                "{} page {}: +{} new, {} updated, {} filtered",
                                self.kind, ticket.page, stats.inserted, stats.updated, stats.rejected
                            ),
                        );
                    }
                }
                self.pager.complete(ticket, page.is_last_page);
                self.last_error = None;
                FetchOutcome::Applied {
                    page: ticket.page,
                    records: self.records.len(),
                }
            }
            Err(e) => {
                logger::warning(
                    LogTag::Scanner,
                    &format!("{} page {} failed: {}", self.kind, ticket.page, e),
                );
                self.pager.fail(ticket);
                self.last_error = Some(e);
                FetchOutcome::Failed
            }
        }
    }

    /// Live `scanner-pairs` replacement, filtered by this list's spec
    pub fn apply_snapshot(&mut self, incoming: Vec<AssetRecord>, now: DateTime<Utc>) -> usize {
        self.records = merge_records(&self.records, incoming, &self.spec, now);
        self.records.len()
    }

    pub fn apply_tick(&mut self, tick: &TradeTick) -> bool {
        apply_tick(&mut self.records, tick)
    }

    pub fn apply_pair_stats(&mut self, update: &PairStatsUpdate) -> bool {
        apply_pair_stats(&mut self.records, update)
    }

    /// Forget what was subscribed; the remote side lost it on reconnect
    pub fn reset_subscriptions(&mut self) {
        self.subscribed.clear();
    }

    /// Subscriptions for every held pair not yet subscribed, followed by
    /// the current filter
    ///
    /// Pairs that left the list are forgotten, so the set tracks the list
    /// size rather than every pair seen during the connection.
    pub fn subscription_commands(&mut self) -> Vec<OutgoingMessage> {
        let held: HashSet<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        self.subscribed.retain(|id| held.contains(id.as_str()));

        let mut commands = Vec::new();
        for record in &self.records {
            if self.subscribed.insert(record.id.clone()) {
                let subscription = PairSubscription::for_record(record);
                commands.push(OutgoingMessage::SubscribePair(subscription.clone()));
                commands.push(OutgoingMessage::SubscribePairStats(subscription));
            }
        }
        commands.push(OutgoingMessage::ScannerFilter(self.spec.clone()));
        commands
    }

    pub fn view(&self, limit: Option<usize>) -> ListView {
        let mut rows = sorted(&self.records, &self.sort);
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        ListView {
            kind: self.kind,
            spec: self.spec.clone(),
            sort: self.sort,
            rows,
            total: self.records.len(),
            page: self.pager.page(),
            loading: self.pager.is_loading(),
            exhausted: self.pager.is_exhausted(),
            error: self.last_error.as_ref().map(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::sort::SortDirection;
    use crate::scanner::types::fixtures::record;

    fn page(records: Vec<AssetRecord>, is_last_page: bool) -> Result<SnapshotPage, FetchError> {
        Ok(SnapshotPage {
            records,
            is_last_page,
        })
    }

    fn controller() -> ListController {
        ListController::new(
            ListKind::Trending,
            FilterSpec::default(),
            SortConfig::trending_default(),
        )
    }

    #[test]
    fn test_refresh_then_load_more_extends() {
        let now = Utc::now();
        let mut list = controller();

        let first = list.begin_refresh();
        let outcome = list.complete_fetch(&first, page(vec![record("A", now, 1)], false), now);
        assert_eq!(outcome, FetchOutcome::Applied { page: 1, records: 1 });

        let second = list.begin_load_more().unwrap();
        list.complete_fetch(&second, page(vec![record("B", now, 1)], false), now);
        assert_eq!(list.records().len(), 2);

        let third = list.begin_load_more().unwrap();
        list.complete_fetch(&third, page(vec![], true), now);
        assert!(list.is_exhausted());
        assert!(list.begin_load_more().is_none());
        assert_eq!(list.records().len(), 2);
    }

    #[test]
    fn test_stale_page_after_filter_change_is_dropped() {
        let now = Utc::now();
        let mut list = controller();
        let old = list.begin_refresh();
        let new = list.set_filter(FilterSpec::new_pairs());

        assert_eq!(
            list.complete_fetch(&old, page(vec![record("OLD", now, 1)], false), now),
            FetchOutcome::Stale
        );
        assert!(list.records().is_empty());
        assert!(list.is_loading());

        list.complete_fetch(&new, page(vec![record("NEW", now, 1)], false), now);
        assert!(list.contains("NEW"));
        assert!(!list.is_loading());
    }

    #[test]
    fn test_failed_fetch_keeps_records_and_sets_error() {
        let now = Utc::now();
        let mut list = controller();
        let first = list.begin_refresh();
        list.complete_fetch(&first, page(vec![record("A", now, 1)], false), now);

        let retry = list.begin_refresh();
        let err = FetchError::HttpStatus {
            endpoint: "/scanner".to_string(),
            status: 500,
            body: String::new(),
        };
        assert_eq!(list.complete_fetch(&retry, Err(err), now), FetchOutcome::Failed);
        assert!(list.contains("A"));
        assert!(list.view(None).error.unwrap().contains("500"));

        let again = list.begin_refresh();
        list.complete_fetch(&again, page(vec![record("A", now, 1)], false), now);
        assert!(list.last_error().is_none());
    }

    #[test]
    fn test_subscriptions_only_for_new_pairs() {
        let now = Utc::now();
        let mut list = controller();
        list.apply_snapshot(vec![record("A", now, 1), record("B", now, 1)], now);

        let first = list.subscription_commands();
        assert_eq!(first.len(), 5);
        assert!(matches!(first.last(), Some(OutgoingMessage::ScannerFilter(_))));

        list.apply_snapshot(vec![record("A", now, 1), record("B", now, 1), record("C", now, 1)], now);
        let second = list.subscription_commands();
        assert_eq!(second.len(), 3);
        assert!(matches!(&second[0], OutgoingMessage::SubscribePair(s) if s.pair == "C"));

        list.reset_subscriptions();
        assert_eq!(list.subscription_commands().len(), 7);
    }

    #[test]
    fn test_view_sorts_and_truncates() {
        let now = Utc::now();
        let mut list = controller();
        let mut records = vec![record("A", now, 1), record("B", now, 1), record("C", now, 1)];
        records[0].volume_usd = Some(10.0);
        records[1].volume_usd = Some(30.0);
        records[2].volume_usd = Some(20.0);
        list.apply_snapshot(records, now);

        let view = list.view(Some(2));
        let ids: Vec<&str> = view.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C"]);
        assert_eq!(view.total, 3);

        assert_eq!(list.toggle_sort(SortField::TokenName).direction, SortDirection::Asc);
        let ids: Vec<String> = list.view(None).rows.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_subscribed_set_follows_held_pairs() {
        let now = Utc::now();
        let mut list = controller();
        list.apply_snapshot(vec![record("A", now, 1), record("B", now, 1)], now);
        assert_eq!(list.subscription_commands().len(), 5);

        // B drops out of the list, then comes back later
        list.apply_snapshot(vec![record("A", now, 1)], now);
        assert_eq!(list.subscription_commands().len(), 1);
        assert_eq!(list.subscribed.len(), 1);

        list.apply_snapshot(vec![record("A", now, 1), record("B", now, 1)], now);
        let commands = list.subscription_commands();
        assert_eq!(commands.len(), 3);
        assert!(matches!(&commands[0], OutgoingMessage::SubscribePair(s) if s.pair == "B"));
    }

    #[test]
    fn test_new_filter_is_not_exhausted_by_old_one() {
        let now = Utc::now();
        let mut list = controller();
        let only = list.begin_refresh();
        list.complete_fetch(&only, page(vec![record("A", now, 1)], true), now);
        assert!(list.is_exhausted());

        let replaced = list.set_filter(FilterSpec::new_pairs());
        let err = FetchError::HttpStatus {
            endpoint: "/scanner".to_string(),
            status: 500,
            body: String::new(),
        };
        assert_eq!(list.complete_fetch(&replaced, Err(err), now), FetchOutcome::Failed);

        assert!(!list.is_exhausted());
        let retry = list.begin_load_more().unwrap();
        assert_eq!(retry.page, 1);
        assert_eq!(retry.spec, FilterSpec::new_pairs());
    }
}
