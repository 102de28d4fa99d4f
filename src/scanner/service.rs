/// Scanner service: the single event loop that owns both list controllers
///
/// Every mutation of list state happens on this loop. Snapshot fetches run as
/// their own tasks and report back through a channel; live session events and
/// user commands arrive the same way. After each change the service publishes
/// fresh `ScannerViews` on a watch channel.
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::api::{ScannerApiClient, SnapshotPage, SnapshotSource};
use super::controller::{FetchOutcome, ListController, ListKind, ListView};
use super::convert::convert_rows;
use super::filters::FilterSpec;
use super::messages::IncomingMessage;
use super::pager::FetchTicket;
use super::session::{spawn_session, ReconnectPolicy, SessionEvent, SessionHandle, SessionState};
use super::sort::SortField;
use crate::arguments::is_debug_scanner_enabled;
use crate::config::Config;
use crate::errors::{FetchError, ScannerError};
use crate::logger::{self, LogTag};

/// User actions, one per list
#[derive(Debug, Clone, PartialEq)]
pub enum ScannerCommand {
    SetFilter { list: ListKind, spec: FilterSpec },
    LoadMore(ListKind),
    Refresh(ListKind),
    ToggleSort { list: ListKind, field: SortField },
}

/// Everything the presentation layer needs, published after each change
#[derive(Debug, Clone)]
pub struct ScannerViews {
    pub trending: ListView,
    pub new: ListView,
    pub session: SessionState,
    pub updated_at: DateTime<Utc>,
}

impl ScannerViews {
    pub fn list(&self, kind: ListKind) -> &ListView {
        match kind {
            ListKind::Trending => &self.trending,
            ListKind::New => &self.new,
        }
    }
}

/// Cloneable front door to a running service
#[derive(Debug, Clone)]
pub struct ScannerHandle {
    commands: mpsc::UnboundedSender<ScannerCommand>,
    views: watch::Receiver<ScannerViews>,
}

impl ScannerHandle {
    pub fn send(&self, command: ScannerCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn set_filter(&self, list: ListKind, spec: FilterSpec) -> bool {
        self.send(ScannerCommand::SetFilter { list, spec })
    }

    pub fn load_more(&self, list: ListKind) -> bool {
        self.send(ScannerCommand::LoadMore(list))
    }

    pub fn refresh(&self, list: ListKind) -> bool {
        self.send(ScannerCommand::Refresh(list))
    }

    pub fn toggle_sort(&self, list: ListKind, field: SortField) -> bool {
        self.send(ScannerCommand::ToggleSort { list, field })
    }

    /// Latest published views
    pub fn views(&self) -> ScannerViews {
        self.views.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScannerViews> {
        self.views.clone()
    }
}

#[derive(Debug)]
struct FetchResult {
    list: ListKind,
    ticket: FetchTicket,
    result: Result<SnapshotPage, FetchError>,
}

pub struct ScannerService {
    trending: ListController,
    new: ListController,
    source: Arc<dyn SnapshotSource>,
    session: SessionHandle,
    commands_tx: mpsc::UnboundedSender<ScannerCommand>,
    commands_rx: mpsc::UnboundedReceiver<ScannerCommand>,
    fetch_tx: mpsc::UnboundedSender<FetchResult>,
    fetch_rx: mpsc::UnboundedReceiver<FetchResult>,
    views_tx: watch::Sender<ScannerViews>,
}

impl ScannerService {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        session: SessionHandle,
        trending: ListController,
        new: ListController,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let initial = ScannerViews {
            trending: trending.view(None),
            new: new.view(None),
            session: session.state(),
            updated_at: Utc::now(),
        };
        let (views_tx, _) = watch::channel(initial);

        Self {
            trending,
            new,
            source,
            session,
            commands_tx,
            commands_rx,
            fetch_tx,
            fetch_rx,
            views_tx,
        }
    }

    pub fn handle(&self) -> ScannerHandle {
        ScannerHandle {
            commands: self.commands_tx.clone(),
            views: self.views_tx.subscribe(),
        }
    }

    fn controller_mut(&mut self, kind: ListKind) -> &mut ListController {
        match kind {
            ListKind::Trending => &mut self.trending,
            ListKind::New => &mut self.new,
        }
    }

    fn controllers_mut(&mut self) -> [&mut ListController; 2] {
        [&mut self.trending, &mut self.new]
    }

    fn spawn_fetch(&self, list: ListKind, ticket: FetchTicket) {
        let source = Arc::clone(&self.source);
        let results = self.fetch_tx.clone();

        if is_debug_scanner_enabled() {
            logger::debug(
                LogTag::Scanner,
                &format!(
                    "{} fetching page {} (generation {})",
                    list, ticket.page, ticket.generation
                ),
            );
        }

        tokio::spawn(async move {
            let result = source.fetch_page(&ticket.spec, ticket.page).await;
            let _ = results.send(FetchResult {
                list,
                ticket,
                result,
            });
        });
    }

    /// Kick off page 1 for both lists
    pub fn refresh_all(&mut self) {
        for kind in ListKind::ALL {
            let ticket = self.controller_mut(kind).begin_refresh();
            self.spawn_fetch(kind, ticket);
        }
    }

    pub fn handle_command(&mut self, command: ScannerCommand) {
        match command {
            ScannerCommand::SetFilter { list, spec } => {
                let ticket = self.controller_mut(list).set_filter(spec);
                self.spawn_fetch(list, ticket);
                // server-side hint goes out now, not after page 1 lands
                self.sync_subscriptions(list);
            }
            ScannerCommand::LoadMore(list) => match self.controller_mut(list).begin_load_more() {
                Some(ticket) => self.spawn_fetch(list, ticket),
                None => {
                    if is_debug_scanner_enabled() {
                        logger::debug(
                            LogTag::Scanner,
                            &format!("{} load more ignored (loading or exhausted)", list),
                        );
                    }
                }
            },
            ScannerCommand::Refresh(list) => {
                let ticket = self.controller_mut(list).begin_refresh();
                self.spawn_fetch(list, ticket);
            }
            ScannerCommand::ToggleSort { list, field } => {
                let sort = self.controller_mut(list).toggle_sort(field);
                if is_debug_scanner_enabled() {
                    logger::debug(
                        LogTag::Scanner,
                        &format!("{} sorted by {} {}", list, sort.key, sort.direction),
                    );
                }
            }
        }
        self.publish();
    }

    fn handle_fetch_result(&mut self, fetched: FetchResult, now: DateTime<Utc>) {
        let FetchResult {
            list,
            ticket,
            result,
        } = fetched;

        let outcome = self.controller_mut(list).complete_fetch(&ticket, result, now);
        match outcome {
            FetchOutcome::Applied { page, records } => {
                logger::info(
                    LogTag::Scanner,
                    &format!("{} page {} loaded, {} records held", list, page, records),
                );
                self.sync_subscriptions(list);
            }
            FetchOutcome::Stale => return,
            FetchOutcome::Failed => {}
        }
        self.publish();
    }

    pub fn handle_session_event(&mut self, event: SessionEvent, now: DateTime<Utc>) {
        match event {
            SessionEvent::StateChanged(SessionState::Connected) => {
                for controller in self.controllers_mut() {
                    controller.reset_subscriptions();
                }
                for kind in ListKind::ALL {
                    self.sync_subscriptions(kind);
                }
            }
            SessionEvent::StateChanged(state) => {
                if is_debug_scanner_enabled() {
                    logger::debug(LogTag::Scanner, &format!("Session is now {:?}", state));
                }
            }
            SessionEvent::Message(IncomingMessage::Tick(payload)) => {
                let Some(trade) = payload.latest_trade() else {
                    return;
                };
                let mut touched = false;
                for controller in self.controllers_mut() {
                    touched |= controller.apply_tick(&trade);
                }
                if !touched {
                    return;
                }
            }
            SessionEvent::Message(IncomingMessage::PairStats(payload)) => {
                let update = payload.to_update();
                let mut touched = false;
                for controller in self.controllers_mut() {
                    touched |= controller.apply_pair_stats(&update);
                }
                if !touched {
                    return;
                }
            }
            SessionEvent::Message(IncomingMessage::ScannerPairs(rows)) => {
                let records = convert_rows(&rows);
                for controller in self.controllers_mut() {
                    let held = controller.apply_snapshot(records.clone(), now);
                    if is_debug_scanner_enabled() {
                        logger::debug(
                            LogTag::Scanner,
                            &format!(
                                "{} replaced from live snapshot: {} of {} rows kept",
                                controller.kind(),
                                held,
                                records.len()
                            ),
                        );
                    }
                }
                for kind in ListKind::ALL {
                    self.sync_subscriptions(kind);
                }
            }
        }
        self.publish();
    }

    /// Subscribe newly held pairs; skipped while disconnected so the full
    /// set goes out on the next connect
    fn sync_subscriptions(&mut self, list: ListKind) {
        if !self.session.is_connected() {
            return;
        }
        let commands = self.controller_mut(list).subscription_commands();
        let count = commands.len();
        for command in commands {
            self.session.send(command);
        }
        if is_debug_scanner_enabled() {
            logger::debug(
                LogTag::Scanner,
                &format!("{} sent {} subscription commands", list, count),
            );
        }
    }

    fn publish(&self) {
        let views = ScannerViews {
            trending: self.trending.view(None),
            new: self.new.view(None),
            session: self.session.state(),
            updated_at: Utc::now(),
        };
        self.views_tx.send_replace(views);
    }

    /// Run until shutdown is requested
    pub async fn run(
        mut self,
        mut session_events: mpsc::UnboundedReceiver<SessionEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        self.refresh_all();
        self.publish();
        let mut session_open = true;

        loop {
            tokio::select! {
                Some(command) = self.commands_rx.recv() => self.handle_command(command),
                Some(fetched) = self.fetch_rx.recv() => self.handle_fetch_result(fetched, Utc::now()),
                event = session_events.recv(), if session_open => match event {
                    Some(event) => self.handle_session_event(event, Utc::now()),
                    None => session_open = false,
                },
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        logger::info(LogTag::Scanner, "Scanner service stopped");
    }
}

/// Running service and its task
pub struct ScannerRuntime {
    pub handle: ScannerHandle,
    pub task: JoinHandle<()>,
}

/// Build the HTTP source and live session from config and start the loop
pub fn start_scanner(
    config: &Config,
    shutdown: watch::Receiver<bool>,
) -> Result<ScannerRuntime, ScannerError> {
    config.validate().map_err(ScannerError::Config)?;

    let source: Arc<dyn SnapshotSource> = Arc::new(ScannerApiClient::from_config(&config.api)?);
    let policy = ReconnectPolicy::from_config(&config.session);
    let (session, session_events) =
        spawn_session(config.session.url.clone(), policy, shutdown.clone());

    let trending = ListController::new(
        ListKind::Trending,
        config.lists.trending_filter.clone(),
        config.lists.trending_sort,
    );
    let new = ListController::new(
        ListKind::New,
        config.lists.new_filter.clone(),
        config.lists.new_sort,
    );

    let service = ScannerService::new(source, session, trending, new);
    let handle = service.handle();
    let task = tokio::spawn(service.run(session_events, shutdown));

    Ok(ScannerRuntime { handle, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::messages::{OutgoingMessage, PairStatsPayload, TickPayload};
    use crate::scanner::session::testing::detached_handle;
    use crate::scanner::sort::SortConfig;
    use crate::scanner::types::fixtures::record;
    use crate::scanner::types::AssetRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::timeout;

    /// In-memory snapshot source keyed by page number
    #[derive(Default)]
    struct MemorySource {
        pages: Mutex<HashMap<u32, Vec<AssetRecord>>>,
        calls: Mutex<Vec<(FilterSpec, u32)>>,
    }

    impl MemorySource {
        fn with_page(self, page: u32, records: Vec<AssetRecord>) -> Self {
            self.pages.lock().unwrap().insert(page, records);
            self
        }
    }

    #[async_trait]
    impl SnapshotSource for MemorySource {
        async fn fetch_page(&self, spec: &FilterSpec, page: u32) -> Result<SnapshotPage, FetchError> {
            self.calls.lock().unwrap().push((spec.clone(), page));
            let records = self.pages.lock().unwrap().get(&page).cloned().unwrap_or_default();
            Ok(SnapshotPage {
                is_last_page: records.is_empty(),
                records,
            })
        }
    }

    async fn wait_until<F>(views: &mut watch::Receiver<ScannerViews>, mut pred: F) -> ScannerViews
    where
        F: FnMut(&ScannerViews) -> bool,
    {
        timeout(Duration::from_secs(5), async {
            loop {
                {
                    let current = views.borrow_and_update();
                    if pred(&current) {
                        return current.clone();
                    }
                }
                views.changed().await.unwrap();
            }
        })
        .await
        .expect("timed out waiting for views")
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OutgoingMessage>) -> Vec<OutgoingMessage> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    fn lists() -> (ListController, ListController) {
        (
            ListController::new(ListKind::Trending, FilterSpec::default(), SortConfig::trending_default()),
            ListController::new(ListKind::New, FilterSpec::new_pairs(), SortConfig::new_pairs_default()),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_fetch_live_updates_and_resubscribe() {
        let now = Utc::now();
        let mut young = record("A", now, 60);
        young.volume_usd = Some(50.0);
        young.token_address = "T".to_string();
        let old = record("B", now, 3 * 86_400);
        let source = Arc::new(MemorySource::default().with_page(1, vec![young, old]));

        let (session, mut outbound, session_state) = detached_handle(SessionState::Connected);
        let (trending, new) = lists();
        let service = ScannerService::new(source.clone(), session, trending, new);
        let handle = service.handle();
        let mut views = handle.subscribe();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(service.run(events_rx, shutdown_rx));

        // Trending keeps both, new drops the 3-day-old pair
        let snapshot = wait_until(&mut views, |v| {
            v.trending.total == 2 && v.new.total == 1 && !v.trending.loading && !v.new.loading
        })
        .await;
        assert_eq!(snapshot.new.rows[0].id, "A");

        let sent = drain(&mut outbound);
        let pair_subs = sent
            .iter()
            .filter(|m| matches!(m, OutgoingMessage::SubscribePair(_)))
            .count();
        let filters = sent
            .iter()
            .filter(|m| matches!(m, OutgoingMessage::ScannerFilter(_)))
            .count();
        assert_eq!(pair_subs, 3);
        assert_eq!(filters, 2);

        // Tick reaches both lists
        let tick: TickPayload = serde_json::from_str(
            r#"{"pair":{"pair":"A","token":"T"},"swaps":[
                {"isOutlier":false,"priceToken1Usd":"2.0","amountToken1":"10","tokenInAddress":"T"}]}"#,
        )
        .unwrap();
        events_tx
            .send(SessionEvent::Message(IncomingMessage::Tick(tick)))
            .unwrap();
        let updated = wait_until(&mut views, |v| {
            v.new.rows.first().map(|r| r.transactions.buys) == Some(1)
        })
        .await;
        let a = updated.trending.rows.iter().find(|r| r.id == "A").unwrap();
        assert_eq!(a.volume_usd, Some(70.0));
        assert_eq!(a.price_usd, 2.0);

        // Audit update
        let stats: PairStatsPayload = serde_json::from_str(
            r#"{"pair":{"pairAddress":"A","token1IsHoneypot":false,"isVerified":true}}"#,
        )
        .unwrap();
        events_tx
            .send(SessionEvent::Message(IncomingMessage::PairStats(stats)))
            .unwrap();
        wait_until(&mut views, |v| {
            v.new.rows.first().map(|r| r.audit.contract_verified) == Some(Some(true))
        })
        .await;

        // Reconnect: everything held is subscribed again
        session_state.send_replace(SessionState::Disconnected);
        events_tx
            .send(SessionEvent::StateChanged(SessionState::Disconnected))
            .unwrap();
        session_state.send_replace(SessionState::Connected);
        events_tx
            .send(SessionEvent::StateChanged(SessionState::Connected))
            .unwrap();
        let resent = timeout(Duration::from_secs(5), async {
            let mut got = Vec::new();
            while got.len() < 8 {
                got.push(outbound.recv().await.unwrap());
            }
            got
        })
        .await
        .unwrap();
        assert_eq!(
            resent
                .iter()
                .filter(|m| matches!(m, OutgoingMessage::SubscribePairStats(_)))
                .count(),
            3
        );

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_commands_load_more_and_filter_change() {
        let now = Utc::now();
        let source = Arc::new(
            MemorySource::default()
                .with_page(1, vec![record("A", now, 10)])
                .with_page(2, vec![record("B", now, 10)]),
        );
        let (session, _outbound, _state) = detached_handle(SessionState::Disconnected);
        let (trending, new) = lists();
        let service = ScannerService::new(source.clone(), session, trending, new);
        let handle = service.handle();
        let mut views = handle.subscribe();

        let (_events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(service.run(events_rx, shutdown_rx));

        wait_until(&mut views, |v| v.trending.total == 1 && !v.trending.loading).await;
        assert!(handle.load_more(ListKind::Trending));
        wait_until(&mut views, |v| v.trending.total == 2 && v.trending.page == 2).await;

        assert!(handle.load_more(ListKind::Trending));
        wait_until(&mut views, |v| v.trending.exhausted).await;

        let spec = FilterSpec {
            min_vol_24h: Some(1.0),
            ..Default::default()
        };
        assert!(handle.set_filter(ListKind::Trending, spec.clone()));
        let filtered = wait_until(&mut views, |v| v.trending.spec == spec && !v.trending.loading).await;
        assert_eq!(filtered.trending.total, 0);
        assert_eq!(filtered.trending.page, 1);

        assert!(handle.toggle_sort(ListKind::New, SortField::Mcap));
        wait_until(&mut views, |v| v.new.sort.key == SortField::Mcap).await;

        let calls = source.calls.lock().unwrap().clone();
        assert!(calls.iter().any(|(s, p)| *s == spec && *p == 1));

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    /// Source whose every page request fails with a 500
    struct FailingSource;

    #[async_trait]
    impl SnapshotSource for FailingSource {
        async fn fetch_page(&self, _spec: &FilterSpec, _page: u32) -> Result<SnapshotPage, FetchError> {
            Err(FetchError::HttpStatus {
                endpoint: "/scanner".to_string(),
                status: 500,
                body: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_filter_change_is_sent_even_when_fetch_fails() {
        let (session, mut outbound, _state) = detached_handle(SessionState::Connected);
        let (trending, new) = lists();
        let service = ScannerService::new(Arc::new(FailingSource), session, trending, new);
        let handle = service.handle();
        let mut views = handle.subscribe();

        let (_events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(service.run(events_rx, shutdown_rx));

        wait_until(&mut views, |v| v.trending.error.is_some() && v.new.error.is_some()).await;
        assert!(drain(&mut outbound).is_empty());

        let spec = FilterSpec {
            min_liq: Some(5.0),
            ..Default::default()
        };
        assert!(handle.set_filter(ListKind::Trending, spec.clone()));

        let sent = timeout(Duration::from_secs(5), outbound.recv())
            .await
            .expect("filter was not sent")
            .unwrap();
        assert_eq!(sent, OutgoingMessage::ScannerFilter(spec.clone()));

        let failed = wait_until(&mut views, |v| v.trending.spec == spec && !v.trending.loading).await;
        assert!(failed.trending.error.is_some());
        assert!(!failed.trending.exhausted);

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
