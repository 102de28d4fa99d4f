//! Live pair scanner
//!
//! Two ranked lists (trending and new pairs) built from paged snapshots of the
//! scanner API and kept current by the live websocket stream.
//!
//! ## Layout
//! - `types`, `convert`: asset records and conversion from raw API rows
//! - `filters`, `sort`: per-list filter predicate and sort engine
//! - `merge`: snapshot merge plus tick / pair-stats application
//! - `pager`, `api`: paged snapshot fetching with generation tags
//! - `messages`, `session`: websocket payloads and the reconnecting session
//! - `controller`, `service`: per-list state and the event loop that owns it
//! - `format`: display helpers for the console summary

pub mod api;
pub mod controller;
pub mod convert;
pub mod filters;
pub mod format;
pub mod merge;
pub mod messages;
pub mod pager;
pub mod service;
pub mod session;
pub mod sort;
pub mod types;

pub use api::{ScannerApiClient, SnapshotPage, SnapshotSource};
pub use controller::{FetchOutcome, ListController, ListKind, ListView};
pub use filters::{passes, passes_at, FilterSpec, RankBy};
pub use merge::{PairStatsUpdate, TradeTick};
pub use messages::{IncomingMessage, OutgoingMessage};
pub use service::{
    start_scanner, ScannerCommand, ScannerHandle, ScannerRuntime, ScannerService, ScannerViews,
};
pub use session::{ReconnectPolicy, SessionEvent, SessionHandle, SessionState};
pub use sort::{SortConfig, SortDirection, SortField};
pub use types::{AssetRecord, AuditFlags, Chain};
