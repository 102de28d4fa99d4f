/// Snapshot pagination state for one list
///
/// Every fetch carries a ticket. The generation counter advances whenever the
/// list starts over (filter replaced or explicit refresh), so a page that
/// arrives for an older generation is recognised and dropped.
use super::filters::FilterSpec;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub generation: u64,
    pub page: u32,
    pub spec: FilterSpec,
}

impl FetchTicket {
    /// Page 1 replaces the list, later pages extend it
    pub fn is_replacement(&self) -> bool {
        self.page <= 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotPager {
    /// Last page loaded successfully in this generation (0 = none)
    page: u32,
    exhausted: bool,
    loading: bool,
    generation: u64,
    in_flight: Option<u32>,
}

impl SnapshotPager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start over at page 1 in a new generation; always allowed
    pub fn begin_refresh(&mut self, spec: &FilterSpec) -> FetchTicket {
        self.generation += 1;
        self.page = 0;
        self.exhausted = false;
        self.loading = true;
        self.in_flight = Some(1);
        FetchTicket {
            generation: self.generation,
            page: 1,
            spec: spec.clone(),
        }
    }

    /// Next page, unless a fetch is running or the listing is exhausted
    pub fn begin_next(&mut self, spec: &FilterSpec) -> Option<FetchTicket> {
        if self.loading || self.exhausted {
            return None;
        }
        let next = self.page + 1;
        self.loading = true;
        self.in_flight = Some(next);
        Some(FetchTicket {
            generation: self.generation,
            page: next,
            spec: spec.clone(),
        })
    }

    /// Whether a finished fetch still belongs to the current generation
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && self.in_flight == Some(ticket.page)
    }

    /// Record a successful page; caller must have checked `is_current`
    pub fn complete(&mut self, ticket: &FetchTicket, is_last_page: bool) {
        self.page = ticket.page;
        self.exhausted = is_last_page;
        self.loading = false;
        self.in_flight = None;
    }

    /// Record a failed page; the cursor does not advance, so the next
    /// `begin_next` retries the same page
    pub fn fail(&mut self, _ticket: &FetchTicket) {
        self.loading = false;
        self.in_flight = None;
    }
}
