//! Issue list view state.
//!
//! Two strategies share the [`IssueListView`] interface and are kept
//! deliberately distinct:
//!
//! - [`ActiveIssueList`] sends every filter change to
//!   `/issue/filtra-avanzato` scoped to `archiviata=false`. Search is not
//!   debounced: each keystroke is its own request cycle.
//! - [`ArchivedIssueList`] fetches the full list once and filters and sorts
//!   in memory, recomputing synchronously on every change.
//!
//! Requests are never aborted. Each fetch gets a sequence number and a
//! response is applied only if no newer fetch has started since.

use tracing::{debug, warn};

use crate::Result;
use crate::api::IssueApi;
use crate::models::Issue;
use crate::models::query::{DateField, FilterChange, IssueFilter};
use crate::session::Session;

use super::ListRoute;

/// Progress of the current fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The message shown inline. The last loaded list is kept.
    Error(String),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Identifies one request cycle of an [`ActiveIssueList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub filter: IssueFilter,
}

/// Common interface of the issue list views.
pub trait IssueListView {
    fn route(&self) -> ListRoute;

    fn filter(&self) -> &IssueFilter;

    fn state(&self) -> &FetchState;

    /// Issues currently shown, in display order.
    fn visible(&self) -> &[Issue];

    /// Size of the population before client-side filtering.
    fn total(&self) -> usize;

    /// Run a fetch cycle. The error is recorded in [`Self::state`] and also
    /// returned to the caller.
    fn load(&mut self, api: &dyn IssueApi, session: &Session) -> Result<()>;

    /// Apply one filter edit and refresh the visible list.
    fn change(
        &mut self,
        api: &dyn IssueApi,
        session: &Session,
        change: FilterChange,
    ) -> Result<()>;

    fn summary(&self) -> String {
        let shown = self.visible().len();
        let total = self.total();
        if shown == total {
            format!("{} issue{}", shown, if shown == 1 { "" } else { "s" })
        } else {
            format!("Showing {} of {} issues", shown, total)
        }
    }
}

/// Build the view for a list route.
pub fn view_for(route: ListRoute, filter: IssueFilter) -> Box<dyn IssueListView> {
    match route {
        ListRoute::Active => Box::new(ActiveIssueList::with_filter(filter)),
        ListRoute::Archived => Box::new(ArchivedIssueList::with_filter(filter)),
    }
}

/// Active issues, filtered and sorted server-side.
#[derive(Debug, Default)]
pub struct ActiveIssueList {
    filter: IssueFilter,
    state: FetchState,
    issues: Vec<Issue>,
    latest_seq: u64,
}

impl ActiveIssueList {
    pub fn new() -> Self {
        Self::with_filter(IssueFilter::active())
    }

    /// The archived scope is forced to `false` whatever `filter` says.
    pub fn with_filter(filter: IssueFilter) -> Self {
        Self {
            filter: IssueFilter {
                archived: false,
                ..filter
            },
            ..Self::default()
        }
    }

    /// Start a request cycle for the current filter. Any earlier ticket
    /// becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_seq += 1;
        self.state = FetchState::Loading;
        debug!(seq = self.latest_seq, "issue list fetch started");
        FetchTicket {
            seq: self.latest_seq,
            filter: self.filter.clone(),
        }
    }

    /// Apply a response. Returns false when the ticket is stale and the
    /// response was dropped.
    pub fn complete_fetch(&mut self, ticket: &FetchTicket, result: &Result<Vec<Issue>>) -> bool {
        if ticket.seq != self.latest_seq {
            warn!(
                seq = ticket.seq,
                latest = self.latest_seq,
                "ignoring stale issue list response"
            );
            return false;
        }
        match result {
            Ok(issues) => {
                self.issues = issues.clone();
                self.state = FetchState::Loaded;
            }
            Err(e) => {
                self.state = FetchState::Error(e.user_message());
            }
        }
        true
    }
}

impl IssueListView for ActiveIssueList {
    fn route(&self) -> ListRoute {
        ListRoute::Active
    }

    fn filter(&self) -> &IssueFilter {
        &self.filter
    }

    fn state(&self) -> &FetchState {
        &self.state
    }

    fn visible(&self) -> &[Issue] {
        &self.issues
    }

    fn total(&self) -> usize {
        self.issues.len()
    }

    fn load(&mut self, api: &dyn IssueApi, session: &Session) -> Result<()> {
        let ticket = self.begin_fetch();
        let result = api.filter_issues_advanced(session, &ticket.filter);
        self.complete_fetch(&ticket, &result);
        result.map(|_| ())
    }

    fn change(
        &mut self,
        api: &dyn IssueApi,
        session: &Session,
        change: FilterChange,
    ) -> Result<()> {
        if self.filter.apply_change(change) {
            self.load(api, session)
        } else {
            Ok(())
        }
    }
}

/// Archived issues, filtered and sorted in memory.
#[derive(Debug)]
pub struct ArchivedIssueList {
    filter: IssueFilter,
    state: FetchState,
    archived: Vec<Issue>,
    visible: Vec<Issue>,
}

impl Default for ArchivedIssueList {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchivedIssueList {
    pub fn new() -> Self {
        Self::with_filter(IssueFilter::archived())
    }

    pub fn with_filter(filter: IssueFilter) -> Self {
        Self {
            filter: IssueFilter {
                archived: true,
                ..filter
            },
            state: FetchState::Idle,
            archived: Vec::new(),
            visible: Vec::new(),
        }
    }

    /// Replace the population and recompute. Non-archived issues are dropped.
    pub fn set_issues(&mut self, issues: Vec<Issue>) {
        self.archived = issues.into_iter().filter(|i| i.archived).collect();
        self.recompute();
        self.state = FetchState::Loaded;
    }

    /// Apply a filter edit locally. Never touches the network.
    pub fn apply(&mut self, change: FilterChange) {
        if self.filter.apply_change(change) {
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        self.visible = self.filter.apply(&self.archived, DateField::Archived);
    }
}

impl IssueListView for ArchivedIssueList {
    fn route(&self) -> ListRoute {
        ListRoute::Archived
    }

    fn filter(&self) -> &IssueFilter {
        &self.filter
    }

    fn state(&self) -> &FetchState {
        &self.state
    }

    fn visible(&self) -> &[Issue] {
        &self.visible
    }

    fn total(&self) -> usize {
        self.archived.len()
    }

    fn load(&mut self, api: &dyn IssueApi, session: &Session) -> Result<()> {
        self.state = FetchState::Loading;
        match api.list_issues(session, None) {
            Ok(issues) => {
                self.set_issues(issues);
                Ok(())
            }
            Err(e) => {
                self.state = FetchState::Error(e.user_message());
                Err(e)
            }
        }
    }

    fn change(
        &mut self,
        _api: &dyn IssueApi,
        _session: &Session,
        change: FilterChange,
    ) -> Result<()> {
        self.apply(change);
        Ok(())
    }
}
