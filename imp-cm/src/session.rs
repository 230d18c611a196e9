//! Campaign session
//!
//! One [`CampaignSession`] manages a campaign (owner id + target contact
//! type): view mode, filters, per-view sort, page size, cursors, selection,
//! membership and the error banner. Fetches run in three steps so callers
//! can overlap them: [`CampaignSession::begin_fetch`] captures parameters
//! under a generation ticket, [`PendingFetch::run`] performs the I/O without
//! borrowing the session, and [`CampaignSession::commit`] applies the result
//! only if nothing newer started meanwhile.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use imp_common::config::CampaignSection;
use imp_common::contact::{
    CampaignSortField, Contact, ContactSortField, ContactType, SortDirection,
};
use imp_common::quality::QualityScore;
use imp_common::{CampaignStatus, MembershipMap, StageDistribution, StageOrder};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{RequestTracker, Ticket, ViewCaches};
use crate::error::{Error, Result};
use crate::filter::ContactFilter;
use crate::membership::summary_distribution;
use crate::mutation::{Confirmer, MutationOutcome, StageAction, StageMutationCoordinator};
use crate::pagination::{CursorPager, PageTotal};
use crate::reconcile::{
    reconcile, AllContactsRequest, CampaignRequest, FetchContext, MatchMeta, MatchesRequest,
    ViewMode, ViewPage, ViewRequest,
};
use crate::selection::SelectionSet;
use crate::sources::Sources;

fn no_confirmation(_stage: CampaignStatus, _count: usize) -> bool {
    true
}

/// Tunables of a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub page_size: usize,
    pub matches_limit: usize,
    pub stale_after: Duration,
    pub stage_order: StageOrder,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            matches_limit: 25,
            stale_after: crate::cache::DEFAULT_STALE_AFTER,
            stage_order: StageOrder::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(section: &CampaignSection) -> Result<Self> {
        Ok(Self {
            page_size: section.page_size.max(1),
            matches_limit: section.matches_limit,
            stale_after: Duration::from_secs(section.stale_secs),
            stage_order: section.stage_order()?,
        })
    }
}

/// Fetch captured by [`CampaignSession::begin_fetch`]
pub struct PendingFetch {
    ticket: Ticket,
    request: ViewRequest,
    membership: MembershipMap,
    ctx: FetchContext,
}

/// Result of [`PendingFetch::run`], handed back to the session
pub struct FetchResult {
    ticket: Ticket,
    result: imp_common::Result<ViewPage>,
}

impl PendingFetch {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn request(&self) -> &ViewRequest {
        &self.request
    }

    pub async fn run(self) -> FetchResult {
        let result = reconcile(&self.ctx, &self.request, &self.membership).await;
        FetchResult {
            ticket: self.ticket,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// A newer fetch or parameter change happened; result dropped
    Superseded,
    /// Fetch failed; message is on the error banner
    Failed(String),
}

/// One displayed row
#[derive(Debug, Clone)]
pub struct ContactRow {
    pub contact: Contact,
    pub status: CampaignStatus,
    pub quality: QualityScore,
    pub selected: bool,
    pub match_meta: Option<MatchMeta>,
}

/// Everything a front end needs to render the current view
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub mode: ViewMode,
    pub page: usize,
    pub page_size: usize,
    pub rows: Vec<ContactRow>,
    pub total: Option<PageTotal>,
    pub has_more: bool,
    pub can_go_previous: bool,
    pub selected: usize,
    pub stage_distribution: StageDistribution,
    pub actions_enabled: bool,
    pub error: Option<String>,
}

pub struct CampaignSession {
    owner_id: String,
    target_type: ContactType,
    options: SessionOptions,
    ctx: FetchContext,
    coordinator: StageMutationCoordinator,
    tracker: RequestTracker,
    mode: ViewMode,
    filter: ContactFilter,
    all_sort: (ContactSortField, SortDirection),
    campaign_sort: (CampaignSortField, SortDirection),
    page_size: usize,
    all_pager: CursorPager,
    campaign_pager: CursorPager,
    /// Remote ids seen across the current campaign cursor generation
    campaign_seen: HashSet<String>,
    matches_page: usize,
    matches_has_more: bool,
    selection: SelectionSet,
    membership: MembershipMap,
    membership_loaded: bool,
    current: Option<ViewPage>,
    error: Option<String>,
}

impl CampaignSession {
    pub fn new(
        owner_id: impl Into<String>,
        target_type: ContactType,
        sources: Sources,
        options: SessionOptions,
    ) -> Self {
        let owner_id = owner_id.into();
        let caches = Arc::new(Mutex::new(ViewCaches::new(options.stale_after)));
        let coordinator =
            StageMutationCoordinator::new(owner_id.clone(), sources.membership.clone(), caches.clone());

        Self {
            page_size: options.page_size.max(1),
            owner_id,
            target_type,
            options,
            ctx: FetchContext::new(sources, caches),
            coordinator,
            tracker: RequestTracker::new(),
            mode: ViewMode::default(),
            filter: ContactFilter::default(),
            all_sort: (ContactSortField::default(), SortDirection::default()),
            campaign_sort: (CampaignSortField::Stage, SortDirection::Asc),
            all_pager: CursorPager::new(),
            campaign_pager: CursorPager::new(),
            campaign_seen: HashSet::new(),
            matches_page: 0,
            matches_has_more: false,
            selection: SelectionSet::new(),
            membership: MembershipMap::new(),
            membership_loaded: false,
            current: None,
            error: None,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn filter(&self) -> &ContactFilter {
        &self.filter
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn all_sort(&self) -> (ContactSortField, SortDirection) {
        self.all_sort
    }

    pub fn campaign_sort(&self) -> (CampaignSortField, SortDirection) {
        self.campaign_sort
    }

    pub fn membership(&self) -> &MembershipMap {
        &self.membership
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn current_page(&self) -> Option<&ViewPage> {
        self.current.as_ref()
    }

    /// Page index of the active view
    pub fn page(&self) -> usize {
        match self.mode {
            ViewMode::All => self.all_pager.page(),
            ViewMode::Campaign => self.campaign_pager.page(),
            ViewMode::Matches => self.matches_page,
        }
    }

    pub fn all_pager(&self) -> &CursorPager {
        &self.all_pager
    }

    pub fn campaign_pager(&self) -> &CursorPager {
        &self.campaign_pager
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Number of contacts currently in the campaign
    pub fn campaign_total(&self) -> usize {
        self.membership.member_ids().len()
    }

    pub fn actions_enabled(&self) -> bool {
        self.coordinator.actions_enabled(&self.selection)
    }

    /// Switch views; selection is always cleared
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.selection.clear();
        if mode == self.mode {
            return;
        }
        if mode == ViewMode::Campaign {
            self.campaign_sort = (CampaignSortField::Stage, SortDirection::Asc);
            self.reset_campaign_cursors();
        }
        info!(from = %self.mode, to = %mode, "View mode changed");
        self.mode = mode;
        self.current = None;
        self.tracker.supersede(mode);
    }

    /// Replace the filters; every view restarts at page 0
    pub fn apply_filters(&mut self, filter: ContactFilter) {
        if filter == self.filter {
            return;
        }
        debug!(remote = filter.has_remote_criteria(), "Filters applied");
        self.filter = filter;
        self.reset_all_views();
    }

    pub fn clear_filters(&mut self) {
        self.apply_filters(ContactFilter::default());
    }

    pub fn set_all_sort(&mut self, field: ContactSortField, direction: SortDirection) {
        if self.all_sort == (field, direction) {
            return;
        }
        self.all_sort = (field, direction);
        self.all_pager.reset();
        self.tracker.supersede(ViewMode::All);
    }

    pub fn set_campaign_sort(&mut self, field: CampaignSortField, direction: SortDirection) {
        if self.campaign_sort == (field, direction) {
            return;
        }
        self.campaign_sort = (field, direction);
        self.reset_campaign_cursors();
        self.tracker.supersede(ViewMode::Campaign);
    }

    /// Page size is shared by all views
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(Error::InvalidState("page size must be positive".to_string()));
        }
        if page_size != self.page_size {
            self.page_size = page_size;
            self.reset_all_views();
        }
        Ok(())
    }

    /// Advance the active view; `false` if there is no next page
    pub fn next_page(&mut self) -> bool {
        let moved = match self.mode {
            ViewMode::All => self.all_pager.next_page(),
            ViewMode::Campaign => self.campaign_pager.next_page(),
            ViewMode::Matches => {
                if self.matches_has_more {
                    self.matches_page += 1;
                    self.matches_has_more = false;
                    true
                } else {
                    false
                }
            }
        };
        if moved {
            self.tracker.supersede(self.mode);
        }
        moved
    }

    pub fn previous_page(&mut self) -> bool {
        let moved = match self.mode {
            ViewMode::All => self.all_pager.previous_page(),
            ViewMode::Campaign => self.campaign_pager.previous_page(),
            ViewMode::Matches => {
                if self.matches_page > 0 {
                    self.matches_page -= 1;
                    true
                } else {
                    false
                }
            }
        };
        if moved {
            self.tracker.supersede(self.mode);
        }
        moved
    }

    /// Capture the active view's parameters under a fresh ticket
    pub fn begin_fetch(&mut self) -> PendingFetch {
        let request = self.build_request();
        let ticket = self.tracker.begin(self.mode);
        debug!(view = %self.mode, generation = ticket.generation, "Fetch started");
        PendingFetch {
            ticket,
            request,
            membership: self.membership.clone(),
            ctx: self.ctx.clone(),
        }
    }

    /// Apply a finished fetch if it is still the newest for its view
    pub fn commit(&mut self, fetched: FetchResult) -> CommitOutcome {
        if fetched.ticket.view != self.mode || !self.tracker.is_current(&fetched.ticket) {
            debug!(
                view = %fetched.ticket.view,
                generation = fetched.ticket.generation,
                "Superseded fetch dropped"
            );
            return CommitOutcome::Superseded;
        }

        let page = match fetched.result {
            Ok(page) => page,
            Err(e) => {
                let message = Error::from(e).banner_message();
                warn!(view = %fetched.ticket.view, error = %message, "Fetch failed");
                self.error = Some(message.clone());
                return CommitOutcome::Failed(message);
            }
        };

        match fetched.ticket.view {
            ViewMode::All => self
                .all_pager
                .record_page(page.has_more, page.last_id.clone()),
            ViewMode::Campaign => {
                self.campaign_seen.extend(page.remote_ids.iter().cloned());
                self.campaign_pager
                    .record_page(page.has_more, page.last_id.clone());
            }
            ViewMode::Matches => {
                self.matches_page = page.page;
                self.matches_has_more = page.has_more;
            }
        }

        self.selection.prune(page.ids());
        self.error = None;
        self.current = Some(page);
        CommitOutcome::Committed
    }

    /// Fetch and commit the active view, loading membership first if needed
    pub async fn load(&mut self) -> Result<ViewSnapshot> {
        if !self.membership_loaded {
            self.refresh_membership().await?;
        }

        let pending = self.begin_fetch();
        let fetched = pending.run().await;
        match self.commit(fetched) {
            CommitOutcome::Failed(message) => Err(Error::Fetch(message)),
            CommitOutcome::Committed | CommitOutcome::Superseded => Ok(self.snapshot()),
        }
    }

    /// Reload the membership map; failures go to the error banner
    pub async fn refresh_membership(&mut self) -> Result<()> {
        match self.coordinator.refresh_membership().await {
            Ok(map) => {
                debug!(members = map.member_ids().len(), "Membership refreshed");
                self.membership = map;
                self.membership_loaded = true;
                Ok(())
            }
            Err(e) => {
                let e = Error::from(e);
                self.error = Some(e.banner_message());
                Err(e)
            }
        }
    }

    /// Server-side per-stage counts of the campaign
    pub async fn stage_summary(&self) -> Result<StageDistribution> {
        let items = self.ctx.sources.membership.stage_summary(&self.owner_id).await?;
        Ok(summary_distribution(&items))
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let (rows, distribution, total, has_more) = match &self.current {
            Some(page) => {
                let rows = page
                    .contacts
                    .iter()
                    .map(|contact| ContactRow {
                        status: self.membership.status_of(&contact.id),
                        quality: contact.quality_score(),
                        selected: self.selection.contains(&contact.id),
                        match_meta: page.match_meta.get(&contact.id).cloned(),
                        contact: contact.clone(),
                    })
                    .collect();
                let distribution = StageDistribution::from_membership(page.ids(), &self.membership);
                (rows, distribution, Some(page.total), page.has_more)
            }
            None => (Vec::new(), StageDistribution::zeroed(), None, false),
        };

        ViewSnapshot {
            mode: self.mode,
            page: self.page(),
            page_size: self.page_size,
            rows,
            total,
            has_more,
            can_go_previous: self.page() > 0,
            selected: self.selection.len(),
            stage_distribution: distribution,
            actions_enabled: self.actions_enabled(),
            error: self.error.clone(),
        }
    }

    /// Flip one row; ids not on the current page are ignored
    pub fn toggle_select(&mut self, id: &str) -> bool {
        let displayed = self
            .current
            .as_ref()
            .is_some_and(|page| page.ids().any(|displayed| displayed == id));
        if !displayed {
            return false;
        }
        self.selection.toggle(id)
    }

    pub fn toggle_select_all(&mut self) {
        let ids: Vec<&str> = self
            .current
            .as_ref()
            .map(|page| page.ids().collect())
            .unwrap_or_default();
        self.selection.toggle_all(ids);
    }

    pub async fn add_to_campaign(&mut self) -> Result<MutationOutcome> {
        self.mutate(StageAction::AddToCampaign, &no_confirmation).await
    }

    pub async fn remove_from_campaign(&mut self) -> Result<MutationOutcome> {
        self.mutate(StageAction::RemoveFromCampaign, &no_confirmation)
            .await
    }

    pub async fn change_stage(
        &mut self,
        stage: CampaignStatus,
        confirmer: &dyn Confirmer,
    ) -> Result<MutationOutcome> {
        self.mutate(StageAction::ChangeStage(stage), confirmer).await
    }

    async fn mutate(
        &mut self,
        action: StageAction,
        confirmer: &dyn Confirmer,
    ) -> Result<MutationOutcome> {
        let outcome = match self
            .coordinator
            .apply(action, &mut self.selection, confirmer)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let e = Error::from(e);
                self.error = Some(e.banner_message());
                return Err(e);
            }
        };

        if let MutationOutcome::Applied { membership, .. } = &outcome {
            match membership {
                Some(map) => {
                    self.membership = map.clone();
                    self.membership_loaded = true;
                }
                None => {
                    self.membership_loaded = false;
                    self.error = Some("Stage updated but membership could not be refreshed".into());
                }
            }
            // In-flight fetches may carry pre-mutation data
            self.tracker.supersede_all();
        }
        Ok(outcome)
    }

    fn build_request(&self) -> ViewRequest {
        match self.mode {
            ViewMode::All => ViewRequest::AllContacts(AllContactsRequest {
                filter: self.filter.clone(),
                order_by: self.all_sort.0,
                direction: self.all_sort.1,
                page: self.all_pager.page(),
                page_size: self.page_size,
                cursor: self.all_pager.current_cursor(),
            }),
            ViewMode::Campaign => ViewRequest::Campaign(CampaignRequest {
                owner_id: self.owner_id.clone(),
                filter: self.filter.clone(),
                order_by: self.campaign_sort.0,
                direction: self.campaign_sort.1,
                page: self.campaign_pager.page(),
                page_size: self.page_size,
                cursor: self.campaign_pager.current_cursor(),
                seen_remote_ids: self.campaign_seen.clone(),
                stage_order: self.options.stage_order.clone(),
            }),
            ViewMode::Matches => ViewRequest::Matches(MatchesRequest {
                seed_id: self.owner_id.clone(),
                target_type: self.target_type,
                limit: self.options.matches_limit,
                filter: self.filter.clone(),
                page: self.matches_page,
                page_size: self.page_size,
            }),
        }
    }

    fn reset_campaign_cursors(&mut self) {
        self.campaign_pager.reset();
        self.campaign_seen.clear();
    }

    fn reset_all_views(&mut self) {
        self.all_pager.reset();
        self.reset_campaign_cursors();
        self.matches_page = 0;
        self.matches_has_more = false;
        self.tracker.supersede_all();
    }
}
