//! Dataset reconciliation
//!
//! Each view variant has one reconciliation function that turns a
//! [`ViewRequest`] into the ordered contacts to display. All of them share
//! the [`ContactFilter`] predicate and the query cache in [`FetchContext`].

mod all;
mod campaign;
mod matches;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use imp_common::contact::{
    CampaignSortField, Contact, ContactSortField, ContactType, MatchOverlap, SortDirection,
};
use imp_common::{Error, MembershipMap, Result, StageOrder};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{Cached, ViewCaches};
use crate::filter::ContactFilter;
use crate::pagination::{PageCursor, PageTotal};
use crate::sources::Sources;

/// Which dataset the session displays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ViewMode {
    /// Every contact
    #[default]
    All,
    /// Members of the campaign
    Campaign,
    /// Ranked match candidates of the campaign owner
    Matches,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::All, ViewMode::Campaign, ViewMode::Matches];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::All => "all",
            ViewMode::Campaign => "campaign",
            ViewMode::Matches => "matches",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidInput(format!("unknown view mode: {s}")))
    }
}

#[derive(Debug, Clone)]
pub struct AllContactsRequest {
    pub filter: ContactFilter,
    pub order_by: ContactSortField,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
    pub cursor: PageCursor,
}

#[derive(Debug, Clone)]
pub struct CampaignRequest {
    pub owner_id: String,
    pub filter: ContactFilter,
    pub order_by: CampaignSortField,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
    pub cursor: PageCursor,
    /// Ids returned by earlier remote pages of this cursor generation
    pub seen_remote_ids: HashSet<String>,
    pub stage_order: StageOrder,
}

#[derive(Debug, Clone)]
pub struct MatchesRequest {
    pub seed_id: String,
    pub target_type: ContactType,
    pub limit: usize,
    pub filter: ContactFilter,
    pub page: usize,
    pub page_size: usize,
}

/// Parameters of one fetch, captured when it begins
#[derive(Debug, Clone)]
pub enum ViewRequest {
    AllContacts(AllContactsRequest),
    Campaign(CampaignRequest),
    Matches(MatchesRequest),
}

impl ViewRequest {
    pub fn mode(&self) -> ViewMode {
        match self {
            ViewRequest::AllContacts(_) => ViewMode::All,
            ViewRequest::Campaign(_) => ViewMode::Campaign,
            ViewRequest::Matches(_) => ViewMode::Matches,
        }
    }
}

/// Score and overlaps of a displayed match candidate
#[derive(Debug, Clone, PartialEq)]
pub struct MatchMeta {
    pub score: f64,
    pub overlaps: Vec<MatchOverlap>,
}

/// Reconciled page of one view
#[derive(Debug, Clone)]
pub struct ViewPage {
    pub contacts: Vec<Contact>,
    /// Page index actually served (offset views clamp it)
    pub page: usize,
    pub total: PageTotal,
    pub has_more: bool,
    /// Last remote id, the cursor source for the next page
    pub last_id: Option<String>,
    /// Ids the remote page returned, before local filtering
    pub remote_ids: Vec<String>,
    pub match_meta: HashMap<String, MatchMeta>,
}

impl ViewPage {
    pub fn empty(page: usize, total: PageTotal) -> Self {
        Self {
            contacts: Vec::new(),
            page,
            total,
            has_more: false,
            last_id: None,
            remote_ids: Vec::new(),
            match_meta: HashMap::new(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.contacts.iter().map(|contact| contact.id.as_str())
    }
}

/// Sources and caches a fetch runs against
#[derive(Clone)]
pub struct FetchContext {
    pub sources: Sources,
    pub caches: Arc<Mutex<ViewCaches>>,
}

impl FetchContext {
    pub fn new(sources: Sources, caches: Arc<Mutex<ViewCaches>>) -> Self {
        Self { sources, caches }
    }

    /// Cached value for `key`, or the result of `fetch` stored under it
    pub(crate) async fn cached<V, F, Fut>(&self, key: String, fetch: F) -> Result<V>
    where
        V: Cached,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let hit = {
            let mut caches = self.caches.lock().await;
            V::slot(&mut caches).get(V::REGION, &key)
        };
        if let Some(value) = hit {
            debug!(region = ?V::REGION, key = %key, "Cache hit");
            return Ok(value);
        }

        let value = fetch().await?;
        let mut caches = self.caches.lock().await;
        V::slot(&mut caches).insert(V::REGION, key, value.clone());
        Ok(value)
    }
}

/// Produce the page `request` describes
pub async fn reconcile(
    ctx: &FetchContext,
    request: &ViewRequest,
    membership: &MembershipMap,
) -> Result<ViewPage> {
    match request {
        ViewRequest::AllContacts(request) => all::reconcile_all(ctx, request, membership).await,
        ViewRequest::Campaign(request) => {
            campaign::reconcile_campaign(ctx, request, membership).await
        }
        ViewRequest::Matches(request) => matches::reconcile_matches(ctx, request, membership).await,
    }
}
