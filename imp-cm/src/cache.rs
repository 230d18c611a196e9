//! Query result cache and fetch supersession
//!
//! Results are keyed by `(region, key)` where the key is the canonical form
//! of the request parameters. A mutation invalidates whole regions. Each view
//! also carries a generation counter: a fetch commits only if no newer fetch
//! or parameter change happened for that view while it was in flight.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use imp_common::contact::{
    CampaignContactsPage, Contact, ContactsPage, FilteredContacts, MatchesResponse,
};
use tracing::debug;

use crate::reconcile::ViewMode;

/// Default freshness window of a cached result
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

/// Named invalidation group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheRegion {
    /// Unfiltered listing pages
    Contacts,
    /// Filtered-search pages
    ContactFilters,
    /// Owner campaign-contacts pages
    CampaignContacts,
    /// Ranked match lists
    Matches,
    /// Single contacts fetched by id
    ContactDetail,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    stored_at: Instant,
    value: V,
}

/// Keyed cache with a stale time
#[derive(Debug, Clone)]
pub struct QueryCache<V> {
    entries: HashMap<(CacheRegion, String), Entry<V>>,
    stale_after: Duration,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stale_after,
        }
    }

    /// Fresh value for `key`, dropping it if stale
    pub fn get(&mut self, region: CacheRegion, key: &str) -> Option<V> {
        let slot = (region, key.to_string());
        let fresh = self
            .entries
            .get(&slot)
            .map(|entry| entry.stored_at.elapsed() < self.stale_after)?;
        if fresh {
            self.entries.get(&slot).map(|entry| entry.value.clone())
        } else {
            debug!(?region, key, "Cache entry stale");
            self.entries.remove(&slot);
            None
        }
    }

    /// Store `value`, pruning every expired entry first
    pub fn insert(&mut self, region: CacheRegion, key: impl Into<String>, value: V) {
        let stale_after = self.stale_after;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < stale_after);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(pruned, "Expired cache entries pruned");
        }

        self.entries.insert(
            (region, key.into()),
            Entry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub fn remove(&mut self, region: CacheRegion, key: &str) -> Option<V> {
        self.entries
            .remove(&(region, key.to_string()))
            .map(|entry| entry.value)
    }

    /// Drop every entry of `region`
    pub fn invalidate(&mut self, region: CacheRegion) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(r, _), _| *r != region);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One cache per payload type, shared by a session and its coordinator
#[derive(Debug, Clone)]
pub struct ViewCaches {
    pub contacts: QueryCache<ContactsPage>,
    pub filtered: QueryCache<FilteredContacts>,
    pub campaign: QueryCache<CampaignContactsPage>,
    pub matches: QueryCache<MatchesResponse>,
    pub details: QueryCache<Contact>,
}

impl Default for ViewCaches {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

impl ViewCaches {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            contacts: QueryCache::new(stale_after),
            filtered: QueryCache::new(stale_after),
            campaign: QueryCache::new(stale_after),
            matches: QueryCache::new(stale_after),
            details: QueryCache::new(stale_after),
        }
    }

    pub fn invalidate(&mut self, region: CacheRegion) {
        let dropped = match region {
            CacheRegion::Contacts => self.contacts.invalidate(region),
            CacheRegion::ContactFilters => self.filtered.invalidate(region),
            CacheRegion::CampaignContacts => self.campaign.invalidate(region),
            CacheRegion::Matches => self.matches.invalidate(region),
            CacheRegion::ContactDetail => self.details.invalidate(region),
        };
        debug!(?region, dropped, "Cache region invalidated");
    }
}

/// Payload types with a home in [`ViewCaches`]
pub trait Cached: Clone + Sized {
    const REGION: CacheRegion;

    fn slot(caches: &mut ViewCaches) -> &mut QueryCache<Self>;
}

impl Cached for ContactsPage {
    const REGION: CacheRegion = CacheRegion::Contacts;

    fn slot(caches: &mut ViewCaches) -> &mut QueryCache<Self> {
        &mut caches.contacts
    }
}

impl Cached for FilteredContacts {
    const REGION: CacheRegion = CacheRegion::ContactFilters;

    fn slot(caches: &mut ViewCaches) -> &mut QueryCache<Self> {
        &mut caches.filtered
    }
}

impl Cached for CampaignContactsPage {
    const REGION: CacheRegion = CacheRegion::CampaignContacts;

    fn slot(caches: &mut ViewCaches) -> &mut QueryCache<Self> {
        &mut caches.campaign
    }
}

impl Cached for MatchesResponse {
    const REGION: CacheRegion = CacheRegion::Matches;

    fn slot(caches: &mut ViewCaches) -> &mut QueryCache<Self> {
        &mut caches.matches
    }
}

impl Cached for Contact {
    const REGION: CacheRegion = CacheRegion::ContactDetail;

    fn slot(caches: &mut ViewCaches) -> &mut QueryCache<Self> {
        &mut caches.details
    }
}

/// Generation stamp of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub view: ViewMode,
    pub generation: u64,
}

/// Per-view generation counters
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    generations: HashMap<ViewMode, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch; any earlier ticket for `view` stops being current
    pub fn begin(&mut self, view: ViewMode) -> Ticket {
        let generation = self.bump(view);
        Ticket { view, generation }
    }

    /// Parameters of `view` changed; in-flight fetches are obsolete
    pub fn supersede(&mut self, view: ViewMode) {
        self.bump(view);
    }

    pub fn supersede_all(&mut self) {
        for view in ViewMode::ALL {
            self.bump(view);
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.generations.get(&ticket.view).copied().unwrap_or(0) == ticket.generation
    }

    fn bump(&mut self, view: ViewMode) -> u64 {
        let generation = self.generations.entry(view).or_insert(0);
        *generation += 1;
        *generation
    }
}
