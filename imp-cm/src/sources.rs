//! Remote data source seams
//!
//! The session and reconciler only see these traits; [`crate::api`] provides
//! the REST implementations and tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use imp_common::contact::{
    CampaignAnalysis, CampaignContactsPage, CampaignSortField, Contact, ContactSortField,
    ContactType, ContactsPage, FilteredContacts, MatchesResponse, SortDirection,
};
use imp_common::introductions::{
    BulkStageUpdateRequest, IntroductionRecord, IntroductionStageUpdate, StageSummaryItem,
};
use imp_common::{ApiStage, Result};

use crate::filter::FilterRequest;

/// Parameters of `GET /contacts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactsQuery {
    pub limit: usize,
    pub start_after: Option<String>,
    pub order_by: ContactSortField,
    pub direction: SortDirection,
}

/// Parameters of `GET /owners/:id/campaign-contacts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignContactsQuery {
    pub limit: usize,
    pub start_after: Option<String>,
    pub order_by: CampaignSortField,
    pub direction: SortDirection,
}

#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Unfiltered, cursor-paged listing
    async fn list_contacts(&self, query: &ContactsQuery) -> Result<ContactsPage>;

    /// Server-side filtered search
    async fn filter_contacts(&self, request: &FilterRequest) -> Result<FilteredContacts>;

    async fn get_contact(&self, id: &str) -> Result<Contact>;

    /// Contacts of one owner's campaign with their wire stage
    async fn campaign_contacts(
        &self,
        owner_id: &str,
        query: &CampaignContactsQuery,
    ) -> Result<CampaignContactsPage>;
}

#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Introductions of `owner_id`, optionally restricted to one stage
    async fn list_stages(
        &self,
        owner_id: &str,
        stage: Option<ApiStage>,
    ) -> Result<Vec<IntroductionRecord>>;

    /// Single upsert
    async fn set_stage(&self, update: &IntroductionStageUpdate) -> Result<IntroductionRecord>;

    /// Batched upsert; returns the number of rows written
    async fn bulk_update_stages(&self, request: &BulkStageUpdateRequest) -> Result<usize>;

    async fn stage_summary(&self, owner_id: &str) -> Result<Vec<StageSummaryItem>>;
}

#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Ranked candidates of `target_type` for a seed contact
    async fn matches(
        &self,
        seed_id: &str,
        target_type: ContactType,
        limit: usize,
    ) -> Result<MatchesResponse>;

    async fn campaign_analysis(
        &self,
        contact_id: &str,
        target_type: ContactType,
    ) -> Result<CampaignAnalysis>;
}

/// Injected source set shared by a session and its coordinator
#[derive(Clone)]
pub struct Sources {
    pub contacts: Arc<dyn ContactSource>,
    pub membership: Arc<dyn MembershipSource>,
    pub matches: Arc<dyn MatchSource>,
}

impl Sources {
    pub fn new(
        contacts: Arc<dyn ContactSource>,
        membership: Arc<dyn MembershipSource>,
        matches: Arc<dyn MatchSource>,
    ) -> Self {
        Self {
            contacts,
            membership,
            matches,
        }
    }

    /// One client serving all three roles
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: ContactSource + MembershipSource + MatchSource + 'static,
    {
        Self {
            contacts: client.clone(),
            membership: client.clone(),
            matches: client,
        }
    }
}
