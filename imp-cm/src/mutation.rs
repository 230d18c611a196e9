//! Bulk stage mutations
//!
//! A stage change is written for the whole selection in one batched call.
//! Only after the write succeeds does the coordinator refresh membership,
//! invalidate the listing regions and clear the selection, in that order.
//! No write starts while another write or a membership refresh is pending.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use imp_common::introductions::{
    BulkStageUpdate, BulkStageUpdateRequest, IntroductionStageUpdate,
};
use imp_common::{CampaignStatus, MembershipMap, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::{CacheRegion, ViewCaches};
use crate::membership::fetch_membership_map;
use crate::selection::SelectionSet;
use crate::sources::MembershipSource;

/// Regions whose pages embed stage-dependent data
const INVALIDATED_REGIONS: [CacheRegion; 3] = [
    CacheRegion::Contacts,
    CacheRegion::ContactFilters,
    CacheRegion::CampaignContacts,
];

/// User-facing stage actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    AddToCampaign,
    RemoveFromCampaign,
    ChangeStage(CampaignStatus),
}

impl StageAction {
    pub fn target(&self) -> CampaignStatus {
        match self {
            StageAction::AddToCampaign => CampaignStatus::Prospect,
            StageAction::RemoveFromCampaign => CampaignStatus::NotInCampaign,
            StageAction::ChangeStage(stage) => *stage,
        }
    }

    /// Only explicit stage changes ask first
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, StageAction::ChangeStage(_))
    }
}

/// Asks the user to approve a stage change for `count` contacts
pub trait Confirmer: Send + Sync {
    fn confirm(&self, stage: CampaignStatus, count: usize) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(CampaignStatus, usize) -> bool + Send + Sync,
{
    fn confirm(&self, stage: CampaignStatus, count: usize) -> bool {
        self(stage, count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Written; `membership` is `None` if the follow-up refresh failed
    Applied {
        updated: usize,
        stage: CampaignStatus,
        membership: Option<MembershipMap>,
    },
    /// Nothing selected; no call made
    EmptySelection,
    /// Confirmation refused
    Declined,
    /// Another mutation or a membership refresh is in flight
    Busy,
}

/// Clears an in-progress flag when dropped
struct FlagGuard {
    flag: Arc<AtomicBool>,
}

impl FlagGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One pending membership refresh; refreshes may overlap
struct RefreshGuard {
    pending: Arc<AtomicUsize>,
}

impl RefreshGuard {
    fn enter(pending: &Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::AcqRel);
        Self {
            pending: pending.clone(),
        }
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Applies stage changes for one campaign owner
#[derive(Clone)]
pub struct StageMutationCoordinator {
    owner_id: String,
    membership: Arc<dyn MembershipSource>,
    caches: Arc<Mutex<ViewCaches>>,
    in_flight: Arc<AtomicBool>,
    refreshing: Arc<AtomicUsize>,
}

impl StageMutationCoordinator {
    pub fn new(
        owner_id: impl Into<String>,
        membership: Arc<dyn MembershipSource>,
        caches: Arc<Mutex<ViewCaches>>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            membership,
            caches,
            in_flight: Arc::new(AtomicBool::new(false)),
            refreshing: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire) > 0
    }

    /// Whether stage actions may be offered for `selection`
    pub fn actions_enabled(&self, selection: &SelectionSet) -> bool {
        !selection.is_empty() && !self.is_busy() && !self.is_refreshing()
    }

    /// Reload the full membership map
    pub async fn refresh_membership(&self) -> Result<MembershipMap> {
        let _pending = RefreshGuard::enter(&self.refreshing);
        fetch_membership_map(self.membership.as_ref(), &self.owner_id).await
    }

    /// Claim the write slot, unless a write or a refresh is pending
    fn begin_write(&self) -> Option<FlagGuard> {
        let Some(guard) = FlagGuard::acquire(&self.in_flight) else {
            warn!("Stage mutation already in flight");
            return None;
        };
        if self.is_refreshing() {
            warn!("Membership refresh pending, stage mutation refused");
            return None;
        }
        Some(guard)
    }

    /// Move every selected contact to the stage of `action`.
    ///
    /// A failed write returns the error and leaves `selection` untouched.
    pub async fn apply(
        &self,
        action: StageAction,
        selection: &mut SelectionSet,
        confirmer: &dyn Confirmer,
    ) -> Result<MutationOutcome> {
        if selection.is_empty() {
            return Ok(MutationOutcome::EmptySelection);
        }

        let Some(_in_flight) = self.begin_write() else {
            return Ok(MutationOutcome::Busy);
        };

        let stage = action.target();
        let ids = selection.ids();
        if action.requires_confirmation() && !confirmer.confirm(stage, ids.len()) {
            info!(stage = %stage, count = ids.len(), "Stage change declined");
            return Ok(MutationOutcome::Declined);
        }

        let request = BulkStageUpdateRequest {
            owner_id: self.owner_id.clone(),
            updates: ids
                .iter()
                .map(|id| BulkStageUpdate {
                    target_id: id.clone(),
                    stage: stage.to_api(),
                })
                .collect(),
        };
        let updated = self.membership.bulk_update_stages(&request).await?;
        info!(owner_id = %self.owner_id, stage = %stage, updated, "Stage mutation written");

        let membership = self.settle(&ids).await;
        selection.clear();

        Ok(MutationOutcome::Applied {
            updated,
            stage,
            membership,
        })
    }

    /// Move one contact with the single-record upsert.
    ///
    /// Same gating and follow-up as [`apply`](Self::apply), without a selection.
    pub async fn apply_one(&self, id: &str, stage: CampaignStatus) -> Result<MutationOutcome> {
        if id.trim().is_empty() {
            return Ok(MutationOutcome::EmptySelection);
        }

        let Some(_in_flight) = self.begin_write() else {
            return Ok(MutationOutcome::Busy);
        };

        let update = IntroductionStageUpdate {
            owner_id: self.owner_id.clone(),
            target_id: id.to_string(),
            stage: stage.to_api(),
        };
        let record = self.membership.set_stage(&update).await?;
        let stage = CampaignStatus::from_api(record.stage);

        let membership = self.settle(&[id.to_string()]).await;
        Ok(MutationOutcome::Applied {
            updated: 1,
            stage,
            membership,
        })
    }

    /// Refresh membership, then drop every cached result the write made stale
    async fn settle(&self, ids: &[String]) -> Option<MembershipMap> {
        let membership = match self.refresh_membership().await {
            Ok(map) => Some(map),
            Err(e) => {
                warn!(error = %e, "Membership refresh after stage mutation failed");
                None
            }
        };

        let mut caches = self.caches.lock().await;
        for region in INVALIDATED_REGIONS {
            caches.invalidate(region);
        }
        // Per-stage counts live on the contact records
        for id in ids {
            caches.details.remove(CacheRegion::ContactDetail, id);
        }
        membership
    }
}
