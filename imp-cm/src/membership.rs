//! Campaign membership loading

use imp_common::introductions::StageSummaryItem;
use imp_common::{CampaignStatus, MembershipMap, Result, StageDistribution};
use tracing::debug;

use crate::sources::MembershipSource;

/// Load the membership map of `owner_id`.
///
/// An empty owner id yields an empty map without a call.
pub async fn fetch_membership_map(
    source: &dyn MembershipSource,
    owner_id: &str,
) -> Result<MembershipMap> {
    if owner_id.trim().is_empty() {
        return Ok(MembershipMap::new());
    }

    let records = source.list_stages(owner_id, None).await?;
    debug!(owner_id, records = records.len(), "Membership loaded");

    Ok(MembershipMap::from_pairs(
        records
            .into_iter()
            .map(|record| (record.target_id, record.stage)),
    ))
}

/// Server-side per-stage counts, with every stage present
pub fn summary_distribution(items: &[StageSummaryItem]) -> StageDistribution {
    let mut distribution = StageDistribution::zeroed();
    for item in items {
        distribution.add(CampaignStatus::from_api(item.stage), item.count as usize);
    }
    distribution
}
