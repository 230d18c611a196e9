//! Introduction (campaign membership) endpoints

use async_trait::async_trait;
use imp_common::introductions::{
    BulkStageUpdateRequest, IntroductionRecord, IntroductionStageUpdate, StageSummaryItem,
};
use imp_common::{ApiStage, Result};
use tracing::info;

use super::ApiClient;
use crate::sources::MembershipSource;

#[async_trait]
impl MembershipSource for ApiClient {
    async fn list_stages(
        &self,
        owner_id: &str,
        stage: Option<ApiStage>,
    ) -> Result<Vec<IntroductionRecord>> {
        let url = self.rest().url(&["introductions", "stage"])?;
        let mut params = vec![("ownerId", owner_id.to_string())];
        if let Some(stage) = stage {
            params.push(("stage", stage.as_str().to_string()));
        }
        self.rest()
            .send_json(|http| http.get(url.clone()).query(&params))
            .await
    }

    async fn set_stage(&self, update: &IntroductionStageUpdate) -> Result<IntroductionRecord> {
        let url = self.rest().url(&["introductions", "stage"])?;
        let record: IntroductionRecord = self
            .rest()
            .send_json(|http| http.post(url.clone()).json(update))
            .await?;
        info!(
            owner_id = %update.owner_id,
            target_id = %update.target_id,
            stage = %update.stage,
            "Introduction stage set"
        );
        Ok(record)
    }

    async fn bulk_update_stages(&self, request: &BulkStageUpdateRequest) -> Result<usize> {
        let url = self
            .rest()
            .url(&["introductions", "stages", "bulk-update"])?;
        self.rest()
            .send_unit(|http| http.post(url.clone()).json(request))
            .await?;
        info!(
            owner_id = %request.owner_id,
            updates = request.updates.len(),
            "Bulk stage update applied"
        );
        Ok(request.updates.len())
    }

    async fn stage_summary(&self, owner_id: &str) -> Result<Vec<StageSummaryItem>> {
        let url = self
            .rest()
            .url(&["introductions", "stage", "summary"])?;
        let params = [("ownerId", owner_id)];
        self.rest()
            .send_json(|http| http.get(url.clone()).query(&params))
            .await
    }
}
