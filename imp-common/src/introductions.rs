//! Introduction (campaign membership) wire types
//!
//! An introduction links an owner (the campaign's seed contact) to a target
//! contact at some pipeline stage.

use serde::{Deserialize, Serialize};

use crate::campaign::ApiStage;
use crate::contact::FirestoreTimestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionRecord {
    #[serde(default)]
    pub id: String,
    pub owner_id: String,
    pub target_id: String,
    pub stage: ApiStage,
    #[serde(default)]
    pub created_at: Option<FirestoreTimestamp>,
    #[serde(default)]
    pub updated_at: Option<FirestoreTimestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummaryItem {
    pub stage: ApiStage,
    pub count: u64,
}

/// Body of `POST /introductions/stage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionStageUpdate {
    pub owner_id: String,
    pub target_id: String,
    pub stage: ApiStage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStageUpdate {
    pub target_id: String,
    pub stage: ApiStage,
}

/// Body of `POST /introductions/stages/bulk-update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStageUpdateRequest {
    pub owner_id: String,
    pub updates: Vec<BulkStageUpdate>,
}
