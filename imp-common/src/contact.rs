//! Contact records and the listing/match payloads that carry them
//!
//! Collections the backend omits deserialize as empty; contacts are rebuilt
//! on every fetch and never mutated locally.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::ApiStage;
use crate::quality::{self, QualityScore};
use crate::{Error, Result};

/// Investor or founder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Investor,
    Founder,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Investor => "investor",
            ContactType::Founder => "founder",
        }
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "investor" => Ok(ContactType::Investor),
            "founder" => Ok(ContactType::Founder),
            other => Err(Error::InvalidInput(format!("unknown contact type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    ActionRequired,
    Waiting,
}

/// Timestamp as serialized by the backend document store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FirestoreTimestamp {
    #[serde(rename = "_seconds")]
    pub seconds: i64,
    #[serde(rename = "_nanoseconds", default)]
    pub nanoseconds: u32,
}

impl FirestoreTimestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

/// String-collection attributes that search filters can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayAttribute {
    Industries,
    Skills,
    Roles,
    FundingStages,
    Verticals,
    ProductTypes,
    SeniorityLevels,
}

impl ArrayAttribute {
    pub const ALL: [ArrayAttribute; 7] = [
        ArrayAttribute::Industries,
        ArrayAttribute::Skills,
        ArrayAttribute::Roles,
        ArrayAttribute::FundingStages,
        ArrayAttribute::Verticals,
        ArrayAttribute::ProductTypes,
        ArrayAttribute::SeniorityLevels,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArrayAttribute::Industries => "industries",
            ArrayAttribute::Skills => "skills",
            ArrayAttribute::Roles => "roles",
            ArrayAttribute::FundingStages => "funding_stages",
            ArrayAttribute::Verticals => "verticals",
            ArrayAttribute::ProductTypes => "product_types",
            ArrayAttribute::SeniorityLevels => "seniority_levels",
        }
    }
}

/// Investor or founder contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub headline: String,
    pub contact_type: ContactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_status: Option<ActionStatus>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub location_city: String,
    #[serde(default)]
    pub location_country: String,
    #[serde(default)]
    pub current_company: String,
    #[serde(default)]
    pub current_role: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub funding_stages: Vec<String>,
    #[serde(default)]
    pub verticals: Vec<String>,
    #[serde(default)]
    pub product_types: Vec<String>,
    #[serde(default)]
    pub seniority_levels: Vec<String>,
    #[serde(default)]
    pub past_companies: Vec<String>,
    #[serde(default)]
    pub job_to_be_done: Vec<String>,
    #[serde(default)]
    pub target_domains: Vec<String>,
    #[serde(default)]
    pub stage_preferences: Vec<String>,
    #[serde(default)]
    pub check_size_range: Vec<String>,
    /// Capability bucket ids, e.g. `platform_quality_8`
    #[serde(default)]
    pub bucket_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<FirestoreTimestamp>,
    #[serde(default)]
    pub updated_at: Option<FirestoreTimestamp>,
    /// Server-side aggregate; stale after any stage mutation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_counts: Option<BTreeMap<ApiStage, u64>>,
}

impl Contact {
    /// Minimal contact; all collections empty
    pub fn new(id: impl Into<String>, contact_type: ContactType) -> Self {
        Self {
            id: id.into(),
            full_name: String::new(),
            headline: String::new(),
            contact_type,
            action_status: None,
            email: String::new(),
            linkedin_url: None,
            location_city: String::new(),
            location_country: String::new(),
            current_company: String::new(),
            current_role: String::new(),
            skills: Vec::new(),
            industries: Vec::new(),
            roles: Vec::new(),
            funding_stages: Vec::new(),
            verticals: Vec::new(),
            product_types: Vec::new(),
            seniority_levels: Vec::new(),
            past_companies: Vec::new(),
            job_to_be_done: Vec::new(),
            target_domains: Vec::new(),
            stage_preferences: Vec::new(),
            check_size_range: Vec::new(),
            bucket_ids: Vec::new(),
            created_at: None,
            updated_at: None,
            stage_counts: None,
        }
    }

    pub fn attribute(&self, attribute: ArrayAttribute) -> &[String] {
        match attribute {
            ArrayAttribute::Industries => &self.industries,
            ArrayAttribute::Skills => &self.skills,
            ArrayAttribute::Roles => &self.roles,
            ArrayAttribute::FundingStages => &self.funding_stages,
            ArrayAttribute::Verticals => &self.verticals,
            ArrayAttribute::ProductTypes => &self.product_types,
            ArrayAttribute::SeniorityLevels => &self.seniority_levels,
        }
    }

    pub fn quality_score(&self) -> QualityScore {
        quality::score(&self.bucket_ids)
    }

    /// Server-side count for one stage (0 when absent)
    pub fn stage_count(&self, stage: ApiStage) -> u64 {
        self.stage_counts
            .as_ref()
            .and_then(|counts| counts.get(&stage).copied())
            .unwrap_or(0)
    }
}

/// Pagination block of the plain listing endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
}

/// `GET /contacts` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactsPage {
    #[serde(default)]
    pub data: Vec<Contact>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// `POST /contacts/filter` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteredContacts {
    #[serde(default)]
    pub data: Vec<Contact>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub filters_applied: serde_json::Value,
}

/// One row of the owner campaign-contacts listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignContactRecord {
    pub contact: Contact,
    #[serde(default)]
    pub stage: Option<ApiStage>,
}

/// `GET /owners/:id/campaign-contacts` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignContactsPage {
    #[serde(default)]
    pub data: Vec<CampaignContactRecord>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOverlap {
    pub attribute: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Ranked candidate from the match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub contact: Contact,
    pub score: f64,
    #[serde(default)]
    pub overlaps: Vec<MatchOverlap>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchesResponse {
    #[serde(default)]
    pub candidates: Vec<MatchCandidate>,
    #[serde(rename = "totalMatches", default)]
    pub total_matches: u64,
    #[serde(rename = "seedContact", default)]
    pub seed_contact: Option<Contact>,
    #[serde(default)]
    pub attributes_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignCombination {
    pub attributes: Vec<String>,
    pub match_count: u64,
    #[serde(default)]
    pub description: String,
}

/// `GET /contacts/:id/campaign-analysis` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignAnalysis {
    pub contact: Contact,
    #[serde(default)]
    pub combinations: Vec<CampaignCombination>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort fields of the all-contacts view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSortField {
    #[default]
    UpdatedAt,
    CreatedAt,
    FullName,
    ContactType,
}

impl ContactSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactSortField::UpdatedAt => "updated_at",
            ContactSortField::CreatedAt => "created_at",
            ContactSortField::FullName => "full_name",
            ContactSortField::ContactType => "contact_type",
        }
    }
}

/// Sort fields of the in-campaign view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignSortField {
    #[default]
    Stage,
    UpdatedAt,
}

impl CampaignSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignSortField::Stage => "stage",
            CampaignSortField::UpdatedAt => "updated_at",
        }
    }
}
