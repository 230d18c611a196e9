//! Campaign pipeline stages
//!
//! Two spellings of the same closed enumeration exist: [`CampaignStatus`]
//! (snake_case, used everywhere inside the portal) and [`ApiStage`]
//! (hyphenated, used on the wire by the introductions endpoints). The
//! translation between them is total in both directions; unknown wire values
//! collapse to `not_in_campaign` instead of failing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::{Error, Result};

/// Pipeline stage of a contact within one campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Prospect,
    Qualified,
    Outreached,
    Interested,
    ToMeet,
    Met,
    Disqualified,
    NotInCampaign,
}

impl CampaignStatus {
    /// Every stage, in pipeline order
    pub const ALL: [CampaignStatus; 8] = [
        CampaignStatus::Prospect,
        CampaignStatus::Qualified,
        CampaignStatus::Outreached,
        CampaignStatus::Interested,
        CampaignStatus::ToMeet,
        CampaignStatus::Met,
        CampaignStatus::Disqualified,
        CampaignStatus::NotInCampaign,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Prospect => "prospect",
            CampaignStatus::Qualified => "qualified",
            CampaignStatus::Outreached => "outreached",
            CampaignStatus::Interested => "interested",
            CampaignStatus::ToMeet => "to_meet",
            CampaignStatus::Met => "met",
            CampaignStatus::Disqualified => "disqualified",
            CampaignStatus::NotInCampaign => "not_in_campaign",
        }
    }

    /// Wire spelling of this stage
    pub fn to_api(self) -> ApiStage {
        match self {
            CampaignStatus::Prospect => ApiStage::Prospect,
            CampaignStatus::Qualified => ApiStage::Qualified,
            CampaignStatus::Outreached => ApiStage::Outreached,
            CampaignStatus::Interested => ApiStage::Interested,
            CampaignStatus::ToMeet => ApiStage::ToMeet,
            CampaignStatus::Met => ApiStage::Met,
            CampaignStatus::Disqualified => ApiStage::Disqualified,
            CampaignStatus::NotInCampaign => ApiStage::NotInCampaign,
        }
    }

    pub fn from_api(stage: ApiStage) -> Self {
        match stage {
            ApiStage::Prospect => CampaignStatus::Prospect,
            ApiStage::Qualified => CampaignStatus::Qualified,
            ApiStage::Outreached => CampaignStatus::Outreached,
            ApiStage::Interested => CampaignStatus::Interested,
            ApiStage::ToMeet => CampaignStatus::ToMeet,
            ApiStage::Met => CampaignStatus::Met,
            ApiStage::Disqualified => CampaignStatus::Disqualified,
            ApiStage::NotInCampaign => CampaignStatus::NotInCampaign,
        }
    }

    /// Human label ("to meet", "not in campaign")
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = Error;

    /// Accepts both the snake_case and the hyphenated spelling.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        CampaignStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| Error::InvalidInput(format!("unknown campaign stage: {s}")))
    }
}

/// Wire-format stage as sent and received by the introductions API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiStage {
    Prospect,
    Qualified,
    Outreached,
    Interested,
    ToMeet,
    Met,
    Disqualified,
    NotInCampaign,
}

impl ApiStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiStage::Prospect => "prospect",
            ApiStage::Qualified => "qualified",
            ApiStage::Outreached => "outreached",
            ApiStage::Interested => "interested",
            ApiStage::ToMeet => "to-meet",
            ApiStage::Met => "met",
            ApiStage::Disqualified => "disqualified",
            ApiStage::NotInCampaign => "not-in-campaign",
        }
    }

    /// Lenient parse: anything unrecognized is `not-in-campaign`.
    pub fn parse_lenient(raw: &str) -> Self {
        let stage = [
            ApiStage::Prospect,
            ApiStage::Qualified,
            ApiStage::Outreached,
            ApiStage::Interested,
            ApiStage::ToMeet,
            ApiStage::Met,
            ApiStage::Disqualified,
            ApiStage::NotInCampaign,
        ]
        .into_iter()
        .find(|stage| stage.as_str() == raw);

        match stage {
            Some(stage) => stage,
            None => {
                warn!(stage = %raw, "Unrecognized wire stage, treating as not-in-campaign");
                ApiStage::NotInCampaign
            }
        }
    }
}

impl fmt::Display for ApiStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiStage {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(ApiStage::parse_lenient(&raw))
    }
}

/// Stage priority used for "stage" sorting, highest priority first
const DEFAULT_PRIORITY: [CampaignStatus; 8] = [
    CampaignStatus::Met,
    CampaignStatus::ToMeet,
    CampaignStatus::Interested,
    CampaignStatus::Qualified,
    CampaignStatus::Outreached,
    CampaignStatus::Prospect,
    CampaignStatus::Disqualified,
    CampaignStatus::NotInCampaign,
];

/// Total order over stages for priority sorting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOrder {
    ranked: Vec<CampaignStatus>,
}

impl Default for StageOrder {
    fn default() -> Self {
        Self {
            ranked: DEFAULT_PRIORITY.to_vec(),
        }
    }
}

impl StageOrder {
    /// Build an order from configured stage names (highest first).
    ///
    /// Stages missing from `names` are appended in default priority order so
    /// the result is always total. Duplicates keep their first position.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut ranked: Vec<CampaignStatus> = Vec::with_capacity(CampaignStatus::ALL.len());
        for name in names {
            let status: CampaignStatus = name.as_ref().parse()?;
            if !ranked.contains(&status) {
                ranked.push(status);
            }
        }
        for status in DEFAULT_PRIORITY {
            if !ranked.contains(&status) {
                ranked.push(status);
            }
        }
        Ok(Self { ranked })
    }

    /// 0 is the highest priority
    pub fn rank(&self, status: CampaignStatus) -> usize {
        self.ranked
            .iter()
            .position(|s| *s == status)
            .unwrap_or(self.ranked.len())
    }

    /// Orders higher-priority stages first
    pub fn compare(&self, a: CampaignStatus, b: CampaignStatus) -> Ordering {
        self.rank(a).cmp(&self.rank(b))
    }

    pub fn stages(&self) -> &[CampaignStatus] {
        &self.ranked
    }
}

/// Contact id → current stage within one campaign
///
/// `None` means the stage is not known yet; an absent key means the contact
/// is not in the campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipMap {
    entries: HashMap<String, Option<CampaignStatus>>,
}

impl MembershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full map from `(target id, wire stage)` pairs.
    ///
    /// A later pair for the same id wins.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, ApiStage)>,
        S: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(id, stage)| (id.into(), Some(CampaignStatus::from_api(stage))))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, id: impl Into<String>, status: Option<CampaignStatus>) {
        self.entries.insert(id.into(), status);
    }

    pub fn get(&self, id: &str) -> Option<Option<CampaignStatus>> {
        self.entries.get(id).copied()
    }

    /// Effective stage, defaulting to `not_in_campaign`
    pub fn status_of(&self, id: &str) -> CampaignStatus {
        self.entries
            .get(id)
            .copied()
            .flatten()
            .unwrap_or(CampaignStatus::NotInCampaign)
    }

    /// Ids whose stage places them inside the campaign
    pub fn member_ids(&self) -> HashSet<&str> {
        self.entries
            .iter()
            .filter(|(_, status)| {
                matches!(status, Some(s) if *s != CampaignStatus::NotInCampaign)
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<CampaignStatus>)> {
        self.entries.iter().map(|(id, status)| (id.as_str(), *status))
    }
}

/// Per-stage counters with every stage present
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDistribution {
    counts: BTreeMap<CampaignStatus, usize>,
}

impl Default for StageDistribution {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl StageDistribution {
    pub fn zeroed() -> Self {
        Self {
            counts: CampaignStatus::ALL.into_iter().map(|s| (s, 0)).collect(),
        }
    }

    /// Count `ids` by their effective stage in `membership`.
    pub fn from_membership<'a, I>(ids: I, membership: &MembershipMap) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut distribution = Self::zeroed();
        for id in ids {
            distribution.record(membership.status_of(id));
        }
        distribution
    }

    pub fn record(&mut self, status: CampaignStatus) {
        self.add(status, 1);
    }

    pub fn add(&mut self, status: CampaignStatus, count: usize) {
        *self.counts.entry(status).or_insert(0) += count;
    }

    pub fn get(&self, status: CampaignStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CampaignStatus, usize)> + '_ {
        self.counts.iter().map(|(s, c)| (*s, *c))
    }
}
