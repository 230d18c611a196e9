//! Contact filter criteria
//!
//! One [`ContactFilter`] drives both the server-side filtered search (via
//! [`ContactFilter::to_request`]) and the local predicate the reconciler
//! re-applies to campaign and match datasets. `campaign_status` is purely
//! local: it is checked against the membership map and never sent.

use std::collections::BTreeMap;

use imp_common::contact::{ArrayAttribute, Contact, ContactSortField, ContactType, SortDirection};
use imp_common::{ApiStage, CampaignStatus, MembershipMap};
use serde::{Deserialize, Serialize};

/// How array criteria combine with a contact's collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every filter value must be present
    All,
    /// At least one filter value must be present
    #[default]
    Any,
}

/// Inclusive bounds on a server-side per-stage count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCountRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

impl StageCountRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Filter state as edited by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFilter {
    pub contact_type: Option<ContactType>,
    pub location_country: Option<String>,
    pub location_city: Option<String>,
    pub industries: Vec<String>,
    pub skills: Vec<String>,
    pub roles: Vec<String>,
    pub funding_stages: Vec<String>,
    pub verticals: Vec<String>,
    pub product_types: Vec<String>,
    pub seniority_levels: Vec<String>,
    pub match_mode: MatchMode,
    pub campaign_status: Option<CampaignStatus>,
    pub stage_count_filters: BTreeMap<CampaignStatus, StageCountRange>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl ContactFilter {
    pub fn values(&self, attribute: ArrayAttribute) -> &[String] {
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

    pub fn values_mut(&mut self, attribute: ArrayAttribute) -> &mut Vec<String> {
        match attribute {
            ArrayAttribute::Industries => &mut self.industries,
            ArrayAttribute::Skills => &mut self.skills,
            ArrayAttribute::Roles => &mut self.roles,
            ArrayAttribute::FundingStages => &mut self.funding_stages,
            ArrayAttribute::Verticals => &mut self.verticals,
            ArrayAttribute::ProductTypes => &mut self.product_types,
            ArrayAttribute::SeniorityLevels => &mut self.seniority_levels,
        }
    }

    /// Whether the filtered-search endpoint must be used.
    ///
    /// `campaign_status` and `match_mode` alone never activate it.
    pub fn has_remote_criteria(&self) -> bool {
        self.contact_type.is_some()
            || non_blank(&self.location_country).is_some()
            || non_blank(&self.location_city).is_some()
            || ArrayAttribute::ALL
                .iter()
                .any(|attribute| !self.values(*attribute).is_empty())
            || self
                .stage_count_filters
                .values()
                .any(|range| !range.is_unbounded())
    }

    /// Local predicate over the profile attributes
    pub fn matches(&self, contact: &Contact) -> bool {
        if let Some(contact_type) = self.contact_type {
            if contact.contact_type != contact_type {
                return false;
            }
        }
        if let Some(country) = non_blank(&self.location_country) {
            if contact.location_country != country {
                return false;
            }
        }
        if let Some(city) = non_blank(&self.location_city) {
            if contact.location_city != city {
                return false;
            }
        }

        ArrayAttribute::ALL.iter().all(|attribute| {
            array_matches(
                self.values(*attribute),
                contact.attribute(*attribute),
                self.match_mode,
            )
        })
    }

    /// Local `campaign_status` predicate; absent membership is `not_in_campaign`
    pub fn matches_status(&self, membership: &MembershipMap, id: &str) -> bool {
        match self.campaign_status {
            Some(status) => membership.status_of(id) == status,
            None => true,
        }
    }

    /// Body of `POST /contacts/filter`
    pub fn to_request(
        &self,
        limit: usize,
        start_after: Option<String>,
        order_by: ContactSortField,
        direction: SortDirection,
    ) -> FilterRequest {
        let stage_count_filters = self
            .stage_count_filters
            .iter()
            .filter(|(_, range)| !range.is_unbounded())
            .map(|(status, range)| (status.to_api(), *range))
            .collect();

        FilterRequest {
            contact_type: self.contact_type,
            location_country: non_blank(&self.location_country).map(str::to_string),
            location_city: non_blank(&self.location_city).map(str::to_string),
            industries: self.industries.clone(),
            skills: self.skills.clone(),
            roles: self.roles.clone(),
            funding_stages: self.funding_stages.clone(),
            verticals: self.verticals.clone(),
            product_types: self.product_types.clone(),
            seniority_levels: self.seniority_levels.clone(),
            match_mode: self.match_mode,
            stage_count_filters,
            limit,
            start_after,
            order_by: order_by.as_str().to_string(),
            order_direction: direction.as_str().to_string(),
        }
    }
}

fn array_matches(wanted: &[String], present: &[String], mode: MatchMode) -> bool {
    if wanted.is_empty() {
        return true;
    }
    if present.is_empty() {
        return false;
    }
    match mode {
        MatchMode::All => wanted.iter().all(|value| present.contains(value)),
        MatchMode::Any => wanted.iter().any(|value| present.contains(value)),
    }
}

/// Wire body of the filtered search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_type: Option<ContactType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_city: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub industries: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub funding_stages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub verticals: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub product_types: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seniority_levels: Vec<String>,
    pub match_mode: MatchMode,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub stage_count_filters: BTreeMap<ApiStage, StageCountRange>,
    pub limit: usize,
    #[serde(rename = "startAfter", skip_serializing_if = "Option::is_none")]
    pub start_after: Option<String>,
    pub order_by: String,
    pub order_direction: String,
}
