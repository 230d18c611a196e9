//! Shared test fixtures: an in-memory backend implementing every source trait

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use imp_cm::filter::FilterRequest;
use imp_cm::sources::{
    CampaignContactsQuery, ContactSource, ContactsQuery, MatchSource, MembershipSource,
};
use imp_cm::{CampaignSession, SessionOptions, Sources};
use imp_common::contact::{
    CampaignAnalysis, CampaignContactRecord, CampaignContactsPage, Contact, ContactType,
    ContactsPage, FilteredContacts, FirestoreTimestamp, MatchCandidate, MatchesResponse,
    Pagination,
};
use imp_common::introductions::{
    BulkStageUpdateRequest, IntroductionRecord, IntroductionStageUpdate, StageSummaryItem,
};
use imp_common::{ApiStage, Error, Result};
use tokio::sync::Notify;

pub const OWNER: &str = "owner-1";

/// Contact with a name and an update time
pub fn contact(id: &str, contact_type: ContactType, updated_secs: i64) -> Contact {
    let mut contact = Contact::new(id, contact_type);
    contact.full_name = format!("Contact {id}");
    contact.updated_at = Some(FirestoreTimestamp {
        seconds: updated_secs,
        nanoseconds: 0,
    });
    contact
}

/// `count` investors named `c00`, `c01`, ...
pub fn investors(count: usize) -> Vec<Contact> {
    (0..count)
        .map(|i| contact(&format!("c{i:02}"), ContactType::Investor, 1_000 + i as i64))
        .collect()
}

#[derive(Default)]
pub struct Calls {
    pub list: AtomicUsize,
    pub filter: AtomicUsize,
    pub detail: AtomicUsize,
    pub campaign: AtomicUsize,
    pub stages: AtomicUsize,
    pub bulk: AtomicUsize,
    pub single: AtomicUsize,
    pub matches: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory portal backend
#[derive(Default)]
pub struct FakeBackend {
    pub contacts: Mutex<Vec<Contact>>,
    /// Contacts the campaign-contacts endpoint returns, in order
    pub campaign: Mutex<Vec<CampaignContactRecord>>,
    /// Contacts only reachable through the detail endpoint
    pub detail_only: Mutex<Vec<Contact>>,
    pub membership: Mutex<HashMap<String, ApiStage>>,
    pub candidates: Mutex<Vec<MatchCandidate>>,
    pub failing_details: Mutex<HashSet<String>>,
    pub fail_listing: Mutex<bool>,
    pub fail_writes: Mutex<bool>,
    pub fail_stage_reads: Mutex<bool>,
    /// When set, bulk writes wait for a notification
    pub write_gate: Mutex<Option<Arc<Notify>>>,
    /// When set, stage listings wait for a notification
    pub stage_gate: Mutex<Option<Arc<Notify>>>,
    pub filter_requests: Mutex<Vec<FilterRequest>>,
    pub bulk_requests: Mutex<Vec<BulkStageUpdateRequest>>,
    pub calls: Calls,
}

impl FakeBackend {
    pub fn with_contacts(contacts: Vec<Contact>) -> Arc<Self> {
        let backend = Self::default();
        *backend.contacts.lock().unwrap() = contacts;
        Arc::new(backend)
    }

    pub fn set_member(&self, id: &str, stage: ApiStage) {
        self.membership.lock().unwrap().insert(id.to_string(), stage);
    }

    pub fn stage_of(&self, id: &str) -> Option<ApiStage> {
        self.membership.lock().unwrap().get(id).copied()
    }

    pub fn add_campaign_record(&self, contact: Contact, stage: ApiStage) {
        self.set_member(&contact.id, stage);
        self.campaign.lock().unwrap().push(CampaignContactRecord {
            contact,
            stage: Some(stage),
        });
    }

    fn all_known(&self) -> Vec<Contact> {
        let mut known = self.contacts.lock().unwrap().clone();
        known.extend(
            self.campaign
                .lock()
                .unwrap()
                .iter()
                .map(|record| record.contact.clone()),
        );
        known.extend(self.detail_only.lock().unwrap().iter().cloned());
        known
    }
}

/// Items after `start_after`, up to `limit`, plus whether more remain
fn page_after<T, F>(items: &[T], start_after: Option<&str>, limit: usize, id_of: F) -> (Vec<T>, bool)
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let start = match start_after {
        Some(after) => items
            .iter()
            .position(|item| id_of(item) == after)
            .map(|i| i + 1)
            .unwrap_or(items.len()),
        None => 0,
    };
    let end = (start + limit).min(items.len());
    (items[start..end].to_vec(), end < items.len())
}

#[async_trait]
impl ContactSource for FakeBackend {
    async fn list_contacts(&self, query: &ContactsQuery) -> Result<ContactsPage> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        if *self.fail_listing.lock().unwrap() {
            return Err(Error::Api {
                status: 503,
                message: "unavailable".into(),
            });
        }
        let contacts = self.contacts.lock().unwrap().clone();
        let (data, has_more) = page_after(
            &contacts,
            query.start_after.as_deref(),
            query.limit,
            |c: &Contact| c.id.as_str(),
        );
        Ok(ContactsPage {
            pagination: Pagination {
                total: None,
                limit: Some(query.limit as u32),
                next_cursor: data.last().map(|c| c.id.clone()),
                has_more,
            },
            data,
        })
    }

    async fn filter_contacts(&self, request: &FilterRequest) -> Result<FilteredContacts> {
        self.calls.filter.fetch_add(1, Ordering::SeqCst);
        self.filter_requests.lock().unwrap().push(request.clone());

        let matching: Vec<Contact> = self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| request.contact_type.map_or(true, |t| c.contact_type == t))
            .filter(|c| {
                request.industries.is_empty()
                    || request.industries.iter().any(|i| c.industries.contains(i))
            })
            .cloned()
            .collect();
        let (data, _) = page_after(
            &matching,
            request.start_after.as_deref(),
            request.limit,
            |c: &Contact| c.id.as_str(),
        );
        Ok(FilteredContacts {
            data,
            total: Some(matching.len() as u64),
            filters_applied: serde_json::Value::Null,
        })
    }

    async fn get_contact(&self, id: &str) -> Result<Contact> {
        self.calls.detail.fetch_add(1, Ordering::SeqCst);
        if self.failing_details.lock().unwrap().contains(id) {
            return Err(Error::Network("connection reset".into()));
        }
        self.all_known()
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(format!("/contacts/{id}")))
    }

    async fn campaign_contacts(
        &self,
        owner_id: &str,
        query: &CampaignContactsQuery,
    ) -> Result<CampaignContactsPage> {
        self.calls.campaign.fetch_add(1, Ordering::SeqCst);
        assert_eq!(owner_id, OWNER);
        let records = self.campaign.lock().unwrap().clone();
        let (data, has_more) = page_after(
            &records,
            query.start_after.as_deref(),
            query.limit,
            |r: &CampaignContactRecord| r.contact.id.as_str(),
        );
        Ok(CampaignContactsPage {
            data,
            pagination: Pagination {
                total: None,
                limit: Some(query.limit as u32),
                next_cursor: None,
                has_more,
            },
        })
    }
}

#[async_trait]
impl MembershipSource for FakeBackend {
    async fn list_stages(
        &self,
        owner_id: &str,
        stage: Option<ApiStage>,
    ) -> Result<Vec<IntroductionRecord>> {
        self.calls.stages.fetch_add(1, Ordering::SeqCst);
        let gate = self.stage_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if *self.fail_stage_reads.lock().unwrap() {
            return Err(Error::Timeout("stage listing".into()));
        }
        Ok(self
            .membership
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| stage.map_or(true, |wanted| **s == wanted))
            .map(|(id, s)| IntroductionRecord {
                id: format!("intro-{id}"),
                owner_id: owner_id.to_string(),
                target_id: id.clone(),
                stage: *s,
                created_at: None,
                updated_at: None,
            })
            .collect())
    }

    async fn set_stage(&self, update: &IntroductionStageUpdate) -> Result<IntroductionRecord> {
        self.calls.single.fetch_add(1, Ordering::SeqCst);
        self.set_member(&update.target_id, update.stage);
        Ok(IntroductionRecord {
            id: format!("intro-{}", update.target_id),
            owner_id: update.owner_id.clone(),
            target_id: update.target_id.clone(),
            stage: update.stage,
            created_at: None,
            updated_at: None,
        })
    }

    async fn bulk_update_stages(&self, request: &BulkStageUpdateRequest) -> Result<usize> {
        self.calls.bulk.fetch_add(1, Ordering::SeqCst);
        let gate = self.write_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if *self.fail_writes.lock().unwrap() {
            return Err(Error::Api {
                status: 400,
                message: "rejected".into(),
            });
        }
        self.bulk_requests.lock().unwrap().push(request.clone());
        for update in &request.updates {
            self.set_member(&update.target_id, update.stage);
        }
        Ok(request.updates.len())
    }

    async fn stage_summary(&self, _owner_id: &str) -> Result<Vec<StageSummaryItem>> {
        let mut counts: HashMap<ApiStage, u64> = HashMap::new();
        for stage in self.membership.lock().unwrap().values() {
            *counts.entry(*stage).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(stage, count)| StageSummaryItem { stage, count })
            .collect())
    }
}

#[async_trait]
impl MatchSource for FakeBackend {
    async fn matches(
        &self,
        _seed_id: &str,
        _target_type: ContactType,
        limit: usize,
    ) -> Result<MatchesResponse> {
        self.calls.matches.fetch_add(1, Ordering::SeqCst);
        let candidates: Vec<MatchCandidate> = self
            .candidates
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect();
        Ok(MatchesResponse {
            total_matches: candidates.len() as u64,
            candidates,
            seed_contact: None,
            attributes_used: vec!["industries".into()],
        })
    }

    async fn campaign_analysis(
        &self,
        contact_id: &str,
        _target_type: ContactType,
    ) -> Result<CampaignAnalysis> {
        Ok(CampaignAnalysis {
            contact: self.get_contact(contact_id).await?,
            combinations: Vec::new(),
        })
    }
}

pub fn session_with(backend: &Arc<FakeBackend>, page_size: usize) -> CampaignSession {
    let options = SessionOptions {
        page_size,
        ..Default::default()
    };
    CampaignSession::new(
        OWNER,
        ContactType::Investor,
        Sources::from_client(backend.clone()),
        options,
    )
}
