//! Contact listing, search, detail and match endpoints

use async_trait::async_trait;
use imp_common::contact::{
    CampaignAnalysis, CampaignContactsPage, Contact, ContactType, ContactsPage, FilteredContacts,
    MatchesResponse,
};
use imp_common::Result;
use tracing::debug;

use super::ApiClient;
use crate::filter::FilterRequest;
use crate::sources::{CampaignContactsQuery, ContactSource, ContactsQuery, MatchSource};

#[async_trait]
impl ContactSource for ApiClient {
    async fn list_contacts(&self, query: &ContactsQuery) -> Result<ContactsPage> {
        let url = self.rest().url(&["contacts"])?;
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("order_by", query.order_by.as_str().to_string()),
            ("order_direction", query.direction.as_str().to_string()),
        ];
        if let Some(start_after) = &query.start_after {
            params.push(("startAfter", start_after.clone()));
        }

        let page: ContactsPage = self
            .rest()
            .send_json(|http| http.get(url.clone()).query(&params))
            .await?;
        debug!(
            returned = page.data.len(),
            has_more = page.pagination.has_more,
            "Listed contacts"
        );
        Ok(page)
    }

    async fn filter_contacts(&self, request: &FilterRequest) -> Result<FilteredContacts> {
        let url = self.rest().url(&["contacts", "filter"])?;
        let page: FilteredContacts = self
            .rest()
            .send_json(|http| http.post(url.clone()).json(request))
            .await?;
        debug!(returned = page.data.len(), total = ?page.total, "Filtered contacts");
        Ok(page)
    }

    async fn get_contact(&self, id: &str) -> Result<Contact> {
        let url = self.rest().url(&["contacts", id])?;
        self.rest().send_json(|http| http.get(url.clone())).await
    }

    async fn campaign_contacts(
        &self,
        owner_id: &str,
        query: &CampaignContactsQuery,
    ) -> Result<CampaignContactsPage> {
        let url = self
            .rest()
            .url(&["owners", owner_id, "campaign-contacts"])?;
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("orderBy", query.order_by.as_str().to_string()),
            ("orderDirection", query.direction.as_str().to_string()),
        ];
        if let Some(start_after) = &query.start_after {
            params.push(("startAfter", start_after.clone()));
        }

        let page: CampaignContactsPage = self
            .rest()
            .send_json(|http| http.get(url.clone()).query(&params))
            .await?;
        debug!(
            owner_id,
            returned = page.data.len(),
            has_more = page.pagination.has_more,
            "Listed campaign contacts"
        );
        Ok(page)
    }
}

#[async_trait]
impl MatchSource for ApiClient {
    async fn matches(
        &self,
        seed_id: &str,
        target_type: ContactType,
        limit: usize,
    ) -> Result<MatchesResponse> {
        let url = self.rest().url(&["contacts", seed_id, "matches"])?;
        let params = [
            ("type", target_type.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        self.rest()
            .send_json(|http| http.get(url.clone()).query(&params))
            .await
    }

    async fn campaign_analysis(
        &self,
        contact_id: &str,
        target_type: ContactType,
    ) -> Result<CampaignAnalysis> {
        let url = self
            .rest()
            .url(&["contacts", contact_id, "campaign-analysis"])?;
        let params = [("target_type", target_type.as_str())];
        self.rest()
            .send_json(|http| http.get(url.clone()).query(&params))
            .await
    }
}
