//! Agent prompt store client
//!
//! Talks to the PostgREST interface of the hosted database:
//! `{db_url}/rest/v1/agent_prompts`, authenticated with the service key.

use std::time::Duration;

use imp_common::config::{ApiSection, DatabaseSection};
use imp_common::prompts::{AgentPrompt, PromptDraft, PromptFilters, PromptUpsert};
use imp_common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tracing::info;

use super::RestClient;

const TABLE: &str = "agent_prompts";
const CONFLICT_COLUMNS: &str = "agent_name,prompt_type,language";

#[derive(Debug, Clone)]
pub struct PromptStoreClient {
    rest: RestClient,
}

impl PromptStoreClient {
    pub fn new(db_url: &str, service_key: &str, timeout: Duration, retries: u32) -> Result<Self> {
        if service_key.trim().is_empty() {
            return Err(Error::Config("database service key is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_key)
            .map_err(|e| Error::Config(format!("invalid service key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
            .map_err(|e| Error::Config(format!("invalid service key: {e}")))?;
        headers.insert(HeaderName::from_static("apikey"), key);
        headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            rest: RestClient::new(db_url, timeout, retries, headers)?,
        })
    }

    /// Build from the `[database]` section; both url and key are required
    pub fn from_config(database: &DatabaseSection, api: &ApiSection) -> Result<Self> {
        let url = database
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("database.url is not set".to_string()))?;
        let key = database
            .service_key
            .as_deref()
            .ok_or_else(|| Error::Config("database.service_key is not set".to_string()))?;
        Self::new(url, key, Duration::from_secs(api.timeout_secs), api.retries)
    }

    /// Prompts matching `filters`, most recently updated first
    pub async fn list(&self, filters: &PromptFilters) -> Result<Vec<AgentPrompt>> {
        let url = self.rest.url(&["rest", "v1", TABLE])?;
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "updated_at.desc".to_string()),
        ];
        let equals = [
            ("agent_name", &filters.agent_name),
            ("prompt_type", &filters.prompt_type),
            ("language", &filters.language),
        ];
        for (column, value) in equals {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((column, format!("eq.{value}")));
            }
        }

        self.rest
            .send_json(|http| http.get(url.clone()).query(&params))
            .await
    }

    /// Upsert on (agent_name, prompt_type, language) and return the stored row
    pub async fn save(&self, draft: PromptDraft) -> Result<AgentPrompt> {
        let url = self.rest.url(&["rest", "v1", TABLE])?;
        let row = PromptUpsert::from(draft);
        let params = [("on_conflict", CONFLICT_COLUMNS)];

        let mut rows: Vec<AgentPrompt> = self
            .rest
            .send_json(|http| {
                http.post(url.clone())
                    .query(&params)
                    .header("Prefer", "resolution=merge-duplicates,return=representation")
                    .json(&row)
            })
            .await?;

        if rows.is_empty() {
            return Err(Error::Decode("upsert returned no rows".to_string()));
        }
        let saved = rows.swap_remove(0);
        info!(
            agent_name = %saved.agent_name,
            prompt_type = %saved.prompt_type,
            language = %saved.language,
            "Prompt saved"
        );
        Ok(saved)
    }
}
