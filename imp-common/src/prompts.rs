//! Agent prompt rows stored in the hosted database

use serde::{Deserialize, Serialize};

/// Language recorded when a save request leaves it unset
pub const DEFAULT_PROMPT_LANGUAGE: &str = "multi";

/// Row of the `agent_prompts` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPrompt {
    pub id: String,
    pub agent_name: String,
    pub prompt_type: String,
    pub language: String,
    pub content: String,
    pub updated_at: String,
    #[serde(default)]
    pub updated_by: Option<String>,
}

/// Optional equality filters for listing prompts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFilters {
    pub agent_name: Option<String>,
    pub prompt_type: Option<String>,
    pub language: Option<String>,
}

/// Save request; upserted on (agent_name, prompt_type, language)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDraft {
    pub agent_name: String,
    pub prompt_type: String,
    pub language: Option<String>,
    pub content: String,
    pub updated_by: Option<String>,
}

/// Row body actually written by an upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptUpsert {
    pub agent_name: String,
    pub prompt_type: String,
    pub language: String,
    pub content: String,
    pub updated_by: Option<String>,
}

impl From<PromptDraft> for PromptUpsert {
    fn from(draft: PromptDraft) -> Self {
        let language = draft
            .language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROMPT_LANGUAGE.to_string());
        Self {
            agent_name: draft.agent_name,
            prompt_type: draft.prompt_type,
            language,
            content: draft.content,
            updated_by: draft.updated_by,
        }
    }
}
