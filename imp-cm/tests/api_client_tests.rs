//! HTTP client integration tests against a mock portal backend

use std::time::Duration;

use imp_cm::api::{ApiClient, ApiConfig, PromptStoreClient};
use imp_cm::filter::ContactFilter;
use imp_cm::sources::{
    CampaignContactsQuery, ContactSource, ContactsQuery, MatchSource, MembershipSource, Sources,
};
use imp_cm::{CampaignSession, SessionOptions};
use imp_common::contact::{
    CampaignSortField, ContactSortField, ContactType, SortDirection,
};
use imp_common::introductions::{
    BulkStageUpdate, BulkStageUpdateRequest, IntroductionStageUpdate,
};
use imp_common::prompts::{PromptDraft, PromptFilters};
use imp_common::{ApiStage, CampaignStatus, Error};
use serde_json::json;
use wiremock::matchers::{
    body_json, header, header_regex, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    let mut config = ApiConfig::new(server.uri());
    config.bearer_token = Some("secret".into());
    ApiClient::new(&config).unwrap()
}

fn contact_json(id: &str) -> serde_json::Value {
    json!({ "id": id, "full_name": format!("Contact {id}"), "contact_type": "investor" })
}

fn listing_query(start_after: Option<&str>) -> ContactsQuery {
    ContactsQuery {
        limit: 10,
        start_after: start_after.map(str::to_string),
        order_by: ContactSortField::UpdatedAt,
        direction: SortDirection::Desc,
    }
}

#[tokio::test]
async fn test_list_contacts_sends_cursor_and_sort() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .and(header("authorization", "Bearer secret"))
        .and(query_param("limit", "10"))
        .and(query_param("order_by", "updated_at"))
        .and(query_param("order_direction", "desc"))
        .and(query_param("startAfter", "c09"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [contact_json("c10"), contact_json("c11")],
            "pagination": { "limit": 10, "hasMore": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_contacts(&listing_query(Some("c09")))
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].id, "c10");
    assert!(!page.pagination.has_more);
}

#[tokio::test]
async fn test_first_page_has_no_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .and(query_param_is_missing("startAfter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server).list_contacts(&listing_query(None)).await.unwrap();
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_filter_contacts_posts_criteria() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contacts/filter"))
        .and(body_json(json!({
            "contact_type": "investor",
            "industries": ["fintech"],
            "match_mode": "all",
            "limit": 10,
            "startAfter": "c05",
            "order_by": "full_name",
            "order_direction": "asc"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [contact_json("c06")],
            "total": 7
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = ContactFilter {
        contact_type: Some(ContactType::Investor),
        industries: vec!["fintech".into()],
        match_mode: imp_cm::filter::MatchMode::All,
        campaign_status: Some(CampaignStatus::Met),
        ..Default::default()
    };
    let request = filter.to_request(
        10,
        Some("c05".into()),
        ContactSortField::FullName,
        SortDirection::Asc,
    );
    let page = client(&server).filter_contacts(&request).await.unwrap();
    assert_eq!(page.total, Some(7));
    assert_eq!(page.data[0].id, "c06");
}

#[tokio::test]
async fn test_campaign_contacts_use_camel_case_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/owners/owner%201/campaign-contacts"))
        .and(query_param("orderBy", "stage"))
        .and(query_param("orderDirection", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "contact": contact_json("a"), "stage": "to-meet" }],
            "pagination": { "hasMore": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = CampaignContactsQuery {
        limit: 5,
        start_after: None,
        order_by: CampaignSortField::Stage,
        direction: SortDirection::Asc,
    };
    let page = client(&server)
        .campaign_contacts("owner 1", &query)
        .await
        .unwrap();
    assert!(page.pagination.has_more);
    assert_eq!(page.data[0].stage, Some(ApiStage::ToMeet));
}

#[tokio::test]
async fn test_unauthorized_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = client(&server);
    let err = api.list_contacts(&listing_query(None)).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));

    let err = api.get_contact("missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(ref p) if p == "/contacts/missing"));
}

#[tokio::test]
async fn test_server_error_is_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts/c1"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(contact_json("c1")))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let contact = client(&server).get_contact("c1").await.unwrap();
    assert_eq!(contact.full_name, "Contact c1");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introductions/stages/bulk-update"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unknown stage"))
        .expect(1)
        .mount(&server)
        .await;

    let request = BulkStageUpdateRequest {
        owner_id: "o".into(),
        updates: Vec::new(),
    };
    let err = client(&server)
        .bulk_update_stages(&request)
        .await
        .unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "unknown stage");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(contact_json("slow"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let mut config = ApiConfig::new(server.uri());
    config.timeout = Duration::from_millis(50);
    config.retries = 0;
    let api = ApiClient::new(&config).unwrap();

    let err = api.get_contact("slow").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_bulk_update_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introductions/stages/bulk-update"))
        .and(body_json(json!({
            "ownerId": "owner-1",
            "updates": [
                { "targetId": "a", "stage": "to-meet" },
                { "targetId": "b", "stage": "to-meet" }
            ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let request = BulkStageUpdateRequest {
        owner_id: "owner-1".into(),
        updates: ["a", "b"]
            .into_iter()
            .map(|id| BulkStageUpdate {
                target_id: id.into(),
                stage: ApiStage::ToMeet,
            })
            .collect(),
    };
    let updated = client(&server).bulk_update_stages(&request).await.unwrap();
    assert_eq!(updated, 2);
}

#[tokio::test]
async fn test_single_stage_upsert_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introductions/stage"))
        .and(body_json(json!({
            "ownerId": "owner-1",
            "targetId": "a",
            "stage": "not-in-campaign"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "intro-a",
            "ownerId": "owner-1",
            "targetId": "a",
            "stage": "not-in-campaign"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = IntroductionStageUpdate {
        owner_id: "owner-1".into(),
        target_id: "a".into(),
        stage: ApiStage::NotInCampaign,
    };
    let record = client(&server).set_stage(&update).await.unwrap();
    assert_eq!(record.id, "intro-a");
    assert_eq!(record.stage, ApiStage::NotInCampaign);
}

#[tokio::test]
async fn test_stage_listing_and_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/introductions/stage"))
        .and(query_param("ownerId", "owner-1"))
        .and(query_param("stage", "met"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "i1", "ownerId": "owner-1", "targetId": "a", "stage": "met" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts/owner-1/matches"))
        .and(query_param("type", "founder"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "contact": contact_json("f1"), "score": 0.8 }],
            "totalMatches": 1
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let records = api.list_stages("owner-1", Some(ApiStage::Met)).await.unwrap();
    assert_eq!(records[0].target_id, "a");

    let matches = api
        .matches("owner-1", ContactType::Founder, 25)
        .await
        .unwrap();
    assert_eq!(matches.candidates[0].contact.id, "f1");
    assert!(matches.candidates[0].overlaps.is_empty());
}

#[tokio::test]
async fn test_session_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/introductions/stage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "ownerId": "owner-1", "targetId": "c2", "stage": "interested" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [contact_json("c1"), contact_json("c2")],
            "pagination": { "hasMore": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = std::sync::Arc::new(client(&server));
    let options = SessionOptions {
        page_size: 2,
        ..Default::default()
    };
    let mut session = CampaignSession::new(
        "owner-1",
        ContactType::Investor,
        Sources::from_client(api),
        options,
    );

    let snapshot = session.load().await.unwrap();
    assert_eq!(snapshot.rows.len(), 2);
    assert_eq!(snapshot.rows[1].status, CampaignStatus::Interested);
    assert!(snapshot.has_more);
    assert!(session.next_page());
}

#[tokio::test]
async fn test_unauthorized_session_banner() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/introductions/stage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let api = std::sync::Arc::new(client(&server));
    let mut session = CampaignSession::new(
        "owner-1",
        ContactType::Investor,
        Sources::from_client(api),
        SessionOptions::default(),
    );

    assert!(session.load().await.is_err());
    assert_eq!(
        session.error(),
        Some("Not authorized to access the contacts API")
    );
}

// =============================================================================
// Prompt store
// =============================================================================

#[tokio::test]
async fn test_prompt_list_filters_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/agent_prompts"))
        .and(header("apikey", "service"))
        .and(header("authorization", "Bearer service"))
        .and(query_param("select", "*"))
        .and(query_param("order", "updated_at.desc"))
        .and(query_param("agent_name", "eq.matcher"))
        .and(query_param_is_missing("language"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "p1",
            "agent_name": "matcher",
            "prompt_type": "system",
            "language": "multi",
            "content": "Be brief.",
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let store =
        PromptStoreClient::new(&server.uri(), "service", Duration::from_secs(5), 0).unwrap();
    let prompts = store
        .list(&PromptFilters {
            agent_name: Some("matcher".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].updated_by, None);
}

#[tokio::test]
async fn test_prompt_save_upserts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/agent_prompts"))
        .and(query_param("on_conflict", "agent_name,prompt_type,language"))
        .and(header_regex("prefer", "resolution=merge-duplicates"))
        .and(body_json(json!({
            "agent_name": "matcher",
            "prompt_type": "system",
            "language": "multi",
            "content": "Be brief.",
            "updated_by": null
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "p1",
            "agent_name": "matcher",
            "prompt_type": "system",
            "language": "multi",
            "content": "Be brief.",
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let store =
        PromptStoreClient::new(&server.uri(), "service", Duration::from_secs(5), 0).unwrap();
    let saved = store
        .save(PromptDraft {
            agent_name: "matcher".into(),
            prompt_type: "system".into(),
            language: None,
            content: "Be brief.".into(),
            updated_by: None,
        })
        .await
        .unwrap();
    assert_eq!(saved.id, "p1");
    assert_eq!(saved.language, "multi");
}

#[tokio::test]
async fn test_prompt_save_without_rows_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/agent_prompts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store =
        PromptStoreClient::new(&server.uri(), "service", Duration::from_secs(5), 0).unwrap();
    let err = store
        .save(PromptDraft {
            agent_name: "matcher".into(),
            prompt_type: "system".into(),
            language: Some("en".into()),
            content: String::new(),
            updated_by: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}
