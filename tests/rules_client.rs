use std::time::Duration;

use parsing_rules::rules_group::{BlockRule, Rule, RuleGroup, RuleKind, RuleSubgroup, Severity};
use parsing_rules::{ApiError, RetryConfig, RulesClient, RulesGroupsApi};
use serde_json::json;
use wiremock::matchers::{
    body_partial_json, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RULE_SET: &str = "/api/v1/external/rule/rule-set";

fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        max_attempts: 3,
    }
}

fn client(server: &MockServer) -> RulesClient {
    RulesClient::with_base_url("test_key".to_string(), server.uri())
        .unwrap()
        .with_retry(fast_retry())
}

fn group_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "description": "drops health checks",
        "creator": "terraform",
        "enabled": true,
        "hidden": false,
        "order": 3,
        "ruleMatchers": [
            { "field": "applicationName", "constraint": "web" },
            { "field": "severity", "constraint": "error" }
        ],
        "rulesGroups": [
            {
                "id": "sub-1",
                "enabled": true,
                "order": 1,
                "rules": [
                    {
                        "id": "rule-1",
                        "name": "health",
                        "description": "",
                        "enabled": true,
                        "order": 1,
                        "type": "block",
                        "sourceField": "text",
                        "rule": "GET /health",
                        "keepBlockedLogs": true,
                        "blockMatching": true
                    }
                ]
            }
        ]
    })
}

fn desired_group() -> RuleGroup {
    let mut group = RuleGroup::new("nginx").with_subgroup(RuleSubgroup::new(vec![Rule::new(
        "health",
        BlockRule {
            source_field: "text".into(),
            regular_expression: "GET /health".into(),
            keep_blocked_logs: true,
            blocking_all_matching_blocks: true,
        },
    )]));
    group.description = "drops health checks".into();
    group.creator = "terraform".into();
    group.applications = vec!["web".into()];
    group.severities = vec![Severity::Error];
    group
}

#[tokio::test]
async fn test_create_sends_payload_and_reads_group() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RULE_SET))
        .and(header("authorization", "Bearer test_key"))
        .and(body_partial_json(json!({
            "name": "nginx",
            "enabled": true,
            "ruleMatchers": [
                { "field": "applicationName", "constraint": "web" },
                { "field": "severity", "constraint": "error" }
            ],
            "rulesGroups": [
                { "rules": [ { "type": "block", "sourceField": "text", "rule": "GET /health" } ] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_json("g-1", "nginx")))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server).create(&desired_group()).await.unwrap();

    assert_eq!(created.id.as_deref(), Some("g-1"));
    assert_eq!(created.order, Some(3));
    assert_eq!(created.applications, vec!["web"]);
    assert_eq!(created.severities, vec![Severity::Error]);
    let rule = &created.rule_subgroups[0].rules[0];
    assert_eq!(rule.id.as_deref(), Some("rule-1"));
    match &rule.kind {
        RuleKind::Block(block) => {
            assert_eq!(block.regular_expression, "GET /health");
            assert!(block.keep_blocked_logs);
        }
        other => panic!("expected block rule, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RULE_SET}/g-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_json("g-1", "nginx")))
        .expect(1)
        .mount(&server)
        .await;

    let group = client(&server).get("g-1").await.unwrap();
    assert_eq!(group.name, "nginx");
    assert_eq!(group.rule_subgroups.len(), 1);
}

#[tokio::test]
async fn test_get_missing_group_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RULE_SET}/gone")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "rule group not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).get("gone").await;
    match result {
        Err(ApiError::NotFound { id }) => assert_eq!(id, "gone"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_puts_with_id() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("{RULE_SET}/g-1")))
        .and(body_partial_json(json!({ "id": "g-1", "name": "renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_json("g-1", "renamed")))
        .expect(1)
        .mount(&server)
        .await;

    let mut group = desired_group();
    group.name = "renamed".into();
    let updated = client(&server).update("g-1", &group).await.unwrap();
    assert_eq!(updated.name, "renamed");
}

#[tokio::test]
async fn test_delete() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{RULE_SET}/g-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).delete("g-1").await.unwrap();
}

#[tokio::test]
async fn test_list_follows_page_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RULE_SET))
        .and(query_param("pageSize", "100"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ruleGroups": [group_json("g-1", "first")],
            "nextPageToken": "page 2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(RULE_SET))
        .and(query_param("pageToken", "page 2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ruleGroups": [group_json("g-2", "second")],
            "nextPageToken": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let groups = client(&server).list().await.unwrap();
    let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RULE_SET))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{ "message": "invalid api key" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).list().await;
    match result {
        Err(ApiError::Auth { message }) => {
            assert_eq!(message, "invalid api key");
            assert!(!message.contains("test_key"));
        }
        other => panic!("expected Auth, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RULE_SET}/g-1")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{RULE_SET}/g-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_json("g-1", "nginx")))
        .expect(1)
        .mount(&server)
        .await;

    let group = client(&server).get("g-1").await.unwrap();
    assert_eq!(group.id.as_deref(), Some("g-1"));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RULE_SET}/g-1")))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let result = client(&server).get("g-1").await;
    match result {
        Err(ApiError::Api { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RULE_SET))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "invalid regular expression"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).create(&desired_group()).await;
    match result {
        Err(ApiError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid regular expression");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_enum_is_invalid_response() {
    let server = MockServer::start().await;

    let mut body = group_json("g-1", "nginx");
    body["ruleMatchers"] = json!([{ "field": "severity", "constraint": "fatal" }]);

    Mock::given(method("GET"))
        .and(path(format!("{RULE_SET}/g-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let result = client(&server).get("g-1").await;
    assert!(matches!(result, Err(ApiError::InvalidResponse { .. })));
}
