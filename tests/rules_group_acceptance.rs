use parsing_rules::MemoryRulesApi;
use parsing_rules::acceptance::configs::{
    self, DATA_SOURCE_ADDRESS, RESOURCE_ADDRESS,
};
use parsing_rules::acceptance::{
    AcceptanceError, Check, ParsingRuleFixture, TestCase, TestStep, check_attr, check_attr_set,
    check_no_attr, random_parsing_rule,
};
use parsing_rules::terraform::{StateFile, parse_configuration};
use parsing_rules::workflow;

const RULE: &str = "rule_subgroups.0.rules.0";

fn common_checks(fixture: &ParsingRuleFixture, kind: &str) -> Vec<Check> {
    let rule = format!("{RULE}.{kind}.0");
    vec![
        check_attr_set(RESOURCE_ADDRESS, "id"),
        check_attr(RESOURCE_ADDRESS, "name", &fixture.name),
        check_attr(RESOURCE_ADDRESS, "description", &fixture.description),
        check_attr(RESOURCE_ADDRESS, "creator", &fixture.creator),
        check_attr(RESOURCE_ADDRESS, "active", "true"),
        check_attr(RESOURCE_ADDRESS, "rule_subgroups.#", "1"),
        check_attr(RESOURCE_ADDRESS, "rule_subgroups.0.rules.#", "1"),
        check_attr(RESOURCE_ADDRESS, &format!("{RULE}.{kind}.#"), "1"),
        check_attr_set(RESOURCE_ADDRESS, &format!("{rule}.id")),
        check_attr(RESOURCE_ADDRESS, &format!("{rule}.name"), &fixture.rule.name),
        check_attr(
            RESOURCE_ADDRESS,
            &format!("{rule}.description"),
            &fixture.rule.description,
        ),
        check_attr(RESOURCE_ADDRESS, &format!("{rule}.active"), "true"),
        check_attr(RESOURCE_ADDRESS, &format!("{rule}.order"), "1"),
    ]
}

fn rule_attr(kind: &str, key: &str, value: &str) -> Check {
    check_attr(RESOURCE_ADDRESS, &format!("{RULE}.{kind}.0.{key}"), value)
}

async fn run_single(kind: &str, config: String, fixture: &ParsingRuleFixture, extra: Vec<Check>) {
    let api = MemoryRulesApi::new();
    let case = TestCase::new(vec![
        TestStep::new(config)
            .checks(common_checks(fixture, kind))
            .checks(extra),
    ]);

    case.run(&api)
        .await
        .unwrap_or_else(|e| panic!("{kind}: {e}"));
    assert!(api.is_empty().await, "{kind}: groups left behind");
}

#[tokio::test]
async fn test_rules_group_block() {
    let fixture = random_parsing_rule();
    run_single(
        "block",
        configs::block_config(&fixture),
        &fixture,
        vec![
            rule_attr("block", "source_field", "text"),
            rule_attr("block", "regular_expression", r"sql_error_code\s*=\s*28000"),
            rule_attr("block", "keep_blocked_logs", "false"),
            rule_attr("block", "blocking_all_matching_blocks", "true"),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_allow() {
    let fixture = random_parsing_rule();
    run_single(
        "allow",
        configs::allow_config(&fixture),
        &fixture,
        vec![
            rule_attr("allow", "source_field", "text"),
            rule_attr("allow", "keep_blocked_logs", "true"),
            check_no_attr(RESOURCE_ADDRESS, &format!("{RULE}.allow.0.blocking_all_matching_blocks")),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_replace() {
    let fixture = random_parsing_rule();
    run_single(
        "replace",
        configs::replace_config(&fixture),
        &fixture,
        vec![
            rule_attr("replace", "source_field", "text"),
            rule_attr("replace", "destination_field", "text"),
            rule_attr("replace", "regular_expression", r".*\{"),
            rule_attr("replace", "replacement_string", "{"),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_extract() {
    let fixture = random_parsing_rule();
    run_single(
        "extract",
        configs::extract_config(&fixture),
        &fixture,
        vec![
            rule_attr("extract", "source_field", "text"),
            check_attr_set(RESOURCE_ADDRESS, &format!("{RULE}.extract.0.regular_expression")),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_parse() {
    let fixture = random_parsing_rule();
    run_single(
        "parse",
        configs::parse_config(&fixture),
        &fixture,
        vec![
            rule_attr("parse", "source_field", "text"),
            rule_attr("parse", "destination_field", "text"),
            check_attr_set(RESOURCE_ADDRESS, &format!("{RULE}.parse.0.regular_expression")),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_parse_json_field() {
    let fixture = random_parsing_rule();
    run_single(
        "parse_json_field",
        configs::parse_json_field_config(&fixture),
        &fixture,
        vec![
            rule_attr("parse_json_field", "source_field", "text"),
            rule_attr("parse_json_field", "destination_field", "text"),
            rule_attr("parse_json_field", "keep_source_field", "true"),
            rule_attr("parse_json_field", "keep_destination_field", "true"),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_json_extract() {
    let fixture = random_parsing_rule();
    run_single(
        "json_extract",
        configs::json_extract_config(&fixture),
        &fixture,
        vec![
            rule_attr("json_extract", "json_key", "worker"),
            rule_attr("json_extract", "destination_field", "Category"),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_json_stringify() {
    let fixture = random_parsing_rule();
    run_single(
        "json_stringify",
        configs::json_stringify_config(&fixture),
        &fixture,
        vec![
            rule_attr("json_stringify", "source_field", "text"),
            rule_attr("json_stringify", "destination_field", "text"),
            rule_attr("json_stringify", "keep_source_field", "false"),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_remove_fields() {
    let fixture = random_parsing_rule();
    run_single(
        "remove_fields",
        configs::remove_fields_config(&fixture),
        &fixture,
        vec![
            rule_attr("remove_fields", "excluded_fields.#", "2"),
            rule_attr(
                "remove_fields",
                "excluded_fields.0",
                "coralogix.metadata.applicationName",
            ),
            rule_attr(
                "remove_fields",
                "excluded_fields.1",
                "coralogix.metadata.className",
            ),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_extract_timestamp() {
    let fixture = random_parsing_rule();
    run_single(
        "extract_timestamp",
        configs::extract_timestamp_config(&fixture),
        &fixture,
        vec![
            rule_attr("extract_timestamp", "source_field", "text.time"),
            rule_attr("extract_timestamp", "field_format_standard", "Strftime"),
            rule_attr("extract_timestamp", "time_format", "%Y-%m-%dT%H:%M:%S%.f%:z"),
        ],
    )
    .await;
}

#[tokio::test]
async fn test_rules_group_combination() {
    let fixture = random_parsing_rule();
    let api = MemoryRulesApi::new();

    let case = TestCase::new(vec![
        TestStep::new(configs::combination_config(&fixture)).checks([
            check_attr(RESOURCE_ADDRESS, "applications.#", "2"),
            check_attr(RESOURCE_ADDRESS, "applications.0", "nginx"),
            check_attr(RESOURCE_ADDRESS, "subsystems.0", "ingress"),
            check_attr(RESOURCE_ADDRESS, "severities.#", "3"),
            check_attr(RESOURCE_ADDRESS, "severities.2", "Critical"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.#", "2"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.0.rules.#", "2"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.0.rules.1.json_extract.0.destination_field", "THREADID"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.1.active", "false"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.1.order", "2"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.1.rules.1.remove_fields.0.excluded_fields.0", "password"),
        ]),
    ]);

    case.run(&api).await.unwrap();
    assert!(api.is_empty().await);
}

#[tokio::test]
async fn test_rules_group_ordering() {
    let fixture = random_parsing_rule();
    let api = MemoryRulesApi::new();
    let first = format!("{}-1", fixture.rule.name);
    let second = format!("{}-2", fixture.rule.name);

    let case = TestCase::new(vec![
        TestStep::new(configs::ordering_config(&fixture)).checks([
            check_attr(RESOURCE_ADDRESS, "order", "2"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.0.order", "1"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.0.rules.0.block.0.regular_expression", "only"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.1.order", "2"),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.1.rules.0.block.0.name", &first),
            check_attr(RESOURCE_ADDRESS, "rule_subgroups.1.rules.1.block.0.name", &second),
        ]),
    ]);

    case.run(&api).await.unwrap();
}

#[tokio::test]
async fn test_rules_group_update_in_place() {
    let fixture = random_parsing_rule();
    let api = MemoryRulesApi::new();

    let case = TestCase::new(vec![
        TestStep::new(configs::block_config(&fixture))
            .check(rule_attr("block", "keep_blocked_logs", "false")),
        TestStep::new(configs::allow_config(&fixture))
            .check(rule_attr("allow", "keep_blocked_logs", "true"))
            .check(check_no_attr(RESOURCE_ADDRESS, &format!("{RULE}.block.#"))),
    ]);

    case.run(&api).await.unwrap();
    assert!(api.is_empty().await);
}

#[tokio::test]
async fn test_data_source_rules_group() {
    let fixture = random_parsing_rule();
    let api = MemoryRulesApi::new();

    let case = TestCase::new(vec![
        TestStep::new(configs::data_source_config(&fixture)).checks([
            check_attr(DATA_SOURCE_ADDRESS, "name", &fixture.name),
            check_attr(DATA_SOURCE_ADDRESS, "creator", &fixture.creator),
            check_attr_set(DATA_SOURCE_ADDRESS, "id"),
            check_attr(
                DATA_SOURCE_ADDRESS,
                &format!("{RULE}.block.0.name"),
                &fixture.rule.name,
            ),
        ]),
    ]);

    case.run(&api).await.unwrap();
    assert!(api.is_empty().await);
}

#[tokio::test]
async fn test_failing_check_names_step_and_check() {
    let fixture = random_parsing_rule();
    let api = MemoryRulesApi::new();

    let case = TestCase::new(vec![
        TestStep::new(configs::block_config(&fixture)),
        TestStep::new(configs::block_config(&fixture))
            .check(check_attr_set(RESOURCE_ADDRESS, "id"))
            .check(check_attr(RESOURCE_ADDRESS, "creator", "someone else")),
    ]);

    let err = case.run(&api).await.unwrap_err();
    match &err {
        AcceptanceError::Check { step, check, message } => {
            assert_eq!((*step, *check), (2, 2));
            assert!(message.contains("'creator'"));
        }
        other => panic!("expected check failure, got {other}"),
    }
    assert!(api.is_empty().await, "failed runs still destroy");
}

#[tokio::test]
async fn test_destroy_check_reads_each_group_once() {
    let api = MemoryRulesApi::new();
    let fixture = random_parsing_rule();

    let mut config = parse_configuration(&configs::block_config(&fixture)).unwrap();
    let mut second = config.resources[0].clone();
    second.name = "second".to_string();
    config.resources.push(second);

    let mut state = StateFile::default();
    workflow::apply(&api, &config, &mut state).await.unwrap();
    assert_eq!(api.len().await, 2);

    let ids = workflow::destroy(&api, state).await.unwrap();
    assert_eq!(ids.len(), 2);

    let before = api.get_calls();
    workflow::check_destroyed(&api, &ids).await.unwrap();
    assert_eq!(api.get_calls() - before, ids.len());
}
