//! HCL configurations for each rules-group variant the acceptance tests apply.
//!
//! Every function renders one `coralogix_rules_group` resource named
//! [`RESOURCE_NAME`] from a fixture. Regular expressions are written with HCL
//! escaping (`\\` for a backslash).

use super::fixtures::ParsingRuleFixture;

pub const RESOURCE_NAME: &str = "test";

/// Address of the resource every config declares.
pub const RESOURCE_ADDRESS: &str = "coralogix_rules_group.test";

/// Address of the data source [`data_source_config`] declares.
pub const DATA_SOURCE_ADDRESS: &str = "data.coralogix_rules_group.test";

pub const BLOCK_REGEX: &str = r"sql_error_code\\s*=\\s*28000";

pub const EXTRACT_REGEX: &str = r#"(?:^|[\\s\"'.:\\-\\[\\]])(?P<severity>DEBUG|TRACE|INFO|WARN|WARNING|ERROR|FATAL|EXCEPTION)(?:$|[\\s\"'.:\\-\\[\\]])"#;

pub const PARSE_REGEX: &str = r"(?P<remote_addr>\\d{1,3}\\.\\d{1,3}\\.\\d{1,3}\\.\\d{1,3})\\s*-\\s*(?P<user>[^ ]+)\\s*\\[(?P<timestamp>[^\\]]+)\\]\\s*(?P<request>.*)";

fn resource(fixture: &ParsingRuleFixture, extra: &str, subgroups: &str) -> String {
    format!(
        r#"resource "coralogix_rules_group" "{RESOURCE_NAME}" {{
  name        = "{name}"
  description = "{description}"
  creator     = "{creator}"
{extra}
{subgroups}
}}
"#,
        name = fixture.name,
        description = fixture.description,
        creator = fixture.creator,
    )
}

fn rule(fixture: &ParsingRuleFixture, kind: &str, attributes: &str) -> String {
    format!(
        r#"    rules {{
      {kind} {{
        name        = "{name}"
        description = "{description}"
{attributes}
      }}
    }}"#,
        name = fixture.rule.name,
        description = fixture.rule.description,
    )
}

fn single_rule(fixture: &ParsingRuleFixture, kind: &str, attributes: &str) -> String {
    let subgroup = format!("  rule_subgroups {{\n{}\n  }}", rule(fixture, kind, attributes));
    resource(fixture, "", &subgroup)
}

pub fn block_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "block",
        &format!(
            r#"        source_field                 = "text"
        regular_expression           = "{BLOCK_REGEX}"
        keep_blocked_logs            = false
        blocking_all_matching_blocks = true"#
        ),
    )
}

pub fn allow_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "allow",
        &format!(
            r#"        source_field       = "text"
        regular_expression = "{BLOCK_REGEX}"
        keep_blocked_logs  = true"#
        ),
    )
}

pub fn replace_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "replace",
        r#"        source_field       = "text"
        destination_field  = "text"
        regular_expression = ".*\\{"
        replacement_string = "{""#,
    )
}

pub fn extract_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "extract",
        &format!(
            r#"        source_field       = "text"
        regular_expression = "{EXTRACT_REGEX}""#
        ),
    )
}

pub fn parse_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "parse",
        &format!(
            r#"        source_field       = "text"
        destination_field  = "text"
        regular_expression = "{PARSE_REGEX}""#
        ),
    )
}

pub fn parse_json_field_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "parse_json_field",
        r#"        source_field           = "text"
        destination_field      = "text"
        keep_source_field      = true
        keep_destination_field = true"#,
    )
}

pub fn json_extract_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "json_extract",
        r#"        json_key          = "worker"
        destination_field = "Category""#,
    )
}

pub fn json_stringify_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "json_stringify",
        r#"        source_field      = "text"
        destination_field = "text"
        keep_source_field = false"#,
    )
}

pub fn remove_fields_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "remove_fields",
        r#"        excluded_fields = ["coralogix.metadata.applicationName", "coralogix.metadata.className"]"#,
    )
}

pub fn extract_timestamp_config(fixture: &ParsingRuleFixture) -> String {
    single_rule(
        fixture,
        "extract_timestamp",
        r#"        source_field          = "text.time"
        field_format_standard = "Strftime"
        time_format           = "%Y-%m-%dT%H:%M:%S%.f%:z""#,
    )
}

/// Two subgroups with several rule kinds, plus group-level filters.
pub fn combination_config(fixture: &ParsingRuleFixture) -> String {
    let first = [
        rule(
            fixture,
            "extract",
            &format!(
                r#"        source_field       = "text"
        regular_expression = "{EXTRACT_REGEX}""#
            ),
        ),
        rule(
            fixture,
            "json_extract",
            r#"        json_key          = "worker"
        destination_field = "THREADID""#,
        ),
    ]
    .join("\n");
    let second = [
        rule(
            fixture,
            "block",
            &format!(
                r#"        source_field       = "text"
        regular_expression = "{BLOCK_REGEX}""#
            ),
        ),
        rule(
            fixture,
            "remove_fields",
            r#"        excluded_fields = ["password"]"#,
        ),
    ]
    .join("\n");

    resource(
        fixture,
        r#"  applications = ["nginx", "api"]
  subsystems   = ["ingress"]
  severities   = ["Warning", "Error", "Critical"]
  hidden       = false"#,
        &format!("  rule_subgroups {{\n{first}\n  }}\n  rule_subgroups {{\n    active = false\n{second}\n  }}"),
    )
}

/// Explicit group, subgroup and rule orders, declared out of order.
pub fn ordering_config(fixture: &ParsingRuleFixture) -> String {
    let ordered = |order: u32, regex: &str| {
        format!(
            r#"    rules {{
      block {{
        name               = "{name}-{order}"
        order              = {order}
        source_field       = "text"
        regular_expression = "{regex}"
      }}
    }}"#,
            name = fixture.rule.name,
        )
    };

    resource(
        fixture,
        "  order = 2",
        &format!(
            "  rule_subgroups {{\n    order = 2\n{}\n{}\n  }}\n  rule_subgroups {{\n    order = 1\n{}\n  }}",
            ordered(2, "second"),
            ordered(1, "first"),
            ordered(1, "only"),
        ),
    )
}

/// [`block_config`] plus a data source reading the group back by reference.
pub fn data_source_config(fixture: &ParsingRuleFixture) -> String {
    format!(
        r#"{}
data "coralogix_rules_group" "{RESOURCE_NAME}" {{
  id = coralogix_rules_group.{RESOURCE_NAME}.id
}}
"#,
        block_config(fixture)
    )
}
