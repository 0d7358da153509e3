mod validate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use validate::ValidationError;

/// Terraform type name of the rules-group resource and data source.
pub const RESOURCE_TYPE: &str = "coralogix_rules_group";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub creator: String,
    pub active: bool,
    pub hidden: bool,
    pub order: Option<u32>,
    pub applications: Vec<String>,
    pub subsystems: Vec<String>,
    pub severities: Vec<Severity>,
    pub rule_subgroups: Vec<RuleSubgroup>,
}

impl RuleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            creator: String::new(),
            active: true,
            hidden: false,
            order: None,
            applications: Vec::new(),
            subsystems: Vec::new(),
            severities: Vec::new(),
            rule_subgroups: Vec::new(),
        }
    }

    pub fn with_subgroup(mut self, subgroup: RuleSubgroup) -> Self {
        self.rule_subgroups.push(subgroup);
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rule_subgroups.iter().flat_map(|s| s.rules.iter())
    }

    /// Subgroups in the order the platform applies them.
    pub fn ordered_subgroups(&self) -> Vec<&RuleSubgroup> {
        by_position(&self.rule_subgroups, |s| s.order)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_group(self)
    }

    /// Drops every server-assigned id so the group can be sent as a fresh definition.
    pub fn without_ids(&self) -> Self {
        let mut group = self.clone();
        group.id = None;
        for subgroup in &mut group.rule_subgroups {
            subgroup.id = None;
            for rule in &mut subgroup.rules {
                rule.id = None;
            }
        }
        group
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSubgroup {
    pub id: Option<String>,
    pub active: bool,
    pub order: Option<u32>,
    pub rules: Vec<Rule>,
}

impl RuleSubgroup {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            id: None,
            active: true,
            order: None,
            rules,
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn ordered_rules(&self) -> Vec<&Rule> {
        by_position(&self.rules, |r| r.order)
    }
}

/// Sorts by explicit order, with unordered items standing at their 1-based
/// position. The sort is stable.
fn by_position<T>(items: &[T], order: impl Fn(&T) -> Option<u32>) -> Vec<&T> {
    let mut indexed: Vec<(u32, &T)> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (order(item).unwrap_or(i as u32 + 1), item))
        .collect();
    indexed.sort_by_key(|(position, _)| *position);
    indexed.into_iter().map(|(_, item)| item).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub order: Option<u32>,
    pub kind: RuleKind,
}

impl Rule {
    pub fn new(name: impl Into<String>, kind: impl Into<RuleKind>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            active: true,
            order: None,
            kind: kind.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Block(BlockRule),
    Allow(AllowRule),
    Replace(ReplaceRule),
    Extract(ExtractRule),
    Parse(ParseRule),
    ParseJsonField(ParseJsonFieldRule),
    JsonExtract(JsonExtractRule),
    JsonStringify(JsonStringifyRule),
    RemoveFields(RemoveFieldsRule),
    ExtractTimestamp(ExtractTimestampRule),
}

impl RuleKind {
    /// Every nested block name a `rules` block may hold, in schema order.
    pub const BLOCK_NAMES: [&'static str; 10] = [
        "block",
        "allow",
        "replace",
        "extract",
        "parse",
        "parse_json_field",
        "json_extract",
        "json_stringify",
        "remove_fields",
        "extract_timestamp",
    ];

    pub fn block_name(&self) -> &'static str {
        match self {
            RuleKind::Block(_) => "block",
            RuleKind::Allow(_) => "allow",
            RuleKind::Replace(_) => "replace",
            RuleKind::Extract(_) => "extract",
            RuleKind::Parse(_) => "parse",
            RuleKind::ParseJsonField(_) => "parse_json_field",
            RuleKind::JsonExtract(_) => "json_extract",
            RuleKind::JsonStringify(_) => "json_stringify",
            RuleKind::RemoveFields(_) => "remove_fields",
            RuleKind::ExtractTimestamp(_) => "extract_timestamp",
        }
    }

    /// The regular expression the rule matches with, for the regex-driven kinds.
    pub fn regular_expression(&self) -> Option<&str> {
        match self {
            RuleKind::Block(r) => Some(&r.regular_expression),
            RuleKind::Allow(r) => Some(&r.regular_expression),
            RuleKind::Replace(r) => Some(&r.regular_expression),
            RuleKind::Extract(r) => Some(&r.regular_expression),
            RuleKind::Parse(r) => Some(&r.regular_expression),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRule {
    pub source_field: String,
    pub regular_expression: String,
    pub keep_blocked_logs: bool,
    pub blocking_all_matching_blocks: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowRule {
    pub source_field: String,
    pub regular_expression: String,
    pub keep_blocked_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceRule {
    pub source_field: String,
    pub destination_field: String,
    pub regular_expression: String,
    pub replacement_string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRule {
    pub source_field: String,
    pub regular_expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseRule {
    pub source_field: String,
    pub destination_field: String,
    pub regular_expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseJsonFieldRule {
    pub source_field: String,
    pub destination_field: String,
    pub keep_source_field: bool,
    pub keep_destination_field: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonExtractRule {
    pub json_key: String,
    pub destination_field: JsonExtractTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonStringifyRule {
    pub source_field: String,
    pub destination_field: String,
    pub keep_source_field: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveFieldsRule {
    pub excluded_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractTimestampRule {
    pub source_field: String,
    pub field_format_standard: TimestampFormat,
    pub time_format: String,
}

macro_rules! impl_into_kind {
    ($($rule:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$rule> for RuleKind {
                fn from(rule: $rule) -> Self {
                    RuleKind::$variant(rule)
                }
            }
        )*
    };
}

impl_into_kind! {
    BlockRule => Block,
    AllowRule => Allow,
    ReplaceRule => Replace,
    ExtractRule => Extract,
    ParseRule => Parse,
    ParseJsonFieldRule => ParseJsonField,
    JsonExtractRule => JsonExtract,
    JsonStringifyRule => JsonStringify,
    RemoveFieldsRule => RemoveFields,
    ExtractTimestampRule => ExtractTimestamp,
}

/// Error for a string that names no variant of one of the schema enums.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {kind} '{value}', expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

/// Declares a schema enum with its Terraform spelling and its API spelling.
macro_rules! schema_enum {
    ($name:ident, $kind:literal, { $($variant:ident => ($tf:literal, $api:literal)),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Spelling used in Terraform configuration and state.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $tf),*
                }
            }

            /// Spelling used by the REST API.
            pub fn api_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $api),*
                }
            }

            pub fn from_api_name(value: &str) -> Result<Self, UnknownVariant> {
                match value {
                    $($api => Ok($name::$variant),)*
                    other => Err(Self::unknown(other)),
                }
            }

            fn unknown(value: &str) -> UnknownVariant {
                UnknownVariant {
                    kind: $kind,
                    value: value.to_string(),
                    expected: Self::ALL
                        .iter()
                        .map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tf => Ok($name::$variant),)*
                    other => Err(Self::unknown(other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

schema_enum!(Severity, "severity", {
    Debug => ("Debug", "debug"),
    Verbose => ("Verbose", "verbose"),
    Info => ("Info", "info"),
    Warning => ("Warning", "warning"),
    Error => ("Error", "error"),
    Critical => ("Critical", "critical"),
});

schema_enum!(JsonExtractTarget, "json_extract destination_field", {
    Category => ("Category", "category"),
    ClassName => ("CLASSNAME", "className"),
    MethodName => ("METHODNAME", "methodName"),
    ThreadId => ("THREADID", "threadId"),
    Severity => ("SEVERITY", "severity"),
});

schema_enum!(TimestampFormat, "field_format_standard", {
    Strftime => ("Strftime", "strftime"),
    JavaSdf => ("JavaSDF", "javasdf"),
    Golang => ("Golang", "golang"),
    SecondTs => ("SecondTS", "secondts"),
    MilliTs => ("MilliTS", "millits"),
    MicroTs => ("MicroTS", "microts"),
    NanoTs => ("NanoTS", "nanots"),
});

impl TimestampFormat {
    /// Epoch formats carry no layout, so `time_format` is ignored for them.
    pub fn is_epoch(&self) -> bool {
        matches!(
            self,
            TimestampFormat::SecondTs
                | TimestampFormat::MilliTs
                | TimestampFormat::MicroTs
                | TimestampFormat::NanoTs
        )
    }
}
