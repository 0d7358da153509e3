use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::rules_group::{
    AllowRule, BlockRule, ExtractRule, ExtractTimestampRule, JsonExtractRule, JsonExtractTarget,
    JsonStringifyRule, ParseJsonFieldRule, ParseRule, RemoveFieldsRule, ReplaceRule, Rule,
    RuleGroup, RuleKind, RuleSubgroup, Severity, TimestampFormat,
};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

fn default_true() -> bool {
    true
}

/// A rules group as the REST API sends and receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroupPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub rule_matchers: Vec<RuleMatcher>,
    /// The API calls subgroups "rules groups".
    #[serde(default)]
    pub rules_groups: Vec<SubgroupPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMatcher {
    pub field: MatcherField,
    pub constraint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatcherField {
    ApplicationName,
    SubsystemName,
    Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgroupPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub rules: Vec<RulePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(flatten)]
    pub params: RuleParams,
}

/// Type-specific rule parameters, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RuleParams {
    #[serde(rename = "block")]
    Block {
        source_field: String,
        rule: String,
        #[serde(default)]
        keep_blocked_logs: bool,
        #[serde(default = "default_true")]
        block_matching: bool,
    },
    #[serde(rename = "allow")]
    Allow {
        source_field: String,
        rule: String,
        #[serde(default)]
        keep_blocked_logs: bool,
    },
    #[serde(rename = "replace")]
    Replace {
        source_field: String,
        destination_field: String,
        rule: String,
        #[serde(default)]
        replace_new_val: String,
    },
    #[serde(rename = "extract")]
    Extract { source_field: String, rule: String },
    #[serde(rename = "parse")]
    Parse {
        source_field: String,
        destination_field: String,
        rule: String,
    },
    #[serde(rename = "jsonparse")]
    JsonParse {
        source_field: String,
        destination_field: String,
        #[serde(default)]
        delete_source: bool,
        #[serde(default)]
        override_dest: bool,
    },
    #[serde(rename = "jsonextract")]
    JsonExtract {
        rule: String,
        destination_field: String,
    },
    #[serde(rename = "stringify")]
    Stringify {
        source_field: String,
        destination_field: String,
        #[serde(default)]
        delete_source: bool,
    },
    #[serde(rename = "removefields")]
    RemoveFields { fields: Vec<String> },
    #[serde(rename = "timestampextract")]
    TimestampExtract {
        source_field: String,
        format_standard: String,
        #[serde(default)]
        time_format: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroupList {
    #[serde(default)]
    pub rule_groups: Vec<RuleGroupPayload>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl From<&RuleGroup> for RuleGroupPayload {
    fn from(group: &RuleGroup) -> Self {
        let matchers = group
            .applications
            .iter()
            .map(|app| RuleMatcher {
                field: MatcherField::ApplicationName,
                constraint: app.clone(),
            })
            .chain(group.subsystems.iter().map(|sub| RuleMatcher {
                field: MatcherField::SubsystemName,
                constraint: sub.clone(),
            }))
            .chain(group.severities.iter().map(|sev| RuleMatcher {
                field: MatcherField::Severity,
                constraint: sev.api_name().to_string(),
            }))
            .collect();

        Self {
            id: group.id.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
            creator: group.creator.clone(),
            enabled: group.active,
            hidden: group.hidden,
            order: group.order,
            rule_matchers: matchers,
            rules_groups: group.rule_subgroups.iter().map(SubgroupPayload::from).collect(),
        }
    }
}

impl From<&RuleSubgroup> for SubgroupPayload {
    fn from(subgroup: &RuleSubgroup) -> Self {
        Self {
            id: subgroup.id.clone(),
            enabled: subgroup.active,
            order: subgroup.order,
            rules: subgroup.rules.iter().map(RulePayload::from).collect(),
        }
    }
}

impl From<&Rule> for RulePayload {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            description: rule.description.clone(),
            enabled: rule.active,
            order: rule.order,
            params: RuleParams::from(&rule.kind),
        }
    }
}

impl From<&RuleKind> for RuleParams {
    fn from(kind: &RuleKind) -> Self {
        match kind.clone() {
            RuleKind::Block(r) => RuleParams::Block {
                source_field: r.source_field,
                rule: r.regular_expression,
                keep_blocked_logs: r.keep_blocked_logs,
                block_matching: r.blocking_all_matching_blocks,
            },
            RuleKind::Allow(r) => RuleParams::Allow {
                source_field: r.source_field,
                rule: r.regular_expression,
                keep_blocked_logs: r.keep_blocked_logs,
            },
            RuleKind::Replace(r) => RuleParams::Replace {
                source_field: r.source_field,
                destination_field: r.destination_field,
                rule: r.regular_expression,
                replace_new_val: r.replacement_string,
            },
            RuleKind::Extract(r) => RuleParams::Extract {
                source_field: r.source_field,
                rule: r.regular_expression,
            },
            RuleKind::Parse(r) => RuleParams::Parse {
                source_field: r.source_field,
                destination_field: r.destination_field,
                rule: r.regular_expression,
            },
            RuleKind::ParseJsonField(r) => RuleParams::JsonParse {
                source_field: r.source_field,
                destination_field: r.destination_field,
                delete_source: !r.keep_source_field,
                override_dest: !r.keep_destination_field,
            },
            RuleKind::JsonExtract(r) => RuleParams::JsonExtract {
                rule: r.json_key,
                destination_field: r.destination_field.api_name().to_string(),
            },
            RuleKind::JsonStringify(r) => RuleParams::Stringify {
                source_field: r.source_field,
                destination_field: r.destination_field,
                delete_source: !r.keep_source_field,
            },
            RuleKind::RemoveFields(r) => RuleParams::RemoveFields {
                fields: r.excluded_fields,
            },
            RuleKind::ExtractTimestamp(r) => RuleParams::TimestampExtract {
                source_field: r.source_field,
                format_standard: r.field_format_standard.api_name().to_string(),
                time_format: r.time_format,
            },
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> ApiError {
    ApiError::InvalidResponse {
        message: message.to_string(),
    }
}

impl TryFrom<RuleGroupPayload> for RuleGroup {
    type Error = ApiError;

    fn try_from(payload: RuleGroupPayload) -> Result<Self, Self::Error> {
        let mut applications = Vec::new();
        let mut subsystems = Vec::new();
        let mut severities = Vec::new();

        for matcher in payload.rule_matchers {
            match matcher.field {
                MatcherField::ApplicationName => applications.push(matcher.constraint),
                MatcherField::SubsystemName => subsystems.push(matcher.constraint),
                MatcherField::Severity => {
                    severities.push(Severity::from_api_name(&matcher.constraint).map_err(invalid)?)
                }
            }
        }

        let rule_subgroups = payload
            .rules_groups
            .into_iter()
            .map(RuleSubgroup::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleGroup {
            id: payload.id,
            name: payload.name,
            description: payload.description,
            creator: payload.creator,
            active: payload.enabled,
            hidden: payload.hidden,
            order: payload.order,
            applications,
            subsystems,
            severities,
            rule_subgroups,
        })
    }
}

impl TryFrom<SubgroupPayload> for RuleSubgroup {
    type Error = ApiError;

    fn try_from(payload: SubgroupPayload) -> Result<Self, Self::Error> {
        Ok(RuleSubgroup {
            id: payload.id,
            active: payload.enabled,
            order: payload.order,
            rules: payload
                .rules
                .into_iter()
                .map(Rule::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

impl TryFrom<RulePayload> for Rule {
    type Error = ApiError;

    fn try_from(payload: RulePayload) -> Result<Self, Self::Error> {
        Ok(Rule {
            id: payload.id,
            name: payload.name,
            description: payload.description,
            active: payload.enabled,
            order: payload.order,
            kind: RuleKind::try_from(payload.params)?,
        })
    }
}

impl TryFrom<RuleParams> for RuleKind {
    type Error = ApiError;

    fn try_from(params: RuleParams) -> Result<Self, Self::Error> {
        let kind = match params {
            RuleParams::Block {
                source_field,
                rule,
                keep_blocked_logs,
                block_matching,
            } => BlockRule {
                source_field,
                regular_expression: rule,
                keep_blocked_logs,
                blocking_all_matching_blocks: block_matching,
            }
            .into(),
            RuleParams::Allow {
                source_field,
                rule,
                keep_blocked_logs,
            } => AllowRule {
                source_field,
                regular_expression: rule,
                keep_blocked_logs,
            }
            .into(),
            RuleParams::Replace {
                source_field,
                destination_field,
                rule,
                replace_new_val,
            } => ReplaceRule {
                source_field,
                destination_field,
                regular_expression: rule,
                replacement_string: replace_new_val,
            }
            .into(),
            RuleParams::Extract { source_field, rule } => ExtractRule {
                source_field,
                regular_expression: rule,
            }
            .into(),
            RuleParams::Parse {
                source_field,
                destination_field,
                rule,
            } => ParseRule {
                source_field,
                destination_field,
                regular_expression: rule,
            }
            .into(),
            RuleParams::JsonParse {
                source_field,
                destination_field,
                delete_source,
                override_dest,
            } => ParseJsonFieldRule {
                source_field,
                destination_field,
                keep_source_field: !delete_source,
                keep_destination_field: !override_dest,
            }
            .into(),
            RuleParams::JsonExtract {
                rule,
                destination_field,
            } => JsonExtractRule {
                json_key: rule,
                destination_field: JsonExtractTarget::from_api_name(&destination_field)
                    .map_err(invalid)?,
            }
            .into(),
            RuleParams::Stringify {
                source_field,
                destination_field,
                delete_source,
            } => JsonStringifyRule {
                source_field,
                destination_field,
                keep_source_field: !delete_source,
            }
            .into(),
            RuleParams::RemoveFields { fields } => RemoveFieldsRule {
                excluded_fields: fields,
            }
            .into(),
            RuleParams::TimestampExtract {
                source_field,
                format_standard,
                time_format,
            } => ExtractTimestampRule {
                source_field,
                field_format_standard: TimestampFormat::from_api_name(&format_standard)
                    .map_err(invalid)?,
                time_format,
            }
            .into(),
        };
        Ok(kind)
    }
}
