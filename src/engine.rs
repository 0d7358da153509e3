//! Local evaluation of rules groups against log records.
//!
//! Groups run in their `order`. Inside a group, subgroups run in order and
//! each subgroup applies at most one rule: the first active rule that matches.
//! A block (or allow) decision ends processing of the record.

mod record;
mod timestamp;

pub use record::{FieldPath, LogMetadata, LogRecord, value_as_text};
pub use timestamp::{go_to_strftime, java_to_strftime, parse_timestamp};

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::rules_group::{JsonExtractTarget, Rule, RuleGroup, RuleKind, Severity};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule '{rule}': invalid regular expression: {source}")]
    InvalidRegex {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed(LogRecord),
    /// Blocked records stop processing; archived ones are kept out of the index only.
    Blocked { record: LogRecord, archived: bool },
}

impl Outcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Outcome::Blocked { .. })
    }

    pub fn record(&self) -> &LogRecord {
        match self {
            Outcome::Passed(record) => record,
            Outcome::Blocked { record, .. } => record,
        }
    }
}

enum Step {
    /// The rule did not match; continue with the next rule of the subgroup.
    Skip,
    /// The rule did not match and blocks the record unless a later rule matches.
    Pending { archived: bool },
    Applied,
    Block { archived: bool },
}

#[derive(Debug)]
struct CompiledRule {
    rule: Rule,
    regex: Option<Regex>,
}

impl CompiledRule {
    fn compile(rule: &Rule) -> Result<Self, EngineError> {
        let regex = rule
            .kind
            .regular_expression()
            .map(Regex::new)
            .transpose()
            .map_err(|source| EngineError::InvalidRegex {
                rule: rule.name.clone(),
                source,
            })?;
        Ok(Self {
            rule: rule.clone(),
            regex,
        })
    }

    fn is_match(&self, record: &LogRecord, source_field: &str) -> bool {
        let Some(regex) = &self.regex else {
            return false;
        };
        record
            .get_str(&FieldPath::parse(source_field))
            .is_some_and(|text| regex.is_match(&text))
    }

    fn apply(&self, record: &mut LogRecord) -> Step {
        match &self.rule.kind {
            RuleKind::Block(r) => {
                let matched = self.is_match(record, &r.source_field);
                match (r.blocking_all_matching_blocks, matched) {
                    (true, true) => Step::Block {
                        archived: r.keep_blocked_logs,
                    },
                    (true, false) => Step::Skip,
                    (false, true) => Step::Applied,
                    (false, false) => Step::Pending {
                        archived: r.keep_blocked_logs,
                    },
                }
            }
            RuleKind::Allow(r) => {
                if self.is_match(record, &r.source_field) {
                    Step::Applied
                } else {
                    Step::Pending {
                        archived: r.keep_blocked_logs,
                    }
                }
            }
            RuleKind::Replace(r) => {
                let Some((regex, text)) = self.matched_text(record, &r.source_field) else {
                    return Step::Skip;
                };
                let replaced = regex.replace_all(&text, r.replacement_string.as_str());
                record.set(
                    &FieldPath::parse(&r.destination_field),
                    Value::String(replaced.into_owned()),
                );
                Step::Applied
            }
            RuleKind::Extract(r) => {
                let Some(fields) = self.named_captures(record, &r.source_field) else {
                    return Step::Skip;
                };
                for (key, value) in fields {
                    record.set(&FieldPath::Key(vec![key]), value);
                }
                Step::Applied
            }
            RuleKind::Parse(r) => {
                let Some(fields) = self.named_captures(record, &r.source_field) else {
                    return Step::Skip;
                };
                record.set(&FieldPath::parse(&r.destination_field), Value::Object(fields));
                Step::Applied
            }
            RuleKind::ParseJsonField(r) => {
                let source = FieldPath::parse(&r.source_field);
                let destination = FieldPath::parse(&r.destination_field);
                let Some(Value::String(raw)) = record.get(&source) else {
                    return Step::Skip;
                };
                let Ok(parsed) = serde_json::from_str::<Value>(raw) else {
                    return Step::Skip;
                };

                if !r.keep_source_field && source != destination {
                    record.remove(&source);
                }
                let merged = match (r.keep_destination_field, record.get(&destination), parsed) {
                    (true, Some(Value::Object(existing)), Value::Object(new)) => {
                        let mut existing = existing.clone();
                        existing.extend(new);
                        Value::Object(existing)
                    }
                    (_, _, parsed) => parsed,
                };
                record.set(&destination, merged);
                Step::Applied
            }
            RuleKind::JsonExtract(r) => {
                let Some(value) = record.get_str(&FieldPath::parse(&r.json_key)) else {
                    return Step::Skip;
                };
                let metadata = &mut record.metadata;
                match r.destination_field {
                    JsonExtractTarget::Category => metadata.category = Some(value),
                    JsonExtractTarget::ClassName => metadata.class_name = Some(value),
                    JsonExtractTarget::MethodName => metadata.method_name = Some(value),
                    JsonExtractTarget::ThreadId => metadata.thread_id = Some(value),
                    JsonExtractTarget::Severity => {
                        match Severity::from_api_name(&value.to_ascii_lowercase()) {
                            Ok(severity) => metadata.severity = Some(severity),
                            Err(_) => return Step::Skip,
                        }
                    }
                }
                Step::Applied
            }
            RuleKind::JsonStringify(r) => {
                let source = FieldPath::parse(&r.source_field);
                let Some(value) = record.get(&source) else {
                    return Step::Skip;
                };
                let serialized = value.to_string();
                if !r.keep_source_field {
                    record.remove(&source);
                }
                record.set(&FieldPath::parse(&r.destination_field), Value::String(serialized));
                Step::Applied
            }
            RuleKind::RemoveFields(r) => {
                let removed = r
                    .excluded_fields
                    .iter()
                    .filter(|field| record.remove(&FieldPath::parse(field)).is_some())
                    .count();
                if removed > 0 { Step::Applied } else { Step::Skip }
            }
            RuleKind::ExtractTimestamp(r) => {
                let parsed = record
                    .get_str(&FieldPath::parse(&r.source_field))
                    .and_then(|raw| parse_timestamp(&raw, r.field_format_standard, &r.time_format));
                match parsed {
                    Some(ts) => {
                        record.metadata.timestamp = Some(ts);
                        Step::Applied
                    }
                    None => Step::Skip,
                }
            }
        }
    }

    fn matched_text(&self, record: &LogRecord, source_field: &str) -> Option<(&Regex, String)> {
        let regex = self.regex.as_ref()?;
        let text = record.get_str(&FieldPath::parse(source_field))?;
        regex.is_match(&text).then_some((regex, text))
    }

    fn named_captures(&self, record: &LogRecord, source_field: &str) -> Option<Map<String, Value>> {
        let (regex, text) = self.matched_text(record, source_field)?;
        let captures = regex.captures(&text)?;
        let fields: Map<String, Value> = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), Value::String(m.as_str().to_string())))
            })
            .collect();
        Some(fields)
    }
}

#[derive(Debug)]
struct CompiledSubgroup {
    active: bool,
    rules: Vec<CompiledRule>,
}

/// A rules group with its regular expressions compiled, ready to apply.
#[derive(Debug)]
pub struct CompiledGroup {
    name: String,
    order: Option<u32>,
    active: bool,
    applications: Vec<String>,
    subsystems: Vec<String>,
    severities: Vec<Severity>,
    subgroups: Vec<CompiledSubgroup>,
}

impl CompiledGroup {
    pub fn compile(group: &RuleGroup) -> Result<Self, EngineError> {
        let subgroups = group
            .ordered_subgroups()
            .into_iter()
            .map(|subgroup| {
                Ok(CompiledSubgroup {
                    active: subgroup.active,
                    rules: subgroup
                        .ordered_rules()
                        .into_iter()
                        .map(CompiledRule::compile)
                        .collect::<Result<Vec<_>, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(Self {
            name: group.name.clone(),
            order: group.order,
            active: group.active,
            applications: group.applications.clone(),
            subsystems: group.subsystems.clone(),
            severities: group.severities.clone(),
            subgroups,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the group's application, subsystem and severity filters admit the record.
    pub fn matches(&self, record: &LogRecord) -> bool {
        let meta = &record.metadata;
        self.active
            && (self.applications.is_empty() || self.applications.contains(&meta.application))
            && (self.subsystems.is_empty() || self.subsystems.contains(&meta.subsystem))
            && (self.severities.is_empty()
                || meta.severity.is_some_and(|s| self.severities.contains(&s)))
    }

    pub fn apply(&self, mut record: LogRecord) -> Outcome {
        if !self.matches(&record) {
            return Outcome::Passed(record);
        }

        for (index, subgroup) in self.subgroups.iter().enumerate() {
            if !subgroup.active {
                continue;
            }

            let mut pending: Option<bool> = None;
            let mut applied = false;
            for compiled in subgroup.rules.iter().filter(|c| c.rule.active) {
                match compiled.apply(&mut record) {
                    Step::Skip => {}
                    Step::Pending { archived } => {
                        pending.get_or_insert(archived);
                    }
                    Step::Applied => {
                        tracing::trace!(group = %self.name, subgroup = index, rule = %compiled.rule.name, "rule applied");
                        applied = true;
                        break;
                    }
                    Step::Block { archived } => {
                        tracing::debug!(group = %self.name, rule = %compiled.rule.name, archived, "record blocked");
                        return Outcome::Blocked { record, archived };
                    }
                }
            }

            if let (false, Some(archived)) = (applied, pending) {
                tracing::debug!(group = %self.name, subgroup = index, archived, "record not allowed");
                return Outcome::Blocked { record, archived };
            }
        }

        Outcome::Passed(record)
    }
}

/// Several compiled groups applied in group order.
#[derive(Debug, Default)]
pub struct RuleEngine {
    groups: Vec<CompiledGroup>,
}

impl RuleEngine {
    pub fn new(groups: &[RuleGroup]) -> Result<Self, EngineError> {
        let mut compiled = groups
            .iter()
            .map(CompiledGroup::compile)
            .collect::<Result<Vec<_>, _>>()?;
        compiled.sort_by_key(|g| g.order.unwrap_or(u32::MAX));
        Ok(Self { groups: compiled })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn process(&self, record: LogRecord) -> Outcome {
        let mut record = record;
        for group in &self.groups {
            match group.apply(record) {
                Outcome::Passed(next) => record = next,
                blocked => return blocked,
            }
        }
        Outcome::Passed(record)
    }
}
