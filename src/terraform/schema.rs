//! Attribute tables shared by rendering, parsing and flattening.
//!
//! Each table lists the attributes a block carries, in schema order. Optional
//! computed attributes (`id`, `order`) are only listed when they are known.

use crate::rules_group::{Rule, RuleGroup, RuleKind, RuleSubgroup};

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    String(String),
    Bool(bool),
    Number(u32),
    List(Vec<String>),
}

impl AttrValue {
    /// Flatmap rendering of a scalar value.
    pub fn to_state_string(&self) -> Option<String> {
        match self {
            AttrValue::String(s) => Some(s.clone()),
            AttrValue::Bool(b) => Some(b.to_string()),
            AttrValue::Number(n) => Some(n.to_string()),
            AttrValue::List(_) => None,
        }
    }
}

type Attrs = Vec<(&'static str, AttrValue)>;

fn push_computed(attrs: &mut Attrs, id: &Option<String>, order: Option<u32>) {
    if let Some(id) = id {
        attrs.push(("id", AttrValue::String(id.clone())));
    }
    if let Some(order) = order {
        attrs.push(("order", AttrValue::Number(order)));
    }
}

pub fn group_attributes(group: &RuleGroup) -> Attrs {
    let mut attrs = Vec::new();
    push_computed(&mut attrs, &group.id, group.order);
    attrs.extend([
        ("name", AttrValue::String(group.name.clone())),
        ("description", AttrValue::String(group.description.clone())),
        ("creator", AttrValue::String(group.creator.clone())),
        ("active", AttrValue::Bool(group.active)),
        ("hidden", AttrValue::Bool(group.hidden)),
        ("applications", AttrValue::List(group.applications.clone())),
        ("subsystems", AttrValue::List(group.subsystems.clone())),
        (
            "severities",
            AttrValue::List(
                group
                    .severities
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            ),
        ),
    ]);
    attrs
}

pub fn subgroup_attributes(subgroup: &RuleSubgroup) -> Attrs {
    let mut attrs = Vec::new();
    push_computed(&mut attrs, &subgroup.id, subgroup.order);
    attrs.push(("active", AttrValue::Bool(subgroup.active)));
    attrs
}

/// Attributes of a rule-kind block: the common rule attributes followed by
/// the kind-specific ones.
pub fn rule_attributes(rule: &Rule) -> Attrs {
    let mut attrs = Vec::new();
    push_computed(&mut attrs, &rule.id, rule.order);
    attrs.extend([
        ("name", AttrValue::String(rule.name.clone())),
        ("description", AttrValue::String(rule.description.clone())),
        ("active", AttrValue::Bool(rule.active)),
    ]);
    attrs.extend(kind_attributes(&rule.kind));
    attrs
}

fn s(value: &str) -> AttrValue {
    AttrValue::String(value.to_string())
}

pub fn kind_attributes(kind: &RuleKind) -> Attrs {
    match kind {
        RuleKind::Block(r) => vec![
            ("source_field", s(&r.source_field)),
            ("regular_expression", s(&r.regular_expression)),
            ("keep_blocked_logs", AttrValue::Bool(r.keep_blocked_logs)),
            (
                "blocking_all_matching_blocks",
                AttrValue::Bool(r.blocking_all_matching_blocks),
            ),
        ],
        RuleKind::Allow(r) => vec![
            ("source_field", s(&r.source_field)),
            ("regular_expression", s(&r.regular_expression)),
            ("keep_blocked_logs", AttrValue::Bool(r.keep_blocked_logs)),
        ],
        RuleKind::Replace(r) => vec![
            ("source_field", s(&r.source_field)),
            ("destination_field", s(&r.destination_field)),
            ("regular_expression", s(&r.regular_expression)),
            ("replacement_string", s(&r.replacement_string)),
        ],
        RuleKind::Extract(r) => vec![
            ("source_field", s(&r.source_field)),
            ("regular_expression", s(&r.regular_expression)),
        ],
        RuleKind::Parse(r) => vec![
            ("source_field", s(&r.source_field)),
            ("destination_field", s(&r.destination_field)),
            ("regular_expression", s(&r.regular_expression)),
        ],
        RuleKind::ParseJsonField(r) => vec![
            ("source_field", s(&r.source_field)),
            ("destination_field", s(&r.destination_field)),
            ("keep_source_field", AttrValue::Bool(r.keep_source_field)),
            (
                "keep_destination_field",
                AttrValue::Bool(r.keep_destination_field),
            ),
        ],
        RuleKind::JsonExtract(r) => vec![
            ("json_key", s(&r.json_key)),
            ("destination_field", s(r.destination_field.as_str())),
        ],
        RuleKind::JsonStringify(r) => vec![
            ("source_field", s(&r.source_field)),
            ("destination_field", s(&r.destination_field)),
            ("keep_source_field", AttrValue::Bool(r.keep_source_field)),
        ],
        RuleKind::RemoveFields(r) => vec![(
            "excluded_fields",
            AttrValue::List(r.excluded_fields.clone()),
        )],
        RuleKind::ExtractTimestamp(r) => vec![
            ("source_field", s(&r.source_field)),
            (
                "field_format_standard",
                s(r.field_format_standard.as_str()),
            ),
            ("time_format", s(&r.time_format)),
        ],
    }
}
