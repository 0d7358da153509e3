//! Terraform-style state: flatmap attributes per managed resource.
//!
//! Keys follow the SDK flatmap layout, e.g.
//! `rule_subgroups.0.rules.1.block.0.regular_expression`, with `.#` holding
//! the length of every list and nested block list. Subgroups and rules are
//! indexed in application order.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::{self, AttrValue};
use crate::rules_group::RuleGroup;

pub const STATE_VERSION: u32 = 1;

pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// `<type>.<name>` for resources, `data.<type>.<name>` for data sources.
    pub address: String,
    pub id: String,
    pub attributes: Attributes,
}

impl ResourceState {
    pub fn from_group(address: impl Into<String>, group: &RuleGroup) -> Self {
        let attributes = flatten_rule_group(group);
        Self {
            address: address.into(),
            id: group.id.clone().unwrap_or_default(),
            attributes,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub resources: Vec<ResourceState>,
    #[serde(default)]
    pub data_sources: Vec<ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: Vec::new(),
            data_sources: Vec::new(),
        }
    }
}

impl StateFile {
    pub fn resource(&self, address: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.address == address)
    }

    /// Looks up a resource or data source by its address.
    pub fn get(&self, address: &str) -> Option<&ResourceState> {
        self.resources
            .iter()
            .chain(self.data_sources.iter())
            .find(|r| r.address == address)
    }

    pub fn upsert(&mut self, state: ResourceState) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.address == state.address)
        {
            Some(existing) => *existing = state,
            None => self.resources.push(state),
        }
    }

    pub fn remove(&mut self, address: &str) -> Option<ResourceState> {
        let index = self.resources.iter().position(|r| r.address == address)?;
        Some(self.resources.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.data_sources.is_empty()
    }
}

fn insert_attrs(out: &mut Attributes, prefix: &str, attrs: Vec<(&'static str, AttrValue)>) {
    for (key, value) in attrs {
        match value {
            AttrValue::List(items) => {
                out.insert(format!("{prefix}{key}.#"), items.len().to_string());
                for (i, item) in items.into_iter().enumerate() {
                    out.insert(format!("{prefix}{key}.{i}"), item);
                }
            }
            scalar => {
                if let Some(v) = scalar.to_state_string() {
                    out.insert(format!("{prefix}{key}"), v);
                }
            }
        }
    }
}

pub fn flatten_rule_group(group: &RuleGroup) -> Attributes {
    let mut out = Attributes::new();
    insert_attrs(&mut out, "", schema::group_attributes(group));

    out.insert(
        "rule_subgroups.#".to_string(),
        group.rule_subgroups.len().to_string(),
    );
    for (i, subgroup) in group.ordered_subgroups().into_iter().enumerate() {
        let prefix = format!("rule_subgroups.{i}.");
        insert_attrs(&mut out, &prefix, schema::subgroup_attributes(subgroup));

        out.insert(format!("{prefix}rules.#"), subgroup.rules.len().to_string());
        for (j, rule) in subgroup.ordered_rules().into_iter().enumerate() {
            let kind = rule.kind.block_name();
            out.insert(format!("{prefix}rules.{j}.{kind}.#"), "1".to_string());
            let rule_prefix = format!("{prefix}rules.{j}.{kind}.0.");
            insert_attrs(&mut out, &rule_prefix, schema::rule_attributes(rule));
        }
    }

    out
}

/// Attributes the platform fills in when the configuration leaves them out.
pub fn is_computed_key(key: &str) -> bool {
    let last = key.rsplit('.').next().unwrap_or(key);
    last == "id" || last == "order"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules_group::{
        BlockRule, RemoveFieldsRule, Rule, RuleSubgroup, Severity,
    };
    use pretty_assertions::assert_eq;

    fn sample_group() -> RuleGroup {
        let mut group = RuleGroup::new("nginx");
        group.id = Some("group-1".into());
        group.order = Some(4);
        group.description = "drop health checks".into();
        group.creator = "terraform".into();
        group.applications = vec!["web".into()];
        group.severities = vec![Severity::Info, Severity::Error];

        let mut block = Rule::new(
            "health",
            BlockRule {
                source_field: "text".into(),
                regular_expression: "GET /health".into(),
                keep_blocked_logs: true,
                blocking_all_matching_blocks: true,
            },
        );
        block.order = Some(1);
        let remove = Rule::new(
            "secrets",
            RemoveFieldsRule {
                excluded_fields: vec!["text.password".into(), "text.token".into()],
            },
        );
        group.with_subgroup(RuleSubgroup::new(vec![block, remove]))
    }

    #[test]
    fn test_flatten_group_scalars_and_lists() {
        let attrs = flatten_rule_group(&sample_group());
        assert_eq!(attrs.get("id").map(String::as_str), Some("group-1"));
        assert_eq!(attrs.get("order").map(String::as_str), Some("4"));
        assert_eq!(attrs.get("active").map(String::as_str), Some("true"));
        assert_eq!(attrs.get("hidden").map(String::as_str), Some("false"));
        assert_eq!(attrs.get("applications.#").map(String::as_str), Some("1"));
        assert_eq!(attrs.get("applications.0").map(String::as_str), Some("web"));
        assert_eq!(attrs.get("subsystems.#").map(String::as_str), Some("0"));
        assert_eq!(attrs.get("severities.1").map(String::as_str), Some("Error"));
    }

    #[test]
    fn test_flatten_nested_rule_blocks() {
        let attrs = flatten_rule_group(&sample_group());
        let expected = [
            ("rule_subgroups.#", "1"),
            ("rule_subgroups.0.active", "true"),
            ("rule_subgroups.0.rules.#", "2"),
            ("rule_subgroups.0.rules.0.block.#", "1"),
            ("rule_subgroups.0.rules.0.block.0.name", "health"),
            ("rule_subgroups.0.rules.0.block.0.order", "1"),
            ("rule_subgroups.0.rules.0.block.0.keep_blocked_logs", "true"),
            (
                "rule_subgroups.0.rules.0.block.0.regular_expression",
                "GET /health",
            ),
            ("rule_subgroups.0.rules.1.remove_fields.#", "1"),
            (
                "rule_subgroups.0.rules.1.remove_fields.0.excluded_fields.#",
                "2",
            ),
            (
                "rule_subgroups.0.rules.1.remove_fields.0.excluded_fields.1",
                "text.token",
            ),
        ];
        for (key, value) in expected {
            assert_eq!(attrs.get(key).map(String::as_str), Some(value), "{}", key);
        }
        assert!(!attrs.contains_key("rule_subgroups.0.id"));
        assert!(!attrs.contains_key("rule_subgroups.0.rules.1.remove_fields.0.order"));
    }

    #[test]
    fn test_flatten_indexes_by_explicit_order() {
        let mut group = sample_group();
        group.rule_subgroups[0].rules[0].order = Some(3);
        let attrs = flatten_rule_group(&group);
        assert_eq!(
            attrs.get("rule_subgroups.0.rules.0.remove_fields.#").map(String::as_str),
            Some("1")
        );
        assert_eq!(
            attrs.get("rule_subgroups.0.rules.1.block.0.order").map(String::as_str),
            Some("3")
        );
    }

    #[test]
    fn test_resource_state_from_group() {
        let state = ResourceState::from_group("coralogix_rules_group.test", &sample_group());
        assert_eq!(state.id, "group-1");
        assert_eq!(state.attr("name"), Some("nginx"));
        assert_eq!(state.attr("missing"), None);
    }

    #[test]
    fn test_state_file_upsert_and_remove() {
        let mut file = StateFile::default();
        let mut state = ResourceState::from_group("coralogix_rules_group.a", &sample_group());
        file.upsert(state.clone());
        state.id = "group-2".into();
        file.upsert(state);

        assert_eq!(file.resources.len(), 1);
        assert_eq!(file.resource("coralogix_rules_group.a").unwrap().id, "group-2");
        assert!(file.remove("coralogix_rules_group.a").is_some());
        assert!(file.remove("coralogix_rules_group.a").is_none());
        assert!(file.is_empty());
    }

    #[test]
    fn test_computed_keys() {
        assert!(is_computed_key("id"));
        assert!(is_computed_key("rule_subgroups.0.rules.1.parse.0.order"));
        assert!(!is_computed_key("rule_subgroups.0.rules.1.json_extract.0.json_key"));
        assert!(!is_computed_key("name"));
    }
}
