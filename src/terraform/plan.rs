use std::collections::BTreeSet;
use std::fmt;

use super::state::{Attributes, ResourceState, flatten_rule_group, is_computed_key};
use crate::rules_group::RuleGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
    NoOp,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Action::Create => "+ create",
            Action::Update => "~ update",
            Action::Delete => "- destroy",
            Action::NoOp => "  no-op",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub key: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePlan {
    pub address: String,
    pub action: Action,
    pub changes: Vec<AttributeChange>,
}

/// Diffs the desired configuration of one resource against its prior state.
///
/// Computed attributes the configuration leaves unset keep their prior
/// values and never count as changes.
pub fn plan_resource(
    address: &str,
    prior: Option<&ResourceState>,
    desired: Option<&RuleGroup>,
) -> ResourcePlan {
    let desired_attrs = desired.map(flatten_rule_group);

    let (action, changes) = match (prior, desired_attrs) {
        (None, None) => (Action::NoOp, Vec::new()),
        (None, Some(new)) => (
            Action::Create,
            new.into_iter()
                .map(|(key, value)| AttributeChange {
                    key,
                    old: None,
                    new: Some(value),
                })
                .collect(),
        ),
        (Some(old), None) => (
            Action::Delete,
            old.attributes
                .iter()
                .map(|(key, value)| AttributeChange {
                    key: key.clone(),
                    old: Some(value.clone()),
                    new: None,
                })
                .collect(),
        ),
        (Some(old), Some(new)) => {
            let changes = diff_attributes(&old.attributes, &new);
            let action = if changes.is_empty() {
                Action::NoOp
            } else {
                Action::Update
            };
            (action, changes)
        }
    };

    ResourcePlan {
        address: address.to_string(),
        action,
        changes,
    }
}

fn diff_attributes(old: &Attributes, new: &Attributes) -> Vec<AttributeChange> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let before = old.get(key);
            let after = new.get(key);
            match (before, after) {
                (Some(_), None) if is_computed_key(key) => None,
                (Some(a), Some(b)) if a == b => None,
                (None, None) => None,
                _ => Some(AttributeChange {
                    key: key.clone(),
                    old: before.cloned(),
                    new: after.cloned(),
                }),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub resources: Vec<ResourcePlan>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.resources.iter().any(|r| r.action != Action::NoOp)
    }

    pub fn count(&self, action: Action) -> usize {
        self.resources.iter().filter(|r| r.action == action).count()
    }

    pub fn get(&self, address: &str) -> Option<&ResourcePlan> {
        self.resources.iter().find(|r| r.address == address)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for resource in self.resources.iter().filter(|r| r.action != Action::NoOp) {
            writeln!(f, "{} {}", resource.action, resource.address)?;
            for change in &resource.changes {
                let old = change.old.as_deref().unwrap_or("(none)");
                let new = change.new.as_deref().unwrap_or("(none)");
                writeln!(f, "    {}: {:?} => {:?}", change.key, old, new)?;
            }
        }
        write!(
            f,
            "Plan: {} to add, {} to change, {} to destroy.",
            self.count(Action::Create),
            self.count(Action::Update),
            self.count(Action::Delete)
        )
    }
}
