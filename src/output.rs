use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::engine::Outcome;
use crate::rules_group::{Rule, RuleGroup};

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Order")]
    order: String,
    #[tabled(rename = "Active")]
    active: bool,
    #[tabled(rename = "Subgroups")]
    subgroups: usize,
    #[tabled(rename = "Rules")]
    rules: usize,
    #[tabled(rename = "Creator")]
    creator: String,
}

impl From<&RuleGroup> for GroupRow {
    fn from(group: &RuleGroup) -> Self {
        Self {
            id: group.id.clone().unwrap_or_default(),
            name: group.name.clone(),
            order: group.order.map(|o| o.to_string()).unwrap_or_default(),
            active: group.active,
            subgroups: group.rule_subgroups.len(),
            rules: group.rules().count(),
            creator: group.creator.clone(),
        }
    }
}

/// One row per group, in the order given.
pub fn groups_table(groups: &[RuleGroup]) -> String {
    let rows: Vec<GroupRow> = groups.iter().map(GroupRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

fn rule_label(rule: &Rule) -> String {
    let mut label = format!("{} [{}]", rule.name, rule.kind.block_name());
    if let Some(regex) = rule.kind.regular_expression() {
        label.push_str(&format!(" /{regex}/"));
    }
    if !rule.active {
        label.push_str(" (inactive)");
    }
    label
}

/// The group's subgroups and rules as a tree.
pub fn group_tree(group: &RuleGroup) -> Tree<String> {
    let mut root = Tree::new(match &group.id {
        Some(id) => format!("{} ({id})", group.name),
        None => group.name.clone(),
    });

    for (i, subgroup) in group.rule_subgroups.iter().enumerate() {
        let order = subgroup.order.unwrap_or(i as u32 + 1);
        let label = if subgroup.active {
            format!("subgroup {order}")
        } else {
            format!("subgroup {order} (inactive)")
        };
        let leaves = subgroup.rules.iter().map(|rule| Tree::new(rule_label(rule)));
        root.push(Tree::new(label).with_leaves(leaves));
    }

    root
}

/// A processed record as one output line.
pub fn outcome_line(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Passed(record) => record.text.to_string(),
        Outcome::Blocked { archived: true, .. } => "[blocked, archived]".to_string(),
        Outcome::Blocked { .. } => "[blocked]".to_string(),
    }
}
