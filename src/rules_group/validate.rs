use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use super::{Rule, RuleGroup, RuleKind};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{path}: must not be empty")]
    Empty { path: String },

    #[error("{path}: invalid regular expression: {message}")]
    InvalidRegex { path: String, message: String },

    #[error("{path}: regular expression needs at least one named group")]
    MissingNamedGroup { path: String },

    #[error("{path}: order {order} is used more than once")]
    DuplicateOrder { path: String, order: u32 },

    #[error("{path}: order must be 1 or greater")]
    ZeroOrder { path: String },

    #[error("{path}: set order on every entry or on none of them")]
    MixedOrder { path: String },
}

pub(super) fn validate_group(group: &RuleGroup) -> Result<(), ValidationError> {
    if group.name.trim().is_empty() {
        return Err(ValidationError::Empty {
            path: "name".to_string(),
        });
    }
    if group.rule_subgroups.is_empty() {
        return Err(ValidationError::Empty {
            path: "rule_subgroups".to_string(),
        });
    }
    if group.order == Some(0) {
        return Err(ValidationError::ZeroOrder {
            path: "order".to_string(),
        });
    }

    check_orders(
        "rule_subgroups",
        group.rule_subgroups.iter().map(|s| s.order),
    )?;

    for (i, subgroup) in group.rule_subgroups.iter().enumerate() {
        let path = format!("rule_subgroups.{i}.rules");
        if subgroup.rules.is_empty() {
            return Err(ValidationError::Empty { path });
        }
        check_orders(&path, subgroup.rules.iter().map(|r| r.order))?;
        for (j, rule) in subgroup.rules.iter().enumerate() {
            validate_rule(&format!("{path}.{j}"), rule)?;
        }
    }

    Ok(())
}

/// Explicit orders must be unique and either cover the whole list or be
/// absent, since omitted orders are filled with 1-based positions.
fn check_orders(
    path: &str,
    orders: impl Iterator<Item = Option<u32>>,
) -> Result<(), ValidationError> {
    let orders: Vec<Option<u32>> = orders.collect();
    let explicit = orders.iter().flatten().count();
    if explicit != 0 && explicit != orders.len() {
        return Err(ValidationError::MixedOrder {
            path: path.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for order in orders.into_iter().flatten() {
        if order == 0 {
            return Err(ValidationError::ZeroOrder {
                path: path.to_string(),
            });
        }
        if !seen.insert(order) {
            return Err(ValidationError::DuplicateOrder {
                path: path.to_string(),
                order,
            });
        }
    }
    Ok(())
}

fn validate_rule(path: &str, rule: &Rule) -> Result<(), ValidationError> {
    if rule.name.trim().is_empty() {
        return Err(ValidationError::Empty {
            path: format!("{path}.name"),
        });
    }

    let kind_path = format!("{path}.{}", rule.kind.block_name());

    if let Some(pattern) = rule.kind.regular_expression() {
        let regex = Regex::new(pattern).map_err(|e| ValidationError::InvalidRegex {
            path: format!("{kind_path}.regular_expression"),
            message: e.to_string(),
        })?;

        let needs_named_group = matches!(rule.kind, RuleKind::Extract(_) | RuleKind::Parse(_));
        if needs_named_group && regex.capture_names().flatten().next().is_none() {
            return Err(ValidationError::MissingNamedGroup {
                path: format!("{kind_path}.regular_expression"),
            });
        }
    }

    match &rule.kind {
        RuleKind::RemoveFields(r) => {
            if r.excluded_fields.iter().all(|f| f.trim().is_empty()) {
                return Err(ValidationError::Empty {
                    path: format!("{kind_path}.excluded_fields"),
                });
            }
        }
        RuleKind::ExtractTimestamp(r) => {
            if !r.field_format_standard.is_epoch() && r.time_format.trim().is_empty() {
                return Err(ValidationError::Empty {
                    path: format!("{kind_path}.time_format"),
                });
            }
        }
        RuleKind::JsonExtract(r) => {
            if r.json_key.trim().is_empty() {
                return Err(ValidationError::Empty {
                    path: format!("{kind_path}.json_key"),
                });
            }
        }
        _ => {}
    }

    Ok(())
}
