use std::collections::HashSet;

use hcl::expr::{Expression, TraversalOperator};
use hcl::{Block, Body};

use super::{ConfigError, IdSource};
use crate::rules_group::{
    AllowRule, BlockRule, ExtractRule, ExtractTimestampRule, JsonExtractRule, JsonStringifyRule,
    ParseJsonFieldRule, ParseRule, RESOURCE_TYPE, RemoveFieldsRule, ReplaceRule, Rule, RuleGroup,
    RuleKind, RuleSubgroup,
};

/// Block types Terraform accepts at the top level that carry nothing for this provider.
const IGNORED_TOP_LEVEL: [&str; 5] = ["terraform", "provider", "variable", "locals", "output"];

const GROUP_ATTRIBUTES: [&str; 9] = [
    "name",
    "description",
    "creator",
    "active",
    "hidden",
    "order",
    "applications",
    "subsystems",
    "severities",
];
const SUBGROUP_ATTRIBUTES: [&str; 2] = ["active", "order"];
const COMMON_RULE_ATTRIBUTES: [&str; 4] = ["name", "description", "active", "order"];

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    pub name: String,
    pub group: RuleGroup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceConfig {
    pub name: String,
    pub id: IdSource,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    pub resources: Vec<ResourceConfig>,
    pub data_sources: Vec<DataSourceConfig>,
}

impl Configuration {
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }
}

pub fn parse_configuration(source: &str) -> Result<Configuration, ConfigError> {
    let body: Body = hcl::parse(source).map_err(|e| ConfigError::Syntax(e.to_string()))?;

    if let Some(attr) = body.attributes().next() {
        return Err(ConfigError::UnknownAttribute {
            path: "<root>".to_string(),
            name: attr.key.to_string(),
        });
    }

    let mut config = Configuration::default();

    for block in body.blocks() {
        match block.identifier.as_str() {
            "resource" => {
                let name = typed_block_name(block, "resource")?;
                if config.resource(&name).is_some() {
                    return Err(ConfigError::Duplicate {
                        kind: "resource",
                        name,
                    });
                }
                let group = parse_group(&name, &block.body)?;
                config.resources.push(ResourceConfig { name, group });
            }
            "data" => {
                let name = typed_block_name(block, "data source")?;
                if config.data_sources.iter().any(|d| d.name == name) {
                    return Err(ConfigError::Duplicate {
                        kind: "data source",
                        name,
                    });
                }
                let id = parse_data_source(&name, &block.body)?;
                config.data_sources.push(DataSourceConfig { name, id });
            }
            other if IGNORED_TOP_LEVEL.contains(&other) => {
                tracing::debug!(block = other, "ignoring top-level block");
            }
            other => {
                return Err(ConfigError::UnknownBlock {
                    path: "<root>".to_string(),
                    name: other.to_string(),
                });
            }
        }
    }

    for data_source in &config.data_sources {
        if let IdSource::Reference(resource) = &data_source.id {
            if config.resource(resource).is_none() {
                return Err(ConfigError::UnknownReference {
                    data_source: data_source.name.clone(),
                    resource: resource.clone(),
                });
            }
        }
    }

    Ok(config)
}

fn typed_block_name(block: &Block, kind: &'static str) -> Result<String, ConfigError> {
    let labels: Vec<&str> = block.labels.iter().map(|l| l.as_str()).collect();
    match labels.as_slice() {
        [type_name, name] if *type_name == RESOURCE_TYPE => Ok(name.to_string()),
        [type_name, _] => Err(ConfigError::UnsupportedType {
            kind,
            type_name: type_name.to_string(),
        }),
        _ => Err(ConfigError::InvalidValue {
            path: block.identifier.to_string(),
            message: "expected a type label and a name label".to_string(),
        }),
    }
}

fn parse_data_source(name: &str, body: &Body) -> Result<IdSource, ConfigError> {
    let path = format!("data.{}.{}", RESOURCE_TYPE, name);
    let reader = BlockReader::new(&path, body, &["id"], &[])?;
    let attr = reader
        .expr("id")
        .ok_or_else(|| ConfigError::MissingAttribute {
            path: path.clone(),
            name: "id".to_string(),
        })?;

    match attr {
        Expression::String(id) => Ok(IdSource::Literal(id.clone())),
        Expression::Traversal(traversal) => {
            let root = traversal.expr.to_string();
            let parts: Vec<String> = traversal
                .operators
                .iter()
                .filter_map(|op| match op {
                    TraversalOperator::GetAttr(ident) => Some(ident.to_string()),
                    _ => None,
                })
                .collect();
            match parts.as_slice() {
                [resource, attr]
                    if root == RESOURCE_TYPE
                        && attr == "id"
                        && parts.len() == traversal.operators.len() =>
                {
                    Ok(IdSource::Reference(resource.clone()))
                }
                _ => Err(ConfigError::InvalidValue {
                    path: format!("{path}.id"),
                    message: format!("expected {}.<name>.id", RESOURCE_TYPE),
                }),
            }
        }
        _ => Err(ConfigError::InvalidType {
            path: format!("{path}.id"),
            expected: "a string or a resource reference",
        }),
    }
}

fn parse_group(name: &str, body: &Body) -> Result<RuleGroup, ConfigError> {
    let path = format!("{}.{}", RESOURCE_TYPE, name);
    let reader = BlockReader::new(&path, body, &GROUP_ATTRIBUTES, &["rule_subgroups"])?;

    let mut group = RuleGroup::new(reader.required_string("name")?);
    group.description = reader.string("description")?.unwrap_or_default();
    group.creator = reader.string("creator")?.unwrap_or_default();
    group.active = reader.bool("active")?.unwrap_or(true);
    group.hidden = reader.bool("hidden")?.unwrap_or(false);
    group.order = reader.number("order")?;
    group.applications = reader.list("applications")?;
    group.subsystems = reader.list("subsystems")?;
    group.severities = reader
        .list("severities")?
        .iter()
        .map(|s| {
            s.parse().map_err(|e: crate::rules_group::UnknownVariant| {
                ConfigError::InvalidValue {
                    path: format!("{path}.severities"),
                    message: e.to_string(),
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (i, block) in reader.blocks("rule_subgroups").enumerate() {
        let sub_path = format!("{path}.rule_subgroups.{i}");
        group
            .rule_subgroups
            .push(parse_subgroup(&sub_path, &block.body)?);
    }

    Ok(group)
}

fn parse_subgroup(path: &str, body: &Body) -> Result<RuleSubgroup, ConfigError> {
    let reader = BlockReader::new(path, body, &SUBGROUP_ATTRIBUTES, &["rules"])?;

    let mut rules = Vec::new();
    for (j, block) in reader.blocks("rules").enumerate() {
        rules.push(parse_rule(&format!("{path}.rules.{j}"), &block.body)?);
    }

    let mut subgroup = RuleSubgroup::new(rules);
    subgroup.active = reader.bool("active")?.unwrap_or(true);
    subgroup.order = reader.number("order")?;
    Ok(subgroup)
}

fn parse_rule(path: &str, body: &Body) -> Result<Rule, ConfigError> {
    BlockReader::new(path, body, &[], &RuleKind::BLOCK_NAMES)?;
    let kinds: Vec<&Block> = body.blocks().collect();
    let [kind_block] = kinds.as_slice() else {
        return Err(ConfigError::RuleCount {
            path: path.to_string(),
            found: kinds.len(),
        });
    };

    let kind_name = kind_block.identifier.as_str();
    let kind_path = format!("{path}.{kind_name}");
    let specific: &[&str] = match kind_name {
        "block" => &[
            "source_field",
            "regular_expression",
            "keep_blocked_logs",
            "blocking_all_matching_blocks",
        ],
        "allow" => &["source_field", "regular_expression", "keep_blocked_logs"],
        "replace" => &[
            "source_field",
            "destination_field",
            "regular_expression",
            "replacement_string",
        ],
        "extract" => &["source_field", "regular_expression"],
        "parse" => &["source_field", "destination_field", "regular_expression"],
        "parse_json_field" => &[
            "source_field",
            "destination_field",
            "keep_source_field",
            "keep_destination_field",
        ],
        "json_extract" => &["json_key", "destination_field"],
        "json_stringify" => &["source_field", "destination_field", "keep_source_field"],
        "remove_fields" => &["excluded_fields"],
        "extract_timestamp" => &["source_field", "field_format_standard", "time_format"],
        other => {
            return Err(ConfigError::UnknownBlock {
                path: path.to_string(),
                name: other.to_string(),
            });
        }
    };
    let allowed: Vec<&str> = COMMON_RULE_ATTRIBUTES
        .iter()
        .chain(specific.iter())
        .copied()
        .collect();
    let r = BlockReader::new(&kind_path, &kind_block.body, &allowed, &[])?;

    let kind: RuleKind = match kind_name {
        "block" => BlockRule {
            source_field: r.required_string("source_field")?,
            regular_expression: r.required_string("regular_expression")?,
            keep_blocked_logs: r.bool("keep_blocked_logs")?.unwrap_or(false),
            blocking_all_matching_blocks: r
                .bool("blocking_all_matching_blocks")?
                .unwrap_or(true),
        }
        .into(),
        "allow" => AllowRule {
            source_field: r.required_string("source_field")?,
            regular_expression: r.required_string("regular_expression")?,
            keep_blocked_logs: r.bool("keep_blocked_logs")?.unwrap_or(false),
        }
        .into(),
        "replace" => ReplaceRule {
            source_field: r.required_string("source_field")?,
            destination_field: r.required_string("destination_field")?,
            regular_expression: r.required_string("regular_expression")?,
            replacement_string: r.string("replacement_string")?.unwrap_or_default(),
        }
        .into(),
        "extract" => ExtractRule {
            source_field: r.required_string("source_field")?,
            regular_expression: r.required_string("regular_expression")?,
        }
        .into(),
        "parse" => ParseRule {
            source_field: r.required_string("source_field")?,
            destination_field: r.required_string("destination_field")?,
            regular_expression: r.required_string("regular_expression")?,
        }
        .into(),
        "parse_json_field" => ParseJsonFieldRule {
            source_field: r.required_string("source_field")?,
            destination_field: r.required_string("destination_field")?,
            keep_source_field: r.bool("keep_source_field")?.unwrap_or(false),
            keep_destination_field: r.bool("keep_destination_field")?.unwrap_or(false),
        }
        .into(),
        "json_extract" => JsonExtractRule {
            json_key: r.required_string("json_key")?,
            destination_field: r.parsed("destination_field")?,
        }
        .into(),
        "json_stringify" => JsonStringifyRule {
            source_field: r.required_string("source_field")?,
            destination_field: r.required_string("destination_field")?,
            keep_source_field: r.bool("keep_source_field")?.unwrap_or(false),
        }
        .into(),
        "remove_fields" => RemoveFieldsRule {
            excluded_fields: r.required_list("excluded_fields")?,
        }
        .into(),
        _ => ExtractTimestampRule {
            source_field: r.required_string("source_field")?,
            field_format_standard: r.parsed("field_format_standard")?,
            time_format: r.string("time_format")?.unwrap_or_default(),
        }
        .into(),
    };

    let mut rule = Rule::new(r.required_string("name")?, kind);
    rule.description = r.string("description")?.unwrap_or_default();
    rule.active = r.bool("active")?.unwrap_or(true);
    rule.order = r.number("order")?;
    Ok(rule)
}

/// Typed access to the attributes of one block, rejecting anything the schema
/// does not declare.
struct BlockReader<'a> {
    path: String,
    body: &'a Body,
}

impl<'a> BlockReader<'a> {
    fn new(
        path: &str,
        body: &'a Body,
        attributes: &[&str],
        blocks: &[&str],
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for attr in body.attributes() {
            let key = attr.key.as_str();
            if !attributes.contains(&key) {
                return Err(ConfigError::UnknownAttribute {
                    path: path.to_string(),
                    name: key.to_string(),
                });
            }
            if !seen.insert(key) {
                return Err(ConfigError::InvalidValue {
                    path: format!("{path}.{key}"),
                    message: "attribute set more than once".to_string(),
                });
            }
        }
        for block in body.blocks() {
            let id = block.identifier.as_str();
            if !blocks.contains(&id) {
                return Err(ConfigError::UnknownBlock {
                    path: path.to_string(),
                    name: id.to_string(),
                });
            }
        }
        Ok(Self {
            path: path.to_string(),
            body,
        })
    }

    fn expr(&self, name: &str) -> Option<&'a Expression> {
        self.body
            .attributes()
            .find(|a| a.key.as_str() == name)
            .map(|a| &a.expr)
            .filter(|e| !matches!(e, Expression::Null))
    }

    fn blocks(&self, name: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.body
            .blocks()
            .filter(move |b| b.identifier.as_str() == name)
    }

    fn attr_path(&self, name: &str) -> String {
        format!("{}.{}", self.path, name)
    }

    fn string(&self, name: &str) -> Result<Option<String>, ConfigError> {
        match self.expr(name) {
            None => Ok(None),
            Some(Expression::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ConfigError::InvalidType {
                path: self.attr_path(name),
                expected: "a string",
            }),
        }
    }

    fn required_string(&self, name: &str) -> Result<String, ConfigError> {
        self.string(name)?
            .ok_or_else(|| ConfigError::MissingAttribute {
                path: self.path.clone(),
                name: name.to_string(),
            })
    }

    fn parsed<T>(&self, name: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required_string(name)?;
        raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            path: self.attr_path(name),
            message: e.to_string(),
        })
    }

    fn bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        match self.expr(name) {
            None => Ok(None),
            Some(Expression::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ConfigError::InvalidType {
                path: self.attr_path(name),
                expected: "a bool",
            }),
        }
    }

    fn number(&self, name: &str) -> Result<Option<u32>, ConfigError> {
        match self.expr(name) {
            None => Ok(None),
            Some(Expression::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidType {
                    path: self.attr_path(name),
                    expected: "a non-negative whole number",
                }),
            Some(_) => Err(ConfigError::InvalidType {
                path: self.attr_path(name),
                expected: "a number",
            }),
        }
    }

    fn list(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        match self.expr(name) {
            None => Ok(Vec::new()),
            Some(Expression::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Expression::String(s) => Ok(s.clone()),
                    _ => Err(ConfigError::InvalidType {
                        path: self.attr_path(name),
                        expected: "a list of strings",
                    }),
                })
                .collect(),
            Some(_) => Err(ConfigError::InvalidType {
                path: self.attr_path(name),
                expected: "a list of strings",
            }),
        }
    }

    fn required_list(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        if self.expr(name).is_none() {
            return Err(ConfigError::MissingAttribute {
                path: self.path.clone(),
                name: name.to_string(),
            });
        }
        self.list(name)
    }
}
