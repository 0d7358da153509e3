use hcl::expr::{Expression, Traversal, Variable};
use hcl::{Attribute, Block, BlockBuilder, Body, Number};

use super::ConfigError;
use super::schema::{self, AttrValue};
use crate::rules_group::{RESOURCE_TYPE, RuleGroup};

/// Where a data source takes its id from.
#[derive(Debug, Clone, PartialEq)]
pub enum IdSource {
    Literal(String),
    /// `coralogix_rules_group.<name>.id`
    Reference(String),
}

impl IdSource {
    pub fn reference(resource_name: impl Into<String>) -> Self {
        IdSource::Reference(resource_name.into())
    }
}

fn expression(value: AttrValue) -> Expression {
    match value {
        AttrValue::String(s) => Expression::from(s),
        AttrValue::Bool(b) => Expression::from(b),
        AttrValue::Number(n) => Expression::Number(Number::from(n)),
        AttrValue::List(items) => {
            Expression::Array(items.into_iter().map(Expression::from).collect())
        }
    }
}

fn with_attributes(
    mut builder: BlockBuilder,
    attrs: Vec<(&'static str, AttrValue)>,
) -> BlockBuilder {
    for (key, value) in attrs {
        builder = builder.add_attribute(Attribute::new(key, expression(value)));
    }
    builder
}

/// Renders `resource "coralogix_rules_group" "<name>" { ... }`.
pub fn resource_block(name: &str, group: &RuleGroup) -> Block {
    // ids are never part of a configuration
    let group = group.without_ids();

    let mut builder = with_attributes(
        BlockBuilder::new("resource")
            .add_label(RESOURCE_TYPE)
            .add_label(name),
        schema::group_attributes(&group),
    );

    for subgroup in &group.rule_subgroups {
        let mut sub_builder = with_attributes(
            BlockBuilder::new("rule_subgroups"),
            schema::subgroup_attributes(subgroup),
        );
        for rule in &subgroup.rules {
            let kind_block = with_attributes(
                BlockBuilder::new(rule.kind.block_name()),
                schema::rule_attributes(rule),
            )
            .build();
            sub_builder = sub_builder.add_block(BlockBuilder::new("rules").add_block(kind_block).build());
        }
        builder = builder.add_block(sub_builder.build());
    }

    builder.build()
}

/// Renders `data "coralogix_rules_group" "<name>" { id = ... }`.
pub fn data_source_block(name: &str, id: &IdSource) -> Block {
    let id_expr = match id {
        IdSource::Literal(id) => Expression::from(id.clone()),
        IdSource::Reference(resource) => Expression::from(
            Traversal::builder(Variable::unchecked(RESOURCE_TYPE))
                .attr(resource.as_str())
                .attr("id")
                .build(),
        ),
    };

    BlockBuilder::new("data")
        .add_label(RESOURCE_TYPE)
        .add_label(name)
        .add_attribute(Attribute::new("id", id_expr))
        .build()
}

/// Collects blocks of one configuration and renders them as HCL.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    blocks: Vec<Block>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, name: &str, group: &RuleGroup) -> Self {
        self.blocks.push(resource_block(name, group));
        self
    }

    pub fn data_source(mut self, name: &str, id: IdSource) -> Self {
        self.blocks.push(data_source_block(name, &id));
        self
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn render(self) -> Result<String, ConfigError> {
        let body = Body::builder().add_blocks(self.blocks).build();
        hcl::to_string(&body).map_err(|e| ConfigError::Render(e.to_string()))
    }
}
