pub mod config;
pub mod parse;
pub mod plan;
pub mod schema;
pub mod state;

pub use config::{ConfigBuilder, IdSource};
pub use parse::{Configuration, DataSourceConfig, ResourceConfig, parse_configuration};
pub use plan::{Action, AttributeChange, Plan, ResourcePlan};
pub use state::{ResourceState, StateFile, flatten_rule_group};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HCL syntax error: {0}")]
    Syntax(String),

    #[error("failed to render configuration: {0}")]
    Render(String),

    #[error("unsupported {kind} type '{type_name}'")]
    UnsupportedType { kind: &'static str, type_name: String },

    #[error("{path}: unknown attribute '{name}'")]
    UnknownAttribute { path: String, name: String },

    #[error("{path}: unknown block '{name}'")]
    UnknownBlock { path: String, name: String },

    #[error("{path}: missing required attribute '{name}'")]
    MissingAttribute { path: String, name: String },

    #[error("{path}: expected {expected}")]
    InvalidType { path: String, expected: &'static str },

    #[error("{path}: {message}")]
    InvalidValue { path: String, message: String },

    #[error("{path}: a rules block must contain exactly one rule, found {found}")]
    RuleCount { path: String, found: usize },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("data source '{data_source}' references undeclared resource '{resource}'")]
    UnknownReference { data_source: String, resource: String },
}

/// `<type>.<name>` address of a rules-group resource.
pub fn resource_address(name: &str) -> String {
    format!("{}.{}", crate::rules_group::RESOURCE_TYPE, name)
}

/// `data.<type>.<name>` address of a rules-group data source.
pub fn data_source_address(name: &str) -> String {
    format!("data.{}.{}", crate::rules_group::RESOURCE_TYPE, name)
}
