//! Parsing rules for Coralogix as a Terraform-style `coralogix_rules_group`
//! resource.
//!
//! A library for translating rules groups between Terraform configuration,
//! flatmap state and the platform's REST API, applying them locally to log
//! records, and driving acceptance tests against the API.

pub mod acceptance;
pub mod api;
pub mod engine;
pub mod output;
pub mod rules_group;
pub mod store;
pub mod terraform;
pub mod workflow;

mod config;
mod error;

pub use api::{ApiError, MemoryRulesApi, Region, RetryConfig, RulesClient, RulesGroupsApi};
pub use config::ProviderConfig;
pub use engine::{LogRecord, Outcome, RuleEngine};
pub use error::AppError;
pub use rules_group::{Rule, RuleGroup, RuleKind, RuleSubgroup};
