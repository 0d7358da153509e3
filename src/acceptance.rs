//! Acceptance test driver: apply configurations step by step against a rules
//! API, check the resulting state, then destroy everything and confirm the
//! groups are gone.

pub mod checks;
pub mod configs;
pub mod fixtures;

pub use checks::{Check, check_attr, check_attr_set, check_no_attr};
pub use fixtures::{ParsingRuleFixture, RuleFixture, random_parsing_rule};

use thiserror::Error;

use crate::api::RulesGroupsApi;
use crate::terraform::{ConfigError, Plan, StateFile, parse_configuration};
use crate::workflow::{self, WorkflowError};

#[derive(Debug, Error)]
pub enum AcceptanceError {
    #[error("step {step}: invalid configuration: {source}")]
    Config {
        step: usize,
        #[source]
        source: ConfigError,
    },

    #[error("step {step}: {source}")]
    Apply {
        step: usize,
        #[source]
        source: WorkflowError,
    },

    #[error("step {step}: check {check} failed: {message}")]
    Check {
        step: usize,
        check: usize,
        message: String,
    },

    #[error("step {step}: plan not empty after apply:\n{plan}")]
    NonEmptyPlan { step: usize, plan: String },

    #[error("destroy: {0}")]
    Destroy(#[source] WorkflowError),
}

#[derive(Debug, Clone)]
pub struct TestStep {
    pub config: String,
    pub checks: Vec<Check>,
}

impl TestStep {
    pub fn new(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            checks: Vec::new(),
        }
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn checks(mut self, checks: impl IntoIterator<Item = Check>) -> Self {
        self.checks.extend(checks);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestCase {
    pub steps: Vec<TestStep>,
}

impl TestCase {
    pub fn new(steps: Vec<TestStep>) -> Self {
        Self { steps }
    }

    /// Runs every step, then destroys whatever was created, even after a
    /// failing step. The first error wins.
    pub async fn run(&self, api: &dyn RulesGroupsApi) -> Result<StateFile, AcceptanceError> {
        let mut state = StateFile::default();
        let mut outcome = Ok(());

        for (index, step) in self.steps.iter().enumerate() {
            let step_number = index + 1;
            tracing::info!(step = step_number, checks = step.checks.len(), "running step");
            match run_step(api, step_number, step, state.clone()).await {
                Ok(next) => state = next,
                Err((next, err)) => {
                    state = next;
                    outcome = Err(err);
                    break;
                }
            }
        }

        let final_state = state.clone();
        let destroyed = match workflow::destroy(api, state).await {
            Ok(ids) => workflow::check_destroyed(api, &ids).await,
            Err(err) => Err(err),
        };

        outcome?;
        destroyed.map_err(AcceptanceError::Destroy)?;
        Ok(final_state)
    }
}

async fn run_step(
    api: &dyn RulesGroupsApi,
    step: usize,
    test_step: &TestStep,
    state: StateFile,
) -> Result<StateFile, (StateFile, AcceptanceError)> {
    let config = match parse_configuration(&test_step.config) {
        Ok(config) => config,
        Err(source) => return Err((state, AcceptanceError::Config { step, source })),
    };

    let mut state = state;
    if let Err(source) = workflow::apply(api, &config, &mut state).await {
        return Err((state, AcceptanceError::Apply { step, source }));
    }

    for (index, check) in test_step.checks.iter().enumerate() {
        if let Err(message) = check.verify(&state) {
            tracing::debug!(step, check = %check, "check failed");
            return Err((
                state,
                AcceptanceError::Check {
                    step,
                    check: index + 1,
                    message,
                },
            ));
        }
    }

    let plan: Result<Plan, WorkflowError> = workflow::plan(&config, &state);
    match plan {
        Ok(plan) if plan.has_changes() => {
            let plan = plan.to_string();
            Err((state, AcceptanceError::NonEmptyPlan { step, plan }))
        }
        Ok(_) => Ok(state),
        Err(source) => Err((state, AcceptanceError::Apply { step, source })),
    }
}
