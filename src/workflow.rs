//! Drives a configuration against the rules API: plan, apply, destroy and the
//! post-destroy check.

use thiserror::Error;

use crate::api::{ApiError, RulesGroupsApi};
use crate::rules_group::ValidationError;
use crate::terraform::plan::plan_resource;
use crate::terraform::{
    Action, Configuration, IdSource, Plan, ResourceState, StateFile, data_source_address,
    resource_address,
};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{address}: {source}")]
    Invalid {
        address: String,
        #[source]
        source: ValidationError,
    },

    #[error("{address}: {source}")]
    Api {
        address: String,
        #[source]
        source: ApiError,
    },

    #[error("data source '{data_source}' references '{resource}', which is not in state")]
    MissingReference { data_source: String, resource: String },

    #[error("rules group '{id}' still exists after destroy")]
    StillExists { id: String },

    #[error("destroy check for '{id}' failed: {source}")]
    DestroyCheck {
        id: String,
        #[source]
        source: ApiError,
    },
}

fn api_error(address: &str) -> impl FnOnce(ApiError) -> WorkflowError + '_ {
    move |source| WorkflowError::Api {
        address: address.to_string(),
        source,
    }
}

/// Validates every configured group and diffs it against `state`.
///
/// Resources in state that the configuration no longer declares are planned
/// for deletion.
pub fn plan(config: &Configuration, state: &StateFile) -> Result<Plan, WorkflowError> {
    let mut resources = Vec::new();

    for resource in &config.resources {
        let address = resource_address(&resource.name);
        resource
            .group
            .validate()
            .map_err(|source| WorkflowError::Invalid {
                address: address.clone(),
                source,
            })?;
        resources.push(plan_resource(
            &address,
            state.resource(&address),
            Some(&resource.group),
        ));
    }

    for prior in &state.resources {
        let declared = config
            .resources
            .iter()
            .any(|r| resource_address(&r.name) == prior.address);
        if !declared {
            resources.push(plan_resource(&prior.address, Some(prior), None));
        }
    }

    Ok(Plan { resources })
}

/// Plans, then converges the remote groups onto the configuration.
///
/// Every managed resource is read back after its write so state holds the
/// platform's view (ids, orders). Data sources are read last, after the
/// resources they reference exist. `state` is updated as each write lands, so
/// on error it still records every group that was created, updated or deleted
/// before the failure.
pub async fn apply(
    api: &dyn RulesGroupsApi,
    config: &Configuration,
    state: &mut StateFile,
) -> Result<(), WorkflowError> {
    let plan = plan(config, state)?;
    tracing::info!(
        create = plan.count(Action::Create),
        update = plan.count(Action::Update),
        delete = plan.count(Action::Delete),
        "applying plan"
    );

    for resource_plan in &plan.resources {
        let address = resource_plan.address.as_str();
        let desired = config
            .resources
            .iter()
            .find(|r| resource_address(&r.name) == address)
            .map(|r| &r.group);
        let prior_id = state.resource(address).map(|r| r.id.clone());

        let written = match (resource_plan.action, desired, prior_id) {
            (Action::Create, Some(group), _) => Some(api.create(group).await.map_err(api_error(address))?),
            (Action::Update, Some(group), Some(id)) => {
                Some(api.update(&id, group).await.map_err(api_error(address))?)
            }
            (Action::NoOp, Some(_), Some(id)) => Some(api.get(&id).await.map_err(api_error(address))?),
            (Action::Delete, _, Some(id)) => {
                match api.delete(&id).await {
                    Ok(()) | Err(ApiError::NotFound { .. }) => {}
                    Err(err) => return Err(api_error(address)(err)),
                }
                state.remove(address);
                tracing::info!(address, id = %id, "destroyed");
                None
            }
            _ => None,
        };

        if let Some(group) = written {
            // recorded before the refresh so a failed read cannot lose the id
            state.upsert(ResourceState::from_group(address, &group));
            let id = group.id.clone().unwrap_or_default();
            if resource_plan.action != Action::NoOp {
                let refreshed = api.get(&id).await.map_err(api_error(address))?;
                state.upsert(ResourceState::from_group(address, &refreshed));
            }
            tracing::info!(address, id = %id, action = %resource_plan.action, "applied");
        }
    }

    state.data_sources = read_data_sources(api, config, state).await?;
    Ok(())
}

async fn read_data_sources(
    api: &dyn RulesGroupsApi,
    config: &Configuration,
    state: &StateFile,
) -> Result<Vec<ResourceState>, WorkflowError> {
    let mut data_sources = Vec::with_capacity(config.data_sources.len());

    for data_source in &config.data_sources {
        let address = data_source_address(&data_source.name);
        let id = match &data_source.id {
            IdSource::Literal(id) => id.clone(),
            IdSource::Reference(resource) => state
                .resource(&resource_address(resource))
                .map(|r| r.id.clone())
                .ok_or_else(|| WorkflowError::MissingReference {
                    data_source: data_source.name.clone(),
                    resource: resource.clone(),
                })?,
        };

        let group = api.get(&id).await.map_err(api_error(&address))?;
        tracing::debug!(address = %address, id = %id, "data source read");
        data_sources.push(ResourceState::from_group(address, &group));
    }

    Ok(data_sources)
}

/// Deletes every managed resource and returns the ids that were destroyed.
pub async fn destroy(
    api: &dyn RulesGroupsApi,
    mut state: StateFile,
) -> Result<Vec<String>, WorkflowError> {
    let mut destroyed = Vec::new();

    for resource in std::mem::take(&mut state.resources).into_iter().rev() {
        match api.delete(&resource.id).await {
            Ok(()) => {}
            Err(ApiError::NotFound { .. }) => {
                tracing::warn!(address = %resource.address, id = %resource.id, "already gone");
            }
            Err(err) => return Err(api_error(&resource.address)(err)),
        }
        tracing::info!(address = %resource.address, id = %resource.id, "destroyed");
        destroyed.push(resource.id);
    }

    Ok(destroyed)
}

/// Confirms destroyed groups are gone, issuing exactly one read per id.
pub async fn check_destroyed(api: &dyn RulesGroupsApi, ids: &[String]) -> Result<(), WorkflowError> {
    for id in ids {
        match api.get(id).await {
            Err(ApiError::NotFound { .. }) => {}
            Ok(_) => return Err(WorkflowError::StillExists { id: id.clone() }),
            Err(source) => {
                return Err(WorkflowError::DestroyCheck {
                    id: id.clone(),
                    source,
                });
            }
        }
    }
    Ok(())
}
