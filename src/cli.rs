mod args;

pub use args::{Cli, Command, ConfigArgs, ProcessArgs, RenderArgs, StateArgs, StatefulArgs};

use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use parsing_rules::api::RulesGroupsApi;
use parsing_rules::engine::{LogMetadata, LogRecord, RuleEngine};
use parsing_rules::terraform::{ConfigBuilder, Configuration, IdSource, parse_configuration};
use parsing_rules::{AppError, ProviderConfig, output, store, workflow};

impl args::ProviderArgs {
    pub fn resolve(&self) -> ProviderConfig {
        ProviderConfig::resolve(
            self.api_key.clone(),
            self.region,
            self.url.clone(),
            self.dry_run,
        )
    }
}

impl StateArgs {
    pub fn path(&self) -> PathBuf {
        self.state.clone().unwrap_or_else(store::default_state_path)
    }
}

fn read_config(args: &ConfigArgs) -> Result<Configuration, AppError> {
    let source = std::fs::read_to_string(&args.config)?;
    Ok(parse_configuration(&source)?)
}

pub fn validate(args: &ConfigArgs) -> Result<(), AppError> {
    let config = read_config(args)?;
    for resource in &config.resources {
        resource.group.validate()?;
    }
    tracing::info!(
        resources = config.resources.len(),
        data_sources = config.data_sources.len(),
        "configuration is valid"
    );
    Ok(())
}

pub fn plan(args: &StatefulArgs) -> Result<(), AppError> {
    let config = read_config(&args.config)?;
    let state = store::load(&args.state.path())?;
    let plan = workflow::plan(&config, &state)?;
    println!("{plan}");
    Ok(())
}

pub async fn apply(
    api: &dyn RulesGroupsApi,
    args: &StatefulArgs,
    dry_run: bool,
) -> Result<(), AppError> {
    let config = read_config(&args.config)?;
    let path = args.state.path();
    let mut state = store::load(&path)?;

    let plan = workflow::plan(&config, &state)?;
    println!("{plan}");

    if dry_run {
        tracing::info!("dry run, no changes applied");
        return Ok(());
    }

    let applied = workflow::apply(api, &config, &mut state).await;
    store::save(&path, &state)?;
    applied?;
    println!("Apply complete! Resources: {} managed.", state.resources.len());
    Ok(())
}

pub async fn destroy(
    api: &dyn RulesGroupsApi,
    args: &StateArgs,
    dry_run: bool,
) -> Result<(), AppError> {
    let path = args.path();
    let state = store::load(&path)?;
    let ids = workflow::destroy(api, state).await?;
    workflow::check_destroyed(api, &ids).await?;

    if !dry_run {
        store::save(&path, &Default::default())?;
    }
    println!("Destroy complete! Resources: {} destroyed.", ids.len());
    Ok(())
}

pub async fn list(api: &dyn RulesGroupsApi) -> Result<(), AppError> {
    let groups = api.list().await?;
    println!("{}", output::groups_table(&groups));
    Ok(())
}

pub async fn show(api: &dyn RulesGroupsApi, id: &str) -> Result<(), AppError> {
    let group = api.get(id).await?;
    println!("{}", output::group_tree(&group));
    Ok(())
}

/// Turns a group name into a Terraform identifier, unique among `used`.
fn resource_name(group_name: &str, used: &mut HashSet<String>) -> String {
    let mut base: String = group_name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
        base.insert(0, '_');
    }

    let mut name = base.clone();
    let mut n = 1;
    while !used.insert(name.clone()) {
        n += 1;
        name = format!("{base}_{n}");
    }
    name
}

pub async fn render(api: &dyn RulesGroupsApi, args: &RenderArgs) -> Result<(), AppError> {
    let groups = if args.ids.is_empty() {
        api.list().await?
    } else {
        let mut groups = Vec::with_capacity(args.ids.len());
        for id in &args.ids {
            groups.push(api.get(id).await?);
        }
        groups
    };

    let mut used = HashSet::new();
    let mut builder = ConfigBuilder::new();
    for group in &groups {
        let name = resource_name(&group.name, &mut used);
        builder = builder.resource(&name, group);
        if args.data_sources {
            builder = builder.data_source(&name, IdSource::reference(&name));
        }
    }

    tracing::info!(count = groups.len(), "rendering rules groups");
    print!("{}", builder.render()?);
    Ok(())
}

pub fn process(args: &ProcessArgs) -> Result<(), AppError> {
    let config = read_config(&args.config)?;
    let groups: Vec<_> = config.resources.into_iter().map(|r| r.group).collect();
    let engine = RuleEngine::new(&groups)?;

    let metadata = LogMetadata {
        application: args.application.clone(),
        subsystem: args.subsystem.clone(),
        severity: args.severity,
        ..LogMetadata::default()
    };

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut blocked = 0usize;
    let mut total = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        total += 1;
        let outcome = engine.process(LogRecord::from_line(&line).with_metadata(metadata.clone()));
        if outcome.is_blocked() {
            blocked += 1;
        }
        writeln!(out, "{}", output::outcome_line(&outcome))?;
    }

    tracing::info!(total, blocked, groups = engine.len(), "processing complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsing_rules::MemoryRulesApi;
    use parsing_rules::terraform::StateFile;

    const CONFIG: &str = r#"
resource "coralogix_rules_group" "test" {
  name = "cli"

  rule_subgroups {
    rules {
      block {
        name               = "drop health checks"
        source_field       = "text"
        regular_expression = "GET /health"
      }
    }
  }
}
"#;

    fn stateful_args(dir: &tempfile::TempDir, config: &str) -> StatefulArgs {
        let config_path = dir.path().join("main.tf");
        std::fs::write(&config_path, config).unwrap();
        StatefulArgs {
            config: ConfigArgs {
                config: config_path,
            },
            state: StateArgs {
                state: Some(dir.path().join("state.json")),
            },
        }
    }

    #[tokio::test]
    async fn test_apply_saves_state() {
        let dir = tempfile::tempdir().unwrap();
        let args = stateful_args(&dir, CONFIG);
        let api = MemoryRulesApi::new();

        apply(&api, &args, false).await.unwrap();

        let state = store::load(&args.state.path()).unwrap();
        assert!(state.resource("coralogix_rules_group.test").is_some());
        assert_eq!(api.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_apply_saves_partial_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = format!(
            "{CONFIG}\ndata \"coralogix_rules_group\" \"missing\" {{\n  id = \"does-not-exist\"\n}}\n"
        );
        let args = stateful_args(&dir, &config);
        let api = MemoryRulesApi::new();

        assert!(apply(&api, &args, false).await.is_err());

        let state = store::load(&args.state.path()).unwrap();
        let created = state.resource("coralogix_rules_group.test").unwrap();
        assert!(api.get(&created.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_apply_leaves_backend_and_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let args = stateful_args(&dir, CONFIG);
        apply(&MemoryRulesApi::new(), &args, false).await.unwrap();
        let saved = store::load(&args.state.path()).unwrap();

        // a fresh backend knows none of the ids recorded in state
        let fresh = MemoryRulesApi::new();
        apply(&fresh, &args, true).await.unwrap();

        assert!(fresh.is_empty().await);
        assert_eq!(store::load(&args.state.path()).unwrap(), saved);
        assert_ne!(saved, StateFile::default());
    }

    #[test]
    fn test_resource_name_sanitizes_and_dedupes() {
        let mut used = HashSet::new();
        assert_eq!(resource_name("Nginx Access", &mut used), "nginx_access");
        assert_eq!(resource_name("nginx-access", &mut used), "nginx_access_2");
        assert_eq!(resource_name("1st group", &mut used), "_1st_group");
        assert_eq!(resource_name("", &mut used), "_");
    }
}
