use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parsing_rules::api::Region;
use parsing_rules::rules_group::Severity;

#[derive(Parser, Debug)]
#[command(name = "prules", author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings shared by every command that talks to the platform.
#[derive(clap::Args, Debug)]
pub struct ProviderArgs {
    #[arg(long, global = true, env = "CORALOGIX_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, global = true, env = "CORALOGIX_ENV", value_enum, ignore_case = true)]
    pub region: Option<Region>,

    /// Explicit API endpoint; wins over --region.
    #[arg(long, global = true, env = "CORALOGIX_URL")]
    pub url: Option<String>,

    /// Print the plan without applying it; other commands use an in-memory
    /// backend instead of the platform.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render remote rules groups as Terraform configuration.
    Render(RenderArgs),
    /// Parse and validate a configuration.
    Validate(ConfigArgs),
    /// Show what apply would change.
    Plan(StatefulArgs),
    Apply(StatefulArgs),
    /// Delete every group recorded in state.
    Destroy(StateArgs),
    List,
    Show(ShowArgs),
    /// Run log lines through the groups of a configuration.
    Process(ProcessArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Terraform configuration file.
    #[arg(short, long)]
    pub config: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct StateArgs {
    #[arg(long, env = "PRULES_STATE")]
    pub state: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct StatefulArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub state: StateArgs,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Group ids to render; all groups when omitted.
    pub ids: Vec<String>,

    /// Also render a data source per group.
    #[arg(long)]
    pub data_sources: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Input file with one log record per line; stdin when omitted.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    #[arg(long, default_value = "")]
    pub application: String,

    #[arg(long, default_value = "")]
    pub subsystem: String,

    /// Severity attached to every record.
    #[arg(long)]
    pub severity: Option<Severity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    fn with_env<T>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
        let backup: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(k, _)| (k.to_string(), std::env::var(k).ok()))
            .collect();

        unsafe {
            for (key, value) in vars {
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
        }

        let result = f();

        unsafe {
            for (key, value) in backup {
                match value {
                    Some(v) => std::env::set_var(&key, v),
                    None => std::env::remove_var(&key),
                }
            }
        }

        result
    }

    #[test]
    #[serial]
    fn test_api_key_from_flag() {
        let cli = with_env(&[("CORALOGIX_API_KEY", None)], || {
            Cli::parse_from(["prules", "list", "--api-key=flag_key"])
        });
        assert_eq!(cli.provider.api_key, Some("flag_key".to_string()));
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    #[serial]
    fn test_api_key_from_env() {
        let cli = with_env(&[("CORALOGIX_API_KEY", Some("env_key"))], || {
            Cli::parse_from(["prules", "list"])
        });
        assert_eq!(cli.provider.api_key, Some("env_key".to_string()));
    }

    #[test]
    #[serial]
    fn test_cli_flag_takes_precedence_over_env() {
        let cli = with_env(&[("CORALOGIX_API_KEY", Some("env_key"))], || {
            Cli::parse_from(["prules", "--api-key=cli_key", "list"])
        });
        assert_eq!(cli.provider.api_key, Some("cli_key".to_string()));
    }

    #[test]
    #[serial]
    fn test_region_from_env_ignores_case() {
        let cli = with_env(&[("CORALOGIX_ENV", Some("us2"))], || {
            Cli::parse_from(["prules", "list"])
        });
        assert_eq!(cli.provider.region, Some(Region::Us2));
    }

    #[test]
    #[serial]
    fn test_no_flags_provided() {
        let cli = with_env(
            &[
                ("CORALOGIX_API_KEY", None),
                ("CORALOGIX_ENV", None),
                ("CORALOGIX_URL", None),
            ],
            || Cli::parse_from(["prules", "list"]),
        );
        assert!(cli.provider.api_key.is_none());
        assert!(cli.provider.region.is_none());
        assert!(cli.provider.url.is_none());
        assert!(!cli.provider.dry_run);
    }

    #[test]
    #[serial]
    fn test_plan_args() {
        let cli = with_env(&[("PRULES_STATE", None)], || {
            Cli::parse_from(["prules", "plan", "--config", "main.tf", "--dry-run"])
        });
        assert!(cli.provider.dry_run);
        match cli.command {
            Command::Plan(args) => {
                assert_eq!(args.config.config, PathBuf::from("main.tf"));
                assert!(args.state.state.is_none());
            }
            other => panic!("Expected Plan command, got {:?}", other),
        }
    }

    #[test]
    fn test_render_ids() {
        let cli = Cli::parse_from(["prules", "render", "a", "b", "--data-sources"]);
        match cli.command {
            Command::Render(args) => {
                assert_eq!(args.ids, vec!["a", "b"]);
                assert!(args.data_sources);
            }
            other => panic!("Expected Render command, got {:?}", other),
        }
    }

    #[test]
    fn test_process_args() {
        let cli = Cli::parse_from([
            "prules",
            "process",
            "-c",
            "rules.tf",
            "--application",
            "web",
            "--severity",
            "Error",
        ]);
        match cli.command {
            Command::Process(args) => {
                assert_eq!(args.application, "web");
                assert_eq!(args.subsystem, "");
                assert_eq!(args.severity, Some(Severity::Error));
                assert!(args.input.is_none());
            }
            other => panic!("Expected Process command, got {:?}", other),
        }
    }

    #[test]
    fn test_show_requires_id() {
        assert!(Cli::try_parse_from(["prules", "show"]).is_err());
    }
}
