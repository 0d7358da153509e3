mod cli;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let provider = cli.provider.resolve();
    tracing::debug!(?provider, "provider configuration");

    match cli.command {
        Command::Validate(args) => cli::validate(&args)?,
        Command::Plan(args) => cli::plan(&args)?,
        Command::Process(args) => cli::process(&args)?,
        Command::Apply(args) => {
            let api = provider.backend()?;
            cli::apply(api.as_ref(), &args, provider.dry_run).await?;
        }
        Command::Destroy(args) => {
            let api = provider.backend()?;
            cli::destroy(api.as_ref(), &args, provider.dry_run).await?;
        }
        Command::List => {
            let api = provider.backend()?;
            cli::list(api.as_ref()).await?;
        }
        Command::Show(args) => {
            let api = provider.backend()?;
            cli::show(api.as_ref(), &args.id).await?;
        }
        Command::Render(args) => {
            let api = provider.backend()?;
            cli::render(api.as_ref(), &args).await?;
        }
    }

    Ok(())
}
