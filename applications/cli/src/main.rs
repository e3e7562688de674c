/// Sharepath - path-addressed SharePoint document library client
use clap::Parser;
use sharepath_cli::{execute, CliConfig, Command, Output};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sharepath")]
#[command(about = "Work with a SharePoint document library by path", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./sharepath.toml when present)
    #[arg(short, long, global = true, env = "SHAREPATH_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sharepath=info,sharepath_core=info,sharepath_graph=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = CliConfig::load(cli.config.as_deref())?;
    config.validate()?;
    let settings = config.graph_settings()?;

    tracing::info!(
        site = %format!("{}{}", settings.site_hostname, settings.site_path),
        library = %settings.library,
        "Connecting"
    );
    let client = sharepath_graph::connect(&settings, config.client_options()).await?;

    let mut out = Output::new(std::io::stdout().lock(), cli.json);
    let failures = execute(&client, cli.command, &mut out).await?;

    if failures > 0 {
        anyhow::bail!("{failures} item(s) failed");
    }

    Ok(())
}
