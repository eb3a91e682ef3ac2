use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::Result;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use rounds_cli::config::{self, CredentialSource, RoundsConfig};

mod repl;

#[derive(Parser)]
#[command(name = "rounds")]
#[command(about = "Case-based clinical tutoring in the terminal")]
struct Cli {
    /// Emit logs as JSON (logs always go to stderr)
    #[arg(long, global = true)]
    log_json: bool,
    /// AWS region, overriding the config file
    #[arg(long, global = true)]
    region: Option<String>,
    /// Bedrock model or inference profile id, overriding the config file
    #[arg(long, global = true)]
    model: Option<String>,
    /// Directory holding case files, overriding the config file
    #[arg(long, global = true)]
    cases_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cases
    Cases,
    /// Work through a case interactively
    Run {
        /// Case id (file stem under the cases directory)
        case_id: String,
        /// Restore the differential and summaries from a saved session
        #[arg(long)]
        resume: Option<Uuid>,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with credentials redacted
    Show,
    /// Write a config file with defaults
    Init {
        /// Use this AWS profile instead of the default credential chain
        #[arg(long)]
        profile: Option<String>,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = config::load_config()?;
    if let Some(region) = &cli.region {
        config.region = region.clone();
    }
    if let Some(model) = &cli.model {
        config.model_id = model.clone();
    }
    if let Some(cases_dir) = &cli.cases_dir {
        config.cases_dir = cases_dir.clone();
    }

    match cli.command {
        Commands::Cases => list_cases(&config),
        Commands::Run { case_id, resume } => repl::run(&config, &case_id, resume).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => show_config(&config),
            ConfigAction::Init { profile, force } => init_config(config, profile, force),
        },
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn list_cases(config: &RoundsConfig) -> Result<()> {
    let ids = rounds_core::loader::list_cases(&config.cases_dir)?;
    if ids.is_empty() {
        println!("No cases found in {}.", config.cases_dir.display());
        return Ok(());
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn show_config(config: &RoundsConfig) -> Result<()> {
    let path = config::config_path()?;
    let info = config::config_info(config, &path);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn init_config(mut config: RoundsConfig, profile: Option<String>, force: bool) -> Result<()> {
    let path = config::config_path()?;
    if path.exists() && !force {
        return Err(eyre::eyre!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }
    if let Some(profile_name) = profile {
        config.credentials = CredentialSource::Profile { profile_name };
    }
    let path = config::save_config(&config)?;
    println!("Wrote {}", path.display());
    Ok(())
}
