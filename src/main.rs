use anyhow::{bail, Context};
use cartflow_cli::config::CartflowConfig;
use cartflow_cli::profile::ProfileStore;
use cartflow_cli::runner;
use cartflow_core_types::{CheckoutRequest, Customer, Task};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cartflow",
    version,
    about = "Adaptive checkout automation over the Chrome DevTools Protocol"
)]
struct Cli {
    /// JSON config file; defaults plus CARTFLOW_* env vars apply on top.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a checkout request against a live browser.
    Run {
        /// Input JSON: a full checkout request, or just a task list when
        /// a customer profile has been saved.
        #[arg(long)]
        input: PathBuf,

        /// Override the browser WebSocket endpoint.
        #[arg(long)]
        cdp_url: Option<String>,

        /// Persist recovery screenshots here.
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,
    },
    /// Inspect or update the saved customer profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the saved profile.
    Show,
    /// Save a profile from a customer JSON file.
    Save {
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            input,
            cdp_url,
            artifacts_dir,
        } => {
            let mut config = CartflowConfig::load(cli.config.as_deref())?;
            if let Some(url) = cdp_url {
                config.cdp_url = url;
            }
            if let Some(dir) = artifacts_dir {
                config.artifacts_dir = Some(dir);
            }

            let request = read_request(&input)?;
            let report = runner::run_checkout(&config, request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Profile { action } => match action {
            ProfileAction::Show => {
                let store = ProfileStore::new()?;
                match store.load()? {
                    Some(customer) => {
                        println!("{}", serde_json::to_string_pretty(&customer)?);
                        Ok(())
                    }
                    None => bail!("no profile saved at {}", store.path().display()),
                }
            }
            ProfileAction::Save { input } => {
                let content = std::fs::read_to_string(&input)
                    .with_context(|| format!("reading {}", input.display()))?;
                let customer: Customer = serde_json::from_str(&content)
                    .with_context(|| format!("parsing {}", input.display()))?;
                let store = ProfileStore::new()?;
                store.save(&customer)?;
                println!("profile saved to {}", store.path().display());
                Ok(())
            }
        },
    }
}

/// Accept either a full request or a bare task list backed by the saved
/// profile.
fn read_request(input: &Path) -> anyhow::Result<CheckoutRequest> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    if let Ok(request) = serde_json::from_str::<CheckoutRequest>(&content) {
        return Ok(request);
    }
    let tasks: Vec<Task> = serde_json::from_str(&content)
        .with_context(|| format!("parsing {} as a request or task list", input.display()))?;
    let store = ProfileStore::new()?;
    let Some(customer) = store.load()? else {
        bail!(
            "{} is a task list but no profile is saved; run `cartflow profile save` first",
            input.display()
        );
    };
    Ok(CheckoutRequest { customer, tasks })
}
