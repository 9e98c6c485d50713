//! Shade Agent CLI - key generation, fallback attestation and config inspection

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use shade_core::{attestation_for_contract, fake_attestation};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shade_agent::{generate_agent, AgentConfig};

#[derive(Parser)]
#[command(name = "shade-agent")]
#[command(about = "Key lifecycle and attestation tools for Shade agents", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $SHADE_AGENT_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an agent account key outside a TEE
    Generate {
        /// Derive deterministically from this path instead of randomly
        #[arg(short, long)]
        derivation_path: Option<String>,

        /// Also print the secret key
        #[arg(long)]
        show_secret: bool,
    },

    /// Print the fallback attestation in verifier contract form
    FakeAttestation,

    /// Print the effective configuration with secrets redacted
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shade_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            derivation_path,
            show_secret,
        } => {
            let identity = generate_agent(None, derivation_path.as_deref(), &mut OsRng).await?;
            println!("Account ID: {}", identity.account_id);
            println!("Public key: {}", identity.key.public_key());
            if show_secret {
                println!("Secret key: {}", identity.key.secret_key_string().as_str());
            }
        }

        Commands::FakeAttestation => {
            let wire = attestation_for_contract(&fake_attestation());
            println!("{}", serde_json::to_string_pretty(&wire)?);
        }

        Commands::ShowConfig => {
            let path = cli.config.unwrap_or_else(AgentConfig::default_path);
            let config = if path.exists() {
                AgentConfig::load(&path)?
            } else {
                info!("No config at {:?}, showing defaults", path);
                AgentConfig::default()
            };
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}
