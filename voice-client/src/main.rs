use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::info;

use helly_voice::VoiceConfig;
use helly_voice::core::realtime::RealtimeSignaling;

/// Helly voice - Azure OpenAI realtime session diagnostics
#[derive(Parser, Debug)]
#[command(name = "helly-voice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective configuration (credentials masked)
    Config,

    /// Mint an ephemeral credential and print its session id and expiry
    Token,

    /// Mint a credential, post an SDP offer and print the answer
    Negotiate {
        /// File containing the SDP offer
        #[arg(long = "offer", value_name = "FILE")]
        offer: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file or environment
    if let Some(ref config_path) = cli.config {
        info!("Loading configuration from {}", config_path.display());
    }
    let config = VoiceConfig::load(cli.config.as_deref()).map_err(|e| anyhow!(e.to_string()))?;

    match cli.command {
        Commands::Config => {
            println!("{config}");
        }
        Commands::Token => {
            let signaling = RealtimeSignaling::new(&config)?;
            let key = signaling.fetch_ephemeral_key().await?;
            println!("session_id: {}", key.session_id.as_deref().unwrap_or("-"));
            match key.expires_at {
                Some(expires_at) => println!("expires_at: {expires_at}"),
                None => println!("expires_at: -"),
            }
            println!("client_secret: {}", key.value.masked());
        }
        Commands::Negotiate { offer } => {
            let offer_sdp = std::fs::read_to_string(&offer)
                .with_context(|| format!("Failed to read SDP offer {}", offer.display()))?;

            let signaling = RealtimeSignaling::new(&config)?;
            let key = signaling.fetch_ephemeral_key().await?;
            let answer = signaling.exchange_sdp(&key, &offer_sdp).await?;
            println!("{answer}");
        }
    }

    Ok(())
}
