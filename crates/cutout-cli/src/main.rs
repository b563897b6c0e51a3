//! cutout CLI: remove image backgrounds through a running relay.
//!
//! The relay URL comes from `--api-url`, then CUTOUT_API_URL, then http://localhost:4000.

use anyhow::Context;
use clap::{Parser, Subcommand};
use cutout_cli::{init_tracing, resolve_api_url, resolve_output};
use cutout_client::{ClientPipeline, ClientState, RelayClient, SelectedFile};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cutout", about = "Background removal from the terminal")]
struct Cli {
    /// Relay base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove the background of an image and save the PNG result
    Remove {
        /// Path to a JPEG, PNG or WebP image
        file: PathBuf,
        /// Where to write the result (default: next to the input)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Check that the relay is up
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let api_url = resolve_api_url(cli.api_url, std::env::var("CUTOUT_API_URL").ok());
    let client = RelayClient::new(&api_url).context("Failed to create relay client")?;

    match cli.command {
        Commands::Remove { file, output } => {
            let selected = SelectedFile::from_path(&file)?;
            tracing::info!(
                file = %file.display(),
                size = selected.size(),
                content_type = %selected.content_type,
                api_url = %api_url,
                "Sending image to relay"
            );

            let mut pipeline = ClientPipeline::new();
            pipeline.process(&client, selected).await?;
            match pipeline.state() {
                ClientState::Done { processed, .. } => {
                    let target = resolve_output(output, &file);
                    pipeline.save(&target)?;
                    println!("Saved {} ({} bytes)", target.display(), processed.len());
                }
                ClientState::Failed { message } => {
                    anyhow::bail!("{}", message);
                }
                other => {
                    anyhow::bail!("Unexpected pipeline state: {}", other.name());
                }
            }
        }
        Commands::Health => {
            let health = client
                .health()
                .await
                .with_context(|| format!("Relay at {} is not reachable", api_url))?;
            println!("{}: {}", api_url, health.status);
        }
    }

    Ok(())
}
