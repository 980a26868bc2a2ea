//! vidcast CLI: upload videos to Cloudflare Stream and keep a local record of
//! the resulting playback id.
//!
//! Set CF_ACCOUNT_ID and CF_STREAM_TOKEN. Records live in VIDCAST_RECORD_DIR
//! (default `./.vidcast/records`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use vidcast_api_client::{StreamClient, TusTransport};
use vidcast_cli::{init_tracing, record_dir, record_summary, render_status};
use vidcast_core::models::UploadFile;
use vidcast_core::{StreamConfig, StreamProvider, UploadConfig};
use vidcast_storage::LocalRecordStore;
use vidcast_upload::{RecordSink, UploadOrchestrator, UploadOutcome};

#[derive(Parser)]
#[command(name = "vidcast", about = "Cloudflare Stream upload CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a video and store its playback id on a record
    Upload {
        /// Path to the video file
        file: PathBuf,
        /// Record (document) id to update
        #[arg(long)]
        document: String,
    },
    /// Show the processing status of a Stream asset
    Status {
        /// Stream asset uid
        uid: String,
    },
    /// Delete the Stream asset referenced by a record and clear the record
    Delete {
        /// Record (document) id
        #[arg(long)]
        document: String,
    },
    /// Print a stored record
    Show {
        /// Record (document) id
        #[arg(long)]
        document: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn open_store() -> anyhow::Result<Arc<LocalRecordStore>> {
    let dir = record_dir();
    let store = LocalRecordStore::new(&dir)
        .await
        .with_context(|| format!("Failed to open record store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

async fn build_orchestrator(document: &str) -> anyhow::Result<UploadOrchestrator> {
    let stream_config = StreamConfig::from_env()
        .context("Failed to load Cloudflare config. Set CF_ACCOUNT_ID and CF_STREAM_TOKEN")?;
    let upload_config = UploadConfig::from_env()?;

    let provider = Arc::new(StreamClient::new(stream_config, upload_config.http_timeout)?);
    let transport = Arc::new(TusTransport::new(&upload_config)?);
    let sink = RecordSink::new(open_store().await?, document);

    Ok(UploadOrchestrator::new(
        provider,
        transport,
        sink,
        upload_config,
    ))
}

async fn upload(file: PathBuf, document: String) -> anyhow::Result<()> {
    let file = UploadFile::from_path(&file)?;
    let orchestrator = build_orchestrator(&document).await?;

    let mut updates = orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let line = render_status(&updates.borrow_and_update());
            eprintln!("{}", line);
        }
    });

    let result = {
        let session = orchestrator.upload(file);
        tokio::pin!(session);
        tokio::select! {
            result = &mut session => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Cancelling upload...");
                orchestrator.cancel();
                session.await
            }
        }
    };

    // Dropping the orchestrator closes the status channel.
    drop(orchestrator);
    let _ = printer.await;

    match result? {
        UploadOutcome::Completed(value) => print_json(&record_summary(&document, &value)),
        UploadOutcome::Cancelled => {
            print_json(&serde_json::json!({ "document": document, "cancelled": true }))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload { file, document } => upload(file, document).await?,
        Commands::Status { uid } => {
            let client = StreamClient::from_env().context(
                "Failed to create Stream client. Set CF_ACCOUNT_ID and CF_STREAM_TOKEN",
            )?;
            let status = client.fetch_asset_status(&uid).await?;
            print_json(&serde_json::json!({
                "status": status,
                "summary": status.to_string(),
            }))?;
        }
        Commands::Delete { document } => {
            let orchestrator = build_orchestrator(&document).await?;
            orchestrator.delete_existing().await?;
            print_json(&serde_json::json!({
                "success": true,
                "message": format!("Stream asset for {} deleted", document)
            }))?;
        }
        Commands::Show { document } => {
            let store = open_store().await?;
            let sink = RecordSink::new(store, document.as_str());
            let value = sink.load().await?;
            print_json(&record_summary(&document, &value))?;
        }
    }

    Ok(())
}
