use anyhow::{Context, Result};
use clap::Parser;
use docqa::{
    api::{self, UploadSettings},
    config, logging,
    extract::SourceKind,
    processing::{Pipeline, ProcessingApi, ProcessingService},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Question answering over uploaded PDFs, text files and images"
)]
struct Cli {
    /// Port to listen on; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Directory receiving uploads; overrides `UPLOAD_DIR`.
    #[arg(long)]
    upload_dir: Option<PathBuf>,
    /// Ingest every supported file under this directory at startup.
    #[arg(long, value_name = "DIR")]
    preload: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let mut uploads = UploadSettings::from_config(config);
    if let Some(dir) = cli.upload_dir {
        uploads.dir = dir;
    }
    reset_upload_dir(&uploads.dir).await?;

    let service = ProcessingService::new(config)
        .await
        .context("Failed to start processing service")?;
    let pipeline = Arc::new(Pipeline::start(
        Arc::new(service),
        config.job_queue_capacity,
    ));

    if let Some(dir) = cli.preload {
        preload(pipeline.as_ref(), &dir, &uploads.dir).await?;
    }

    let app = api::create_router(pipeline, uploads);
    let (listener, port) = bind_listener(cli.port.or(config.server_port))
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Start every run from an empty upload directory.
async fn reset_upload_dir(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to clear {}", dir.display()));
        }
    }
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))
}

/// Copy supported files from `source` into the upload directory and queue them as one job.
async fn preload(pipeline: &Pipeline, source: &Path, upload_dir: &Path) -> Result<()> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        if !entry.file_type().is_file() || SourceKind::from_path(entry.path()).is_none() {
            continue;
        }
        let Some(name) = entry.path().file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(name) = api::sanitize_file_name(name) else {
            continue;
        };
        let target = upload_dir.join(&name);
        tokio::fs::copy(entry.path(), &target)
            .await
            .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        if !paths.contains(&target) {
            paths.push(target);
        }
    }

    if paths.is_empty() {
        tracing::warn!(dir = %source.display(), "No supported files to preload");
        return Ok(());
    }
    let files = paths.len();
    let job_id = pipeline.submit(paths).context("Failed to queue preload job")?;
    tracing::info!(%job_id, files, "Preload queued");
    Ok(())
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
