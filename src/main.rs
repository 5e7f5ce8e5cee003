use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image_caption_client::config::{DEFAULT_BIND, DEFAULT_ENDPOINT};
use image_caption_client::{web, CandidateFile, CaptionClient, ClientConfig, SessionHandle};

/// Upload an image to a captioning service and get its caption back.
#[derive(Parser, Debug)]
#[command(name = "image-caption-client")]
#[command(about = "🎨 Caption images through an external captioning service")]
struct Cli {
    /// Captioning endpoint that accepts a multipart `image` upload
    #[arg(long, env = "CAPTION_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Address the captioning page listens on
    #[arg(long, env = "CAPTION_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Give up on the captioning request after this many seconds (0 or unset waits forever)
    #[arg(long, env = "CAPTION_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, env = "CAPTION_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the captioning page (default)
    Serve,
    /// Caption one image file and print the result
    Caption {
        /// Image to caption
        path: PathBuf,

        /// Also write image-caption.txt into this directory
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = ClientConfig::new(&cli.endpoint, cli.bind, cli.timeout_secs, &cli.log)?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false)
        .init();

    let client = CaptionClient::new(&config).context("building HTTP client")?;
    let session = SessionHandle::new(client);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, session).await,
        Command::Caption { path, save } => caption_once(session, path, save).await,
    }
}

async fn serve(config: &ClientConfig, session: SessionHandle) -> Result<()> {
    let app = web::router(session);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    tracing::info!("🚀 Captioning page on http://{}", config.bind);
    tracing::info!("📸 Captions come from {}", config.endpoint);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving captioning page")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn caption_once(session: SessionHandle, path: PathBuf, save: Option<PathBuf>) -> Result<()> {
    let file = CandidateFile::from_path(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    session.select(file)?;

    if session.preview_ready().await.is_none() {
        bail!("image selection was dropped before its preview was ready");
    }
    session.generate().await;

    let view = session.view();
    if let Some(error) = view.error {
        bail!(error);
    }
    println!("{}", view.caption);

    if let (Some(dir), Some(export)) = (save, session.download()) {
        let written = export
            .save_in(&dir)
            .await
            .with_context(|| format!("writing caption into {}", dir.display()))?;
        tracing::info!("💾 caption saved to {}", written.display());
    }
    Ok(())
}
