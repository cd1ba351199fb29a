mod error;
mod routes;
mod state;

use lyriclip_core::{Collaborators, Config, CoreError, Generator, HistoryStore, LyricsSource};
use lyriclip_lyrics_lrclib::LrclibClient;
use lyriclip_media::{FfmpegRenderer, FfmpegTrimmer, FsRemover, YtDlp};
use state::AppState;
use std::fs::File;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    // Load config first so its logging toggle applies from the first message
    let loaded = Config::load_or_create();
    let file_logging_enabled = loaded.as_ref().is_ok_and(|c| c.logging.enabled);
    init_tracing(file_logging_enabled);

    let config = match loaded {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created config template at {}; starting with default settings",
                path.display()
            );
            Config::default()
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    if let Err(e) = runtime.block_on(serve(config, cancel_token)) {
        error!("Server error: {e}");
        std::process::exit(1);
    }

    info!("Shutdown complete");
}

async fn serve(config: Config, cancel_token: CancellationToken) -> Result<(), CoreError> {
    tokio::fs::create_dir_all(&config.storage.output_dir).await?;
    tokio::fs::create_dir_all(&config.storage.temp_dir).await?;

    let history = Arc::new(HistoryStore::open(&config.storage.history_db).await?);
    let lyrics: Arc<dyn LyricsSource> = Arc::new(LrclibClient::new(&config.lyrics)?);
    let ytdlp = Arc::new(YtDlp::new(&config.tools.yt_dlp, &config.storage.temp_dir));

    let collaborators = Collaborators {
        lyrics: Arc::clone(&lyrics),
        audio: ytdlp.clone(),
        trimmer: Arc::new(FfmpegTrimmer::new(&config.tools.ffmpeg)),
        renderer: Arc::new(FfmpegRenderer::new(&config.tools.ffmpeg, &config.render)),
        remover: Arc::new(FsRemover),
        history: history.clone(),
    };
    let generator = Arc::new(Generator::new(
        collaborators,
        &config.storage.output_dir,
        config.stage_timeouts(),
    ));
    info!(
        "Writing generated files to {}",
        generator.output_dir().display()
    );

    let state = AppState::new(
        generator,
        lyrics,
        ytdlp,
        config.server.max_concurrent_jobs,
        config.render_defaults(),
        cancel_token.clone(),
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await?;

    // Checkpoint WAL before exit
    if let Err(e) = history.checkpoint().await {
        warn!("Failed to checkpoint history database: {}", e);
    }
    Ok(())
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest_retry=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if file_logging_enabled {
        let log_path = lyriclip_core::paths::log_file_path();

        // Create config directory if needed
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
