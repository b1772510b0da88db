mod replay;

use anyhow::{Context, Result};
use signlens_application::{SessionController, SessionParts, SignlensConfig};
use signlens_capture::EngineRegistry;
use signlens_classifier::{Classifier, PredictionClient};
use signlens_events::NullEventBus;
use signlens_storage::{BlobStore, Database, HistoryStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::replay::{Recording, ReplayCameraProvider, ReplayEngineInitializer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,signlens=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <config.json|-> <recording.json>", args[0]);
        eprintln!("\nExample:");
        eprintln!("  SIGNLENS_SERVER_URL=http://127.0.0.1:8000 {} - hello.json", args[0]);
        std::process::exit(1);
    }

    if let Err(e) = run(&args[1], Path::new(&args[2])).await {
        eprintln!("Replay failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config_arg: &str, recording_path: &Path) -> Result<()> {
    let config = if config_arg == "-" {
        SignlensConfig::default()
    } else {
        SignlensConfig::load(Path::new(config_arg))?
    }
    .with_env_overrides();

    let raw = std::fs::read_to_string(recording_path)
        .with_context(|| format!("Failed to read recording {}", recording_path.display()))?;
    let recording = Recording::from_json(&raw)
        .with_context(|| format!("Invalid recording {}", recording_path.display()))?;
    tracing::info!(
        frames = recording.frames.len(),
        fps = recording.fps,
        "loaded recording"
    );

    let store = open_store(&config)?;

    let classifier = PredictionClient::new(config.classifier_config()?)?;
    let classifier: Arc<dyn Classifier> = Arc::new(classifier);
    if let Some(health) = classifier.health().await {
        tracing::info!(
            status = %health.status,
            model_loaded = health.model_loaded,
            label_encoder_loaded = health.label_encoder_loaded,
            "classifier health"
        );
    }

    let cameras = Arc::new(ReplayCameraProvider::new(&recording));
    let finished = cameras.finished();
    let session_config = config.session_config()?;
    let settle = session_config.autosave_period + Duration::from_millis(250);

    let controller = SessionController::new(
        SessionParts {
            cameras,
            engines: EngineRegistry::new().with(Box::new(ReplayEngineInitializer::new(&recording))),
            classifier,
            history: Arc::new(HistoryStore::new(store)),
            events: Arc::new(NullEventBus),
        },
        session_config,
    );

    controller.start().await?;
    finished.notified().await;
    // One more auto-save tick so the last held letter is committed.
    tokio::time::sleep(settle).await;
    controller.stop().await;

    let stats = controller.stats();
    tracing::info!(
        received = stats.frames_received,
        dropped = stats.frames_dropped,
        hands = stats.hands_detected,
        predictions = stats.predictions_ok,
        "replay complete"
    );

    let history = controller.history().await;
    if history.is_empty() {
        println!("(no letters saved)");
    }
    for entry in &history {
        match entry.confidence {
            Some(confidence) => println!(
                "{}  {}  {:.2}",
                entry.timestamp.to_rfc3339(),
                entry.label,
                confidence
            ),
            None => println!("{}  {}", entry.timestamp.to_rfc3339(), entry.label),
        }
    }
    let word: String = history.iter().map(|e| e.label.as_str()).collect();
    println!("\n{word}");

    Ok(())
}

/// Open the history database at the configured path, or under the platform
/// data dir when none is set.
fn open_store(config: &SignlensConfig) -> Result<Arc<dyn BlobStore>> {
    let path = config.database_path();
    let db = Database::open(&path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(db))
}
