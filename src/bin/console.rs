//! Console harness for the dialogue core.
//!
//! Reads lines from stdin and feeds them through the same entry points a
//! glasses host would use: slash commands map to the command/focus/image
//! feeds, every other line is delivered as a final transcript fragment.
//! Display and speech output are printed to stdout; tracing goes to stderr.

use chrono::Utc;
use glasschat::{
    AssistConfig, ApiGateway, DialogueController, FocusState, GlassCommand, GlassesUi,
    ImageCapture, ImagePayload, MessageStore, NarrationPlayer,
};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Prints display and speech output to stdout.
struct ConsoleUi;

impl GlassesUi for ConsoleUi {
    fn start_scrolling(&self, title: &str) {
        println!("== scroll start: {title} ==");
    }
    fn stop_scrolling(&self) {
        println!("== scroll stop ==");
    }
    fn push_scrolling(&self, text: &str) {
        println!("[scroll] {text}");
    }
    fn send_reference_card(&self, title: &str, body: &str) {
        println!("[card] {title}: {body}");
    }
    fn speak(&self, text: &str) {
        println!("[speak] {text}");
    }
}

/// Capture requests are satisfied manually via `/image <path>`.
struct ManualCapture;

impl ImageCapture for ManualCapture {
    fn request_capture(&self) {
        println!("(capture requested — provide it with /image <path>)");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = AssistConfig::default_config_path();
    let config = if config_path.exists() {
        AssistConfig::from_file(&config_path)?
    } else {
        tracing::info!("no config at {}; using defaults", config_path.display());
        AssistConfig::default()
    };

    let store = Arc::new(Mutex::new(MessageStore::new(
        config.dialogue.context_token_budget,
    )));
    let backend = Arc::new(ApiGateway::new(&config.gateway)?);
    let ui: Arc<dyn GlassesUi> = Arc::new(ConsoleUi);

    let (narration_tx, narration_rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();
    let player = NarrationPlayer::spawn(
        config.narration.clone(),
        Arc::clone(&ui),
        narration_rx,
        shutdown.clone(),
    );

    let controller = DialogueController::new(
        config.dialogue.clone(),
        store,
        backend,
        Arc::new(ManualCapture),
        ui,
        narration_tx,
    );

    println!("commands: /conversation /question /listen /clear /blur /image <path> /quit");
    println!("anything else is delivered as a final transcript fragment");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_owned();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line.as_str(), ""), |(a, b)| (a, b)) {
            ("/quit", _) => break,
            ("/conversation", _) => {
                controller.on_command(GlassCommand::StartConversation, Utc::now());
                controller.on_focus(FocusState::InFocus);
            }
            ("/question", _) => {
                controller.on_command(GlassCommand::AskQuestion, Utc::now());
                controller.on_focus(FocusState::InFocus);
            }
            ("/listen", _) => {
                controller.on_command(GlassCommand::Record, Utc::now());
                controller.on_focus(FocusState::InFocus);
            }
            ("/clear", _) => controller.on_command(GlassCommand::ClearContext, Utc::now()),
            ("/blur", _) => controller.on_focus(FocusState::OutOfFocus),
            ("/image", path) => match std::fs::read(path.trim()) {
                Ok(bytes) => controller.on_image(&ImagePayload { bytes }),
                Err(e) => eprintln!("cannot read {path}: {e}"),
            },
            _ => controller.on_transcript(&line, Utc::now(), true),
        }
    }

    shutdown.cancel();
    let _ = player.await;
    Ok(())
}
