//! Narration playback: paces assistant text out to the glasses display and
//! hands the full text to speech.
//!
//! Events are drained strictly one at a time so two narration sequences never
//! interleave on the display. Playback runs off the interaction path and is
//! cancellable between groups.

use crate::config::NarrationConfig;
use crate::glasses::GlassesUi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// An outbound unit of assistant-produced text or an error. Ephemeral —
/// consumed once by the player, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationEvent {
    /// Assistant reply in conversation mode.
    Reply {
        /// Full reply text.
        text: String,
    },
    /// One-shot answer in question mode.
    Answer {
        /// The prompt the answer corresponds to.
        question: String,
        /// Full answer text.
        text: String,
    },
    /// A failure to surface to the user.
    Error {
        /// Failure description.
        message: String,
    },
}

/// Consumes narration events and streams them to the display and speech
/// outputs at a fixed pacing.
pub struct NarrationPlayer {
    config: NarrationConfig,
    ui: Arc<dyn GlassesUi>,
    cancel: CancellationToken,
}

impl NarrationPlayer {
    /// Spawn the playback loop on its own task.
    ///
    /// The loop exits when the channel closes or `cancel` fires; cancellation
    /// is also checked between displayed groups so an in-progress sequence
    /// halts promptly.
    pub fn spawn(
        config: NarrationConfig,
        ui: Arc<dyn GlassesUi>,
        mut rx: mpsc::Receiver<NarrationEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let player = Self { config, ui, cancel };
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = player.cancel.cancelled() => break,
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        player.play(event).await;
                    }
                }
            }
            debug!("narration player stopped");
        })
    }

    /// Play one event to completion (or cancellation).
    async fn play(&self, event: NarrationEvent) {
        match event {
            NarrationEvent::Reply { text } => self.play_paced(&text).await,
            NarrationEvent::Answer { question, text } => {
                info!(%question, "narrating answer");
                self.play_paced(&text).await;
            }
            NarrationEvent::Error { message } => {
                // Single card, no pacing, no speech.
                self.ui.send_reference_card("Error", &message);
            }
        }
    }

    /// Push the text in fixed-size word groups, label the first group, hold
    /// each group for the display duration, then speak the full text once.
    async fn play_paced(&self, text: &str) {
        let words: Vec<&str> = text.split_whitespace().collect();
        let group_size = self.config.group_words.max(1);
        let hold = Duration::from_millis(self.config.group_display_ms);

        let mut label_shown = false;
        for group in words.chunks(group_size) {
            if self.cancel.is_cancelled() {
                return;
            }

            let group_text = group.join(" ");
            if label_shown {
                self.ui.push_scrolling(&group_text);
            } else {
                self.ui
                    .push_scrolling(&format!("{} {group_text}", self.config.assistant_label));
                label_shown = true;
            }

            tokio::select! {
                () = self.cancel.cancelled() => return,
                () = tokio::time::sleep(hold) => {}
            }
        }

        self.ui.speak(text);
    }
}
