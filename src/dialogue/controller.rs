//! The dialogue controller: owns the session state machine, accumulates
//! transcript fragments, decides when to flush to the completion backend,
//! and emits narration events.
//!
//! Entry points are plain method calls from the host's event sources
//! (speech recognition, command feed, focus arbiter, image capture). None of
//! them block on the network: flushes are debounced by a cancellable delayed
//! task and dispatched on spawned tasks. Rescheduling cancels only the
//! pending timer — an in-flight backend call is never cancelled; its result
//! is still applied when it completes, unless the context was cleared in the
//! interim (generation guard).

use crate::command::GlassCommand;
use crate::config::DialogueConfig;
use crate::dialogue::session::{FocusState, Mode, Session};
use crate::gateway::CompletionBackend;
use crate::glasses::{GlassesUi, ImageCapture, ImagePayload};
use crate::narration::NarrationEvent;
use crate::store::{MessageStore, Role};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrates one dialogue session per device.
pub struct DialogueController {
    config: DialogueConfig,
    session: Mutex<Session>,
    store: Arc<Mutex<MessageStore>>,
    backend: Arc<dyn CompletionBackend>,
    camera: Arc<dyn ImageCapture>,
    ui: Arc<dyn GlassesUi>,
    narration_tx: mpsc::Sender<NarrationEvent>,
    /// Pending debounce timer for the next flush. Replaced (and the old one
    /// cancelled) every time a new fragment reschedules.
    flush_timer: Mutex<Option<CancellationToken>>,
    /// Bounded wait for the image payload after a question command.
    capture_timer: Mutex<Option<CancellationToken>>,
}

impl DialogueController {
    /// Create a controller and install the configured system prompt into the
    /// message store.
    pub fn new(
        config: DialogueConfig,
        store: Arc<Mutex<MessageStore>>,
        backend: Arc<dyn CompletionBackend>,
        camera: Arc<dyn ImageCapture>,
        ui: Arc<dyn GlassesUi>,
        narration_tx: mpsc::Sender<NarrationEvent>,
    ) -> Arc<Self> {
        store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set_system_message(&config.system_prompt);

        Arc::new(Self {
            config,
            session: Mutex::new(Session::new()),
            store,
            backend,
            camera,
            ui,
            narration_tx,
            flush_timer: Mutex::new(None),
            capture_timer: Mutex::new(None),
        })
    }

    /// Current session mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.session().mode
    }

    /// Handle a named command from the command feed.
    pub fn on_command(self: &Arc<Self>, command: GlassCommand, triggered_at: DateTime<Utc>) {
        debug!(?command, %triggered_at, "command received");
        match command {
            GlassCommand::StartConversation => self.enter_mode(Mode::Conversation, command),
            GlassCommand::AskQuestion => {
                self.enter_mode(Mode::Question, command);
                self.camera.request_capture();
                self.start_capture_timer();
            }
            GlassCommand::Record => self.enter_mode(Mode::Record, command),
            GlassCommand::ClearContext => self.clear_context(),
        }
    }

    /// Handle a focus change from the external focus arbiter.
    ///
    /// Gaining focus starts a fresh scrolling session and clears the turn
    /// buffer. Losing focus cancels the pending flush, clears the turn
    /// buffer, and tears the session down to inactive. In-flight backend
    /// calls are unaffected.
    pub fn on_focus(self: &Arc<Self>, focus: FocusState) {
        self.ui.stop_scrolling();
        let title = {
            let mut session = self.session();
            session.focus = focus;
            match focus {
                FocusState::InFocus => {
                    session.reset_turn();
                    Some(session.scroll_title.clone())
                }
                FocusState::OutOfFocus => {
                    session.reset_turn();
                    session.mode = Mode::Inactive;
                    None
                }
            }
        };
        match title {
            Some(title) => self.ui.start_scrolling(&title),
            None => self.cancel_flush_timer(),
        }
        debug!(?focus, "focus changed");
    }

    /// Handle one transcript fragment from the speech-recognition feed.
    ///
    /// Interim fragments are ignored; final fragments drive all state
    /// transitions. A final fragment exactly matching a command trigger
    /// phrase was already consumed as a command and is discarded here.
    pub fn on_transcript(self: &Arc<Self>, text: &str, timestamp: DateTime<Utc>, is_final: bool) {
        if !self.session().accepts_transcripts() {
            return;
        }
        if !is_final {
            return;
        }
        if GlassCommand::is_command_phrase(text) {
            debug!(%text, "discarding fragment already consumed as a command");
            return;
        }
        debug!(%text, %timestamp, "final fragment");

        match self.mode() {
            Mode::Inactive => {}
            Mode::Record => self.handle_record_fragment(text),
            Mode::Conversation | Mode::Question => self.handle_turn_fragment(text),
        }
    }

    /// Handle the image payload delivered after a question command.
    ///
    /// The payload is combined with the fixed descriptive prompt, appended
    /// to the store as user messages, and sent through the same completion
    /// path tagged as a question. Question mode is one-shot: the session
    /// returns to inactive once the answer is delivered.
    pub fn on_image(self: &Arc<Self>, image: &ImagePayload) {
        self.cancel_capture_timer();

        let (mode, generation) = {
            let session = self.session();
            (session.mode, session.generation())
        };
        if mode != Mode::Question {
            // Late capture after a mode change is still answered as a question.
            warn!(?mode, "image payload arrived outside question mode");
        }
        info!(bytes = image.bytes.len(), "image payload received");

        let encoded = BASE64.encode(&image.bytes);
        let payload = format!(
            r#"{{ "type": "image_url", "image_url": {{ "url": "data:image/jpeg;base64,{encoded}", "detail": "high" }} }}"#
        );
        {
            let mut store = self.store();
            store.add_message(Role::User, &self.config.image_prompt);
            store.add_message(Role::User, payload);
        }

        self.spawn_completion(Mode::Question, generation, Some(self.config.image_prompt.clone()));
    }

    fn enter_mode(self: &Arc<Self>, mode: Mode, command: GlassCommand) {
        self.cancel_flush_timer();
        self.cancel_capture_timer();
        let mut session = self.session();
        session.mode = mode;
        session.scroll_title = command.scroll_title().to_owned();
        session.reset_turn();
    }

    /// Reset the message store context (keeping the system message) and
    /// return to inactive. A no-op when there is nothing to clear — no
    /// narration, no store mutation.
    fn clear_context(self: &Arc<Self>) {
        {
            let session = self.session();
            let nothing_buffered =
                session.turn_buffer_is_empty() && session.recording_word_count() == 0;
            if session.mode == Mode::Inactive && nothing_buffered && self.store().is_empty() {
                debug!("clear while inactive: no-op");
                return;
            }
        }

        self.cancel_flush_timer();
        self.cancel_capture_timer();
        self.store().clear_history();
        let mut session = self.session();
        session.reset_turn();
        let _ = session.take_recording_buffer();
        session.bump_generation();
        session.mode = Mode::Inactive;
        info!("context cleared");
    }

    /// Record mode: mirror the fragment to the display, accumulate it, and
    /// commit the buffer as one user message once the word count crosses the
    /// chunk threshold.
    fn handle_record_fragment(self: &Arc<Self>, text: &str) {
        self.ui.push_scrolling(text);
        let committed = {
            let mut session = self.session();
            session.push_recording(text);
            if session.recording_word_count() > self.config.record_chunk_words {
                Some(session.take_recording_buffer())
            } else {
                None
            }
        };
        if let Some(chunk) = committed {
            debug!(
                words = chunk.split_whitespace().count(),
                "committing recording chunk"
            );
            self.store().add_message(Role::User, chunk);
        }
    }

    /// Conversation/question mode: accumulate the fragment and debounce the
    /// flush (auto-send), or wait for the literal send phrase (manual).
    fn handle_turn_fragment(self: &Arc<Self>, text: &str) {
        let mut flush_now = false;
        let mut schedule = false;
        let first_of_turn = {
            let mut session = self.session();
            if self.config.auto_send {
                session.push_fragment(text);
                schedule = true;
            } else if text == self.config.send_phrase {
                flush_now = true;
            } else {
                session.push_fragment(text);
            }

            if session.user_turn_shown {
                false
            } else {
                session.user_turn_shown = true;
                true
            }
        };

        if first_of_turn {
            self.ui.push_scrolling(&format!("user: {text}"));
        }
        if schedule {
            self.schedule_flush();
        }
        if flush_now {
            self.dispatch_flush();
        }
    }

    /// Cancel any pending flush timer and arm a new one for one quiet
    /// period from now. Only the pending timer is replaced; a flush already
    /// dispatched keeps running.
    fn schedule_flush(self: &Arc<Self>) {
        let token = CancellationToken::new();
        let previous = self
            .flush_timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let quiet = Duration::from_secs(self.config.quiet_period_secs);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(quiet) => this.dispatch_flush(),
            }
        });
    }

    fn cancel_flush_timer(&self) {
        if let Some(token) = self
            .flush_timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            token.cancel();
        }
    }

    /// Take the turn buffer, record it as a user message, and dispatch the
    /// backend call. The buffer is cleared before the call completes so new
    /// fragments accumulate for the next turn. An empty buffer is a silent
    /// no-op.
    fn dispatch_flush(self: &Arc<Self>) {
        let (text, mode, generation) = {
            let mut session = self.session();
            if session.turn_buffer_is_empty() {
                return;
            }
            (
                session.take_turn_buffer(),
                session.mode,
                session.generation(),
            )
        };

        info!(chars = text.len(), ?mode, "flushing turn");
        self.store().add_message(Role::User, &text);

        let question = (mode == Mode::Question).then(|| text.clone());
        self.spawn_completion(mode, generation, question);
    }

    /// Run the backend call on its own task and apply the result. The call
    /// itself is never cancelled; staleness is decided by the generation
    /// captured at dispatch time.
    fn spawn_completion(self: &Arc<Self>, mode: Mode, generation: u64, question: Option<String>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let messages = this.store().all_messages();
            let result = this
                .backend
                .complete(&messages, this.config.max_reply_tokens)
                .await;

            if this.session().generation() != generation {
                info!("discarding completion result: context was cleared");
                return;
            }

            let event = match result {
                Ok(reply) => {
                    this.store().add_message(Role::Assistant, &reply);
                    let mut session = this.session();
                    session.user_turn_shown = false;
                    if mode == Mode::Question {
                        // One-shot semantics: question mode auto-terminates.
                        session.mode = Mode::Inactive;
                        drop(session);
                        NarrationEvent::Answer {
                            question: question.unwrap_or_default(),
                            text: reply,
                        }
                    } else {
                        drop(session);
                        NarrationEvent::Reply { text: reply }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "completion failed");
                    NarrationEvent::Error {
                        message: e.to_string(),
                    }
                }
            };
            this.emit(event).await;
        });
    }

    /// Arm the bounded wait for the image payload. Expiry surfaces as an
    /// error narration event and ends question mode.
    fn start_capture_timer(self: &Arc<Self>) {
        let token = CancellationToken::new();
        let previous = self
            .capture_timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let wait = Duration::from_secs(self.config.capture_timeout_secs);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(wait) => this.capture_timed_out().await,
            }
        });
    }

    fn cancel_capture_timer(&self) {
        if let Some(token) = self
            .capture_timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            token.cancel();
        }
    }

    async fn capture_timed_out(&self) {
        {
            let mut session = self.session();
            if session.mode != Mode::Question {
                return;
            }
            session.mode = Mode::Inactive;
        }
        warn!("image capture timed out");
        self.emit(NarrationEvent::Error {
            message: "image capture timed out".to_owned(),
        })
        .await;
    }

    async fn emit(&self, event: NarrationEvent) {
        if self.narration_tx.send(event).await.is_err() {
            warn!("narration channel closed; dropping event");
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(&self) -> MutexGuard<'_, MessageStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}
