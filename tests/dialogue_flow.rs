//! End-to-end dialogue controller scenarios with a mock backend and UI.
//!
//! Time-dependent behavior (quiet-period debounce, capture timeout, delayed
//! backend results) runs under tokio's paused clock so the tests are
//! deterministic and fast.

use async_trait::async_trait;
use chrono::Utc;
use glasschat::config::DialogueConfig;
use glasschat::{
    CompletionBackend, DialogueController, DialogueError, FocusState, GlassCommand, GlassesUi,
    ImageCapture, ImagePayload, Message, MessageStore, Mode, NarrationEvent, Role,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

struct MockBackend {
    /// Artificial completion latency (virtual time).
    delay: Duration,
    /// Scripted results, oldest first. Empty means "mock reply".
    script: Mutex<VecDeque<glasschat::Result<String>>>,
    /// Message histories captured per call.
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockBackend {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn script_result(&self, result: glasschat::Result<String>) {
        self.script.lock().unwrap().push_back(result);
    }

    fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, messages: &[Message], _max_tokens: u32) -> glasschat::Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok("mock reply".to_owned()),
        }
    }
}

#[derive(Default)]
struct RecordingUi {
    pushed: Mutex<Vec<String>>,
}

impl GlassesUi for RecordingUi {
    fn start_scrolling(&self, _title: &str) {}
    fn stop_scrolling(&self) {}
    fn push_scrolling(&self, text: &str) {
        self.pushed.lock().unwrap().push(text.to_owned());
    }
    fn send_reference_card(&self, _title: &str, _body: &str) {}
    fn speak(&self, _text: &str) {}
}

#[derive(Default)]
struct MockCamera {
    requests: Mutex<usize>,
}

impl ImageCapture for MockCamera {
    fn request_capture(&self) {
        *self.requests.lock().unwrap() += 1;
    }
}

struct Harness {
    controller: Arc<DialogueController>,
    backend: Arc<MockBackend>,
    store: Arc<Mutex<MessageStore>>,
    ui: Arc<RecordingUi>,
    camera: Arc<MockCamera>,
    rx: mpsc::Receiver<NarrationEvent>,
}

impl Harness {
    fn with(config: DialogueConfig, backend_delay: Duration) -> Self {
        let store = Arc::new(Mutex::new(MessageStore::new(config.context_token_budget)));
        let backend = Arc::new(MockBackend::new(backend_delay));
        let ui = Arc::new(RecordingUi::default());
        let camera = Arc::new(MockCamera::default());
        let (tx, rx) = mpsc::channel(16);

        let controller = DialogueController::new(
            config,
            Arc::clone(&store),
            backend.clone() as Arc<dyn CompletionBackend>,
            camera.clone() as Arc<dyn ImageCapture>,
            ui.clone() as Arc<dyn GlassesUi>,
            tx,
        );

        Self {
            controller,
            backend,
            store,
            ui,
            camera,
            rx,
        }
    }

    fn new() -> Self {
        Self::with(DialogueConfig::default(), Duration::ZERO)
    }

    fn start(&self, command: GlassCommand) {
        self.controller.on_command(command, Utc::now());
        self.controller.on_focus(FocusState::InFocus);
    }

    fn say(&self, text: &str) {
        self.controller.on_transcript(text, Utc::now(), true);
    }

    fn store_messages(&self) -> Vec<Message> {
        self.store.lock().unwrap().all_messages()
    }

    async fn next_event(&mut self) -> NarrationEvent {
        tokio::time::timeout(Duration::from_secs(600), self.rx.recv())
            .await
            .expect("timed out waiting for narration event")
            .expect("narration channel closed")
    }

    async fn assert_no_event(&mut self) {
        settle().await;
        assert!(self.rx.try_recv().is_err(), "unexpected narration event");
    }
}

/// Let spawned tasks run without advancing the clock.
async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

async fn advance(duration: Duration) {
    settle().await;
    tokio::time::advance(duration).await;
    settle().await;
}

// ── Conversation mode ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn quiet_period_flushes_accumulated_fragments() {
    let mut h = Harness::new();
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    h.say("there");
    advance(Duration::from_secs(8)).await;

    let event = h.next_event().await;
    assert_eq!(
        event,
        NarrationEvent::Reply {
            text: "mock reply".to_owned()
        }
    );

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent[1].role, Role::User);
    assert_eq!(sent[1].text, "hello there ");

    // Assistant reply is recorded after success.
    let stored = h.store_messages();
    assert_eq!(stored.last().unwrap().role, Role::Assistant);
    assert_eq!(stored.last().unwrap().text, "mock reply");
}

#[tokio::test(start_paused = true)]
async fn new_fragment_reschedules_the_flush() {
    let mut h = Harness::new();
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    advance(Duration::from_secs(4)).await;
    h.say("there");
    advance(Duration::from_secs(4)).await;

    // 8s since the first fragment but only 4s of quiet: no flush yet.
    assert!(h.backend.requests().is_empty());
    h.assert_no_event().await;

    advance(Duration::from_secs(4)).await;
    let _ = h.next_event().await;

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].last().unwrap().text, "hello there ");
}

#[tokio::test(start_paused = true)]
async fn user_turn_label_shown_once_per_turn() {
    let mut h = Harness::new();
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    h.say("there");
    assert_eq!(h.ui.pushed.lock().unwrap().clone(), vec!["user: hello"]);

    advance(Duration::from_secs(8)).await;
    let _ = h.next_event().await;

    // Label resets once the reply is emitted; the next turn labels again.
    h.say("next turn");
    assert_eq!(
        h.ui.pushed.lock().unwrap().clone(),
        vec!["user: hello", "user: next turn"]
    );
}

#[tokio::test(start_paused = true)]
async fn interim_fragments_are_ignored() {
    let mut h = Harness::new();
    h.start(GlassCommand::StartConversation);

    h.controller.on_transcript("partial gue", Utc::now(), false);
    h.say("full sentence");
    advance(Duration::from_secs(8)).await;
    let _ = h.next_event().await;

    let requests = h.backend.requests();
    assert_eq!(requests[0].last().unwrap().text, "full sentence ");
}

#[tokio::test(start_paused = true)]
async fn command_phrases_are_discarded_from_transcripts() {
    let mut h = Harness::new();
    h.start(GlassCommand::StartConversation);

    h.say("clear");
    advance(Duration::from_secs(10)).await;

    assert!(h.backend.requests().is_empty());
    h.assert_no_event().await;
}

#[tokio::test(start_paused = true)]
async fn manual_send_waits_for_the_send_phrase() {
    let config = DialogueConfig {
        auto_send: false,
        ..DialogueConfig::default()
    };
    let mut h = Harness::with(config, Duration::ZERO);
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    h.say("there");
    advance(Duration::from_secs(60)).await;
    assert!(h.backend.requests().is_empty());

    h.say("send message");
    let _ = h.next_event().await;

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].last().unwrap().text, "hello there ");
}

#[tokio::test(start_paused = true)]
async fn empty_flush_is_a_silent_no_op() {
    let config = DialogueConfig {
        auto_send: false,
        ..DialogueConfig::default()
    };
    let mut h = Harness::with(config, Duration::ZERO);
    h.start(GlassCommand::StartConversation);

    // Send phrase with nothing buffered.
    h.say("send message");
    h.assert_no_event().await;
    assert!(h.backend.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn focus_loss_cancels_pending_flush_and_deactivates() {
    let mut h = Harness::new();
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    h.controller.on_focus(FocusState::OutOfFocus);
    advance(Duration::from_secs(10)).await;

    assert!(h.backend.requests().is_empty());
    assert_eq!(h.controller.mode(), Mode::Inactive);
    h.assert_no_event().await;
}

// ── Failure handling ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn request_failure_surfaces_as_error_and_keeps_context() {
    let mut h = Harness::new();
    h.backend
        .script_result(Err(DialogueError::Request("backend returned 500".to_owned())));
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    advance(Duration::from_secs(8)).await;

    match h.next_event().await {
        NarrationEvent::Error { message } => assert!(message.contains("backend returned 500")),
        other => panic!("expected Error, got {other:?}"),
    }

    // Mode unchanged, user message retained, no assistant message.
    assert_eq!(h.controller.mode(), Mode::Conversation);
    let stored = h.store_messages();
    assert_eq!(stored.last().unwrap().role, Role::User);
    assert_eq!(stored.last().unwrap().text, "hello ");
}

#[tokio::test(start_paused = true)]
async fn missing_credential_surfaces_as_error() {
    let mut h = Harness::new();
    h.backend.script_result(Err(DialogueError::BackendUnavailable));
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    advance(Duration::from_secs(8)).await;

    assert!(matches!(h.next_event().await, NarrationEvent::Error { .. }));
    assert_eq!(h.controller.mode(), Mode::Conversation);
}

// ── Record mode ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn record_mode_commits_one_chunk_past_the_threshold() {
    let mut h = Harness::new();
    h.start(GlassCommand::Record);

    for i in 0..120 {
        h.say(&format!("w{i}"));
    }

    // One commit, triggered when the count first exceeded 100: the first
    // 101 words as a single user message.
    let stored = h.store_messages();
    assert_eq!(stored.len(), 2); // system + one chunk
    let chunk = &stored[1];
    assert_eq!(chunk.role, Role::User);
    let words: Vec<&str> = chunk.text.split_whitespace().collect();
    assert_eq!(words.len(), 101);
    assert_eq!(words[0], "w0");
    assert_eq!(words[100], "w100");

    // Every final fragment was mirrored to the display as it arrived.
    assert_eq!(h.ui.pushed.lock().unwrap().len(), 120);

    // No narration in record mode.
    h.assert_no_event().await;
}

#[tokio::test(start_paused = true)]
async fn record_chunks_concatenate_to_the_full_transcript() {
    let h = Harness::new();
    h.start(GlassCommand::Record);

    for i in 0..250 {
        h.say(&format!("w{i}"));
    }

    let stored = h.store_messages();
    let committed: Vec<String> = stored[1..]
        .iter()
        .flat_map(|m| m.text.split_whitespace().map(str::to_owned))
        .collect();
    let expected: Vec<String> = (0..committed.len()).map(|i| format!("w{i}")).collect();
    assert_eq!(committed, expected);
    for message in &stored[1..] {
        assert!(message.text.split_whitespace().count() > 100);
    }
}

// ── Question mode ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn question_command_requests_capture_and_answers_the_image() {
    let mut h = Harness::new();
    h.start(GlassCommand::AskQuestion);
    assert_eq!(*h.camera.requests.lock().unwrap(), 1);

    h.controller.on_image(&ImagePayload {
        bytes: vec![0xde, 0xad, 0xbe, 0xef],
    });

    let event = h.next_event().await;
    match event {
        NarrationEvent::Answer { question, text } => {
            assert_eq!(question, DialogueConfig::default().image_prompt);
            assert_eq!(text, "mock reply");
        }
        other => panic!("expected Answer, got {other:?}"),
    }

    // The prompt and the data-URL payload both went into the context.
    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    let texts: Vec<&str> = requests[0].iter().map(|m| m.text.as_str()).collect();
    assert!(texts.contains(&DialogueConfig::default().image_prompt.as_str()));
    assert!(texts.iter().any(|t| t.contains("data:image/jpeg;base64,")));

    // One-shot semantics.
    settle().await;
    assert_eq!(h.controller.mode(), Mode::Inactive);
}

#[tokio::test(start_paused = true)]
async fn spoken_question_flush_produces_an_answer() {
    let mut h = Harness::new();
    h.start(GlassCommand::AskQuestion);

    h.say("what is in front of me");
    advance(Duration::from_secs(8)).await;

    match h.next_event().await {
        NarrationEvent::Answer { question, text } => {
            assert_eq!(question, "what is in front of me ");
            assert_eq!(text, "mock reply");
        }
        other => panic!("expected Answer, got {other:?}"),
    }
    assert_eq!(h.controller.mode(), Mode::Inactive);
}

#[tokio::test(start_paused = true)]
async fn capture_timeout_surfaces_as_error_and_deactivates() {
    let mut h = Harness::new();
    h.start(GlassCommand::AskQuestion);

    advance(Duration::from_secs(31)).await;

    match h.next_event().await {
        NarrationEvent::Error { message } => assert!(message.contains("capture timed out")),
        other => panic!("expected Error, got {other:?}"),
    }
    assert_eq!(h.controller.mode(), Mode::Inactive);
    assert!(h.backend.requests().is_empty());
}

// ── Clear and staleness ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn clear_while_inactive_is_a_no_op() {
    let mut h = Harness::new();

    h.controller.on_command(GlassCommand::ClearContext, Utc::now());

    h.assert_no_event().await;
    let stored = h.store_messages();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, Role::System);
}

#[tokio::test(start_paused = true)]
async fn clear_resets_context_and_returns_to_inactive() {
    let mut h = Harness::new();
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    advance(Duration::from_secs(8)).await;
    let _ = h.next_event().await;
    assert!(h.store_messages().len() > 1);

    h.controller.on_command(GlassCommand::ClearContext, Utc::now());

    let stored = h.store_messages();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, Role::System);
    assert_eq!(h.controller.mode(), Mode::Inactive);
}

#[tokio::test(start_paused = true)]
async fn stale_result_after_clear_is_discarded() {
    // Backend takes 10 virtual seconds; clear lands while it is in flight.
    let mut h = Harness::with(DialogueConfig::default(), Duration::from_secs(10));
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    advance(Duration::from_secs(8)).await;
    assert_eq!(h.backend.requests().len(), 1);

    h.controller.on_command(GlassCommand::ClearContext, Utc::now());
    advance(Duration::from_secs(20)).await;

    // The late reply is neither stored nor narrated.
    h.assert_no_event().await;
    let stored = h.store_messages();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, Role::System);
}

#[tokio::test(start_paused = true)]
async fn mode_change_does_not_discard_an_in_flight_result() {
    let mut h = Harness::with(DialogueConfig::default(), Duration::from_secs(10));
    h.start(GlassCommand::StartConversation);

    h.say("hello");
    advance(Duration::from_secs(8)).await;
    assert_eq!(h.backend.requests().len(), 1);

    // Switch modes while the call is in flight; delivery is best-effort,
    // not discarded.
    h.controller.on_command(GlassCommand::Record, Utc::now());
    advance(Duration::from_secs(20)).await;

    assert_eq!(
        h.next_event().await,
        NarrationEvent::Reply {
            text: "mock reply".to_owned()
        }
    );
    assert_eq!(h.store_messages().last().unwrap().role, Role::Assistant);
}
