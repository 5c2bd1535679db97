//! Session state owned by the dialogue controller.
//!
//! One active session per device. External collaborators only send commands
//! and events into the controller; nothing outside the controller touches
//! these fields.

/// Session operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No active session; transcripts are ignored.
    #[default]
    Inactive,
    /// Multi-turn conversation with debounced flushes.
    Conversation,
    /// One-shot image question; auto-terminates after the answer.
    Question,
    /// Ambient recording into the context, chunk-committed.
    Record,
}

/// Interaction focus granted by the external focus arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    /// Transcripts are delivered and processed.
    InFocus,
    /// Transcripts are ignored; the session is torn down.
    #[default]
    OutOfFocus,
}

/// Mutable per-session state: mode, buffers, labels, and the generation
/// counter used to discard stale gateway results after a context reset.
#[derive(Debug, Default)]
pub struct Session {
    /// Current operating mode.
    pub mode: Mode,
    /// Current interaction focus.
    pub focus: FocusState,
    /// Title for the scrolling-text session started on focus gain.
    pub scroll_title: String,
    /// Whether the user-turn label was already shown for the current turn.
    pub user_turn_shown: bool,
    /// Ordered transcript fragments awaiting flush, space-joined.
    turn_buffer: String,
    /// Accumulated record-mode transcript pending chunked commit.
    recording_buffer: String,
    /// Bumped on context reset; flush results from older generations are
    /// discarded instead of applied.
    generation: u64,
}

impl Session {
    /// Create a fresh inactive session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether transcripts should be processed at all.
    #[must_use]
    pub fn accepts_transcripts(&self) -> bool {
        self.focus == FocusState::InFocus && self.mode != Mode::Inactive
    }

    /// Append a final fragment to the turn buffer, space-joined.
    pub fn push_fragment(&mut self, text: &str) {
        self.turn_buffer.push_str(text);
        self.turn_buffer.push(' ');
    }

    /// Take the turn buffer for flushing, leaving it empty so new fragments
    /// can accumulate concurrently for the next turn.
    pub fn take_turn_buffer(&mut self) -> String {
        std::mem::take(&mut self.turn_buffer)
    }

    /// Whether the turn buffer holds any text.
    #[must_use]
    pub fn turn_buffer_is_empty(&self) -> bool {
        self.turn_buffer.is_empty()
    }

    /// Discard any accumulated turn text and reset the turn label.
    pub fn reset_turn(&mut self) {
        self.turn_buffer.clear();
        self.user_turn_shown = false;
    }

    /// Append a final fragment to the recording buffer.
    pub fn push_recording(&mut self, text: &str) {
        self.recording_buffer.push_str(text);
        self.recording_buffer.push(' ');
    }

    /// Word count of the recording buffer.
    #[must_use]
    pub fn recording_word_count(&self) -> usize {
        self.recording_buffer.split_whitespace().count()
    }

    /// Take the recording buffer for a chunk commit, leaving it empty.
    pub fn take_recording_buffer(&mut self) -> String {
        std::mem::take(&mut self.recording_buffer)
    }

    /// Current generation; captured by in-flight flushes.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidate in-flight flush results (context reset).
    pub fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
