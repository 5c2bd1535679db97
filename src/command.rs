//! Voice command detection for session control.
//!
//! Commands are bound to fixed trigger phrases spoken by the user. A final
//! transcript fragment that exactly matches a trigger phrase has already been
//! consumed as a command and is discarded by the transcript path.
//!
//! # Supported Commands
//!
//! | Phrase | Command |
//! |--------------|----------------------|
//! | "conversation" | `StartConversation` |
//! | "question" | `AskQuestion` |
//! | "listen" | `Record` |
//! | "clear" | `ClearContext` |

/// A session control command detected from user speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlassCommand {
    /// Start (or restart) a conversation session.
    StartConversation,
    /// Ask a one-shot question about the current camera view.
    AskQuestion,
    /// Record ambient conversation into the context for later questions.
    Record,
    /// Clear the conversation context, keeping only the system prompt.
    ClearContext,
}

impl GlassCommand {
    /// All commands with their trigger phrases.
    const TRIGGERS: [(&'static str, Self); 4] = [
        ("conversation", Self::StartConversation),
        ("question", Self::AskQuestion),
        ("listen", Self::Record),
        ("clear", Self::ClearContext),
    ];

    /// Look up the command bound to a trigger phrase, if any.
    #[must_use]
    pub fn from_phrase(phrase: &str) -> Option<Self> {
        let phrase = phrase.trim();
        Self::TRIGGERS
            .iter()
            .find(|(trigger, _)| phrase.eq_ignore_ascii_case(trigger))
            .map(|(_, command)| *command)
    }

    /// Whether a final fragment exactly matches a known trigger phrase.
    #[must_use]
    pub fn is_command_phrase(phrase: &str) -> bool {
        Self::from_phrase(phrase).is_some()
    }

    /// Title shown on the scrolling-text display while this command's
    /// session mode is active.
    #[must_use]
    pub fn scroll_title(self) -> &'static str {
        match self {
            Self::StartConversation => "Conversation",
            Self::AskQuestion => "Question",
            Self::Record => "Listening",
            Self::ClearContext => "",
        }
    }
}
