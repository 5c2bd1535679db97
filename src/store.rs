//! Conversation message history with a token-budget eviction policy.
//!
//! Stores the ordered message sequence used to build completion requests.
//! The system message is pinned first and never evicted; everything else is
//! evicted oldest-first once the estimated size exceeds the budget.

use std::collections::VecDeque;

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The pinned system prompt.
    System,
    /// User speech or recorded context.
    User,
    /// Assistant reply.
    Assistant,
}

impl Role {
    /// Wire name used by chat-completion APIs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message role.
    pub role: Role,
    /// Message text content.
    pub text: String,
}

/// Rough token-count proxy. Exactness does not matter, monotonic budget
/// enforcement does: a stable word count keeps eviction deterministic.
fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Ordered conversation history bounded by an estimated token budget.
#[derive(Debug, Clone)]
pub struct MessageStore {
    /// Pinned system message. Does not count toward the budget.
    system: Option<Message>,
    /// Non-system messages in insertion order (oldest first).
    messages: VecDeque<Message>,
    /// Maximum estimated token count for the non-system messages.
    token_budget: usize,
}

impl MessageStore {
    /// Create a store with the given estimated-token budget.
    #[must_use]
    pub fn new(token_budget: usize) -> Self {
        Self {
            system: None,
            messages: VecDeque::new(),
            token_budget,
        }
    }

    /// Replace (or insert as first) the system message.
    pub fn set_system_message(&mut self, text: impl Into<String>) {
        self.system = Some(Message {
            role: Role::System,
            text: text.into(),
        });
    }

    /// Append a message, then evict the oldest non-system messages until
    /// the estimated total is back under budget.
    ///
    /// Eviction is a private maintenance step, never reported to the caller.
    pub fn add_message(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push_back(Message {
            role,
            text: text.into(),
        });

        while self.estimated_size() > self.token_budget {
            let evicted = self.messages.pop_front();
            if let Some(evicted) = evicted {
                tracing::debug!(
                    words = estimate_tokens(&evicted.text),
                    "evicted oldest message to stay under context budget"
                );
            }
        }
    }

    /// The ordered sequence for building a completion request: system
    /// message first, then history. Cloned out; the store's own append path
    /// is the only mutation route.
    #[must_use]
    pub fn all_messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = &self.system {
            out.push(system.clone());
        }
        out.extend(self.messages.iter().cloned());
        out
    }

    /// Drop all non-system messages, keeping the system prompt.
    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    /// Estimated token count of the non-system messages.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        self.messages.iter().map(|m| estimate_tokens(&m.text)).sum()
    }

    /// Number of non-system messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store holds no non-system messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
