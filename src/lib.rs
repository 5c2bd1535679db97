//! Glasschat: voice-driven dialogue core for smart-glasses assistants.
//!
//! Transcript fragments stream in from a speech-recognition feed; the
//! dialogue controller buffers and debounces them into request-sized turns,
//! dispatches them to a chat-completion backend, and serializes the
//! resulting narration back out over a rate-limited display/speech channel.
//!
//! # Architecture
//!
//! The core is built from small components wired by method calls and one
//! internal channel:
//! - **Message store**: ordered conversation history with a token-budget
//!   eviction policy
//! - **Completion gateway**: one request/response call to an
//!   OpenAI-compatible backend
//! - **Dialogue controller**: the session mode state machine, fragment
//!   accumulation, and flush timing
//! - **Narration player**: paces assistant text to the display in word
//!   groups, then hands it to speech
//!
//! Audio capture, BLE, cameras, text-to-speech, and display rendering are
//! external collaborators behind the narrow traits in [`glasses`].

pub mod command;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod gateway;
pub mod glasses;
pub mod narration;
pub mod store;

pub use command::GlassCommand;
pub use config::AssistConfig;
pub use dialogue::{DialogueController, FocusState, Mode};
pub use error::{DialogueError, Result};
pub use gateway::{ApiGateway, CompletionBackend};
pub use glasses::{GlassesUi, ImageCapture, ImagePayload};
pub use narration::{NarrationEvent, NarrationPlayer};
pub use store::{Message, MessageStore, Role};
