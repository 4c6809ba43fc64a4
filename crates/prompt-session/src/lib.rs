//! Orchestration of one prompt instance against a messaging surface.
//!
//! [`PromptSession::mount`] wires a prompt function to a [`Screen`](prompt_screen::Screen)
//! through a [`Renderer`](prompt_core::Renderer), routes component interactions
//! back into the prompt's handlers, and closes the message according to a
//! [`ClosePolicy`] when the user, the lifetime timer or the idle timer ends it.

mod config;
mod interaction;
mod session;

pub use config::{ConfigError, SessionConfig};
pub use interaction::{use_interaction, InteractionRouter};
pub use session::{CloseReason, PromptSession};

pub use prompt_screen::ClosePolicy;
