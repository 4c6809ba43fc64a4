#![doc = r"Hook store, scheduler and renderer for re-entrant message prompts."]
//!
//! A prompt is a plain function that renders a payload from hook state. The
//! [`Renderer`] calls it again whenever that state changes, batching bursts
//! of updates through the [`Scheduler`] into one render and one commit.

pub mod collections;
pub mod context;
pub mod effects;
pub mod hash;
pub mod keyed_collection;
pub mod memo;
pub mod mutable_state;
pub mod platform;
pub mod refs;
pub mod renderer;
pub mod scheduler;
pub mod slot_table;

pub use context::{current_store, use_context, with_current_store};
pub use effects::{
    use_effect, use_effect_always, use_observed_value, EffectResult, EffectScope, MarkChanged,
};
pub use hash::{content_eq, hash_one};
pub use keyed_collection::{use_keyed_collection, KeyedCollection};
pub use memo::use_memo;
pub use mutable_state::{use_reducer, use_state, MutableState, ReducerDispatch};
pub use platform::WorkScheduler;
pub use refs::{use_ref, RefHandle};
pub use renderer::{Committer, RenderPhase, Renderer};
pub use scheduler::{
    DefaultScheduler, Scheduler, SchedulerConfig, SchedulerError, TaskKind, DEFAULT_MAX_QUEUE_LEN,
};
pub use slot_table::{Cleanup, Dispatcher, HookError, HookStore, SlotKind, SlotShape};

pub use indexmap::IndexMap;

use std::fmt;
use std::sync::Arc;

/// Identity of a message created on the remote surface.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(Arc<str>);

impl MessageId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod scheduler_tests;
