//! Message payloads and the diff-commit layer between a prompt and the remote
//! messaging surface.
//!
//! A [`Screen`] owns one message on one [`Target`]. Each rendered
//! [`MessagePayload`] is compared with the previous one through [`diff`], and
//! only the changed fields travel to the [`Adaptor`].

mod adaptor;
mod diff;
mod payload;
mod screen;
mod target;

pub use adaptor::{Adaptor, AdaptorError, InteractionHandler, Subscription};
pub use diff::{diff, FieldUpdate, MessagePatch};
pub use payload::{
    ActionRow, AllowedMentions, Button, ButtonStyle, Component, Embed, EmbedField, MentionKind,
    MessageFlags, MessagePayload, SelectMenu, SelectOption,
};
pub use screen::{ClosePolicy, CommitOutcome, Screen, ScreenCommitter};
pub use target::{ChannelId, Interaction, InteractionKind, InteractionRef, Target};

pub use prompt_core::MessageId;
