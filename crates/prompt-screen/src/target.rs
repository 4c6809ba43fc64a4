use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use prompt_core::MessageId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(Arc<str>);

impl ChannelId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Handle needed to answer an interaction: its id plus the callback token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InteractionRef {
    pub id: String,
    pub token: String,
}

impl InteractionRef {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
        }
    }
}

/// Where a screen's message lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// A plain channel message.
    Channel(ChannelId),
    /// The original response to an interaction.
    InteractionResponse(InteractionRef),
    /// A follow-up message attached to an interaction.
    FollowUp(InteractionRef),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Channel(channel) => write!(f, "channel {channel}"),
            Target::InteractionResponse(interaction) => {
                write!(f, "response to interaction {}", interaction.id)
            }
            Target::FollowUp(interaction) => {
                write!(f, "follow-up to interaction {}", interaction.id)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    Button,
    SelectMenu { values: Vec<String> },
    ModalSubmit { fields: IndexMap<String, String> },
}

/// An event delivered by the adaptor's interaction subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interaction {
    pub interaction: InteractionRef,
    /// The message whose component produced the event, when known.
    pub message_id: Option<MessageId>,
    pub custom_id: String,
    pub user_id: Option<String>,
    pub kind: InteractionKind,
}

impl Interaction {
    pub fn button(
        interaction: InteractionRef,
        message_id: MessageId,
        custom_id: impl Into<String>,
    ) -> Self {
        Self {
            interaction,
            message_id: Some(message_id),
            custom_id: custom_id.into(),
            user_id: None,
            kind: InteractionKind::Button,
        }
    }

    pub fn select(
        interaction: InteractionRef,
        message_id: MessageId,
        custom_id: impl Into<String>,
        values: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            interaction,
            message_id: Some(message_id),
            custom_id: custom_id.into(),
            user_id: None,
            kind: InteractionKind::SelectMenu {
                values: values.into_iter().collect(),
            },
        }
    }

    pub fn modal_submit(
        interaction: InteractionRef,
        message_id: Option<MessageId>,
        custom_id: impl Into<String>,
        fields: IndexMap<String, String>,
    ) -> Self {
        Self {
            interaction,
            message_id,
            custom_id: custom_id.into(),
            user_id: None,
            kind: InteractionKind::ModalSubmit { fields },
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Selected values for select menus, empty otherwise.
    pub fn values(&self) -> &[String] {
        match &self.kind {
            InteractionKind::SelectMenu { values } => values,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match &self.kind {
            InteractionKind::ModalSubmit { fields } => fields.get(name).map(String::as_str),
            _ => None,
        }
    }
}
