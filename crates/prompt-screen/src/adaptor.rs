use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use prompt_core::MessageId;
use thiserror::Error;

use crate::diff::MessagePatch;
use crate::payload::MessagePayload;
use crate::target::{ChannelId, Interaction, InteractionRef};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdaptorError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("message or interaction not found")]
    NotFound,
    #[error("rate limited; retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("request rejected: {0}")]
    Rejected(String),
}

pub type InteractionHandler = Rc<dyn Fn(Interaction)>;

/// Message and interaction I/O against the remote surface.
///
/// Every call may fail independently; callers log and absorb failures.
/// Implementations are driven from a single thread, so futures need not be
/// `Send`.
#[async_trait(?Send)]
pub trait Adaptor {
    async fn send_message(
        &self,
        channel: &ChannelId,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError>;

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError>;

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), AdaptorError>;

    async fn send_interaction_response(
        &self,
        interaction: &InteractionRef,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError>;

    async fn edit_interaction_response(
        &self,
        interaction: &InteractionRef,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError>;

    async fn delete_interaction_response(
        &self,
        interaction: &InteractionRef,
    ) -> Result<(), AdaptorError>;

    async fn send_follow_up(
        &self,
        interaction: &InteractionRef,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError>;

    async fn edit_follow_up(
        &self,
        interaction: &InteractionRef,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError>;

    async fn delete_follow_up(
        &self,
        interaction: &InteractionRef,
        message_id: &MessageId,
    ) -> Result<(), AdaptorError>;

    /// Tell the remote side the interaction was received; the visible
    /// update follows through the regular edit path.
    async fn acknowledge_interaction(&self, interaction: &Interaction) -> Result<(), AdaptorError>;

    fn subscribe_interaction(&self, handler: InteractionHandler) -> Subscription;
}

/// Keeps an interaction handler registered until dropped or unsubscribed.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { unsubscribe: None }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
