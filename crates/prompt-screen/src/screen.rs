use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use prompt_core::{Committer, MessageId};
use serde::{Deserialize, Serialize};

use crate::adaptor::{Adaptor, AdaptorError};
use crate::diff::{diff, MessagePatch};
use crate::payload::MessagePayload;
use crate::target::Target;

/// What `Screen::close` does with the message it owns.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Delete the message.
    DeleteMessage,
    /// Keep the content but strip every interactive component.
    #[default]
    DeleteComponents,
    /// Leave the message as it is.
    Keep,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// First successful send; the screen now has a message id.
    Created,
    /// An edit carrying a non-empty patch went through.
    Edited,
    /// Nothing differed from the last rendered payload; no call was made.
    Unchanged,
    /// The adaptor call failed or the screen is closed.
    NotUpdated,
}

impl CommitOutcome {
    pub fn is_updated(self) -> bool {
        !matches!(self, CommitOutcome::NotUpdated)
    }
}

/// Owner of one message on one target.
///
/// Tracks the last rendered payload and the message identity, and turns each
/// new payload into a send, an edit with a minimal patch, or nothing at all.
pub struct Screen {
    adaptor: Rc<dyn Adaptor>,
    target: Target,
    latest_payload: RefCell<Option<MessagePayload>>,
    message_id: RefCell<Option<MessageId>>,
    closed: Cell<bool>,
}

impl Screen {
    pub fn new(adaptor: Rc<dyn Adaptor>, target: Target) -> Self {
        Self {
            adaptor,
            target,
            latest_payload: RefCell::new(None),
            message_id: RefCell::new(None),
            closed: Cell::new(false),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn adaptor(&self) -> &Rc<dyn Adaptor> {
        &self.adaptor
    }

    /// Set once a send succeeded; cleared by a successful delete.
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id.borrow().clone()
    }

    pub fn latest_payload(&self) -> Option<MessagePayload> {
        self.latest_payload.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub async fn commit(&self, payload: MessagePayload) -> CommitOutcome {
        if self.closed.get() {
            log::debug!("commit to closed screen for {} ignored", self.target);
            return CommitOutcome::NotUpdated;
        }
        self.apply(payload).await
    }

    /// Run the close policy once. Later calls do nothing.
    ///
    /// Failures are logged; the screen counts as closed either way.
    pub async fn close(&self, policy: ClosePolicy) {
        if self.closed.replace(true) {
            return;
        }
        let Some(message_id) = self.message_id() else {
            log::debug!("closing {} before any message was sent", self.target);
            return;
        };
        match policy {
            ClosePolicy::Keep => {}
            ClosePolicy::DeleteComponents => {
                let cleared = self
                    .latest_payload
                    .borrow()
                    .as_ref()
                    .map(MessagePayload::without_components);
                if let Some(cleared) = cleared {
                    self.apply(cleared).await;
                }
            }
            ClosePolicy::DeleteMessage => match self.delete(&message_id).await {
                Ok(()) => {
                    self.message_id.borrow_mut().take();
                    self.latest_payload.borrow_mut().take();
                }
                Err(err) => {
                    log::error!("failed to delete message {message_id} on {}: {err}", self.target)
                }
            },
        }
    }

    async fn apply(&self, payload: MessagePayload) -> CommitOutcome {
        let Some(message_id) = self.message_id() else {
            return self.create(payload).await;
        };
        let patch = match self.latest_payload.borrow().as_ref() {
            Some(prev) => diff(prev, &payload),
            None => diff(&MessagePayload::default(), &payload),
        };
        let Some(patch) = patch else {
            log::trace!("payload for {} unchanged; skipping edit", self.target);
            *self.latest_payload.borrow_mut() = Some(payload);
            return CommitOutcome::Unchanged;
        };
        match self.edit(&message_id, &patch).await {
            Ok(edited) => {
                *self.message_id.borrow_mut() = Some(edited);
                *self.latest_payload.borrow_mut() = Some(payload);
                CommitOutcome::Edited
            }
            Err(err) => {
                log::error!("failed to edit message {message_id} on {}: {err}", self.target);
                CommitOutcome::NotUpdated
            }
        }
    }

    async fn create(&self, payload: MessagePayload) -> CommitOutcome {
        match self.send(&payload).await {
            Ok(message_id) => {
                log::debug!("created message {message_id} on {}", self.target);
                *self.message_id.borrow_mut() = Some(message_id);
                *self.latest_payload.borrow_mut() = Some(payload);
                CommitOutcome::Created
            }
            Err(err) => {
                log::error!("failed to send message to {}: {err}", self.target);
                CommitOutcome::NotUpdated
            }
        }
    }

    async fn send(&self, payload: &MessagePayload) -> Result<MessageId, AdaptorError> {
        match &self.target {
            Target::Channel(channel) => self.adaptor.send_message(channel, payload).await,
            Target::InteractionResponse(interaction) => {
                self.adaptor
                    .send_interaction_response(interaction, payload)
                    .await
            }
            Target::FollowUp(interaction) => {
                self.adaptor.send_follow_up(interaction, payload).await
            }
        }
    }

    async fn edit(
        &self,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError> {
        match &self.target {
            Target::Channel(channel) => {
                self.adaptor
                    .edit_message(channel, message_id, patch)
                    .await
            }
            Target::InteractionResponse(interaction) => {
                self.adaptor
                    .edit_interaction_response(interaction, patch)
                    .await
            }
            Target::FollowUp(interaction) => {
                self.adaptor
                    .edit_follow_up(interaction, message_id, patch)
                    .await
            }
        }
    }

    async fn delete(&self, message_id: &MessageId) -> Result<(), AdaptorError> {
        match &self.target {
            Target::Channel(channel) => self.adaptor.delete_message(channel, message_id).await,
            Target::InteractionResponse(interaction) => {
                self.adaptor.delete_interaction_response(interaction).await
            }
            Target::FollowUp(interaction) => {
                self.adaptor
                    .delete_follow_up(interaction, message_id)
                    .await
            }
        }
    }
}

/// [`Committer`] that applies rendered payloads through a shared [`Screen`].
///
/// Any outcome other than [`CommitOutcome::NotUpdated`] reports the screen's
/// message id, so queued effects run after unchanged commits too.
#[derive(Clone)]
pub struct ScreenCommitter {
    screen: Rc<Screen>,
}

impl ScreenCommitter {
    pub fn new(screen: Rc<Screen>) -> Self {
        Self { screen }
    }
}

impl Committer<MessagePayload> for ScreenCommitter {
    fn commit_with_effect(&self, payload: MessagePayload) -> LocalBoxFuture<'static, Option<MessageId>> {
        let screen = Rc::clone(&self.screen);
        async move {
            if screen.commit(payload).await.is_updated() {
                screen.message_id()
            } else {
                None
            }
        }
        .boxed_local()
    }
}
