use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use prompt_core::MessageId;
use prompt_screen::{
    Adaptor, AdaptorError, ChannelId, Interaction, InteractionHandler, InteractionRef,
    MessagePatch, MessagePayload, Subscription,
};

/// Broad family of an adaptor call, used to count and to inject failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    Send,
    Edit,
    Delete,
    Acknowledge,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AdaptorCall {
    SendMessage {
        channel: ChannelId,
        payload: MessagePayload,
    },
    EditMessage {
        channel: ChannelId,
        message_id: MessageId,
        patch: MessagePatch,
    },
    DeleteMessage {
        channel: ChannelId,
        message_id: MessageId,
    },
    SendInteractionResponse {
        interaction: InteractionRef,
        payload: MessagePayload,
    },
    EditInteractionResponse {
        interaction: InteractionRef,
        patch: MessagePatch,
    },
    DeleteInteractionResponse {
        interaction: InteractionRef,
    },
    SendFollowUp {
        interaction: InteractionRef,
        payload: MessagePayload,
    },
    EditFollowUp {
        interaction: InteractionRef,
        message_id: MessageId,
        patch: MessagePatch,
    },
    DeleteFollowUp {
        interaction: InteractionRef,
        message_id: MessageId,
    },
    Acknowledge {
        interaction: InteractionRef,
        custom_id: String,
    },
}

impl AdaptorCall {
    pub fn kind(&self) -> CallKind {
        match self {
            AdaptorCall::SendMessage { .. }
            | AdaptorCall::SendInteractionResponse { .. }
            | AdaptorCall::SendFollowUp { .. } => CallKind::Send,
            AdaptorCall::EditMessage { .. }
            | AdaptorCall::EditInteractionResponse { .. }
            | AdaptorCall::EditFollowUp { .. } => CallKind::Edit,
            AdaptorCall::DeleteMessage { .. }
            | AdaptorCall::DeleteInteractionResponse { .. }
            | AdaptorCall::DeleteFollowUp { .. } => CallKind::Delete,
            AdaptorCall::Acknowledge { .. } => CallKind::Acknowledge,
        }
    }

    pub fn patch(&self) -> Option<&MessagePatch> {
        match self {
            AdaptorCall::EditMessage { patch, .. }
            | AdaptorCall::EditInteractionResponse { patch, .. }
            | AdaptorCall::EditFollowUp { patch, .. } => Some(patch),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&MessagePayload> {
        match self {
            AdaptorCall::SendMessage { payload, .. }
            | AdaptorCall::SendInteractionResponse { payload, .. }
            | AdaptorCall::SendFollowUp { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

fn response_id(interaction: &InteractionRef) -> MessageId {
    MessageId::from(format!("response-{}", interaction.id))
}

type Handlers = Rc<RefCell<Vec<(u64, InteractionHandler)>>>;

/// In-memory [`Adaptor`] that records every call.
///
/// Message and follow-up sends return sequential ids (`message-1`,
/// `message-2`, ...), interaction responses `response-<interaction id>`; edits
/// return the id they were given. Failures can be injected per [`CallKind`].
#[derive(Default)]
pub struct RecordingAdaptor {
    calls: RefCell<Vec<AdaptorCall>>,
    next_message: Cell<u64>,
    failures: RefCell<HashMap<CallKind, usize>>,
    handlers: Handlers,
    next_subscription: Cell<u64>,
}

impl RecordingAdaptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AdaptorCall> {
        self.calls.borrow().clone()
    }

    pub fn take_calls(&self) -> Vec<AdaptorCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.kind() == kind)
            .count()
    }

    pub fn last_call(&self) -> Option<AdaptorCall> {
        self.calls.borrow().last().cloned()
    }

    /// Make the next `times` calls of `kind` fail with a transport error.
    pub fn fail_next(&self, kind: CallKind, times: usize) {
        *self.failures.borrow_mut().entry(kind).or_insert(0) += times;
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Deliver `interaction` to every current subscriber.
    pub fn emit(&self, interaction: Interaction) {
        let handlers: Vec<InteractionHandler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        if handlers.is_empty() {
            log::debug!("no subscriber for interaction {}", interaction.custom_id);
        }
        for handler in handlers {
            handler(interaction.clone());
        }
    }

    fn record(&self, call: AdaptorCall) -> Result<(), AdaptorError> {
        let kind = call.kind();
        self.calls.borrow_mut().push(call);
        let mut failures = self.failures.borrow_mut();
        match failures.get_mut(&kind) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(AdaptorError::Transport(format!("injected {kind:?} failure")))
            }
            _ => Ok(()),
        }
    }

    fn next_id(&self) -> MessageId {
        let next = self.next_message.get() + 1;
        self.next_message.set(next);
        MessageId::from(format!("message-{next}"))
    }
}

#[async_trait(?Send)]
impl Adaptor for RecordingAdaptor {
    async fn send_message(
        &self,
        channel: &ChannelId,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError> {
        self.record(AdaptorCall::SendMessage {
            channel: channel.clone(),
            payload: payload.clone(),
        })?;
        Ok(self.next_id())
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError> {
        self.record(AdaptorCall::EditMessage {
            channel: channel.clone(),
            message_id: message_id.clone(),
            patch: patch.clone(),
        })?;
        Ok(message_id.clone())
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), AdaptorError> {
        self.record(AdaptorCall::DeleteMessage {
            channel: channel.clone(),
            message_id: message_id.clone(),
        })
    }

    async fn send_interaction_response(
        &self,
        interaction: &InteractionRef,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError> {
        self.record(AdaptorCall::SendInteractionResponse {
            interaction: interaction.clone(),
            payload: payload.clone(),
        })?;
        Ok(response_id(interaction))
    }

    async fn edit_interaction_response(
        &self,
        interaction: &InteractionRef,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError> {
        self.record(AdaptorCall::EditInteractionResponse {
            interaction: interaction.clone(),
            patch: patch.clone(),
        })?;
        Ok(response_id(interaction))
    }

    async fn delete_interaction_response(
        &self,
        interaction: &InteractionRef,
    ) -> Result<(), AdaptorError> {
        self.record(AdaptorCall::DeleteInteractionResponse {
            interaction: interaction.clone(),
        })
    }

    async fn send_follow_up(
        &self,
        interaction: &InteractionRef,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError> {
        self.record(AdaptorCall::SendFollowUp {
            interaction: interaction.clone(),
            payload: payload.clone(),
        })?;
        Ok(self.next_id())
    }

    async fn edit_follow_up(
        &self,
        interaction: &InteractionRef,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError> {
        self.record(AdaptorCall::EditFollowUp {
            interaction: interaction.clone(),
            message_id: message_id.clone(),
            patch: patch.clone(),
        })?;
        Ok(message_id.clone())
    }

    async fn delete_follow_up(
        &self,
        interaction: &InteractionRef,
        message_id: &MessageId,
    ) -> Result<(), AdaptorError> {
        self.record(AdaptorCall::DeleteFollowUp {
            interaction: interaction.clone(),
            message_id: message_id.clone(),
        })
    }

    async fn acknowledge_interaction(&self, interaction: &Interaction) -> Result<(), AdaptorError> {
        self.record(AdaptorCall::Acknowledge {
            interaction: interaction.interaction.clone(),
            custom_id: interaction.custom_id.clone(),
        })
    }

    fn subscribe_interaction(&self, handler: InteractionHandler) -> Subscription {
        let id = self.next_subscription.get() + 1;
        self.next_subscription.set(id);
        self.handlers.borrow_mut().push((id, handler));
        let handlers = Rc::downgrade(&self.handlers);
        Subscription::new(move || {
            if let Some(handlers) = handlers.upgrade() {
                handlers.borrow_mut().retain(|(existing, _)| *existing != id);
            }
        })
    }
}
