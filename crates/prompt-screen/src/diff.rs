use prompt_core::content_eq;
use serde::Serialize;

use crate::payload::{ActionRow, AllowedMentions, Embed, MessageFlags, MessagePayload};

/// Change to one top-level payload field.
///
/// `Clear` is explicit: adaptors read a missing field as "leave unchanged",
/// so removing a field has to be spelled out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate<T> {
    Set(T),
    Clear,
}

impl<T> FieldUpdate<T> {
    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldUpdate::Set(value) => Some(value),
            FieldUpdate::Clear => None,
        }
    }
}

/// The fields that differ between two rendered payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<FieldUpdate<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<FieldUpdate<Vec<Embed>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<FieldUpdate<Vec<ActionRow>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<FieldUpdate<AllowedMentions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<MessageFlags>,
}

impl MessagePatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.embeds.is_none()
            && self.components.is_none()
            && self.allowed_mentions.is_none()
            && self.flags.is_none()
    }

    /// The payload an adaptor ends up with after editing `base` by this patch.
    pub fn apply(&self, base: &MessagePayload) -> MessagePayload {
        let mut next = base.clone();
        if let Some(update) = &self.content {
            next.content = update.as_set().cloned();
        }
        if let Some(update) = &self.embeds {
            next.embeds = update.as_set().cloned().unwrap_or_default();
        }
        if let Some(update) = &self.components {
            next.components = update.as_set().cloned().unwrap_or_default();
        }
        if let Some(update) = &self.allowed_mentions {
            next.allowed_mentions = update.as_set().cloned();
        }
        if let Some(flags) = self.flags {
            next.flags = flags;
        }
        next
    }
}

/// Compute the minimal patch turning `prev` into `next`.
///
/// Embeds are compared element by element in order; components, mention rules
/// and flags by content hash. Returns `None` when nothing differs.
pub fn diff(prev: &MessagePayload, next: &MessagePayload) -> Option<MessagePatch> {
    let patch = MessagePatch {
        content: optional_field(&prev.content, &next.content, |a, b| a == b),
        embeds: sequence_field(&prev.embeds, &next.embeds, |a, b| a == b),
        components: sequence_field(&prev.components, &next.components, |a, b| {
            content_eq(a, b)
        }),
        allowed_mentions: optional_field(&prev.allowed_mentions, &next.allowed_mentions, |a, b| {
            content_eq(a, b)
        }),
        flags: (!content_eq(&prev.flags, &next.flags)).then_some(next.flags),
    };
    if patch.is_empty() {
        None
    } else {
        Some(patch)
    }
}

fn optional_field<T: Clone>(
    prev: &Option<T>,
    next: &Option<T>,
    same: impl Fn(&T, &T) -> bool,
) -> Option<FieldUpdate<T>> {
    match (prev, next) {
        (None, None) => None,
        (Some(_), None) => Some(FieldUpdate::Clear),
        (Some(prev), Some(next)) if same(prev, next) => None,
        (_, Some(next)) => Some(FieldUpdate::Set(next.clone())),
    }
}

fn sequence_field<T: Clone>(
    prev: &[T],
    next: &[T],
    same: impl Fn(&[T], &[T]) -> bool,
) -> Option<FieldUpdate<Vec<T>>> {
    if same(prev, next) {
        None
    } else if next.is_empty() {
        Some(FieldUpdate::Clear)
    } else {
        Some(FieldUpdate::Set(next.to_vec()))
    }
}
