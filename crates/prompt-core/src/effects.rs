use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::context::with_current_store;
use crate::refs::RefHandle;
use crate::slot_table::{Cleanup, HookError, HookStore, SlotKind};
use crate::MessageId;

type EffectFn = Box<dyn FnOnce(EffectScope) -> EffectResult>;

/// Per-slot effect bookkeeping: last deps, the callback waiting for the next
/// successful commit, and the cleanup returned by the last run.
#[derive(Default)]
pub(crate) struct EffectState {
    deps: RefCell<Option<Box<dyn Any>>>,
    pending: RefCell<Option<EffectFn>>,
    queued: Cell<bool>,
    cleanup: RefCell<Option<Cleanup>>,
}

impl EffectState {
    fn deps_changed<D: PartialEq + 'static>(&self, deps: &D) -> bool {
        match self.deps.borrow().as_ref() {
            Some(previous) => previous
                .downcast_ref::<D>()
                .map_or(true, |previous| previous != deps),
            None => true,
        }
    }

    fn set_deps<D: 'static>(&self, deps: D) {
        *self.deps.borrow_mut() = Some(Box::new(deps));
    }

    fn set_pending(&self, effect: EffectFn) {
        *self.pending.borrow_mut() = Some(effect);
    }

    /// Returns whether the effect was already queued.
    pub(crate) fn mark_queued(&self) -> bool {
        self.queued.replace(true)
    }

    pub(crate) fn take_cleanup(&self) -> Option<Cleanup> {
        self.cleanup.borrow_mut().take()
    }

    pub(crate) fn run(&self, message_id: &MessageId) {
        self.queued.set(false);
        let effect = self.pending.borrow_mut().take();
        if let Some(effect) = effect {
            let result = effect(EffectScope {
                message_id: message_id.clone(),
            });
            *self.cleanup.borrow_mut() = result.into_cleanup();
        }
    }
}

/// Passed to effect callbacks once the render that queued them has been committed.
#[derive(Clone, Debug)]
pub struct EffectScope {
    message_id: MessageId,
}

impl EffectScope {
    /// Identity of the message the commit created or edited.
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) -> EffectResult {
        EffectResult::new(cleanup)
    }
}

#[derive(Default)]
pub struct EffectResult {
    cleanup: Option<Cleanup>,
}

impl EffectResult {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    fn into_cleanup(self) -> Option<Cleanup> {
        self.cleanup
    }
}

impl HookStore {
    pub fn use_effect<D, F>(&self, deps: D, effect: F) -> Result<(), HookError>
    where
        D: PartialEq + 'static,
        F: FnOnce(EffectScope) -> EffectResult + 'static,
    {
        let state = self.slot(SlotKind::Effect, EffectState::default)?;
        if state.deps_changed(&deps) {
            state.set_deps(deps);
            state.set_pending(Box::new(effect));
            self.queue_mount_effect(state);
        }
        Ok(())
    }

    pub fn use_effect_always<F>(&self, effect: F) -> Result<(), HookError>
    where
        F: FnOnce(EffectScope) -> EffectResult + 'static,
    {
        let state = self.slot(SlotKind::Effect, EffectState::default)?;
        state.set_pending(Box::new(effect));
        self.queue_mount_effect(state);
        Ok(())
    }
}

/// Run `effect` after the next successful commit whenever `deps` changed.
///
/// `()` as deps runs the effect once, after the first commit.
pub fn use_effect<D, F>(deps: D, effect: F)
where
    D: PartialEq + 'static,
    F: FnOnce(EffectScope) -> EffectResult + 'static,
{
    with_current_store(|store| store.use_effect(deps, effect))
}

/// Run `effect` after the commit of every render.
pub fn use_effect_always<F>(effect: F)
where
    F: FnOnce(EffectScope) -> EffectResult + 'static,
{
    with_current_store(|store| store.use_effect_always(effect))
}

/// Flags that the observed value changed; see [`use_observed_value`].
#[derive(Clone)]
pub struct MarkChanged {
    flag: RefHandle<bool>,
}

impl MarkChanged {
    pub fn mark_changed(&self) {
        self.flag.set_current(true);
    }

    pub fn is_marked(&self) -> bool {
        self.flag.current()
    }
}

impl HookStore {
    pub fn use_observed_value<T, F>(&self, value: T, on_changed: F) -> Result<MarkChanged, HookError>
    where
        T: 'static,
        F: FnOnce(T) + 'static,
    {
        let flag = self.use_ref(|| false)?;
        let marked = flag.current();
        let effect_flag = flag.clone();
        self.use_effect_always(move |_| {
            if marked && effect_flag.replace(false) {
                on_changed(value);
            }
            EffectResult::default()
        })?;
        Ok(MarkChanged { flag })
    }
}

/// Notify `on_changed` once, after the first commit following `mark_changed()`.
pub fn use_observed_value<T, F>(value: T, on_changed: F) -> MarkChanged
where
    T: 'static,
    F: FnOnce(T) + 'static,
{
    with_current_store(|store| store.use_observed_value(value, on_changed))
}
