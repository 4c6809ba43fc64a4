use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::collections::map::HashMap;
use crate::context;
use crate::effects::EffectState;
use crate::MessageId;

/// Callback run once when an effect is superseded or the store is torn down.
pub type Cleanup = Box<dyn FnOnce()>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotKind {
    State,
    Ref,
    Memo,
    Effect,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotKind::State => "state",
            SlotKind::Ref => "ref",
            SlotKind::Memo => "memo",
            SlotKind::Effect => "effect",
        };
        f.write_str(name)
    }
}

/// What a render found (or expected) at a given slot position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotShape {
    Hook {
        kind: SlotKind,
        type_name: &'static str,
    },
    End,
}

impl fmt::Display for SlotShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotShape::Hook { kind, type_name } => write!(f, "{kind} hook<{type_name}>"),
            SlotShape::End => f.write_str("end of render"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("no active render context: hooks can only run while a prompt renders")]
    NoActiveContext,
    #[error("hook store is already rendering; nested renders are not allowed")]
    AlreadyRendering,
    #[error("hook order violation at slot {index}: expected {expected}, found {found}")]
    HookOrderViolation {
        index: usize,
        expected: SlotShape,
        found: SlotShape,
    },
    #[error("hook store has been closed")]
    StoreClosed,
}

struct Slot {
    kind: SlotKind,
    type_name: &'static str,
    value: Rc<dyn Any>,
}

impl Slot {
    fn shape(&self) -> SlotShape {
        SlotShape::Hook {
            kind: self.kind,
            type_name: self.type_name,
        }
    }
}

pub(crate) struct StoreInner {
    slots: RefCell<Vec<Slot>>,
    cursor: Cell<usize>,
    established: Cell<bool>,
    rendering: Cell<bool>,
    closed: Cell<bool>,
    mount_effects: RefCell<Vec<Rc<EffectState>>>,
    cleanups: RefCell<Vec<Cleanup>>,
    dispatch: RefCell<Option<Rc<dyn Fn()>>>,
    provided: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

/// Ordered, positional hook storage for one prompt instance.
///
/// The Nth hook call of a render owns slot N. Once a render has completed the
/// slot layout is fixed: later renders must call the same hooks in the same
/// order, otherwise [`HookError::HookOrderViolation`] is raised.
#[derive(Clone)]
pub struct HookStore {
    inner: Rc<StoreInner>,
}

impl Default for HookStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HookStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                slots: RefCell::new(Vec::new()),
                cursor: Cell::new(0),
                established: Cell::new(false),
                rendering: Cell::new(false),
                closed: Cell::new(false),
                mount_effects: RefCell::new(Vec::new()),
                cleanups: RefCell::new(Vec::new()),
                dispatch: RefCell::new(None),
                provided: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn ptr_eq(&self, other: &HookStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Install the callback state setters use to request a new render.
    pub fn set_dispatch(&self, dispatch: impl Fn() + 'static) {
        *self.inner.dispatch.borrow_mut() = Some(Rc::new(dispatch));
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher(Rc::downgrade(&self.inner))
    }

    /// Make `value` readable through [`use_context`](crate::use_context) during renders.
    pub fn provide<T: 'static>(&self, value: Rc<T>) {
        self.inner
            .provided
            .borrow_mut()
            .insert(TypeId::of::<T>(), value as Rc<dyn Any>);
    }

    pub fn context<T: 'static>(&self) -> Option<Rc<T>> {
        let value = self.inner.provided.borrow().get(&TypeId::of::<T>()).cloned()?;
        value.downcast::<T>().ok()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub fn is_rendering(&self) -> bool {
        self.inner.rendering.get()
    }

    pub fn slot_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    pub fn pending_effect_count(&self) -> usize {
        self.inner.mount_effects.borrow().len()
    }

    /// Reset the cursor and bind this store as the current render context.
    pub fn start_render(&self) -> Result<(), HookError> {
        if self.inner.closed.get() {
            return Err(HookError::StoreClosed);
        }
        if self.inner.rendering.replace(true) {
            return Err(HookError::AlreadyRendering);
        }
        self.inner.cursor.set(0);
        context::bind(self);
        Ok(())
    }

    /// Unbind the store and verify the render used every recorded slot.
    pub fn end_render(&self) -> Result<(), HookError> {
        if !self.inner.rendering.replace(false) {
            return Err(HookError::NoActiveContext);
        }
        context::unbind(self);
        let used = self.inner.cursor.get();
        let slots = self.inner.slots.borrow();
        if self.inner.established.get() && used < slots.len() {
            return Err(HookError::HookOrderViolation {
                index: used,
                expected: slots[used].shape(),
                found: SlotShape::End,
            });
        }
        self.inner.established.set(true);
        Ok(())
    }

    /// Run `content` as one render pass.
    pub fn render<R>(&self, content: impl FnOnce() -> R) -> Result<R, HookError> {
        self.start_render()?;
        struct Guard<'a>(&'a HookStore);
        impl Drop for Guard<'_> {
            fn drop(&mut self) {
                if self.0.inner.rendering.replace(false) {
                    context::unbind(self.0);
                }
            }
        }
        let guard = Guard(self);
        let result = content();
        std::mem::forget(guard);
        self.end_render()?;
        Ok(result)
    }

    pub fn take_index(&self) -> usize {
        let index = self.inner.cursor.get();
        self.inner.cursor.set(index + 1);
        index
    }

    /// Compare the hook requested at `index` with what earlier renders recorded there.
    pub fn assert_slot_kind(
        &self,
        index: usize,
        kind: SlotKind,
        type_name: &'static str,
    ) -> Result<(), HookError> {
        let found = SlotShape::Hook { kind, type_name };
        let slots = self.inner.slots.borrow();
        match slots.get(index) {
            Some(slot) if slot.kind == kind && slot.type_name == type_name => Ok(()),
            Some(slot) => Err(HookError::HookOrderViolation {
                index,
                expected: slot.shape(),
                found,
            }),
            None if self.inner.established.get() => Err(HookError::HookOrderViolation {
                index,
                expected: SlotShape::End,
                found,
            }),
            None => Ok(()),
        }
    }

    /// Claim the next slot, creating it with `init` on the first render.
    pub(crate) fn slot<T: 'static>(
        &self,
        kind: SlotKind,
        init: impl FnOnce() -> T,
    ) -> Result<Rc<T>, HookError> {
        if !self.inner.rendering.get() {
            return Err(HookError::NoActiveContext);
        }
        let index = self.take_index();
        let type_name = type_name::<T>();
        self.assert_slot_kind(index, kind, type_name)?;
        let existing = self
            .inner
            .slots
            .borrow()
            .get(index)
            .map(|slot| Rc::clone(&slot.value));
        if let Some(value) = existing {
            return value
                .downcast::<T>()
                .map_err(|_| HookError::HookOrderViolation {
                    index,
                    expected: SlotShape::Hook { kind, type_name },
                    found: SlotShape::Hook { kind, type_name },
                });
        }
        let value = Rc::new(init());
        self.inner.slots.borrow_mut().push(Slot {
            kind,
            type_name,
            value: Rc::clone(&value) as Rc<dyn Any>,
        });
        Ok(value)
    }

    pub(crate) fn queue_mount_effect(&self, effect: Rc<EffectState>) {
        if let Some(cleanup) = effect.take_cleanup() {
            self.inner.cleanups.borrow_mut().push(cleanup);
        }
        if !effect.mark_queued() {
            self.inner.mount_effects.borrow_mut().push(effect);
        }
    }

    pub fn push_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        self.inner.cleanups.borrow_mut().push(Box::new(cleanup));
    }

    /// Run every queued mount effect in registration order.
    pub fn after_mount(&self, message_id: &MessageId) {
        if self.inner.closed.get() {
            return;
        }
        let effects = std::mem::take(&mut *self.inner.mount_effects.borrow_mut());
        for effect in effects {
            effect.run(message_id);
        }
    }

    /// Run every queued cleanup in registration order.
    pub fn before_unmount(&self) {
        let cleanups = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }
    }

    /// Run all outstanding cleanups and refuse further renders.
    pub fn close(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let effect_slots: Vec<Rc<EffectState>> = self
            .inner
            .slots
            .borrow()
            .iter()
            .filter(|slot| slot.kind == SlotKind::Effect)
            .filter_map(|slot| Rc::clone(&slot.value).downcast::<EffectState>().ok())
            .collect();
        {
            let mut cleanups = self.inner.cleanups.borrow_mut();
            for effect in &effect_slots {
                if let Some(cleanup) = effect.take_cleanup() {
                    cleanups.push(cleanup);
                }
            }
        }
        self.before_unmount();
        self.inner.mount_effects.borrow_mut().clear();
        self.inner.dispatch.borrow_mut().take();
        self.inner.provided.borrow_mut().clear();
        let slots = std::mem::take(&mut *self.inner.slots.borrow_mut());
        drop(slots);
    }
}

/// Weak handle state setters use to request a render.
#[derive(Clone)]
pub struct Dispatcher(Weak<StoreInner>);

impl Dispatcher {
    /// Ask the owning prompt to render again. A no-op once the store is gone or closed.
    pub fn dispatch(&self) {
        let Some(inner) = self.0.upgrade() else {
            return;
        };
        let dispatch = inner.dispatch.borrow().clone();
        if let Some(dispatch) = dispatch {
            dispatch();
        }
    }
}
