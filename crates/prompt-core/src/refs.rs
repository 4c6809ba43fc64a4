use std::cell::RefCell;
use std::rc::Rc;

use crate::context::with_current_store;
use crate::slot_table::{HookError, HookStore, SlotKind};

/// Render-transparent storage owned by a hook slot.
///
/// Mutating a ref never requests a render. The handle is a cheap clone of the
/// slot's `Rc<RefCell<...>>`, so closures created in one render observe writes
/// made from event handlers or effects.
pub struct RefHandle<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for RefHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> RefHandle<T> {
    fn from_slot(inner: Rc<RefCell<T>>) -> Self {
        Self { inner }
    }

    /// Run `f` with an immutable reference to the stored value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let borrow = self.inner.borrow();
        f(&*borrow)
    }

    /// Run `f` with a mutable reference to the stored value.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut borrow = self.inner.borrow_mut();
        f(&mut *borrow)
    }

    /// Replace the stored value, returning the previous one.
    pub fn replace(&self, new_value: T) -> T {
        self.inner.replace(new_value)
    }

    pub fn set_current(&self, new_value: T) {
        *self.inner.borrow_mut() = new_value;
    }
}

impl<T: Clone> RefHandle<T> {
    pub fn current(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl HookStore {
    pub fn use_ref<T: 'static>(&self, init: impl FnOnce() -> T) -> Result<RefHandle<T>, HookError> {
        let cell = self.slot(SlotKind::Ref, || RefCell::new(init()))?;
        Ok(RefHandle::from_slot(cell))
    }
}

pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> RefHandle<T> {
    with_current_store(|store| store.use_ref(init))
}
