use std::cell::RefCell;
use std::rc::Rc;
use std::thread_local;

use crate::slot_table::{HookError, HookStore};

thread_local! {
    // Innermost entry is the store currently rendering on this thread.
    static CURRENT_STORES: RefCell<Vec<HookStore>> = RefCell::new(Vec::new());
}

pub(crate) fn bind(store: &HookStore) {
    CURRENT_STORES.with(|stack| stack.borrow_mut().push(store.clone()));
}

pub(crate) fn unbind(store: &HookStore) {
    CURRENT_STORES.with(|stack| {
        let mut stack = stack.borrow_mut();
        if let Some(position) = stack.iter().rposition(|bound| bound.ptr_eq(store)) {
            stack.remove(position);
        }
    });
}

/// The store bound by the innermost active render on this thread.
pub fn current_store() -> Result<HookStore, HookError> {
    CURRENT_STORES
        .with(|stack| stack.borrow().last().cloned())
        .ok_or(HookError::NoActiveContext)
}

/// Run `f` against the active store. Hook misuse is a programming error and panics.
pub fn with_current_store<R>(f: impl FnOnce(&HookStore) -> Result<R, HookError>) -> R {
    match current_store().and_then(|store| f(&store)) {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

/// Read a value provided to the active store with [`HookStore::provide`].
pub fn use_context<T: 'static>() -> Option<Rc<T>> {
    with_current_store(|store| Ok(store.context::<T>()))
}
