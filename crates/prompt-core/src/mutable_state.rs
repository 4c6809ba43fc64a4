use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::context::with_current_store;
use crate::slot_table::{Dispatcher, HookError, HookStore, SlotKind};

pub(crate) struct StateCell<T> {
    value: RefCell<T>,
}

/// Render-causing state held in a hook slot.
///
/// Setting a value equal (`PartialEq`) to the current one is a no-op and does
/// not request a render.
pub struct MutableState<T> {
    cell: Rc<StateCell<T>>,
    dispatcher: Dispatcher,
}

impl<T> Clone for MutableState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<T> PartialEq for MutableState<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T> Eq for MutableState<T> {}

impl<T: PartialEq> MutableState<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.value.borrow())
    }

    /// Store `value` and request a render. Returns `false` when nothing changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.cell.value.borrow_mut();
            if *current == value {
                log::trace!("state unchanged; skipping dispatch");
                return false;
            }
            *current = value;
        }
        self.dispatcher.dispatch();
        true
    }

    /// Compute the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = self.with(f);
        self.set(next)
    }
}

impl<T: Clone + PartialEq> MutableState<T> {
    pub fn value(&self) -> T {
        self.cell.value.borrow().clone()
    }

    pub fn get(&self) -> T {
        self.value()
    }
}

impl<T: fmt::Debug> fmt::Debug for MutableState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableState")
            .field("value", &*self.cell.value.borrow())
            .finish()
    }
}

/// Routes actions through a reducer into a [`MutableState`].
pub struct ReducerDispatch<S, A> {
    state: MutableState<S>,
    reducer: Rc<dyn Fn(&S, A) -> S>,
}

impl<S, A> Clone for ReducerDispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            reducer: Rc::clone(&self.reducer),
        }
    }
}

impl<S: PartialEq, A> ReducerDispatch<S, A> {
    pub fn dispatch(&self, action: A) -> bool {
        self.state.update(|current| (self.reducer)(current, action))
    }
}

impl HookStore {
    pub fn use_state<T: PartialEq + 'static>(
        &self,
        init: impl FnOnce() -> T,
    ) -> Result<MutableState<T>, HookError> {
        let cell = self.slot(SlotKind::State, || StateCell {
            value: RefCell::new(init()),
        })?;
        Ok(MutableState {
            cell,
            dispatcher: self.dispatcher(),
        })
    }

    pub fn use_reducer<S, A>(
        &self,
        reducer: impl Fn(&S, A) -> S + 'static,
        init: impl FnOnce() -> S,
    ) -> Result<(S, ReducerDispatch<S, A>), HookError>
    where
        S: Clone + PartialEq + 'static,
    {
        let state = self.use_state(init)?;
        let current = state.value();
        Ok((
            current,
            ReducerDispatch {
                state,
                reducer: Rc::new(reducer),
            },
        ))
    }
}

pub fn use_state<T: PartialEq + 'static>(init: impl FnOnce() -> T) -> MutableState<T> {
    with_current_store(|store| store.use_state(init))
}

pub fn use_reducer<S, A>(
    reducer: impl Fn(&S, A) -> S + 'static,
    init: impl FnOnce() -> S,
) -> (S, ReducerDispatch<S, A>)
where
    S: Clone + PartialEq + 'static,
{
    with_current_store(|store| store.use_reducer(reducer, init))
}
