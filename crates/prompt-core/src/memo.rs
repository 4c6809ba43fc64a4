use std::cell::RefCell;

use crate::context::with_current_store;
use crate::slot_table::{HookError, HookStore, SlotKind};

struct MemoEntry<D, T> {
    deps: D,
    value: T,
}

type MemoCell<D, T> = RefCell<Option<MemoEntry<D, T>>>;

impl HookStore {
    pub fn use_memo<D, T>(&self, deps: D, factory: impl FnOnce() -> T) -> Result<T, HookError>
    where
        D: PartialEq + 'static,
        T: Clone + 'static,
    {
        let cell = self.slot::<MemoCell<D, T>>(SlotKind::Memo, || RefCell::new(None))?;
        if let Some(cached) = cell.borrow().as_ref() {
            if cached.deps == deps {
                return Ok(cached.value.clone());
            }
        }
        let value = factory();
        *cell.borrow_mut() = Some(MemoEntry {
            deps,
            value: value.clone(),
        });
        Ok(value)
    }
}

/// Recompute `factory` only when `deps` differs from the previous render's deps.
pub fn use_memo<D, T>(deps: D, factory: impl FnOnce() -> T) -> T
where
    D: PartialEq + 'static,
    T: Clone + 'static,
{
    with_current_store(|store| store.use_memo(deps, factory))
}
