use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;

use crate::scheduler::Scheduler;
use crate::slot_table::HookStore;
use crate::MessageId;

/// Applies a rendered payload and reports the committed message identity.
///
/// `None` means the commit did not update anything (for example a failed
/// adaptor call); queued mount effects then wait for the next successful commit.
pub trait Committer<P> {
    fn commit_with_effect(&self, payload: P) -> LocalBoxFuture<'static, Option<MessageId>>;
}

impl<P, F> Committer<P> for F
where
    F: Fn(P) -> LocalBoxFuture<'static, Option<MessageId>>,
{
    fn commit_with_effect(&self, payload: P) -> LocalBoxFuture<'static, Option<MessageId>> {
        self(payload)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderPhase {
    Unmounted,
    Mounted,
    Updating,
}

struct RendererInner<P> {
    store: HookStore,
    scheduler: Scheduler,
    prompt: RefCell<Box<dyn FnMut() -> P>>,
    committer: Rc<dyn Committer<P>>,
    phase: Cell<RenderPhase>,
    renders: Cell<usize>,
}

impl<P: 'static> RendererInner<P> {
    fn render_and_commit(self: &Rc<Self>, is_update: bool) {
        if self.phase.get() == RenderPhase::Unmounted {
            log::trace!("skipping render of an unmounted prompt");
            return;
        }
        if is_update {
            self.store.before_unmount();
        }
        let rendered = {
            let mut prompt = self.prompt.borrow_mut();
            let prompt = &mut **prompt;
            self.store.render(|| prompt())
        };
        let payload = match rendered {
            Ok(payload) => payload,
            Err(err) => panic!("{err}"),
        };
        self.renders.set(self.renders.get() + 1);

        let weak: Weak<Self> = Rc::downgrade(self);
        let committer = Rc::clone(&self.committer);
        self.scheduler.schedule_commit(move || async move {
            let committed = committer.commit_with_effect(payload).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match committed {
                Some(message_id) => {
                    inner.store.before_unmount();
                    inner.store.after_mount(&message_id);
                }
                None => log::debug!("commit did not update the message; effects stay queued"),
            }
            if inner.phase.get() == RenderPhase::Updating {
                inner.phase.set(RenderPhase::Mounted);
            }
        });
    }
}

/// Drives one prompt instance through mount, update and unmount.
///
/// Renders run synchronously on the scheduler's dispatch queue; their payloads
/// are handed to the [`Committer`] on the commit queue.
pub struct Renderer<P: 'static> {
    inner: Rc<RendererInner<P>>,
}

impl<P: 'static> Clone for Renderer<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P: 'static> Renderer<P> {
    pub fn new(
        scheduler: Scheduler,
        committer: impl Committer<P> + 'static,
        prompt: impl FnMut() -> P + 'static,
    ) -> Self {
        Self::with_store(HookStore::new(), scheduler, committer, prompt)
    }

    pub fn with_store(
        store: HookStore,
        scheduler: Scheduler,
        committer: impl Committer<P> + 'static,
        prompt: impl FnMut() -> P + 'static,
    ) -> Self {
        let inner = Rc::new(RendererInner {
            store,
            scheduler,
            prompt: RefCell::new(Box::new(prompt)),
            committer: Rc::new(committer),
            phase: Cell::new(RenderPhase::Unmounted),
            renders: Cell::new(0),
        });
        let weak = Rc::downgrade(&inner);
        inner.store.set_dispatch(move || {
            if let Some(inner) = weak.upgrade() {
                Renderer { inner }.update();
            }
        });
        Self { inner }
    }

    pub fn phase(&self) -> RenderPhase {
        self.inner.phase.get()
    }

    pub fn store(&self) -> &HookStore {
        &self.inner.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Number of completed render passes.
    pub fn render_count(&self) -> usize {
        self.inner.renders.get()
    }

    pub fn mount(&self) {
        if self.phase() != RenderPhase::Unmounted || self.inner.store.is_closed() {
            log::warn!("mount ignored: prompt already mounted or closed");
            return;
        }
        log::debug!("mounting prompt");
        self.inner.phase.set(RenderPhase::Mounted);
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule_dispatch(move || {
            if let Some(inner) = weak.upgrade() {
                inner.render_and_commit(false);
            }
        });
    }

    pub fn update(&self) {
        if self.phase() == RenderPhase::Unmounted {
            log::debug!("update ignored: prompt is not mounted");
            return;
        }
        self.inner.phase.set(RenderPhase::Updating);
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule_dispatch(move || {
            if let Some(inner) = weak.upgrade() {
                inner.render_and_commit(true);
            }
        });
    }

    pub fn unmount(&self) {
        self.unmount_with(async {});
    }

    /// Queue `teardown` on the commit queue, then close the hook store.
    pub fn unmount_with<Fut>(&self, teardown: Fut)
    where
        Fut: Future<Output = ()> + 'static,
    {
        if self.phase() == RenderPhase::Unmounted {
            return;
        }
        log::debug!("unmounting prompt");
        self.inner.phase.set(RenderPhase::Unmounted);
        let store = self.inner.store.clone();
        self.inner.scheduler.schedule_commit(move || async move {
            teardown.await;
            store.close();
        });
    }

    /// Run `action`, then drain the scheduler until the pipeline is quiescent.
    pub async fn act<R>(&self, action: impl FnOnce() -> R) -> R {
        let result = action();
        self.inner.scheduler.flush_work().await;
        result
    }
}
