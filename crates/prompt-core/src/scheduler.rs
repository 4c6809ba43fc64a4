use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use thiserror::Error;

use crate::platform::WorkScheduler;

pub const DEFAULT_MAX_QUEUE_LEN: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on queued tasks of one kind, and on renders run in one drain.
    pub max_queue_len: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_len: DEFAULT_MAX_QUEUE_LEN,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Dispatch,
    Commit,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Dispatch => f.write_str("dispatch"),
            TaskKind::Commit => f.write_str("commit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("{kind} queue exceeded {limit} tasks; runaway update loop?")]
    QueueOverflow { kind: TaskKind, limit: usize },
}

struct DispatchTask {
    index: u64,
    run: Box<dyn FnOnce()>,
}

struct CommitTask {
    index: u64,
    run: Box<dyn FnOnce() -> LocalBoxFuture<'static, ()>>,
}

struct SchedulerInner {
    work_scheduler: Rc<dyn WorkScheduler>,
    config: SchedulerConfig,
    dispatch_queue: RefCell<VecDeque<DispatchTask>>,
    commit_queue: RefCell<VecDeque<CommitTask>>,
    dispatch_counter: Cell<u64>,
    commit_counter: Cell<u64>,
    commit_pending: Cell<bool>,
    work_requested: Cell<bool>,
    idle_waiters: RefCell<Vec<oneshot::Sender<()>>>,
}

impl SchedulerInner {
    fn has_work(&self) -> bool {
        !self.dispatch_queue.borrow().is_empty() || !self.commit_queue.borrow().is_empty()
    }

    fn pop_dispatch(&self) -> Option<DispatchTask> {
        loop {
            let task = self.dispatch_queue.borrow_mut().pop_front()?;
            if task.index < self.dispatch_counter.get() {
                log::trace!("skipping stale dispatch #{}", task.index);
                continue;
            }
            return Some(task);
        }
    }

    fn pop_commit(&self) -> Option<CommitTask> {
        loop {
            let task = self.commit_queue.borrow_mut().pop_front()?;
            if task.index < self.commit_counter.get() {
                log::trace!("skipping stale commit #{}", task.index);
                continue;
            }
            return Some(task);
        }
    }

    fn notify_idle(&self) {
        let waiters = std::mem::take(&mut *self.idle_waiters.borrow_mut());
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }
}

/// Two ordered work queues: synchronous renders and serialized async commits.
///
/// Every task receives the next counter value for its kind; when popped, a
/// task older than the latest one queued is skipped, so a burst of requests
/// collapses into the last render and the last commit. At most one commit is
/// in flight at a time.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(work_scheduler: Rc<dyn WorkScheduler>) -> Self {
        Self::with_config(work_scheduler, SchedulerConfig::default())
    }

    pub fn with_config(work_scheduler: Rc<dyn WorkScheduler>, config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                work_scheduler,
                config,
                dispatch_queue: RefCell::new(VecDeque::new()),
                commit_queue: RefCell::new(VecDeque::new()),
                dispatch_counter: Cell::new(0),
                commit_counter: Cell::new(0),
                commit_pending: Cell::new(false),
                work_requested: Cell::new(false),
                idle_waiters: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.inner.config
    }

    pub fn is_commit_pending(&self) -> bool {
        self.inner.commit_pending.get()
    }

    pub fn has_work(&self) -> bool {
        self.inner.has_work()
    }

    pub fn queued_dispatches(&self) -> usize {
        self.inner.dispatch_queue.borrow().len()
    }

    pub fn queued_commits(&self) -> usize {
        self.inner.commit_queue.borrow().len()
    }

    pub fn schedule_dispatch(&self, run: impl FnOnce() + 'static) {
        let limit = self.inner.config.max_queue_len;
        {
            let mut queue = self.inner.dispatch_queue.borrow_mut();
            if queue.len() >= limit {
                overflow(TaskKind::Dispatch, limit);
            }
            let index = self.inner.dispatch_counter.get() + 1;
            self.inner.dispatch_counter.set(index);
            queue.push_back(DispatchTask {
                index,
                run: Box::new(run),
            });
        }
        self.schedule_work();
    }

    pub fn schedule_commit<F, Fut>(&self, run: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let limit = self.inner.config.max_queue_len;
        {
            let mut queue = self.inner.commit_queue.borrow_mut();
            if queue.len() >= limit {
                overflow(TaskKind::Commit, limit);
            }
            let index = self.inner.commit_counter.get() + 1;
            self.inner.commit_counter.set(index);
            queue.push_back(CommitTask {
                index,
                run: Box::new(move || run().boxed_local()),
            });
        }
        self.schedule_work();
    }

    /// Ask the host to run [`Scheduler::work`] later. Requests made before the
    /// work future starts coalesce into one.
    pub fn schedule_work(&self) {
        if self.inner.work_requested.replace(true) {
            return;
        }
        self.inner.work_scheduler.schedule_work(self.work());
    }

    /// One scheduling step: every pending render, then at most one commit.
    pub fn work(&self) -> LocalBoxFuture<'static, ()> {
        let this = self.clone();
        async move {
            this.inner.work_requested.set(false);
            this.run_dispatches();
            if this.inner.commit_pending.get() {
                return;
            }
            if let Some(task) = this.inner.pop_commit() {
                this.run_commit(task).await;
                if this.inner.has_work() {
                    this.schedule_work();
                }
            }
        }
        .boxed_local()
    }

    /// Drain both queues, awaiting every commit, until nothing is left.
    pub async fn flush_work(&self) {
        loop {
            self.run_dispatches();
            if self.inner.commit_pending.get() {
                self.wait_for_commit().await;
                continue;
            }
            match self.inner.pop_commit() {
                Some(task) => self.run_commit(task).await,
                None => {
                    if self.inner.dispatch_queue.borrow().is_empty() {
                        break;
                    }
                }
            }
        }
        self.inner.work_requested.set(false);
    }

    fn run_dispatches(&self) {
        let limit = self.inner.config.max_queue_len;
        let mut executed = 0;
        while let Some(task) = self.inner.pop_dispatch() {
            executed += 1;
            if executed > limit {
                overflow(TaskKind::Dispatch, limit);
            }
            log::trace!("running dispatch #{}", task.index);
            (task.run)();
        }
    }

    async fn run_commit(&self, task: CommitTask) {
        log::trace!("running commit #{}", task.index);
        self.inner.commit_pending.set(true);
        let future = (task.run)();
        future.await;
        self.inner.commit_pending.set(false);
        self.inner.notify_idle();
    }

    async fn wait_for_commit(&self) {
        let (sender, receiver) = oneshot::channel();
        self.inner.idle_waiters.borrow_mut().push(sender);
        let _ = receiver.await;
    }
}

fn overflow(kind: TaskKind, limit: usize) -> ! {
    panic!("{}", SchedulerError::QueueOverflow { kind, limit })
}

/// Scheduler backend that never polls work on its own.
///
/// Work only happens through [`Scheduler::flush_work`] or
/// [`Renderer::act`](crate::Renderer::act). Each request is counted so tests
/// can assert that scheduling happened.
#[derive(Default)]
pub struct DefaultScheduler {
    requests: Cell<usize>,
}

impl DefaultScheduler {
    pub fn take_work_requests(&self) -> usize {
        self.requests.replace(0)
    }
}

impl WorkScheduler for DefaultScheduler {
    fn schedule_work(&self, _work: LocalBoxFuture<'static, ()>) {
        self.requests.set(self.requests.get() + 1);
    }
}
