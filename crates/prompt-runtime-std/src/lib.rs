//! Standard runtime services for prompts.
//!
//! This crate provides concrete implementations of the
//! [`WorkScheduler`] trait defined in `prompt-core`. Applications construct
//! one of them (or the bundled [`TokioRuntime`]) and hand the resulting
//! [`Scheduler`] to their renderers.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::task::{LocalSpawn, LocalSpawnExt};
use prompt_core::{Scheduler, SchedulerConfig, WorkScheduler};

/// Scheduler backend that spawns work on any `futures` local executor.
pub struct LocalSpawnScheduler<S> {
    spawner: S,
    requests: Cell<usize>,
}

impl<S: LocalSpawn> LocalSpawnScheduler<S> {
    pub fn new(spawner: S) -> Self {
        Self {
            spawner,
            requests: Cell::new(0),
        }
    }

    /// Returns whether work has been scheduled since the last call.
    pub fn take_work_request(&self) -> bool {
        self.requests.replace(0) > 0
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }
}

impl<S: LocalSpawn> WorkScheduler for LocalSpawnScheduler<S> {
    fn schedule_work(&self, work: LocalBoxFuture<'static, ()>) {
        self.requests.set(self.requests.get() + 1);
        if let Err(err) = self.spawner.spawn_local(work) {
            log::error!("failed to spawn prompt work: {err}");
        }
    }
}

impl<S> fmt::Debug for LocalSpawnScheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSpawnScheduler")
            .field("requests", &self.requests.get())
            .finish()
    }
}

/// Scheduler backend that runs work through [`tokio::task::spawn_local`].
///
/// Must be used from inside a [`tokio::task::LocalSet`].
#[derive(Default)]
pub struct TokioLocalScheduler {
    requests: Cell<usize>,
}

impl TokioLocalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether work has been scheduled since the last call.
    pub fn take_work_request(&self) -> bool {
        self.requests.replace(0) > 0
    }
}

impl WorkScheduler for TokioLocalScheduler {
    fn schedule_work(&self, work: LocalBoxFuture<'static, ()>) {
        self.requests.set(self.requests.get() + 1);
        drop(tokio::task::spawn_local(work));
    }
}

impl fmt::Debug for TokioLocalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioLocalScheduler")
            .field("requests", &self.requests.get())
            .finish()
    }
}

/// Convenience container bundling the tokio backend with a [`Scheduler`].
#[derive(Clone)]
pub struct TokioRuntime {
    backend: Rc<TokioLocalScheduler>,
    scheduler: Scheduler,
}

impl TokioRuntime {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let backend = Rc::new(TokioLocalScheduler::new());
        let scheduler = Scheduler::with_config(backend.clone(), config);
        Self { backend, scheduler }
    }

    /// Returns the scheduler renderers should be built with.
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    /// Returns whether work was requested since the last poll.
    pub fn take_work_request(&self) -> bool {
        self.backend.take_work_request()
    }
}

impl fmt::Debug for TokioRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioRuntime")
            .field("backend", &self.backend)
            .finish()
    }
}

impl Default for TokioRuntime {
    fn default() -> Self {
        Self::new()
    }
}
