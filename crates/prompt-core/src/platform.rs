//! Platform abstraction traits for the prompt runtime.
//!
//! The scheduler never decides *when* queued work runs. It asks the host
//! through [`WorkScheduler`] to poll a work future later, which lets the
//! same core run on a `futures` local pool, a tokio `LocalSet`, or be driven
//! purely by [`Scheduler::flush_work`](crate::Scheduler::flush_work) in tests.

use futures::future::LocalBoxFuture;

/// Arranges for scheduler work to run later.
///
/// Implementations receive a future that drains the scheduler queues and
/// must poll it to completion on the thread that owns the prompt instance
/// (for example "on the next tick" of a local executor).
pub trait WorkScheduler {
    /// Request that `work` be polled after the current synchronous section.
    fn schedule_work(&self, work: LocalBoxFuture<'static, ()>);
}

impl<S: WorkScheduler + ?Sized> WorkScheduler for std::rc::Rc<S> {
    fn schedule_work(&self, work: LocalBoxFuture<'static, ()>) {
        (**self).schedule_work(work)
    }
}
