use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use prompt_core::{Committer, HookStore, MessageId, Renderer, Scheduler};
use prompt_screen::{
    Adaptor, Interaction, MessagePayload, Screen, ScreenCommitter, Subscription, Target,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};

use crate::config::SessionConfig;
use crate::interaction::InteractionRouter;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called.
    User,
    /// The total lifetime elapsed.
    Timeout,
    /// No commit succeeded within the idle timeout.
    IdleTimeout,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::User => f.write_str("closed by user"),
            CloseReason::Timeout => f.write_str("timed out"),
            CloseReason::IdleTimeout => f.write_str("idle timeout"),
        }
    }
}

struct SessionInner {
    adaptor: Rc<dyn Adaptor>,
    screen: Rc<Screen>,
    renderer: Renderer<MessagePayload>,
    router: Rc<InteractionRouter>,
    config: SessionConfig,
    subscription: RefCell<Option<Subscription>>,
    timers: RefCell<Vec<JoinHandle<()>>>,
    pending_acks: RefCell<Vec<JoinHandle<()>>>,
    idle_deadline: Rc<Cell<Option<Instant>>>,
    close_reason: Cell<Option<CloseReason>>,
    closed: Rc<watch::Sender<bool>>,
}

impl SessionInner {
    fn is_closing(&self) -> bool {
        self.close_reason.get().is_some()
    }

    fn route(&self, interaction: Interaction) {
        if self.is_closing() {
            log::trace!("interaction {} after close ignored", interaction.custom_id);
            return;
        }
        if let Some(target) = &interaction.message_id {
            if self.screen.message_id().as_ref() != Some(target) {
                log::trace!("interaction for message {target} is not ours");
                return;
            }
        }
        if !self.router.has_handler(&interaction.custom_id) {
            log::debug!("no handler for interaction {}", interaction.custom_id);
            return;
        }
        if self.config.acknowledge_interactions {
            self.acknowledge(&interaction);
        }
        self.router.dispatch(&interaction);
    }

    fn acknowledge(&self, interaction: &Interaction) {
        let adaptor = Rc::clone(&self.adaptor);
        let interaction = interaction.clone();
        let handle = tokio::task::spawn_local(async move {
            if let Err(err) = adaptor.acknowledge_interaction(&interaction).await {
                log::error!(
                    "failed to acknowledge interaction {}: {err}",
                    interaction.interaction.id
                );
            }
        });
        self.pending_acks.borrow_mut().push(handle);
    }

    fn close(&self, reason: CloseReason) {
        if self.is_closing() {
            return;
        }
        log::debug!("closing prompt session: {reason}");
        self.close_reason.set(Some(reason));
        let subscription = self.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        for timer in self.timers.borrow_mut().drain(..) {
            timer.abort();
        }
        let screen = Rc::clone(&self.screen);
        let policy = self.config.close_policy;
        let closed = Rc::clone(&self.closed);
        self.renderer.unmount_with(async move {
            screen.close(policy).await;
            closed.send_replace(true);
        });
    }
}

/// One mounted prompt: renderer, screen, interaction routing and timers.
///
/// Timers and interaction acknowledgements run on tokio's local task set, so a
/// session must live inside a [`tokio::task::LocalSet`].
#[derive(Clone)]
pub struct PromptSession {
    inner: Rc<SessionInner>,
}

impl PromptSession {
    pub fn mount(
        adaptor: Rc<dyn Adaptor>,
        target: Target,
        config: SessionConfig,
        scheduler: Scheduler,
        prompt: impl FnMut() -> MessagePayload + 'static,
    ) -> Self {
        let screen = Rc::new(Screen::new(Rc::clone(&adaptor), target));
        let router = Rc::new(InteractionRouter::new());
        let idle_deadline = Rc::new(Cell::new(
            config.idle_timeout.map(|idle| Instant::now() + idle),
        ));

        let store = HookStore::new();
        store.provide(Rc::clone(&router));
        let renderer = Renderer::with_store(
            store,
            scheduler,
            idle_resetting_committer(
                ScreenCommitter::new(Rc::clone(&screen)),
                Rc::clone(&idle_deadline),
                config.idle_timeout,
            ),
            routed_prompt(Rc::clone(&router), prompt),
        );

        let (closed, _) = watch::channel(false);
        let inner = Rc::new(SessionInner {
            adaptor: Rc::clone(&adaptor),
            screen,
            renderer,
            router,
            config,
            subscription: RefCell::new(None),
            timers: RefCell::new(Vec::new()),
            pending_acks: RefCell::new(Vec::new()),
            idle_deadline,
            close_reason: Cell::new(None),
            closed: Rc::new(closed),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = adaptor.subscribe_interaction(Rc::new(move |interaction: Interaction| {
            if let Some(inner) = weak.upgrade() {
                inner.route(interaction);
            }
        }));
        inner.subscription.borrow_mut().replace(subscription);
        start_timers(&inner);

        log::debug!("mounting prompt session on {}", inner.screen.target());
        inner.renderer.mount();
        Self { inner }
    }

    /// Re-render the prompt from outside.
    pub fn update(&self) {
        self.inner.renderer.update();
    }

    /// Apply the close policy, stop timers and interactions, and unmount.
    /// Only the first call has an effect.
    pub fn close(&self) {
        self.inner.close(CloseReason::User);
    }

    /// Resolves once the session has fully closed, for any reason.
    pub async fn closed(&self) {
        let mut receiver = self.inner.closed.subscribe();
        let _ = receiver.wait_for(|closed| *closed).await;
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.inner.close_reason.get()
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.inner.screen.message_id()
    }

    pub fn screen(&self) -> &Screen {
        &self.inner.screen
    }

    pub fn renderer(&self) -> &Renderer<MessagePayload> {
        &self.inner.renderer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Time left before the idle timeout closes the session.
    pub fn idle_remaining(&self) -> Option<Duration> {
        self.inner
            .idle_deadline
            .get()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Run `action`, then wait until acknowledgements, renders and commits it
    /// caused have all finished.
    pub async fn act<R>(&self, action: impl FnOnce() -> R) -> R {
        let result = action();
        self.settle().await;
        result
    }

    pub async fn settle(&self) {
        loop {
            let acks = std::mem::take(&mut *self.inner.pending_acks.borrow_mut());
            let had_acks = !acks.is_empty();
            for ack in acks {
                let _ = ack.await;
            }
            self.inner.renderer.scheduler().flush_work().await;
            if !had_acks && self.inner.pending_acks.borrow().is_empty() {
                break;
            }
        }
    }
}

impl fmt::Debug for PromptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptSession")
            .field("target", self.inner.screen.target())
            .field("message_id", &self.inner.screen.message_id())
            .field("close_reason", &self.inner.close_reason.get())
            .finish()
    }
}

fn routed_prompt(
    router: Rc<InteractionRouter>,
    mut prompt: impl FnMut() -> MessagePayload + 'static,
) -> impl FnMut() -> MessagePayload + 'static {
    move || {
        router.begin_render();
        prompt()
    }
}

fn idle_resetting_committer(
    screen: ScreenCommitter,
    idle_deadline: Rc<Cell<Option<Instant>>>,
    idle_timeout: Option<Duration>,
) -> impl Committer<MessagePayload> {
    move |payload: MessagePayload| -> LocalBoxFuture<'static, Option<MessageId>> {
        let commit = screen.commit_with_effect(payload);
        let idle_deadline = Rc::clone(&idle_deadline);
        async move {
            let committed = commit.await;
            if let (Some(_), Some(idle)) = (&committed, idle_timeout) {
                idle_deadline.set(Some(Instant::now() + idle));
            }
            committed
        }
        .boxed_local()
    }
}

fn start_timers(inner: &Rc<SessionInner>) {
    let mut timers = inner.timers.borrow_mut();
    if let Some(timeout) = inner.config.timeout {
        let weak = Rc::downgrade(inner);
        timers.push(tokio::task::spawn_local(async move {
            sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                log::debug!("prompt session reached its {timeout:?} lifetime");
                inner.close(CloseReason::Timeout);
            }
        }));
    }
    if inner.config.idle_timeout.is_some() {
        let weak = Rc::downgrade(inner);
        timers.push(tokio::task::spawn_local(watch_idle(weak)));
    }
}

async fn watch_idle(weak: Weak<SessionInner>) {
    loop {
        let deadline = match weak.upgrade().and_then(|inner| inner.idle_deadline.get()) {
            Some(deadline) => deadline,
            None => return,
        };
        sleep_until(deadline).await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if inner.is_closing() {
            return;
        }
        match inner.idle_deadline.get() {
            Some(current) if current > Instant::now() => continue,
            _ => {
                inner.close(CloseReason::IdleTimeout);
                return;
            }
        }
    }
}
