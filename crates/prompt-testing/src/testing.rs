use std::rc::Rc;

use futures::executor::block_on;
use prompt_core::{DefaultScheduler, Renderer, Scheduler};
use prompt_screen::{ChannelId, ClosePolicy, MessagePayload, Screen, ScreenCommitter, Target};

use crate::recording::RecordingAdaptor;

/// Headless harness for exercising prompts in tests.
///
/// `PromptTestRule` wires a [`Renderer`] to a [`Screen`] backed by a
/// [`RecordingAdaptor`]. Work never runs on its own: every helper drains the
/// scheduler to quiescence before returning, so assertions observe the end
/// state of each step.
pub struct PromptTestRule {
    adaptor: Rc<RecordingAdaptor>,
    screen: Rc<Screen>,
    scheduler: Scheduler,
    renderer: Option<Renderer<MessagePayload>>,
}

impl PromptTestRule {
    /// Create a rule that posts to a test channel.
    pub fn new() -> Self {
        Self::with_target(Target::Channel(ChannelId::from("test-channel")))
    }

    pub fn with_target(target: Target) -> Self {
        let adaptor = Rc::new(RecordingAdaptor::new());
        let screen = Rc::new(Screen::new(adaptor.clone(), target));
        Self {
            adaptor,
            screen,
            scheduler: Scheduler::new(Rc::new(DefaultScheduler::default())),
            renderer: None,
        }
    }

    /// Install the prompt and run the initial mount to completion.
    pub fn set_content(&mut self, content: impl FnMut() -> MessagePayload + 'static) {
        let renderer = Renderer::new(
            self.scheduler.clone(),
            ScreenCommitter::new(Rc::clone(&self.screen)),
            content,
        );
        renderer.mount();
        self.renderer = Some(renderer);
        self.pump_until_idle();
    }

    /// Run `action`, then drain every render and commit it caused.
    pub fn act<R>(&self, action: impl FnOnce() -> R) -> R {
        let result = action();
        self.pump_until_idle();
        result
    }

    /// Force a re-render of the installed prompt.
    pub fn update(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.update();
        }
        self.pump_until_idle();
    }

    /// Apply `policy` to the message and tear the prompt down.
    pub fn close(&self, policy: ClosePolicy) {
        let screen = Rc::clone(&self.screen);
        match &self.renderer {
            Some(renderer) => renderer.unmount_with(async move { screen.close(policy).await }),
            None => block_on(screen.close(policy)),
        }
        self.pump_until_idle();
    }

    pub fn pump_until_idle(&self) {
        block_on(self.scheduler.flush_work());
    }

    pub fn has_content(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn adaptor(&self) -> &RecordingAdaptor {
        &self.adaptor
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn renderer(&self) -> Option<&Renderer<MessagePayload>> {
        self.renderer.as_ref()
    }
}

impl Default for PromptTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `PromptTestRule`.
pub fn run_test_prompt<R>(f: impl FnOnce(&mut PromptTestRule) -> R) -> R {
    let mut rule = PromptTestRule::new();
    f(&mut rule)
}
