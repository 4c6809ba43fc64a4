use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use prompt_core::{use_effect, use_state, MessageId};
use prompt_runtime_std::TokioRuntime;
use prompt_screen::{
    ActionRow, Adaptor, AdaptorError, Button, ButtonStyle, ChannelId, Embed, Interaction,
    InteractionHandler, InteractionRef, MessagePatch, MessagePayload, Subscription, Target,
};
use prompt_session::{use_interaction, PromptSession, SessionConfig};

/// Adaptor that prints every call instead of talking to a remote service.
#[derive(Default)]
struct ConsoleAdaptor {
    next_id: Cell<u64>,
    handler: Rc<RefCell<Option<InteractionHandler>>>,
}

impl ConsoleAdaptor {
    fn click(&self, n: u64, custom_id: &str) {
        let handler = self.handler.borrow().clone();
        match handler {
            Some(handler) => handler(Interaction::button(
                InteractionRef::new(format!("click-{n}"), "demo-token"),
                MessageId::from("message-1"),
                custom_id,
            )),
            None => println!("(nobody listens for {custom_id})"),
        }
    }

    fn fresh_id(&self) -> MessageId {
        self.next_id.set(self.next_id.get() + 1);
        MessageId::from(format!("message-{}", self.next_id.get()))
    }
}

fn print_json(label: &str, value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{label}\n{json}"),
        Err(err) => log::error!("failed to render {label}: {err}"),
    }
}

#[async_trait(?Send)]
impl Adaptor for ConsoleAdaptor {
    async fn send_message(
        &self,
        channel: &ChannelId,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError> {
        let id = self.fresh_id();
        print_json(&format!("-> send {id} to {channel}"), payload);
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError> {
        print_json(&format!("-> edit {message_id} in {channel}"), patch);
        Ok(message_id.clone())
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), AdaptorError> {
        println!("-> delete {message_id} in {channel}");
        Ok(())
    }

    async fn send_interaction_response(
        &self,
        interaction: &InteractionRef,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError> {
        print_json(&format!("-> respond to {}", interaction.id), payload);
        Ok(MessageId::from(format!("response-{}", interaction.id)))
    }

    async fn edit_interaction_response(
        &self,
        interaction: &InteractionRef,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError> {
        print_json(&format!("-> edit response to {}", interaction.id), patch);
        Ok(MessageId::from(format!("response-{}", interaction.id)))
    }

    async fn delete_interaction_response(
        &self,
        interaction: &InteractionRef,
    ) -> Result<(), AdaptorError> {
        println!("-> delete response to {}", interaction.id);
        Ok(())
    }

    async fn send_follow_up(
        &self,
        interaction: &InteractionRef,
        payload: &MessagePayload,
    ) -> Result<MessageId, AdaptorError> {
        let id = self.fresh_id();
        print_json(&format!("-> follow up {} as {id}", interaction.id), payload);
        Ok(id)
    }

    async fn edit_follow_up(
        &self,
        _interaction: &InteractionRef,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<MessageId, AdaptorError> {
        print_json(&format!("-> edit follow up {message_id}"), patch);
        Ok(message_id.clone())
    }

    async fn delete_follow_up(
        &self,
        _interaction: &InteractionRef,
        message_id: &MessageId,
    ) -> Result<(), AdaptorError> {
        println!("-> delete follow up {message_id}");
        Ok(())
    }

    async fn acknowledge_interaction(&self, interaction: &Interaction) -> Result<(), AdaptorError> {
        println!("-> ack {}", interaction.interaction.id);
        Ok(())
    }

    fn subscribe_interaction(&self, handler: InteractionHandler) -> Subscription {
        self.handler.borrow_mut().replace(handler);
        let slot = Rc::clone(&self.handler);
        Subscription::new(move || {
            slot.borrow_mut().take();
        })
    }
}

fn counter() -> MessagePayload {
    let count = use_state(|| 0i64);

    use_effect((), |scope| {
        log::info!("counter is live as {}", scope.message_id());
        scope.on_cleanup(|| log::info!("counter torn down"))
    });

    for (id, delta) in [("decrement", -1), ("increment", 1)] {
        let count = count.clone();
        use_interaction(id, move |_| {
            count.update(|value| value + delta);
        });
    }

    MessagePayload::new()
        .with_embed(
            Embed::new()
                .title("Counter")
                .description(format!("The count is **{}**", count.value())),
        )
        .with_row(
            ActionRow::new()
                .with(Button::new("decrement", "-1").style(ButtonStyle::Secondary))
                .with(Button::new("increment", "+1").style(ButtonStyle::Primary)),
        )
}

fn load_config() -> SessionConfig {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        return SessionConfig::default().with_timeout(Duration::from_secs(300));
    };
    match SessionConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("{err}; using defaults");
            SessionConfig::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    println!("=== Prompt counter demo ===");
    println!("Three clicks arrive back to back; watch them collapse into one edit.");
    println!();

    let config = load_config();
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let adaptor = Rc::new(ConsoleAdaptor::default());
            let runtime = TokioRuntime::new();
            let session = PromptSession::mount(
                adaptor.clone(),
                Target::Channel(ChannelId::new("demo-channel")),
                config,
                runtime.scheduler(),
                counter,
            );
            session.settle().await;

            session
                .act(|| {
                    adaptor.click(1, "increment");
                    adaptor.click(2, "increment");
                    adaptor.click(3, "increment");
                })
                .await;
            session.act(|| adaptor.click(4, "decrement")).await;

            session.close();
            session.closed().await;
            println!();
            println!("session closed: {:?}", session.close_reason());
        })
        .await;
}
