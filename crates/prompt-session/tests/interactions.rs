use std::cell::RefCell;
use std::rc::Rc;

use prompt_core::{use_state, IndexMap, MessageId};
use prompt_runtime_std::TokioRuntime;
use prompt_screen::{
    ActionRow, Button, ChannelId, FieldUpdate, Interaction, InteractionRef, MessagePayload,
    SelectMenu, Target,
};
use prompt_session::{use_interaction, PromptSession, SessionConfig};
use prompt_testing::{AdaptorCall, CallKind, RecordingAdaptor};
use tokio::task::LocalSet;

fn channel() -> Target {
    Target::Channel(ChannelId::new("channel-1"))
}

fn click(n: usize, message_id: &str, custom_id: &str) -> Interaction {
    Interaction::button(
        InteractionRef::new(format!("interaction-{n}"), "token"),
        MessageId::from(message_id),
        custom_id,
    )
}

fn counter_prompt() -> MessagePayload {
    let count = use_state(|| 0);
    {
        let count = count.clone();
        use_interaction("increment", move |_| {
            count.update(|value| value + 1);
        });
    }
    MessagePayload::text(format!("Count: {}", count.value()))
        .with_row(ActionRow::new().with(Button::new("increment", "+1")))
}

fn mount_counter(adaptor: &Rc<RecordingAdaptor>, config: SessionConfig) -> PromptSession {
    let runtime = TokioRuntime::new();
    PromptSession::mount(
        adaptor.clone(),
        channel(),
        config,
        runtime.scheduler(),
        counter_prompt,
    )
}

#[tokio::test(flavor = "current_thread")]
async fn rapid_clicks_collapse_into_one_edit() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let session = mount_counter(&adaptor, SessionConfig::default());
            session.settle().await;
            assert_eq!(adaptor.count(CallKind::Send), 1);
            assert_eq!(session.message_id(), Some(MessageId::from("message-1")));

            session
                .act(|| {
                    for n in 0..3 {
                        adaptor.emit(click(n, "message-1", "increment"));
                    }
                })
                .await;

            assert_eq!(adaptor.count(CallKind::Acknowledge), 3);
            assert_eq!(adaptor.count(CallKind::Edit), 1);
            assert_eq!(session.renderer().render_count(), 2);
            let edit = adaptor
                .calls()
                .into_iter()
                .find(|call| call.kind() == CallKind::Edit)
                .expect("one edit");
            let patch = edit.patch().expect("edits carry a patch");
            assert_eq!(patch.content, Some(FieldUpdate::Set("Count: 3".to_string())));
            assert!(patch.components.is_none(), "buttons did not change");
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn unrouted_interactions_are_ignored() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let session = mount_counter(&adaptor, SessionConfig::default());
            session.settle().await;
            adaptor.take_calls();

            session
                .act(|| {
                    adaptor.emit(click(1, "message-1", "unknown"));
                    adaptor.emit(click(2, "message-99", "increment"));
                })
                .await;

            assert!(adaptor.calls().is_empty());
            assert_eq!(session.renderer().render_count(), 1);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn acknowledgements_can_be_disabled() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let session = mount_counter(
                &adaptor,
                SessionConfig::default().with_acknowledge_interactions(false),
            );
            session.settle().await;
            session
                .act(|| adaptor.emit(click(1, "message-1", "increment")))
                .await;

            assert_eq!(adaptor.count(CallKind::Acknowledge), 0);
            assert_eq!(adaptor.count(CallKind::Edit), 1);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn failed_acknowledgement_still_dispatches() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let session = mount_counter(&adaptor, SessionConfig::default());
            session.settle().await;
            adaptor.fail_next(CallKind::Acknowledge, 1);
            session
                .act(|| adaptor.emit(click(1, "message-1", "increment")))
                .await;

            let content = session
                .screen()
                .latest_payload()
                .and_then(|payload| payload.content);
            assert_eq!(content.as_deref(), Some("Count: 1"));
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn select_and_modal_values_reach_handlers() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let received: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
            let runtime = TokioRuntime::new();
            let session = PromptSession::mount(
                adaptor.clone(),
                channel(),
                SessionConfig::default(),
                runtime.scheduler(),
                {
                    let received = received.clone();
                    move || {
                        let received_select = received.clone();
                        use_interaction("colour", move |interaction| {
                            received_select
                                .borrow_mut()
                                .extend(interaction.values().iter().cloned());
                        });
                        let received_modal = received.clone();
                        use_interaction("rename", move |interaction| {
                            if let Some(name) = interaction.field("name") {
                                received_modal.borrow_mut().push(name.to_string());
                            }
                        });
                        MessagePayload::text("Pick one").with_row(
                            ActionRow::new().with(
                                SelectMenu::new("colour")
                                    .option("Red", "red")
                                    .option("Blue", "blue"),
                            ),
                        )
                    }
                },
            );
            session.settle().await;

            let mut fields = IndexMap::new();
            fields.insert("name".to_string(), "Ferris".to_string());
            session
                .act(|| {
                    adaptor.emit(Interaction::select(
                        InteractionRef::new("interaction-1", "token"),
                        MessageId::from("message-1"),
                        "colour",
                        vec!["red".to_string(), "blue".to_string()],
                    ));
                    adaptor.emit(Interaction::modal_submit(
                        InteractionRef::new("interaction-2", "token"),
                        None,
                        "rename",
                        fields,
                    ));
                })
                .await;

            assert_eq!(*received.borrow(), vec!["red", "blue", "Ferris"]);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn handlers_follow_the_latest_render() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let runtime = TokioRuntime::new();
            let session = PromptSession::mount(
                adaptor.clone(),
                channel(),
                SessionConfig::default(),
                runtime.scheduler(),
                || {
                    let confirmed = use_state(|| false);
                    if !confirmed.value() {
                        let confirmed = confirmed.clone();
                        use_interaction("confirm", move |_| {
                            confirmed.set(true);
                        });
                        MessagePayload::text("Are you sure?")
                            .with_row(ActionRow::new().with(Button::new("confirm", "Yes")))
                    } else {
                        MessagePayload::text("Done")
                    }
                },
            );
            session.settle().await;
            session
                .act(|| adaptor.emit(click(1, "message-1", "confirm")))
                .await;
            adaptor.take_calls();

            session
                .act(|| adaptor.emit(click(2, "message-1", "confirm")))
                .await;
            assert!(adaptor.calls().is_empty(), "stale button has no handler");
            assert!(matches!(
                session.screen().latest_payload(),
                Some(ref payload) if !payload.has_components()
            ));
        })
        .await;
}

#[test]
#[should_panic(expected = "use_interaction requires a prompt rendered by a PromptSession")]
fn use_interaction_outside_a_session_panics() {
    let store = prompt_core::HookStore::new();
    let _ = store.render(|| use_interaction("orphan", |_: &Interaction| {}));
}

#[tokio::test(flavor = "current_thread")]
async fn edits_after_send_failure_recover() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            adaptor.fail_next(CallKind::Send, 1);
            let session = mount_counter(&adaptor, SessionConfig::default());
            session.settle().await;
            assert_eq!(session.message_id(), None);

            session.act(|| session.update()).await;
            assert_eq!(session.message_id(), Some(MessageId::from("message-1")));
            assert!(matches!(
                adaptor.last_call(),
                Some(AdaptorCall::SendMessage { .. })
            ));
        })
        .await;
}
