use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use prompt_core::{use_effect, use_state, MessageId};
use prompt_runtime_std::TokioRuntime;
use prompt_screen::{
    ActionRow, Button, ChannelId, FieldUpdate, Interaction, InteractionRef, MessagePayload,
    Target,
};
use prompt_session::{use_interaction, CloseReason, ClosePolicy, PromptSession, SessionConfig};
use prompt_testing::{AdaptorCall, CallKind, RecordingAdaptor};
use tokio::task::LocalSet;
use tokio::time::Instant;

fn mount(
    adaptor: &Rc<RecordingAdaptor>,
    config: SessionConfig,
    cleanups: Rc<Cell<usize>>,
) -> PromptSession {
    let runtime = TokioRuntime::new();
    PromptSession::mount(
        adaptor.clone(),
        Target::Channel(ChannelId::new("channel-1")),
        config,
        runtime.scheduler(),
        move || {
            let count = use_state(|| 0);
            let cleanups = cleanups.clone();
            use_effect((), move |scope| {
                scope.on_cleanup(move || cleanups.set(cleanups.get() + 1))
            });
            {
                let count = count.clone();
                use_interaction("increment", move |_| {
                    count.update(|value| value + 1);
                });
            }
            MessagePayload::text(format!("Count: {}", count.value()))
                .with_row(ActionRow::new().with(Button::new("increment", "+1")))
        },
    )
}

fn click(n: usize) -> Interaction {
    Interaction::button(
        InteractionRef::new(format!("interaction-{n}"), "token"),
        MessageId::from("message-1"),
        "increment",
    )
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn lifetime_timeout_closes_with_policy() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let cleanups = Rc::new(Cell::new(0));
            let started = Instant::now();
            let session = mount(
                &adaptor,
                SessionConfig::default().with_timeout(Duration::from_secs(60)),
                cleanups.clone(),
            );
            session.settle().await;

            session.closed().await;

            assert!(started.elapsed() >= Duration::from_secs(60));
            assert_eq!(session.close_reason(), Some(CloseReason::Timeout));
            assert!(session.is_closed());
            assert_eq!(cleanups.get(), 1);
            assert_eq!(adaptor.subscriber_count(), 0);
            match adaptor.last_call() {
                Some(AdaptorCall::EditMessage { patch, .. }) => {
                    assert_eq!(patch.components, Some(FieldUpdate::Clear));
                    assert!(patch.content.is_none());
                }
                other => panic!("expected a component-stripping edit, got {other:?}"),
            }
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn successful_commits_push_back_the_idle_timeout() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let started = Instant::now();
            let session = mount(
                &adaptor,
                SessionConfig::default()
                    .with_idle_timeout(Duration::from_secs(30))
                    .with_close_policy(ClosePolicy::DeleteMessage),
                Rc::new(Cell::new(0)),
            );
            session.settle().await;

            tokio::time::advance(Duration::from_secs(20)).await;
            assert!(!session.is_closed());
            session.act(|| adaptor.emit(click(1))).await;
            assert_eq!(session.idle_remaining(), Some(Duration::from_secs(30)));

            tokio::time::advance(Duration::from_secs(20)).await;
            assert!(!session.is_closed(), "the click reset the idle timer");

            session.closed().await;
            assert!(started.elapsed() >= Duration::from_secs(50));
            assert_eq!(session.close_reason(), Some(CloseReason::IdleTimeout));
            assert!(matches!(
                adaptor.last_call(),
                Some(AdaptorCall::DeleteMessage { .. })
            ));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn user_close_runs_once() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let cleanups = Rc::new(Cell::new(0));
            let session = mount(
                &adaptor,
                SessionConfig::default()
                    .with_timeout(Duration::from_secs(600))
                    .with_close_policy(ClosePolicy::DeleteMessage),
                cleanups.clone(),
            );
            session.settle().await;
            assert_eq!(adaptor.subscriber_count(), 1);

            session.close();
            session.close();
            session.closed().await;

            assert_eq!(session.close_reason(), Some(CloseReason::User));
            assert_eq!(adaptor.count(CallKind::Delete), 1);
            assert_eq!(cleanups.get(), 1);
            assert_eq!(adaptor.subscriber_count(), 0);
            assert!(session.screen().is_closed());

            let calls_before = adaptor.calls().len();
            adaptor.emit(click(1));
            session.update();
            session.settle().await;
            assert_eq!(adaptor.calls().len(), calls_before);

            tokio::time::advance(Duration::from_secs(900)).await;
            assert_eq!(session.close_reason(), Some(CloseReason::User));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn keep_policy_leaves_the_message_alone() {
    LocalSet::new()
        .run_until(async {
            let adaptor = Rc::new(RecordingAdaptor::new());
            let session = mount(
                &adaptor,
                SessionConfig::default().with_close_policy(ClosePolicy::Keep),
                Rc::new(Cell::new(0)),
            );
            session.settle().await;
            adaptor.take_calls();

            session.close();
            session.closed().await;
            assert!(adaptor.calls().is_empty());
            assert_eq!(session.message_id(), Some(MessageId::from("message-1")));
        })
        .await;
}
