use super::*;
use futures::executor::block_on;
use futures::future::FutureExt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn scheduler() -> Scheduler {
    Scheduler::new(Rc::new(DefaultScheduler::default()))
}

#[derive(Default)]
struct CommitLog {
    payloads: RefCell<Vec<String>>,
    fail_next: Cell<bool>,
}

impl CommitLog {
    fn count(&self) -> usize {
        self.payloads.borrow().len()
    }

    fn last(&self) -> Option<String> {
        self.payloads.borrow().last().cloned()
    }
}

fn recording_committer(log: Rc<CommitLog>) -> impl Committer<String> {
    move |payload: String| {
        let log = Rc::clone(&log);
        async move {
            if log.fail_next.replace(false) {
                return None;
            }
            log.payloads.borrow_mut().push(payload);
            Some(MessageId::from("message-1"))
        }
        .boxed_local()
    }
}

fn mount<F>(prompt: F) -> (Renderer<String>, Rc<CommitLog>)
where
    F: FnMut() -> String + 'static,
{
    let log = Rc::new(CommitLog::default());
    let renderer = Renderer::new(scheduler(), recording_committer(Rc::clone(&log)), prompt);
    block_on(renderer.act(|| renderer.mount()));
    (renderer, log)
}

#[test]
#[should_panic(expected = "no active render context")]
fn hook_outside_render_panics() {
    let _ = use_state(|| 0);
}

#[test]
fn store_rejects_nested_render() {
    let store = HookStore::new();
    store.start_render().expect("first bind");
    assert_eq!(store.start_render(), Err(HookError::AlreadyRendering));
    store.end_render().expect("unbind");
    assert!(current_store().is_err());
}

#[test]
fn store_binds_itself_while_rendering() {
    let store = HookStore::new();
    let seen = store
        .render(|| current_store().map(|current| current.ptr_eq(&store)))
        .expect("render");
    assert_eq!(seen, Ok(true));
    assert!(current_store().is_err());
}

#[test]
fn fewer_hooks_than_previous_render_is_an_order_violation() {
    let store = HookStore::new();
    store
        .render(|| {
            store.use_state(|| 0).expect("state");
            store.use_ref(|| "a").expect("ref");
        })
        .expect("first render");

    let result = store.render(|| {
        store.use_state(|| 0).expect("state");
    });

    match result {
        Err(HookError::HookOrderViolation {
            index,
            expected,
            found,
        }) => {
            assert_eq!(index, 1);
            assert!(matches!(
                expected,
                SlotShape::Hook {
                    kind: SlotKind::Ref,
                    ..
                }
            ));
            assert_eq!(found, SlotShape::End);
        }
        other => panic!("expected order violation, got {other:?}"),
    }
}

#[test]
fn swapped_hooks_are_an_order_violation() {
    let store = HookStore::new();
    store
        .render(|| {
            store.use_state(|| 0).expect("state");
            store.use_ref(|| 0).expect("ref");
        })
        .expect("first render");

    let swapped = store.render(|| store.use_ref(|| 0).map(|_| ()));
    let violation = match swapped {
        Ok(inner) => inner.err(),
        Err(err) => Some(err),
    };
    assert!(matches!(
        violation,
        Some(HookError::HookOrderViolation { .. })
    ));
}

#[test]
fn extra_hook_after_first_render_is_an_order_violation() {
    let store = HookStore::new();
    store
        .render(|| {
            store.use_state(|| 0).expect("state");
        })
        .expect("first render");

    let result = store
        .render(|| {
            store.use_state(|| 0).expect("state");
            store.use_ref(|| 0).map(|_| ())
        })
        .expect("render completes");
    assert_eq!(
        result.err(),
        Some(HookError::HookOrderViolation {
            index: 1,
            expected: SlotShape::End,
            found: SlotShape::Hook {
                kind: SlotKind::Ref,
                type_name: std::any::type_name::<RefCell<i32>>(),
            },
        })
    );
}

#[test]
#[should_panic(expected = "hook order violation")]
fn conditional_hook_panics_during_update() {
    let flip = Rc::new(Cell::new(false));
    let prompt_flip = Rc::clone(&flip);
    let (renderer, _log) = mount(move || {
        if prompt_flip.get() {
            let _ = use_ref(|| 0);
        } else {
            let _ = use_state(|| 0);
        }
        String::from("body")
    });
    flip.set(true);
    block_on(renderer.act(|| renderer.update()));
}

#[test]
fn setter_with_equal_value_does_not_dispatch() {
    let store = HookStore::new();
    let dispatches = Rc::new(Cell::new(0));
    let counter = Rc::clone(&dispatches);
    store.set_dispatch(move || counter.set(counter.get() + 1));

    let state = store
        .render(|| store.use_state(|| 5).expect("state"))
        .expect("render");

    assert!(!state.set(5));
    assert_eq!(dispatches.get(), 0);
    assert!(state.update(|value| value + 1));
    assert_eq!(dispatches.get(), 1);
    assert_eq!(state.value(), 6);
}

#[test]
fn mount_renders_and_commits_once() {
    let (renderer, log) = mount(|| String::from("hello"));
    assert_eq!(renderer.render_count(), 1);
    assert_eq!(log.count(), 1);
    assert_eq!(log.last().as_deref(), Some("hello"));
    assert_eq!(renderer.phase(), RenderPhase::Mounted);
}

#[test]
fn rapid_updates_collapse_into_one_render_and_commit() {
    let captured: Rc<RefCell<Option<MutableState<i32>>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&captured);
    let (renderer, log) = mount(move || {
        let count = use_state(|| 0);
        slot.borrow_mut().replace(count.clone());
        format!("count: {}", count.value())
    });
    let count = captured.borrow().clone().expect("state captured");

    block_on(renderer.act(|| {
        for _ in 0..3 {
            count.update(|value| value + 1);
        }
    }));

    assert_eq!(count.value(), 3);
    assert_eq!(renderer.render_count(), 2);
    assert_eq!(log.count(), 2);
    assert_eq!(log.last().as_deref(), Some("count: 3"));
}

#[test]
fn effect_runs_when_deps_change() {
    let deps = Rc::new(Cell::new((1, 2)));
    let runs = Rc::new(Cell::new(0));
    let (prompt_deps, prompt_runs) = (Rc::clone(&deps), Rc::clone(&runs));
    let (renderer, _log) = mount(move || {
        let runs = Rc::clone(&prompt_runs);
        use_effect(prompt_deps.get(), move |_| {
            runs.set(runs.get() + 1);
            EffectResult::default()
        });
        String::new()
    });
    assert_eq!(runs.get(), 1);

    block_on(renderer.act(|| renderer.update()));
    assert_eq!(runs.get(), 1, "same deps must not re-run the effect");

    deps.set((2, 2));
    block_on(renderer.act(|| renderer.update()));
    assert_eq!(runs.get(), 2);
}

#[test]
fn effect_without_deps_runs_every_render_and_empty_deps_runs_once() {
    let always = Rc::new(Cell::new(0));
    let once = Rc::new(Cell::new(0));
    let (prompt_always, prompt_once) = (Rc::clone(&always), Rc::clone(&once));
    let (renderer, _log) = mount(move || {
        let always = Rc::clone(&prompt_always);
        let once = Rc::clone(&prompt_once);
        use_effect_always(move |_| {
            always.set(always.get() + 1);
            EffectResult::default()
        });
        use_effect((), move |_| {
            once.set(once.get() + 1);
            EffectResult::default()
        });
        String::new()
    });

    for _ in 0..2 {
        block_on(renderer.act(|| renderer.update()));
    }
    assert_eq!(always.get(), 3);
    assert_eq!(once.get(), 1);
}

#[test]
fn effects_receive_committed_message_id() {
    let seen: Rc<RefCell<Option<MessageId>>> = Rc::new(RefCell::new(None));
    let prompt_seen = Rc::clone(&seen);
    let (_renderer, _log) = mount(move || {
        let seen = Rc::clone(&prompt_seen);
        use_effect((), move |scope| {
            seen.borrow_mut().replace(scope.message_id().clone());
            EffectResult::default()
        });
        String::new()
    });
    assert_eq!(seen.borrow().as_ref().map(MessageId::as_str), Some("message-1"));
}

#[test]
fn cleanup_runs_before_rerun_and_on_unmount() {
    let events: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let generation = Rc::new(Cell::new(0));
    let (prompt_events, prompt_generation) = (Rc::clone(&events), Rc::clone(&generation));
    let (renderer, _log) = mount(move || {
        let events = Rc::clone(&prompt_events);
        let current = prompt_generation.get();
        use_effect(current, move |scope| {
            events.borrow_mut().push(format!("run {current}"));
            let events = Rc::clone(&events);
            scope.on_cleanup(move || events.borrow_mut().push(format!("cleanup {current}")))
        });
        String::new()
    });

    generation.set(1);
    block_on(renderer.act(|| renderer.update()));
    block_on(renderer.act(|| renderer.unmount()));

    assert_eq!(
        *events.borrow(),
        vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
    );
    assert!(renderer.store().is_closed());
}

#[test]
fn failed_commit_keeps_effects_queued() {
    let log = Rc::new(CommitLog::default());
    log.fail_next.set(true);
    let runs = Rc::new(Cell::new(0));
    let prompt_runs = Rc::clone(&runs);
    let renderer = Renderer::new(
        scheduler(),
        recording_committer(Rc::clone(&log)),
        move || {
            let runs = Rc::clone(&prompt_runs);
            use_effect((), move |_| {
                runs.set(runs.get() + 1);
                EffectResult::default()
            });
            String::from("body")
        },
    );

    block_on(renderer.act(|| renderer.mount()));
    assert_eq!(runs.get(), 0);
    assert_eq!(renderer.store().pending_effect_count(), 1);

    block_on(renderer.act(|| renderer.update()));
    assert_eq!(runs.get(), 1);
    assert_eq!(log.count(), 1);
}

#[test]
fn memo_recomputes_only_when_deps_change() {
    let key = Rc::new(Cell::new(1));
    let computations = Rc::new(Cell::new(0));
    let (prompt_key, prompt_computations) = (Rc::clone(&key), Rc::clone(&computations));
    let (renderer, log) = mount(move || {
        let current = prompt_key.get();
        let computations = Rc::clone(&prompt_computations);
        let doubled = use_memo(current, move || {
            computations.set(computations.get() + 1);
            current * 2
        });
        doubled.to_string()
    });

    block_on(renderer.act(|| renderer.update()));
    assert_eq!(computations.get(), 1);

    key.set(4);
    block_on(renderer.act(|| renderer.update()));
    assert_eq!(computations.get(), 2);
    assert_eq!(log.last().as_deref(), Some("8"));
}

#[test]
fn ref_writes_never_render() {
    let captured: Rc<RefCell<Option<RefHandle<u32>>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&captured);
    let (renderer, _log) = mount(move || {
        let clicks = use_ref(|| 0u32);
        slot.borrow_mut().replace(clicks.clone());
        format!("{}", clicks.current())
    });
    let clicks = captured.borrow().clone().expect("ref captured");

    block_on(renderer.act(|| clicks.with_mut(|value| *value += 10)));
    assert_eq!(renderer.render_count(), 1);
    assert_eq!(clicks.current(), 10);
}

#[test]
fn reducer_routes_actions_through_state() {
    #[derive(Clone)]
    enum Action {
        Add(i32),
        Reset,
    }

    let captured: Rc<RefCell<Option<ReducerDispatch<i32, Action>>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&captured);
    let (renderer, log) = mount(move || {
        let (total, dispatch) = use_reducer(
            |total: &i32, action: Action| match action {
                Action::Add(amount) => total + amount,
                Action::Reset => 0,
            },
            || 0,
        );
        slot.borrow_mut().replace(dispatch);
        total.to_string()
    });
    let dispatch = captured.borrow().clone().expect("dispatch captured");

    block_on(renderer.act(|| {
        dispatch.dispatch(Action::Add(2));
        dispatch.dispatch(Action::Add(5));
    }));
    assert_eq!(log.last().as_deref(), Some("7"));

    assert!(!block_on(renderer.act(|| {
        dispatch.dispatch(Action::Reset);
        dispatch.dispatch(Action::Add(0))
    })));
    assert_eq!(log.last().as_deref(), Some("0"));
}

#[test]
fn observed_value_notifies_once_after_mark() {
    let notified: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
    let captured: Rc<RefCell<Option<(MutableState<i32>, MarkChanged)>>> =
        Rc::new(RefCell::new(None));
    let (prompt_notified, slot) = (Rc::clone(&notified), Rc::clone(&captured));
    let (renderer, _log) = mount(move || {
        let value = use_state(|| 0);
        let notified = Rc::clone(&prompt_notified);
        let mark = use_observed_value(value.value(), move |value| {
            notified.borrow_mut().push(value)
        });
        slot.borrow_mut().replace((value.clone(), mark));
        value.value().to_string()
    });
    let (value, mark) = captured.borrow().clone().expect("captured");

    block_on(renderer.act(|| renderer.update()));
    assert!(notified.borrow().is_empty());

    block_on(renderer.act(|| {
        value.set(9);
        mark.mark_changed();
    }));
    assert_eq!(*notified.borrow(), vec![9]);

    block_on(renderer.act(|| renderer.update()));
    assert_eq!(*notified.borrow(), vec![9]);
    assert!(!mark.is_marked());
}

#[test]
fn keyed_collection_skips_renders_for_unchanged_writes() {
    let captured: Rc<RefCell<Option<KeyedCollection<String, u32>>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&captured);
    let (renderer, log) = mount(move || {
        let votes = use_keyed_collection(|| {
            let mut initial = IndexMap::new();
            initial.insert(String::from("yes"), 0);
            initial.insert(String::from("no"), 0);
            initial
        });
        slot.borrow_mut().replace(votes.clone());
        votes
            .entries()
            .iter()
            .map(|(option, count)| format!("{option}={count}"))
            .collect::<Vec<_>>()
            .join(",")
    });
    let votes = captured.borrow().clone().expect("collection captured");

    assert!(!block_on(renderer.act(|| votes.set(String::from("yes"), 0))));
    assert_eq!(renderer.render_count(), 1);

    block_on(renderer.act(|| {
        votes.set_each([(String::from("yes"), 2), (String::from("no"), 1)])
    }));
    assert_eq!(renderer.render_count(), 2);
    assert_eq!(log.last().as_deref(), Some("yes=2,no=1"));

    assert!(block_on(renderer.act(|| votes.remove(&String::from("no")))));
    assert_eq!(votes.len(), 1);
    assert_eq!(votes.get(&String::from("yes")), Some(2));
}

#[test]
fn provided_context_is_visible_to_hooks() {
    struct Theme(&'static str);

    let store = HookStore::new();
    store.provide(Rc::new(Theme("dark")));
    let name = store
        .render(|| use_context::<Theme>().map(|theme| theme.0))
        .expect("render");
    assert_eq!(name, Some("dark"));
}

#[test]
fn updates_after_unmount_are_ignored() {
    let captured: Rc<RefCell<Option<MutableState<i32>>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&captured);
    let (renderer, log) = mount(move || {
        let count = use_state(|| 0);
        slot.borrow_mut().replace(count.clone());
        count.value().to_string()
    });
    let count = captured.borrow().clone().expect("state captured");

    block_on(renderer.act(|| renderer.unmount()));
    block_on(renderer.act(|| count.set(4)));

    assert_eq!(renderer.phase(), RenderPhase::Unmounted);
    assert_eq!(renderer.render_count(), 1);
    assert_eq!(log.count(), 1);

    renderer.mount();
    assert_eq!(renderer.phase(), RenderPhase::Unmounted);
}
