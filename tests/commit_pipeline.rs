use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use fieldkit::form::{Behaviour, Validated, ValueValidator};
use fieldkit::form::components::{PassThrough, PlainFormatter, TextParser};
use fieldkit::prelude::*;
use fieldkit::{ChangeEvent, InMemoryLinkIndex, ModelMutator, MutationError, RecordRef};

/// Sleeps, then accepts, counting every invocation.
#[derive(Debug, Default)]
struct SlowValidator {
    calls: AtomicUsize,
}

#[async_trait]
impl ValueValidator for SlowValidator {
    async fn validate(
        &self,
        _descriptor: &FieldDescriptor,
        value: Value,
        _fetch_fields: &[String],
    ) -> Result<Validated, ControlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(Validated::accept(value))
    }
}

struct RejectingMutator;

#[async_trait]
impl ModelMutator for RejectingMutator {
    async fn set_field_value(
        &self,
        _record: &RecordRef,
        _key: &str,
        _value: Value,
        _kind: FieldKind,
    ) -> Result<(), MutationError> {
        Err(MutationError::Rejected("server said no".into()))
    }
}

fn slow_control(validator: Arc<SlowValidator>) -> Control {
    let behaviour = Behaviour::new(
        Arc::new(TextParser),
        Arc::new(PlainFormatter::default()),
        validator,
    );
    Control::new(FieldDescriptor::new("title", FieldKind::Data), behaviour)
}

#[tokio::test(start_paused = true)]
async fn second_commit_while_validating_is_skipped() {
    let validator = Arc::new(SlowValidator::default());
    let control = slow_control(validator.clone());
    control.refresh();

    let (first, second) = tokio::join!(control.set_value(json!("a")), control.set_value(json!("b")));

    assert!(first.unwrap().is_committed());
    assert_eq!(second.unwrap(), CommitOutcome::Skipped);
    assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(control.value(), json!("a"));
}

#[tokio::test(start_paused = true)]
async fn latch_is_released_after_each_commit() {
    let validator = Arc::new(SlowValidator::default());
    let control = slow_control(validator.clone());
    control.set_value(json!("a")).await.unwrap();
    assert!(!control.is_committing());
    control.set_value(json!("b")).await.unwrap();
    assert_eq!(validator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(control.value(), json!("b"));
}

#[tokio::test(start_paused = true)]
async fn dropping_a_commit_future_releases_the_latch() {
    let validator = Arc::new(SlowValidator::default());
    let control = slow_control(validator.clone());
    let timed_out =
        tokio::time::timeout(Duration::from_millis(100), control.set_value(json!("a"))).await;
    assert!(timed_out.is_err());
    assert!(!control.is_committing());
    assert_eq!(control.value(), Value::Null);
}

#[tokio::test]
async fn bound_commit_round_trips_through_the_record() {
    let store = Arc::new(RecordStore::new());
    let record = store.insert(Record::new("Task", "T-1"));
    let mut changes = store.subscribe();
    let control = Control::new(
        FieldDescriptor::new("qty", FieldKind::Int),
        ControlRegistry::default().behaviour(FieldKind::Int),
    )
    .with_record(record.clone(), store.clone())
    .with_permissions(Arc::new(PermissionSet::full()));

    control.refresh();
    control.set_value(json!(42)).await.unwrap();
    control.refresh();

    assert_eq!(control.get_value().unwrap(), Some(json!(42)));
    assert_eq!(record.read().get("qty"), Some(&json!(42)));
    let event = changes.try_recv().unwrap();
    assert_eq!((event.key.as_str(), event.value), ("qty", json!(42)));
    assert!(changes.try_recv().is_err());
}

#[tokio::test]
async fn rejected_mutation_keeps_the_committed_value() {
    let record = Record::new("Task", "T-1")
        .with_value("title", json!("before"))
        .into_shared();
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = hook_calls.clone();
    let control = Control::new(
        FieldDescriptor::new("title", FieldKind::Data),
        ControlRegistry::default().behaviour(FieldKind::Data),
    )
    .with_record(record.clone(), Arc::new(RejectingMutator))
    .with_change_hook(Arc::new(move |_: &ChangeEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let err = control.set_value(json!("after")).await.unwrap_err();

    assert!(matches!(err, ControlError::Mutation(MutationError::Rejected(_))));
    assert_eq!(control.value(), json!("before"));
    assert_eq!(control.previous_value(), None);
    assert!(!control.is_committing());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn numeric_input_is_normalized_before_commit() {
    let control = Control::new(
        FieldDescriptor::new("qty", FieldKind::Int),
        ControlRegistry::default().behaviour(FieldKind::Int),
    );
    control.input_changed("12abc").await.unwrap();
    assert_eq!(control.value(), json!(12));
    control.input_changed("abc").await.unwrap();
    assert_eq!(control.value(), Value::Null);
}

#[tokio::test]
async fn malformed_expression_propagates_and_clears_latch() {
    let control = Control::new(
        FieldDescriptor::new("qty", FieldKind::Float),
        ControlRegistry::default().behaviour(FieldKind::Float),
    )
    .with_value(json!(1.5));
    let err = control.set_value(json!("=3*(")).await.unwrap_err();
    assert!(matches!(err, ControlError::Parse(_)));
    assert!(!control.is_committing());
    assert_eq!(control.value(), json!(1.5));
}

#[tokio::test]
async fn deeply_nested_expression_is_a_parse_error() {
    let control = Control::new(
        FieldDescriptor::new("qty", FieldKind::Int),
        ControlRegistry::default().behaviour(FieldKind::Int),
    )
    .with_value(json!(7));
    let raw = Value::String(format!("={}1", "-".repeat(20_000)));
    let err = control.set_value(raw).await.unwrap_err();
    assert!(err.to_string().contains("nested too deeply"), "{err}");
    assert!(!control.is_committing());
    assert_eq!(control.value(), json!(7));
}

#[tokio::test]
async fn large_integers_survive_a_read_write_round_trip() {
    let control = Control::new(
        FieldDescriptor::new("serial", FieldKind::Int),
        ControlRegistry::default().behaviour(FieldKind::Int),
    );
    control.refresh();
    control.set_value(json!(9007199254740993i64)).await.unwrap();
    assert_eq!(control.value(), json!(9007199254740993i64));

    let view = control.refresh();
    assert_eq!(view.input.unwrap().value, "9,007,199,254,740,993");
    assert_eq!(control.get_value().unwrap(), Some(json!(9007199254740993i64)));
}

#[tokio::test]
async fn unreadable_date_is_committed_as_typed() {
    let control = Control::new(
        FieldDescriptor::new("due", FieldKind::Date),
        ControlRegistry::default().behaviour(FieldKind::Date),
    )
    .with_value(json!("2024-01-01"));
    let outcome = control.set_value(json!("next tuesday")).await.unwrap();
    assert_eq!(
        outcome,
        CommitOutcome::Committed {
            value: json!("next tuesday"),
            previous: json!("2024-01-01"),
        }
    );
}

#[tokio::test]
async fn unknown_link_commits_the_empty_sentinel() {
    let links = Arc::new(InMemoryLinkIndex::new().with_record(
        "Customer",
        "ACME",
        [("territory".to_string(), json!("EU"))],
    ));
    let registry = ControlRegistry::default().with_link_validator(links);
    let control = Control::new(
        FieldDescriptor::new("customer", FieldKind::Link).with_options("Customer"),
        registry.behaviour(FieldKind::Link),
    );

    let outcome = control.set_value(json!("Globex")).await.unwrap();

    assert_eq!(
        outcome,
        CommitOutcome::Committed {
            value: json!(""),
            previous: Value::Null
        }
    );
    assert_eq!(control.value(), json!(""));
}

#[tokio::test]
async fn mandatory_state_is_updated_before_the_hook_runs() {
    let seen: Arc<Mutex<Vec<ChangeEvent>>> = Arc::default();
    let sink = seen.clone();
    let control = Arc::new(
        Control::new(
            FieldDescriptor::new("title", FieldKind::Data).mandatory(),
            ControlRegistry::default().behaviour(FieldKind::Data),
        )
        .with_change_hook(Arc::new(move |event: &ChangeEvent| {
            sink.lock().push(event.clone());
        })),
    );
    assert!(control.refresh().mandatory_highlight);

    control.set_value(json!("Quarterly report")).await.unwrap();
    control.set_value(json!("")).await.unwrap();

    let events = seen.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].value, json!("Quarterly report"));
    assert_eq!(events[1].previous, Some(json!("Quarterly report")));
    assert!(control.refresh().mandatory_highlight);
}

#[tokio::test]
async fn controls_are_shareable_across_tasks() {
    let control = Arc::new(Control::new(
        FieldDescriptor::new("title", FieldKind::Data),
        Behaviour::new(
            Arc::new(TextParser),
            Arc::new(PlainFormatter::default()),
            Arc::new(PassThrough),
        ),
    ));
    let worker = control.clone();
    tokio::spawn(async move { worker.set_value(json!("from task")).await })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(control.value(), json!("from task"));
}
