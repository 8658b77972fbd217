use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use fieldkit::prelude::*;
use fieldkit::{ChangeEvent, DocStatus, InMemoryLinkIndex, parse_descriptors};

fn order_fields() -> Vec<FieldDescriptor> {
    parse_descriptors(&json!([
        {"key": "customer", "kind": "Link", "options": "Customer", "mandatory": true},
        {"key": "customer_name", "kind": "Data", "fetch_from": "customer.customer_name", "read_only": true},
        {"key": "territory", "kind": "Data", "fetch_from": "customer.territory", "read_only": true},
        {"key": "priority", "kind": "Select", "options": "Low\nHigh", "default": "Low"},
        {"key": "escalation_note", "kind": "Text", "depends_on": "eval:doc.priority == \"High\"", "mandatory": true}
    ]))
    .unwrap()
}

fn customers() -> Arc<InMemoryLinkIndex> {
    Arc::new(
        InMemoryLinkIndex::new()
            .with_record(
                "Customer",
                "ACME",
                [
                    ("customer_name".to_string(), json!("Acme Corporation")),
                    ("territory".to_string(), json!("EU")),
                ],
            ),
    )
}

async fn order_form(store: &Arc<RecordStore>, ctx: &FormContext) -> FormLayout {
    let record = store.insert(Record::new("Sales Order", "SO-1"));
    FormLayout::for_record(order_fields(), record, store.clone(), ctx)
        .await
        .unwrap()
}

#[tokio::test]
async fn defaults_are_written_through_the_store() {
    let store = Arc::new(RecordStore::new());
    let ctx = FormContext::new(ControlRegistry::default().with_link_validator(customers()))
        .with_permissions(Arc::new(PermissionSet::full()));
    let layout = order_form(&store, &ctx).await;

    let record = layout.record().unwrap();
    assert_eq!(record.read().get("priority"), Some(&json!("Low")));
}

#[tokio::test]
async fn link_commit_fills_fetched_fields() {
    let store = Arc::new(RecordStore::new());
    let ctx = FormContext::new(ControlRegistry::default().with_link_validator(customers()))
        .with_permissions(Arc::new(PermissionSet::full()));
    let layout = order_form(&store, &ctx).await;

    let views = layout.refresh();
    assert_eq!(views[1].status, DisplayStatus::None);

    layout.set_value("customer", json!("acme")).await.unwrap();
    let views = layout.refresh();
    assert_eq!(layout.get_value("customer").unwrap(), Some(json!("ACME")));
    assert_eq!(views[1].status, DisplayStatus::Read);
    assert_eq!(views[1].display.as_deref(), Some("Acme Corporation"));
    assert_eq!(views[2].display.as_deref(), Some("EU"));

    layout.set_value("customer", json!("Initech")).await.unwrap();
    let record = layout.record().unwrap().read();
    assert_eq!(record.get("customer"), Some(&json!("")));
    assert_eq!(record.get("customer_name"), Some(&json!("")));
    assert_eq!(record.get("territory"), Some(&json!("")));
}

#[tokio::test]
async fn depends_on_and_mandatory_follow_commits() {
    let store = Arc::new(RecordStore::new());
    let ctx = FormContext::new(ControlRegistry::default().with_link_validator(customers()))
        .with_permissions(Arc::new(PermissionSet::full()));
    let layout = order_form(&store, &ctx).await;
    layout.refresh();

    let missing = |layout: &FormLayout| -> Vec<String> {
        layout.missing_mandatory().into_iter().map(|field| field.key.clone()).collect()
    };
    assert_eq!(missing(&layout), ["customer"]);
    assert_eq!(layout.control("escalation_note").unwrap().status(), DisplayStatus::None);

    layout.set_value("priority", json!("High")).await.unwrap();
    assert_eq!(layout.control("escalation_note").unwrap().status(), DisplayStatus::Write);
    assert_eq!(missing(&layout), ["customer", "escalation_note"]);

    layout.set_value("priority", json!("Urgent")).await.unwrap();
    assert_eq!(layout.get_value("priority").unwrap(), Some(json!("")));
    assert_eq!(layout.control("escalation_note").unwrap().status(), DisplayStatus::None);
}

#[tokio::test]
async fn change_hook_sees_every_commit_in_order() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = seen.clone();
    let store = Arc::new(RecordStore::new());
    let ctx = FormContext::new(ControlRegistry::default().with_link_validator(customers()))
        .with_change_hook(Arc::new(move |event: &ChangeEvent| {
            sink.lock().push(format!("{}={}", event.key, event.value));
        }));
    let layout = order_form(&store, &ctx).await;

    layout.set_value("customer", json!("ACME")).await.unwrap();
    layout.set_value("priority", json!("High")).await.unwrap();

    assert_eq!(*seen.lock(), ["customer=\"ACME\"", "priority=\"High\""]);
}

#[tokio::test]
async fn submitted_records_are_read_only() {
    let store = Arc::new(RecordStore::new());
    let record = store.insert(
        Record::new("Sales Order", "SO-2")
            .with_docstatus(DocStatus::Submitted)
            .with_value("customer", json!("ACME"))
            .with_value("priority", json!("High")),
    );
    let ctx = FormContext::default().with_permissions(Arc::new(PermissionSet::full()));
    let layout = FormLayout::for_record(order_fields(), record, store.clone(), &ctx)
        .await
        .unwrap();

    let views = layout.refresh();
    let statuses: Vec<_> = views.iter().map(|view| view.status).collect();
    assert_eq!(
        statuses,
        [
            DisplayStatus::Read,
            DisplayStatus::None,
            DisplayStatus::None,
            DisplayStatus::Read,
            DisplayStatus::None,
        ]
    );
    assert_eq!(
        views[0].display.as_deref(),
        Some("<a href=\"/app/customer/ACME\">ACME</a>")
    );
    assert_eq!(layout.to_document()["docstatus"], json!(1));
}

#[tokio::test]
async fn dialog_forms_keep_values_locally() {
    let fields = vec![
        FieldDescriptor::new("subject", FieldKind::Data).mandatory(),
        FieldDescriptor::new("due", FieldKind::Date),
        FieldDescriptor::new("intro", FieldKind::Html).with_options("<p>Fill in</p>"),
    ];
    let layout = FormLayout::new(fields, &FormContext::default()).unwrap();
    layout.refresh();
    layout.set_value("subject", json!("Plan")).await.unwrap();
    layout.set_value("due", json!("01-02-2025")).await.unwrap();

    assert!(layout.missing_mandatory().is_empty());
    assert_eq!(
        layout.to_document(),
        json!({"subject": "Plan", "due": "2025-02-01"})
    );
    let views = layout.refresh();
    assert_eq!(views[1].input.as_ref().unwrap().value, "01-02-2025");
    assert_eq!(views[2].display.as_deref(), Some("<p>Fill in</p>"));
    assert_eq!(layout.get_value("intro").unwrap(), Some(Value::Null));
}
