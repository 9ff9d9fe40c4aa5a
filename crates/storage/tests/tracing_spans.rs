//! Integration test verifying that `#[instrument]` annotations produce
//! the expected spans on `Manager` operations and backend writes.

#![allow(clippy::expect_used)]

mod common;

use std::sync::{Arc, Mutex};

use common::{User, decoder, encoder};
use local_storage::{AnyStorage, Manager, ManagerConfig};
use tracing::{
    Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names and their `storage` field
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordedSpan {
    name: String,
    storage: Option<String>,
}

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
}

#[derive(Default)]
struct StorageField(Option<String>);

impl Visit for StorageField {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "storage" {
            self.0 = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "storage" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut storage = StorageField::default();
        attrs.record(&mut storage);
        if let Some(span) = ctx.span(id) {
            self.spans
                .lock()
                .expect("lock poisoned")
                .push(RecordedSpan { name: span.name().to_owned(), storage: storage.0 });
        }
    }
}

fn collect() -> (SpanCollector, Arc<Mutex<Vec<RecordedSpan>>>) {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    (collector, spans)
}

fn span(name: &str, storage: &str) -> RecordedSpan {
    RecordedSpan { name: name.to_owned(), storage: Some(storage.to_owned()) }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn manager_operations_create_named_spans() {
    let (collector, spans) = collect();
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let manager = Manager::new([("users", AnyStorage::memory())]);
    manager.append("users", User::new("Karl"), &encoder()).expect("append should succeed");
    let _ = manager.all::<User, _>("users", &decoder());
    let _ = manager.remove("users", &decoder(), |u: &User| u.name == "Karl");
    let _ = manager.clear("users");

    let recorded = spans.lock().expect("lock poisoned");
    for name in ["append", "all", "remove", "clear"] {
        assert!(recorded.contains(&span(name, "users")), "expected a '{name}' span for users, got: {recorded:?}");
    }
}

#[test]
fn missing_storage_still_creates_span() {
    let (collector, spans) = collect();
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let manager = Manager::new([("users", AnyStorage::memory())]);
    let _ = manager.count("missing");

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.contains(&span("count", "missing")), "expected a 'count' span, got: {recorded:?}");
}

#[test]
fn file_writes_create_span() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (collector, spans) = collect();
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let manager = Manager::new([("users", AnyStorage::file(dir.path(), "users").expect("open file storage"))]);
    manager.append("users", User::new("Karl"), &encoder()).expect("append should succeed");

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s.name == "open"), "expected an 'open' span, got: {recorded:?}");
    assert!(recorded.iter().any(|s| s.name == "set_raw_data"), "expected a 'set_raw_data' span, got: {recorded:?}");
}

#[test]
fn config_open_creates_span() {
    let (collector, spans) = collect();
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = ManagerConfig::from_json_str(r#"{ "storages": { "users": { "backend": { "kind": "memory" } } } }"#)
        .expect("valid config");
    let _manager = config.open().expect("open should succeed");

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s.name == "open"), "expected an 'open' span, got: {recorded:?}");
}
