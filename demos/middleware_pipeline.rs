//! Every built-in middleware on one store
//!
//! `RUST_LOG=astand=debug cargo run --example middleware_pipeline`

use std::sync::Arc;
use std::time::Duration;

use astand::middleware::{
    console_log, debug, throttle, timestamp, validation, Level, Timestamped, ValidationCondition,
};
use astand::{MemoryStorage, PersistOptions, Storage, Store, StoreOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestMiddlewareState {
    count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl Timestamped for TestMiddlewareState {
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .without_time()
        .init();

    let storage = Arc::new(MemoryStorage::new());
    let options = StoreOptions::new()
        .middleware(console_log())
        .middleware(timestamp())
        .middleware(debug(
            |prev: &TestMiddlewareState| println!("Before change: {}", prev.count),
            |next: &TestMiddlewareState| println!("After change: {}", next.count),
        ))
        .middleware(validation(vec![
            ValidationCondition::new(|s: &TestMiddlewareState| s.count >= 0, "Count must be non-negative"),
            ValidationCondition::new(|s: &TestMiddlewareState| s.count < 3, "Count is getting large")
                .level(Level::Warn),
        ]))
        .middleware(throttle(Duration::from_millis(10)))
        .persist(PersistOptions::new("testMiddlewareStore", storage.clone()));

    let store = Store::with_options(TestMiddlewareState::default(), options);

    for _ in 0..3 {
        store.set_state(|s| s.count += 1);
    }

    for _ in 0..4 {
        let report = store.set_state(|s| s.count -= 1);
        for (middleware, error) in report.errors() {
            println!("{middleware} rejected the update: {error}");
        }
    }

    match storage.get_item("testMiddlewareStore") {
        Ok(Some(raw)) => println!("Persisted: {raw}"),
        Ok(None) => println!("Nothing persisted"),
        Err(e) => eprintln!("Failed to read storage: {e}"),
    }
}
