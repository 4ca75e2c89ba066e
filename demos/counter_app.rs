//! Complete counter application demonstrating all features together

use astand::middleware::{console_log, timestamp, Timestamped};
use astand::{Store, StoreOptions};
use chrono::{DateTime, Utc};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct CounterState {
    count: i32,
    step: i32,
    history: Vec<i32>,
    updated_at: Option<DateTime<Utc>>,
}

impl CounterState {
    fn new() -> Self {
        Self {
            count: 0,
            step: 1,
            history: vec![0],
            updated_at: None,
        }
    }

    fn increment(&mut self) {
        self.count += self.step;
        self.history.push(self.count);
    }

    fn decrement(&mut self) {
        self.count -= self.step;
        self.history.push(self.count);
    }

    fn reset(&mut self) {
        self.count = 0;
        self.history.push(0);
    }
}

impl Timestamped for CounterState {
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .without_time()
        .init();

    println!("=== Complete Counter Application ===\n");

    println!("1. Initializing counter with logging and timestamps");
    let options = StoreOptions::new().middleware(console_log()).middleware(timestamp());
    let store = Store::with_options(CounterState::new(), options);

    // Setup a subscriber to log changes
    store.subscribe(|state| {
        println!("   [State] Count: {}, Step: {}", state.count, state.step);
    });

    println!("\n2. Incrementing...");
    store.set_state(|state| state.increment());
    store.set_state(|state| state.increment());
    store.set_state(|state| state.increment());

    println!("\n3. Changing step size to 5");
    store.set_state(|state| state.step = 5);

    println!("\n4. Incrementing with new step...");
    store.set_state(|state| state.increment());

    println!("\n5. Decrementing...");
    store.set_state(|state| state.decrement());
    store.set_state(|state| state.decrement());

    println!("\n6. History:");
    store.read(|state| {
        println!("   {:?}", state.history);
    });

    println!("\n7. Resetting...");
    store.set_state(|state| state.reset());

    println!("\n8. Final state:");
    let state = store.get_raw();
    println!("   {:?}", state.history);
    if let Some(updated_at) = state.updated_at {
        println!("   last updated at {}", updated_at.to_rfc3339());
    }

    println!("\n✓ Counter application complete!");
}
