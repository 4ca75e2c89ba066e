//! Two stores observed through one subscription

use astand::middleware::console_log;
use astand::{CombinedStore, Store, StoreOptions};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct CounterState {
    count: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct GreeterState {
    name: String,
}

fn main() {
    println!("=== Combined Stores ===\n");

    let counter = Store::new(CounterState::default());
    let greeter = Store::with_options(
        GreeterState {
            name: "World".to_string(),
        },
        StoreOptions::new().middleware(console_log()),
    );

    let combined = CombinedStore::builder()
        .member("counter", counter.clone())
        .member("greeter", greeter.clone())
        .build();

    let subscription = combined.subscribe(|state| {
        println!(
            "It can count {}. Hi, {}!",
            state["counter"]["count"],
            state["greeter"]["name"].as_str().unwrap_or("?")
        );
    });

    counter.set_state(|s| s.count += 1);
    greeter.set_state(|s| s.name = "Bob".to_string());
    greeter.set_state(|s| s.name = "Foo".to_string());

    subscription.unsubscribe();
    counter.set_state(|s| s.count += 1);

    match combined.get_state() {
        Ok(state) => println!("\nFinal snapshot: {}", serde_json::Value::from_iter(state)),
        Err(e) => eprintln!("Failed to snapshot: {e}"),
    }
}
