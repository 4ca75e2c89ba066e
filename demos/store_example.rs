//! Store example with complex state persisted to disk
//!
//! Run it twice: the second run picks up the todos from the first.

use std::sync::Arc;

use astand::{FileStorage, PersistOptions, Store};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TodoItem {
    id: usize,
    text: String,
    completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct AppState {
    todos: Vec<TodoItem>,
    filter: String,
}

fn main() {
    println!("=== Store Example ===\n");

    let storage = Arc::new(FileStorage::new(std::env::temp_dir().join("astand-demo")));
    println!("Persisting under {}", storage.base_path().display());

    // Create a store, rehydrated from disk if a previous run saved one
    let store = Store::persisted(
        AppState {
            todos: vec![],
            filter: "all".to_string(),
        },
        PersistOptions::new("todoStore", storage),
    );

    // Subscribe to state changes
    store.subscribe(|state| {
        println!(
            "State updated! Active todos: {}",
            state.todos.iter().filter(|t| !t.completed).count()
        );
    });

    // Add a todo
    println!("Adding todo...");
    store.set_state(|state| {
        let id = state.todos.len() + 1;
        state.todos.push(TodoItem {
            id,
            text: format!("Learn Astand #{id}"),
            completed: false,
        });
    });

    // Complete the first open todo
    println!("\nCompleting todo...");
    store.set_state(|state| {
        if let Some(todo) = state.todos.iter_mut().find(|t| !t.completed) {
            todo.completed = true;
        }
    });

    // Switch the filter with a partial update
    println!("\nFiltering...");
    if let Err(e) = store.patch(serde_json::json!({ "filter": "completed" })) {
        eprintln!("patch failed: {e}");
    }

    // Read final state
    println!("\nFinal state: {:#?}", store.get_raw());
}
