// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item manager: one collection, several filters, replies out of order.
//!
//! Shows that repeated `show` calls share one load, that a new query
//! re-fetches, and that when replies arrive out of order only the latest
//! request is applied.
//!
//! Run:
//! - `cargo run -p trellis_demos --example item_manager`

use trellis_class::Options;
use trellis_component::event::{COLLECTION_LOAD_FAILED, COLLECTION_LOADED, COLLECTION_LOADING};
use trellis_component::{
    ComponentDescriptor, ComponentTree, EventPayload, FrameworkConfig, ShowOptions,
    collection_component_type,
};
use trellis_demos::{ConsoleView, MemoryStore, init_logging};

const CONFIG: &str = r#"
debug = true

[defaults]
resource = "items"
"#;

fn main() {
    init_logging();

    let store = MemoryStore::new();
    for (title, status) in [
        ("write docs", "open"),
        ("fix flaky test", "open"),
        ("ship 0.1", "done"),
        ("triage issues", "open"),
    ] {
        store.seed(
            "items",
            Options::new().with("title", title).with("status", status),
        );
    }

    let config = match FrameworkConfig::from_toml_str(CONFIG) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    let mut tree = ComponentTree::with_config(config).with_store(Box::new(store.clone()));

    let item_table = ComponentDescriptor::new("ItemTable")
        .parent(&collection_component_type())
        .option("query", serde_json::json!({ "status": "open" }))
        .build();
    let table = tree.create_with(&item_table, Options::new());
    tree.set_view(table, ConsoleView::boxed("items"));

    for event in [COLLECTION_LOADING, COLLECTION_LOADED, COLLECTION_LOAD_FAILED] {
        tree.listen(table, event, |_, e| {
            if let EventPayload::Collection {
                collection,
                response,
            } = &e.payload
            {
                match response {
                    Some(r) => println!("{}: {r}", e.name),
                    None => println!("{}: {} items", e.name, collection.len()),
                }
            }
        });
    }

    println!("== two shows, one load ==");
    tree.show(table, ShowOptions::default());
    tree.show(table, ShowOptions::default());
    println!("queued requests: {}", store.queued());
    store.settle(&mut tree);

    println!("== cached show ==");
    tree.show(table, ShowOptions::default());
    println!("queued requests: {}", store.queued());

    println!("== switch filters quickly, newest reply first ==");
    tree.show(
        table,
        ShowOptions::with_query(Options::new().with("status", "done")),
    );
    tree.show(
        table,
        ShowOptions::with_query(Options::new().with("status", "open")),
    );
    store.settle_newest(&mut tree);
    store.settle(&mut tree);
    let titles: Vec<_> = tree
        .collection(table)
        .unwrap_or_default()
        .iter()
        .filter_map(|m| m.get("title").and_then(|t| t.as_str()))
        .collect();
    println!("showing {titles:?} for {:?}", tree.query(table));

    println!("== store goes offline ==");
    store.set_offline(true);
    tree.fetch_collection(table, None, None);
    store.settle(&mut tree);
    println!("still showing {} items", tree.collection(table).map_or(0, <[_]>::len));
}
