// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contacts: a list, a detail card and an editor under one singly parent.
//!
//! Selecting a list row shows its card; editing goes through a form whose
//! `validate` method rejects empty names. Only one of the three panes is ever
//! visible.
//!
//! Run:
//! - `cargo run -p trellis_demos --example contacts`

use std::rc::Rc;

use serde_json::{Value, json};
use trellis_class::Options;
use trellis_component::event::{
    COMPONENT_SHOWN, FORM_INVALID, LIST_ITEM_SELECTED, MODEL_SAVED,
};
use trellis_component::{
    ComponentDescriptor, ComponentTree, EventPayload, METHOD_VALIDATE, ShowOptions,
    component_type, form_component_type, list_component_type, model_component_type,
};
use trellis_demos::{ConsoleView, MemoryStore, init_logging};

fn main() {
    init_logging();

    let store = MemoryStore::new();
    for (name, email) in [
        ("Ada Lovelace", "ada@example.org"),
        ("Grace Hopper", "grace@example.org"),
        ("Edsger Dijkstra", "ewd@example.org"),
    ] {
        store.seed(
            "contacts",
            Options::new().with("name", name).with("email", email),
        );
    }
    let mut tree = ComponentTree::new().with_store(Box::new(store.clone()));

    let row = ComponentDescriptor::new("ContactRow")
        .parent(&component_type())
        .build();
    let contact_list = ComponentDescriptor::new("ContactList")
        .parent(&list_component_type())
        .option("resource", "contacts")
        .construct(move |tree: &mut ComponentTree, id, _| {
            tree.set_item_type(id, Rc::clone(&row));
        })
        .build();
    let contact_card = ComponentDescriptor::new("ContactCard")
        .parent(&model_component_type())
        .field("resource", "contacts")
        .build();
    let contact_form = ComponentDescriptor::new("ContactForm")
        .parent(&form_component_type())
        .field("resource", "contacts")
        .method(METHOD_VALIDATE, |_, _, _, args| {
            let name = args
                .first()
                .and_then(|m| m.pointer("/attributes/name"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if name.trim().is_empty() {
                json!({ "name": "a contact needs a name" })
            } else {
                Value::Null
            }
        })
        .build();

    let app = tree.create_with(&component_type(), Options::new().with("singly", true));
    let list = tree.create_with(&contact_list, Options::new());
    let card = tree.create_with(&contact_card, Options::new());
    let form = tree.create_with(&contact_form, Options::new());
    for (child, view) in [(list, "list"), (card, "card"), (form, "form")] {
        tree.set_view(child, ConsoleView::boxed(view));
        if let Err(e) = tree.add_component(app, child, None) {
            eprintln!("cannot attach {view}: {e}");
            return;
        }
    }
    println!("children: {:?}", tree.child_names(app));

    tree.listen(app, COMPONENT_SHOWN, |_, e| {
        if let EventPayload::Component { name, .. } = &e.payload {
            println!("app: {} shown", name.as_deref().unwrap_or("?"));
        }
    });
    tree.bubble(app, "contactList", COMPONENT_SHOWN);
    tree.bubble(app, "contactCard", COMPONENT_SHOWN);
    tree.bubble(app, "contactForm", COMPONENT_SHOWN);

    // Selecting a row opens its card.
    tree.listen(list, LIST_ITEM_SELECTED, move |tree, e| {
        if let EventPayload::ListItem {
            model: Some(model), ..
        } = &e.payload
        {
            tree.show(card, ShowOptions::with_model(model.clone()));
        }
    });
    tree.listen(form, FORM_INVALID, |_, e| {
        if let EventPayload::Invalid { errors } = &e.payload {
            println!("form rejected: {errors}");
        }
    });
    // After a save, go back to a fresh list.
    tree.listen(form, MODEL_SAVED, move |tree, e| {
        if let EventPayload::Model {
            response: Some(response),
            ..
        } = &e.payload
        {
            println!("saved: {response}");
        }
        tree.fetch_collection(list, None, Some(ShowOptions::default()));
    });

    println!("== load the list ==");
    tree.show(list, ShowOptions::default());
    println!("(loading, visible = {})", tree.is_visible(list));
    store.settle(&mut tree);

    println!("== select the second contact ==");
    let items = tree.list_items(list);
    if let Some(&second) = items.get(1) {
        tree.select_list_item(list, second);
    }
    println!(
        "list visible = {}, card visible = {}",
        tree.is_visible(list),
        tree.is_visible(card)
    );

    println!("== edit it ==");
    if let Some(model) = tree.model(card).cloned() {
        tree.show(form, ShowOptions::with_model(model));
    }
    tree.submit(form, &Options::new().with("name", "  "));
    tree.submit(form, &Options::new().with("name", "Rear Admiral Grace Hopper"));
    store.settle(&mut tree);

    println!("current pane: {:?}", tree.current_component(app).and_then(|c| tree.name_of(c)));
    tree.destroy(app);
    println!("components left: {}", tree.len());
}
