// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wizard: singly steps, an overlay help panel, and bubbled navigation.
//!
//! Each step overrides `show` to print a header before the built-in show
//! runs. Steps ask to advance by triggering `wizard:next`, which the wizard
//! bubbles from every step and answers by showing the following one.
//!
//! Run:
//! - `cargo run -p trellis_demos --example wizard`

use serde_json::json;
use trellis_class::Options;
use trellis_component::event::{COMPONENT_HIDDEN, COMPONENT_SHOWN};
use trellis_component::{
    ComponentDescriptor, ComponentTree, EventPayload, HideOptions, METHOD_SHOW, ShowOptions,
    component_type,
};
use trellis_demos::{ConsoleView, init_logging};

const NEXT: &str = "wizard:next";
const STEPS: [&str; 3] = ["account", "profile", "confirm"];

fn main() {
    init_logging();
    let mut tree = ComponentTree::new();

    let step_type = ComponentDescriptor::new("WizardStep")
        .parent(&component_type())
        .option("title", "Untitled step")
        .method(METHOD_SHOW, |tree, id, sup, args| {
            let title = tree
                .options(id)
                .and_then(|o| o.str("title"))
                .unwrap_or_default()
                .to_owned();
            println!("-- {title} --");
            sup.call(tree, id, args)
        })
        .build();

    let wizard = tree.create_with(&component_type(), Options::new().with("singly", true));
    for (i, name) in STEPS.iter().enumerate() {
        let step = tree.create_with(
            &step_type,
            Options::new().with("title", format!("Step {}: {name}", i + 1)),
        );
        tree.set_view(step, ConsoleView::boxed(*name));
        if let Err(e) = tree.add_component(wizard, step, Some(name)) {
            eprintln!("{e}");
            return;
        }
        tree.bubble(wizard, name, NEXT);
    }
    let help = tree.create_with(&component_type(), Options::new().with("overlay", true));
    tree.set_view(help, ConsoleView::boxed("help"));
    if let Err(e) = tree.add_component(wizard, help, Some("help")) {
        eprintln!("{e}");
        return;
    }

    tree.listen(wizard, NEXT, |tree, e| {
        let Some(parent) = tree.parent_of(e.source) else {
            return;
        };
        let current = tree.name_of(e.source).unwrap_or_default();
        let next = STEPS
            .iter()
            .position(|s| *s == current)
            .and_then(|i| STEPS.get(i + 1));
        match next {
            Some(next) => {
                tree.show_component(parent, next, ShowOptions::default());
            }
            None => println!("wizard finished with {:?}", e.payload),
        }
    });
    for event in [COMPONENT_SHOWN, COMPONENT_HIDDEN] {
        for name in STEPS {
            tree.bubble(wizard, name, event);
        }
        tree.listen(wizard, event, |tree, e| {
            println!("   {} {}", e.name, tree.name_of(e.source).unwrap_or("?"));
        });
    }

    tree.show(wizard, ShowOptions::default());
    tree.show_component(wizard, "account", ShowOptions::default());
    tree.show_component(wizard, "help", ShowOptions::default());

    for step in STEPS {
        if let Some(id) = tree.get_component(wizard, step) {
            tree.trigger(id, NEXT, EventPayload::Custom(vec![json!({ "from": step })]));
        }
        let visible: Vec<_> = tree
            .children(wizard)
            .into_iter()
            .filter(|(_, c)| tree.is_visible(*c))
            .map(|(n, _)| n)
            .collect();
        println!("visible now: {visible:?}");
    }

    println!("== close the wizard ==");
    tree.hide(wizard, HideOptions::default());
    println!("help still visible: {}", tree.is_visible(help));
}
