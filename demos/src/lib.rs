// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared pieces for the Trellis demos: an in-memory store, a console view,
//! and logging setup.
//!
//! Run the demos with, for example:
//! - `cargo run -p trellis_demos --example contacts`
//! - `RUST_LOG=trellis_component=debug cargo run -p trellis_demos --example wizard`

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use trellis_class::Options;
use trellis_component::{
    ComponentTree, Model, RenderContext, Reply, Response, Store, Ticket, View,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a `tracing` subscriber honouring `RUST_LOG` (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[derive(Clone, Debug)]
enum Request {
    FetchModel(String, Value),
    FetchCollection(String, Options),
    Save(String, Model),
}

#[derive(Debug, Default)]
struct Records {
    tables: BTreeMap<String, Vec<Model>>,
    queue: VecDeque<(Ticket, Request)>,
    next_id: i64,
    offline: bool,
}

/// An in-memory store that answers requests when told to.
///
/// Requests queue up until [`MemoryStore::settle`] resolves them against
/// the tree, so demos can show loading states and out-of-order replies.
/// Cloning gives another handle to the same records.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<Records>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to `resource`, assigning an id.
    pub fn seed(&self, resource: &str, attributes: Options) -> Model {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let model = Model::with_id(inner.next_id, attributes);
        inner
            .tables
            .entry(resource.to_owned())
            .or_default()
            .push(model.clone());
        model
    }

    /// While offline, every request fails with a 503.
    pub fn set_offline(&self, offline: bool) {
        self.inner.borrow_mut().offline = offline;
    }

    /// Number of queued requests.
    pub fn queued(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Answer every queued request, oldest first, including requests issued
    /// while answering. Returns how many were answered.
    pub fn settle(&self, tree: &mut ComponentTree) -> usize {
        let mut answered = 0;
        while let Some((ticket, request)) = self.pop(false) {
            let outcome = self.answer(request);
            tree.resolve(ticket, outcome);
            answered += 1;
        }
        answered
    }

    /// Answer only the newest queued request.
    pub fn settle_newest(&self, tree: &mut ComponentTree) -> bool {
        let Some((ticket, request)) = self.pop(true) else {
            return false;
        };
        let outcome = self.answer(request);
        tree.resolve(ticket, outcome)
    }

    fn pop(&self, newest: bool) -> Option<(Ticket, Request)> {
        let mut inner = self.inner.borrow_mut();
        if newest {
            inner.queue.pop_back()
        } else {
            inner.queue.pop_front()
        }
    }

    fn answer(&self, request: Request) -> Result<Reply, Response> {
        let mut inner = self.inner.borrow_mut();
        if inner.offline {
            return Err(Response::new(503, "store offline"));
        }
        match request {
            Request::FetchModel(resource, id) => inner
                .tables
                .get(&resource)
                .and_then(|t| t.iter().find(|m| m.id.as_ref() == Some(&id)))
                .cloned()
                .map(Reply::Model)
                .ok_or_else(|| Response::new(404, format!("no {resource} with id {id}"))),
            Request::FetchCollection(resource, query) => {
                let matches = inner
                    .tables
                    .get(&resource)
                    .map(|t| {
                        t.iter()
                            .filter(|m| query.iter().all(|(k, v)| m.get(k) == Some(v)))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Reply::Collection(matches))
            }
            Request::Save(resource, mut model) => {
                let created = model.id.is_none();
                if created {
                    inner.next_id += 1;
                    model.id = Some(inner.next_id.into());
                }
                let table = inner.tables.entry(resource).or_default();
                match table.iter_mut().find(|m| m.id == model.id) {
                    Some(existing) => existing.clone_from(&model),
                    None => table.push(model.clone()),
                }
                let response = if created {
                    Response::new(201, "created")
                } else {
                    Response::new(200, "updated")
                };
                Ok(Reply::Saved(model, response))
            }
        }
    }

    fn enqueue(&self, ticket: Ticket, request: Request) {
        tracing::debug!(ticket = ticket.get(), ?request, "queued");
        self.inner.borrow_mut().queue.push_back((ticket, request));
    }
}

impl Store for MemoryStore {
    fn fetch_model(&mut self, ticket: Ticket, resource: &str, id: &Value) {
        self.enqueue(ticket, Request::FetchModel(resource.to_owned(), id.clone()));
    }

    fn fetch_collection(&mut self, ticket: Ticket, resource: &str, query: &Options) {
        self.enqueue(
            ticket,
            Request::FetchCollection(resource.to_owned(), query.clone()),
        );
    }

    fn save_model(&mut self, ticket: Ticket, resource: &str, model: &Model) {
        self.enqueue(ticket, Request::Save(resource.to_owned(), model.clone()));
    }
}

/// A view that prints what it would draw.
#[derive(Debug)]
pub struct ConsoleView {
    label: String,
}

impl ConsoleView {
    /// A boxed view printing under `label`.
    pub fn boxed(label: impl Into<String>) -> Box<dyn View> {
        Box::new(Self {
            label: label.into(),
        })
    }
}

impl View for ConsoleView {
    fn render(&mut self, cx: &RenderContext<'_>) {
        let mut line = format!("  [{}] render", self.label);
        if let Some(model) = cx.model {
            line.push_str(&format!(" model={}", model.attributes.clone().into_value()));
        }
        if let Some(items) = cx.collection {
            line.push_str(&format!(" items={}", items.len()));
        }
        println!("{line}");
    }

    fn show(&mut self) {
        println!("  [{}] show", self.label);
    }

    fn hide(&mut self) {
        println!("  [{}] hide", self.label);
    }

    fn remove(&mut self) {
        println!("  [{}] remove", self.label);
    }
}
