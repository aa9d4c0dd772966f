// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data-bound component types: model, collection, form and list.
//!
//! Requests go to the tree's [`Store`](crate::Store) and come back through
//! [`ComponentTree::resolve`]. Each component keeps only its latest fetch; a
//! reply to anything older is dropped.

use std::rc::Rc;

use serde_json::Value;
use trellis_class::{Options, is_truthy};

use crate::component::{
    ComponentDescriptor, ComponentType, METHOD_SHOW, METHOD_VALIDATE, component_type,
};
use crate::config::{OPT_MODEL, OPT_QUERY, OPT_RESOURCE};
use crate::event::{
    COLLECTION_LOAD_FAILED, COLLECTION_LOADED, COLLECTION_LOADING, EventPayload, FORM_INVALID,
    LIST_ITEM_SELECTED, MODEL_LOAD_FAILED, MODEL_LOADED, MODEL_LOADING, MODEL_SAVE_FAILED,
    MODEL_SAVED, MODEL_SAVING,
};
use crate::store::{Outcome, Reply, Store};
use crate::tree::{ComponentTree, default_name};
use crate::types::{ComponentId, Model, Response, ShowOptions, Ticket};

/// Name of [`model_component_type`].
pub const MODEL_COMPONENT_TYPE_NAME: &str = "ModelComponent";
/// Name of [`collection_component_type`].
pub const COLLECTION_COMPONENT_TYPE_NAME: &str = "CollectionComponent";
/// Name of [`form_component_type`].
pub const FORM_COMPONENT_TYPE_NAME: &str = "FormComponent";
/// Name of [`list_component_type`].
pub const LIST_COMPONENT_TYPE_NAME: &str = "ListComponent";

thread_local! {
    static MODEL: Rc<ComponentType> = build_model_type();
    static COLLECTION: Rc<ComponentType> = build_collection_type();
    static FORM: Rc<ComponentType> = build_form_type();
    static LIST: Rc<ComponentType> = build_list_type();
}

/// A component bound to one [`Model`].
///
/// `show` with [`ShowOptions::id`] fetches that record first and shows once
/// it arrives; with [`ShowOptions::model`] it adopts the record and shows at
/// once. Both end in the same state. A `model` option given at construction
/// is adopted as the initial record.
pub fn model_component_type() -> Rc<ComponentType> {
    MODEL.with(Rc::clone)
}

/// A component bound to a list of records.
///
/// The first `show` is deferred until the first load completes. Later shows
/// render from the cached items unless [`ShowOptions::query`] names a
/// different query, which re-fetches. A `query` option given at construction
/// is the initial query.
pub fn collection_component_type() -> Rc<ComponentType> {
    COLLECTION.with(Rc::clone)
}

/// A model component that validates and saves submissions.
///
/// Override the `validate` method: it receives the candidate model and
/// returns null (or any falsy value) when valid, or a description of the
/// errors otherwise. See [`ComponentTree::submit`].
pub fn form_component_type() -> Rc<ComponentType> {
    FORM.with(Rc::clone)
}

/// A collection component with one child per record.
///
/// After each load the list destroys its old item children and creates one
/// per record from its item type, set with [`ComponentTree::set_item_type`].
pub fn list_component_type() -> Rc<ComponentType> {
    LIST.with(Rc::clone)
}

fn build_model_type() -> Rc<ComponentType> {
    ComponentDescriptor::new(MODEL_COMPONENT_TYPE_NAME)
        .parent(&component_type())
        .construct(|tree, id, options| {
            let model = options
                .get(OPT_MODEL)
                .and_then(|v| serde_json::from_value::<Model>(v.clone()).ok());
            if let Some(node) = tree.node_mut(id) {
                node.data = DataState::Model(ModelState {
                    model,
                    ..ModelState::default()
                });
            }
        })
        .method(METHOD_SHOW, |tree, id, sup, args| {
            let opts = ShowOptions::from_args(args);
            if let Some(model) = opts.model.clone() {
                tree.set_model(id, model);
                return sup.call(tree, id, &[opts.without_data().to_value()]);
            }
            if let Some(model_id) = &opts.id {
                tree.fetch_model(id, model_id, Some(opts.without_data()));
                return Value::Bool(false);
            }
            sup.call(tree, id, args)
        })
        .build()
}

fn build_collection_type() -> Rc<ComponentType> {
    ComponentDescriptor::new(COLLECTION_COMPONENT_TYPE_NAME)
        .parent(&component_type())
        .construct(|tree, id, options| {
            let query = options
                .get(OPT_QUERY)
                .cloned()
                .and_then(Options::from_value)
                .unwrap_or_default();
            if let Some(node) = tree.node_mut(id) {
                node.data = DataState::Collection(CollectionState {
                    query,
                    ..CollectionState::default()
                });
            }
        })
        .method(METHOD_SHOW, |tree, id, sup, args| {
            let opts = ShowOptions::from_args(args);
            let rest = opts.without_data();
            match tree.plan_load(id, opts.query.as_ref()) {
                LoadPlan::Cached => sup.call(tree, id, &[rest.to_value()]),
                LoadPlan::Join => {
                    tree.defer_show(id, rest);
                    Value::Bool(false)
                }
                LoadPlan::Fetch(query) => {
                    tree.fetch_collection(id, Some(query), Some(rest));
                    Value::Bool(false)
                }
            }
        })
        .build()
}

fn build_form_type() -> Rc<ComponentType> {
    ComponentDescriptor::new(FORM_COMPONENT_TYPE_NAME)
        .parent(&model_component_type())
        .method(METHOD_VALIDATE, |_, _, _, _| Value::Null)
        .build()
}

fn build_list_type() -> Rc<ComponentType> {
    ComponentDescriptor::new(LIST_COMPONENT_TYPE_NAME)
        .parent(&collection_component_type())
        .method(METHOD_SHOW, |tree, id, sup, args| {
            let shown = sup.call(tree, id, args);
            if is_truthy(&shown) {
                for item in tree.list_items(id) {
                    tree.show(item, ShowOptions::default());
                }
            }
            shown
        })
        .build()
}

#[derive(Debug, Default)]
pub(crate) enum DataState {
    #[default]
    None,
    Model(ModelState),
    Collection(CollectionState),
}

impl DataState {
    pub(crate) fn model(&self) -> Option<&Model> {
        match self {
            Self::Model(s) => s.model.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn collection(&self) -> Option<&[Model]> {
        match self {
            Self::Collection(s) => Some(&s.items),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ModelState {
    model: Option<Model>,
    latest: Option<Ticket>,
    pending_show: Option<ShowOptions>,
}

#[derive(Debug, Default)]
pub(crate) struct CollectionState {
    items: Vec<Model>,
    loaded_once: bool,
    query: Options,
    in_flight: Option<(Ticket, Options)>,
    pending_show: Option<ShowOptions>,
    item_type: Option<Rc<ComponentType>>,
    list_items: Vec<ComponentId>,
}

/// An issued request awaiting its reply.
#[derive(Debug)]
pub(crate) struct Pending {
    component: ComponentId,
    kind: RequestKind,
}

#[derive(Debug)]
enum RequestKind {
    FetchModel,
    FetchCollection(Options),
    Save,
}

enum LoadPlan {
    Cached,
    Join,
    Fetch(Options),
}

fn mismatched_reply() -> Response {
    tracing::warn!("store reply does not match the request");
    Response::new(500, "mismatched reply")
}

fn into_model(outcome: Outcome) -> Result<(Model, Option<Response>), Response> {
    match outcome {
        Ok(Reply::Model(model)) => Ok((model, None)),
        Ok(Reply::Saved(model, response)) => Ok((model, Some(response))),
        Ok(Reply::Collection(_)) => Err(mismatched_reply()),
        Err(response) => Err(response),
    }
}

fn into_collection(outcome: Outcome) -> Result<Vec<Model>, Response> {
    match outcome {
        Ok(Reply::Collection(items)) => Ok(items),
        Ok(_) => Err(mismatched_reply()),
        Err(response) => Err(response),
    }
}

impl ComponentTree {
    /// The bound model, for model components and list items.
    pub fn model(&self, id: ComponentId) -> Option<&Model> {
        self.node(id)?.data.model()
    }

    /// The loaded items, for collection components.
    pub fn collection(&self, id: ComponentId) -> Option<&[Model]> {
        self.node(id)?.data.collection()
    }

    /// The query of the last completed load, for collection components.
    pub fn query(&self, id: ComponentId) -> Option<&Options> {
        self.collection_state(id).map(|s| &s.query)
    }

    /// Returns true once a collection component has completed a load.
    pub fn has_loaded(&self, id: ComponentId) -> bool {
        self.collection_state(id).is_some_and(|s| s.loaded_once)
    }

    /// Returns true while the component's latest fetch is unanswered.
    pub fn is_loading(&self, id: ComponentId) -> bool {
        match self.node(id).map(|n| &n.data) {
            Some(DataState::Model(s)) => s.latest.is_some(),
            Some(DataState::Collection(s)) => s.in_flight.is_some(),
            _ => false,
        }
    }

    /// Bind `model` without fetching or showing.
    ///
    /// A component with no data binding becomes model-bound; collection
    /// components are rejected. Binding supersedes any model fetch in
    /// flight, so its late reply is dropped.
    pub fn set_model(&mut self, id: ComponentId, model: Model) -> bool {
        let label = self.label(id);
        let Some(node) = self.node_mut(id) else {
            tracing::warn!(component = ?id, "set_model on a stale component");
            return false;
        };
        let superseded = match &mut node.data {
            DataState::Model(s) => {
                s.model = Some(model);
                s.pending_show = None;
                s.latest.take()
            }
            DataState::None => {
                node.data = DataState::Model(ModelState {
                    model: Some(model),
                    ..ModelState::default()
                });
                None
            }
            DataState::Collection(_) => {
                tracing::warn!(component = %label, "set_model on a collection component");
                return false;
            }
        };
        if let Some(old) = superseded {
            tracing::debug!(superseded = old.get(), "model fetch superseded by set_model");
            self.pending.remove(&old);
        }
        true
    }

    /// Fetch the record `model_id`, then show with `then_show` if given.
    ///
    /// Emits `model:loading` now and `model:loaded` or `model:loadFailed`
    /// on resolution. Supersedes any earlier fetch for this component.
    /// Without a store the request fails immediately.
    pub fn fetch_model(
        &mut self,
        id: ComponentId,
        model_id: &Value,
        then_show: Option<ShowOptions>,
    ) -> Option<Ticket> {
        let resource = self.resource_of(id)?;
        let prior = match self.node(id).map(|n| &n.data) {
            Some(DataState::Model(s)) => s.model.clone(),
            _ => {
                tracing::warn!(component = %self.label(id), "fetch_model on a component without a model");
                return None;
            }
        };
        self.trigger(
            id,
            MODEL_LOADING,
            EventPayload::Model {
                model: prior,
                response: None,
            },
        );

        let ticket = self.next_ticket();
        let s = self.model_state_mut(id)?;
        let superseded = s.latest.replace(ticket);
        s.pending_show = then_show;
        if let Some(old) = superseded {
            tracing::debug!(superseded = old.get(), "model fetch superseded");
            self.pending.remove(&old);
        }
        self.pending.insert(
            ticket,
            Pending {
                component: id,
                kind: RequestKind::FetchModel,
            },
        );
        self.send(ticket, |store| store.fetch_model(ticket, &resource, model_id));
        Some(ticket)
    }

    /// Load the collection with `query` (default: the current query), then
    /// show with `then_show` if given.
    ///
    /// Emits `collection:loading` now and `collection:loaded` or
    /// `collection:loadFailed` on resolution. Supersedes any earlier load.
    pub fn fetch_collection(
        &mut self,
        id: ComponentId,
        query: Option<Options>,
        then_show: Option<ShowOptions>,
    ) -> Option<Ticket> {
        let resource = self.resource_of(id)?;
        let Some(s) = self.collection_state(id) else {
            tracing::warn!(component = %self.label(id), "fetch_collection on a non-collection component");
            return None;
        };
        let query = query.unwrap_or_else(|| s.query.clone());
        let collection = s.items.clone();
        self.trigger(
            id,
            COLLECTION_LOADING,
            EventPayload::Collection {
                collection,
                response: None,
            },
        );

        let ticket = self.next_ticket();
        let s = self.collection_state_mut(id)?;
        let superseded = s.in_flight.replace((ticket, query.clone()));
        if then_show.is_some() {
            s.pending_show = then_show;
        }
        if let Some((old, _)) = superseded {
            tracing::debug!(superseded = old.get(), "collection load superseded");
            self.pending.remove(&old);
        }
        self.pending.insert(
            ticket,
            Pending {
                component: id,
                kind: RequestKind::FetchCollection(query.clone()),
            },
        );
        self.send(ticket, |store| {
            store.fetch_collection(ticket, &resource, &query);
        });
        Some(ticket)
    }

    /// Save `model` for a model-bound component.
    ///
    /// Emits `model:saving` now and `model:saved` or `model:saveFailed` on
    /// resolution. Saves never change visibility.
    pub fn save(&mut self, id: ComponentId, model: Model) -> Option<Ticket> {
        let resource = self.resource_of(id)?;
        if self.model_state_mut(id).is_none() {
            tracing::warn!(component = %self.label(id), "save on a component without a model");
            return None;
        }
        self.trigger(
            id,
            MODEL_SAVING,
            EventPayload::Model {
                model: Some(model.clone()),
                response: None,
            },
        );
        if !self.is_alive(id) {
            return None;
        }
        let ticket = self.next_ticket();
        self.pending.insert(
            ticket,
            Pending {
                component: id,
                kind: RequestKind::Save,
            },
        );
        self.send(ticket, |store| store.save_model(ticket, &resource, &model));
        Some(ticket)
    }

    /// Validate `changes` over the bound model and save the result.
    ///
    /// The candidate goes to the component's `validate` method. A truthy
    /// verdict emits `form:invalid` with it and nothing is saved.
    pub fn submit(&mut self, id: ComponentId, changes: &Options) -> Option<Ticket> {
        let Some(node) = self.node(id) else {
            tracing::warn!(component = ?id, "submit on a stale component");
            return None;
        };
        let candidate = node
            .data
            .model()
            .cloned()
            .unwrap_or_default()
            .merged(changes);
        let arg = serde_json::to_value(&candidate).unwrap_or(Value::Null);
        let verdict = self.call(id, METHOD_VALIDATE, &[arg]).ok()?;
        if is_truthy(&verdict) {
            tracing::debug!(component = %self.label(id), "submission rejected by validate");
            self.trigger(id, FORM_INVALID, EventPayload::Invalid { errors: verdict });
            return None;
        }
        self.save(id, candidate)
    }

    /// Deliver the store's answer for `ticket`.
    ///
    /// Returns true if the reply was applied. A superseded request is
    /// forgotten when it is replaced, so its reply is ignored like any
    /// unknown or already-resolved ticket. Replies for destroyed components
    /// are dropped.
    pub fn resolve(&mut self, ticket: Ticket, outcome: Outcome) -> bool {
        let Some(Pending { component, kind }) = self.pending.remove(&ticket) else {
            tracing::debug!(ticket = ticket.get(), "resolve: unknown, superseded or resolved ticket");
            return false;
        };
        if !self.is_alive(component) {
            tracing::debug!(ticket = ticket.get(), "component destroyed before its reply");
            return false;
        }
        match kind {
            RequestKind::FetchModel => self.finish_model_fetch(component, ticket, outcome),
            RequestKind::FetchCollection(query) => {
                self.finish_collection_fetch(component, ticket, query, outcome)
            }
            RequestKind::Save => self.finish_save(component, outcome),
        }
    }

    /// Number of issued requests not yet resolved.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Set the type a list builds its item children from.
    pub fn set_item_type(&mut self, list: ComponentId, ty: Rc<ComponentType>) -> bool {
        let Some(s) = self.collection_state_mut(list) else {
            tracing::warn!(component = ?list, "set_item_type on a non-collection component");
            return false;
        };
        s.item_type = Some(ty);
        true
    }

    /// Item children of a list, in record order.
    pub fn list_items(&self, list: ComponentId) -> Vec<ComponentId> {
        self.collection_state(list)
            .map(|s| s.list_items.clone())
            .unwrap_or_default()
    }

    /// Emit `list:itemSelected` on `list` for one of its items.
    pub fn select_list_item(&mut self, list: ComponentId, item: ComponentId) -> bool {
        let is_item = self
            .collection_state(list)
            .is_some_and(|s| s.list_items.contains(&item));
        if !is_item {
            tracing::warn!(list = %self.label(list), "select_list_item: not an item of this list");
            return false;
        }
        let model = self.model(item).cloned();
        self.trigger(
            list,
            LIST_ITEM_SELECTED,
            EventPayload::ListItem {
                list_item: item,
                model,
            },
        )
    }

    fn finish_model_fetch(&mut self, id: ComponentId, ticket: Ticket, outcome: Outcome) -> bool {
        let Some(s) = self.model_state_mut(id) else {
            return false;
        };
        if s.latest != Some(ticket) {
            tracing::debug!(ticket = ticket.get(), "dropping reply to a superseded model fetch");
            return false;
        }
        s.latest = None;
        let then_show = s.pending_show.take();
        match into_model(outcome) {
            Ok((model, _)) => {
                s.model = Some(model.clone());
                self.trigger(
                    id,
                    MODEL_LOADED,
                    EventPayload::Model {
                        model: Some(model),
                        response: None,
                    },
                );
                self.refresh(id, then_show);
                true
            }
            Err(response) => {
                let prior = s.model.clone();
                tracing::warn!(component = %self.label(id), %response, "model fetch failed");
                self.trigger(
                    id,
                    MODEL_LOAD_FAILED,
                    EventPayload::Model {
                        model: prior,
                        response: Some(response),
                    },
                );
                false
            }
        }
    }

    fn finish_collection_fetch(
        &mut self,
        id: ComponentId,
        ticket: Ticket,
        query: Options,
        outcome: Outcome,
    ) -> bool {
        let Some(s) = self.collection_state_mut(id) else {
            return false;
        };
        if s.in_flight.as_ref().map(|(t, _)| *t) != Some(ticket) {
            tracing::debug!(ticket = ticket.get(), "dropping reply to a superseded collection load");
            return false;
        }
        s.in_flight = None;
        let then_show = s.pending_show.take();
        match into_collection(outcome) {
            Ok(items) => {
                s.items.clone_from(&items);
                s.loaded_once = true;
                s.query = query;
                self.rebuild_list_items(id);
                self.trigger(
                    id,
                    COLLECTION_LOADED,
                    EventPayload::Collection {
                        collection: items,
                        response: None,
                    },
                );
                self.refresh(id, then_show);
                true
            }
            Err(response) => {
                let collection = s.items.clone();
                tracing::warn!(component = %self.label(id), %response, "collection load failed");
                self.trigger(
                    id,
                    COLLECTION_LOAD_FAILED,
                    EventPayload::Collection {
                        collection,
                        response: Some(response),
                    },
                );
                false
            }
        }
    }

    fn finish_save(&mut self, id: ComponentId, outcome: Outcome) -> bool {
        match into_model(outcome) {
            Ok((model, response)) => {
                let Some(s) = self.model_state_mut(id) else {
                    return false;
                };
                s.model = Some(model.clone());
                self.trigger(
                    id,
                    MODEL_SAVED,
                    EventPayload::Model {
                        model: Some(model),
                        response,
                    },
                );
                if self.is_visible(id) {
                    self.render(id);
                }
                true
            }
            Err(response) => {
                let current = self.model(id).cloned();
                tracing::warn!(component = %self.label(id), %response, "save failed");
                self.trigger(
                    id,
                    MODEL_SAVE_FAILED,
                    EventPayload::Model {
                        model: current,
                        response: Some(response),
                    },
                );
                false
            }
        }
    }

    /// Show if a show was waiting on the load, else re-render if visible.
    fn refresh(&mut self, id: ComponentId, then_show: Option<ShowOptions>) {
        match then_show {
            Some(opts) => {
                self.show(id, opts);
            }
            None if self.is_visible(id) => {
                self.render(id);
            }
            None => {}
        }
    }

    fn rebuild_list_items(&mut self, list: ComponentId) {
        let Some(s) = self.collection_state_mut(list) else {
            return;
        };
        let Some(item_type) = s.item_type.clone() else {
            return;
        };
        let stale = core::mem::take(&mut s.list_items);
        let models = s.items.clone();
        for item in stale {
            self.destroy(item);
        }

        let prefix = default_name(item_type.name());
        let visible = self.is_visible(list);
        let mut built = Vec::with_capacity(models.len());
        for (i, model) in models.into_iter().enumerate() {
            let item = self.create_with(&item_type, Options::new());
            self.set_model(item, model);
            if self
                .add_component(list, item, Some(&format!("{prefix}{i}")))
                .is_err()
            {
                self.destroy(item);
                continue;
            }
            if visible {
                self.show(item, ShowOptions::default());
            }
            built.push(item);
        }
        if let Some(s) = self.collection_state_mut(list) {
            s.list_items = built;
        }
    }

    fn plan_load(&self, id: ComponentId, query: Option<&Options>) -> LoadPlan {
        let Some(s) = self.collection_state(id) else {
            return LoadPlan::Cached;
        };
        if let Some((_, loading)) = &s.in_flight {
            return match query {
                Some(q) if q != loading => LoadPlan::Fetch(q.clone()),
                // A refresh does not hold back a show that the cache can serve.
                _ if s.loaded_once && query.is_none_or(|q| *q == s.query) => LoadPlan::Cached,
                _ => LoadPlan::Join,
            };
        }
        match query {
            Some(q) if !s.loaded_once || *q != s.query => LoadPlan::Fetch(q.clone()),
            None if !s.loaded_once => LoadPlan::Fetch(s.query.clone()),
            _ => LoadPlan::Cached,
        }
    }

    fn defer_show(&mut self, id: ComponentId, opts: ShowOptions) {
        if let Some(s) = self.collection_state_mut(id) {
            tracing::debug!("show joins the load in flight");
            s.pending_show = Some(opts);
        }
    }

    /// Hand a request to the store, or fail it at once if there is none.
    fn send(&mut self, ticket: Ticket, request: impl FnOnce(&mut dyn Store)) {
        match self.store.as_deref_mut() {
            Some(store) => request(store),
            None => {
                tracing::warn!(ticket = ticket.get(), "no store configured");
                self.resolve(ticket, Err(Response::new(0, "no store configured")));
            }
        }
    }

    /// The `resource` option, else the type's `resource` field, else the
    /// type name with its first letter lowercased.
    fn resource_of(&self, id: ComponentId) -> Option<String> {
        let Some(node) = self.node(id) else {
            tracing::warn!(component = ?id, "data request on a stale component");
            return None;
        };
        let resource = node
            .options
            .str(OPT_RESOURCE)
            .or_else(|| node.ty.field(OPT_RESOURCE).and_then(Value::as_str))
            .map_or_else(|| default_name(node.ty.name()), str::to_owned);
        Some(resource)
    }

    fn model_state_mut(&mut self, id: ComponentId) -> Option<&mut ModelState> {
        match &mut self.node_mut(id)?.data {
            DataState::Model(s) => Some(s),
            _ => None,
        }
    }

    fn collection_state(&self, id: ComponentId) -> Option<&CollectionState> {
        match &self.node(id)?.data {
            DataState::Collection(s) => Some(s),
            _ => None,
        }
    }

    fn collection_state_mut(&mut self, id: ComponentId) -> Option<&mut CollectionState> {
        match &mut self.node_mut(id)?.data {
            DataState::Collection(s) => Some(s),
            _ => None,
        }
    }
}
