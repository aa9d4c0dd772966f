// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Events emitted by components, and their payloads.

use serde_json::Value;
use trellis_events::emitter::Listener;

use crate::tree::ComponentTree;
use crate::types::{ComponentId, Model, Response};

/// A component became visible.
pub const COMPONENT_SHOWN: &str = "component:shown";
/// A component became hidden.
pub const COMPONENT_HIDDEN: &str = "component:hidden";
/// A model fetch started.
pub const MODEL_LOADING: &str = "model:loading";
/// A model fetch succeeded.
pub const MODEL_LOADED: &str = "model:loaded";
/// A model fetch failed.
pub const MODEL_LOAD_FAILED: &str = "model:loadFailed";
/// A model save started.
pub const MODEL_SAVING: &str = "model:saving";
/// A model save succeeded.
pub const MODEL_SAVED: &str = "model:saved";
/// A model save failed.
pub const MODEL_SAVE_FAILED: &str = "model:saveFailed";
/// A collection fetch started.
pub const COLLECTION_LOADING: &str = "collection:loading";
/// A collection fetch succeeded.
pub const COLLECTION_LOADED: &str = "collection:loaded";
/// A collection fetch failed.
pub const COLLECTION_LOAD_FAILED: &str = "collection:loadFailed";
/// A list item was selected.
pub const LIST_ITEM_SELECTED: &str = "list:itemSelected";
/// A view finished rendering.
pub const RENDER_COMPLETE: &str = "view:renderComplete";
/// Form validation rejected a submission.
pub const FORM_INVALID: &str = "form:invalid";

/// Data carried by a [`ComponentEvent`].
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    /// `component:shown`, `component:hidden`.
    Component {
        /// Name of the component within its parent, if it has one.
        name: Option<String>,
        /// The component.
        component: ComponentId,
    },
    /// `model:*`.
    Model {
        /// The model concerned; for failures, the state left in place.
        model: Option<Model>,
        /// Store response, when there is one.
        response: Option<Response>,
    },
    /// `collection:*`.
    Collection {
        /// Current items.
        collection: Vec<Model>,
        /// Store response, for failures.
        response: Option<Response>,
    },
    /// `list:itemSelected`.
    ListItem {
        /// The selected item component.
        list_item: ComponentId,
        /// The item's model.
        model: Option<Model>,
    },
    /// `view:renderComplete`.
    Render {
        /// The rendered component.
        component: ComponentId,
    },
    /// `form:invalid`.
    Invalid {
        /// Whatever the `validate` method returned.
        errors: Value,
    },
    /// Application-defined events.
    Custom(Vec<Value>),
}

/// An event as delivered to listeners.
///
/// A bubbled event keeps its `source` and `payload`; only the component whose
/// listeners run changes.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentEvent {
    /// Event name.
    pub name: String,
    /// Component that first triggered the event.
    pub source: ComponentId,
    /// Event data.
    pub payload: EventPayload,
}

/// Listener type for component events.
pub type ComponentListener = Listener<ComponentTree, ComponentEvent>;
