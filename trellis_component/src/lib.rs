// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=trellis_component --heading-base-level=0

//! Trellis Component: component trees with a visibility lifecycle.
//!
//! ## Overview
//!
//! A [`ComponentTree`] owns every component. Each one has a
//! [`ComponentType`] (built with [`ComponentDescriptor`] on top of
//! [`component_type`]), merged [`Options`](trellis_class::Options), named
//! children, an optional [`View`], and its own event listeners.
//!
//! - `show`/`hide` dispatch through the component's type, so subtypes can
//!   override them and reach the built-in behaviour through their `Super`
//!   handle. Showing emits `component:shown` before the component is marked
//!   visible; hiding an already-hidden component is a silent no-op.
//! - A parent created with `singly` keeps at most one non-overlay child
//!   visible: when a child announces `component:shown`, its siblings are
//!   hidden. Children created with `overlay` are exempt on both sides.
//! - Hiding a component hides its children too, unless it was created with
//!   `hide_sub_components = false`.
//! - [`ComponentTree::bubble`] forwards a child's event to the parent's
//!   listeners with the same payload.
//!
//! ## Data-bound components
//!
//! [`model_component_type`], [`collection_component_type`],
//! [`form_component_type`] and [`list_component_type`] fetch and save through
//! a [`Store`]. Requests are ticketed and answered through
//! [`ComponentTree::resolve`]; only the latest fetch of each component counts.
//!
//! ## Minimal usage
//!
//! ```
//! use trellis_class::Options;
//! use trellis_component::{ComponentTree, ShowOptions, component_type};
//!
//! let mut tree = ComponentTree::new();
//! let ty = component_type();
//! let tabs = tree.create_with(&ty, Options::new().with("singly", true));
//! let a = tree.create_with(&ty, Options::new());
//! let b = tree.create_with(&ty, Options::new());
//! tree.add_component(tabs, a, Some("a")).unwrap();
//! tree.add_component(tabs, b, Some("b")).unwrap();
//!
//! tree.show(a, ShowOptions::default());
//! tree.show(b, ShowOptions::default());
//! assert!(!tree.is_visible(a));
//! assert!(tree.is_visible(b));
//! assert_eq!(tree.current_component(tabs), Some(b));
//! ```

mod component;
pub mod config;
mod data;
mod error;
pub mod event;
mod store;
mod tree;
mod types;
mod view;

pub use component::{
    COMPONENT_TYPE_NAME, ComponentDescriptor, ComponentType, METHOD_HIDE, METHOD_RENDER,
    METHOD_SHOW, METHOD_VALIDATE, component_type,
};
pub use config::FrameworkConfig;
pub use data::{
    COLLECTION_COMPONENT_TYPE_NAME, FORM_COMPONENT_TYPE_NAME, LIST_COMPONENT_TYPE_NAME,
    MODEL_COMPONENT_TYPE_NAME, collection_component_type, form_component_type,
    list_component_type, model_component_type,
};
pub use error::{ComponentError, ConfigError};
pub use event::{ComponentEvent, ComponentListener, EventPayload};
pub use store::{Outcome, Reply, Store};
pub use tree::ComponentTree;
pub use types::{ComponentFlags, ComponentId, HideOptions, Model, Response, ShowOptions, Ticket};
pub use view::{RenderContext, View};
