// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The root `Component` type and the aliases used to extend it.

use std::rc::Rc;

use serde_json::Value;
use trellis_class::{Type, TypeDescriptor};

use crate::tree::ComponentTree;
use crate::types::{ComponentId, HideOptions, ShowOptions};

/// Name of the root component type.
pub const COMPONENT_TYPE_NAME: &str = "Component";

/// Lifecycle method: takes one [`ShowOptions`] argument, returns a bool.
pub const METHOD_SHOW: &str = "show";
/// Lifecycle method: takes one [`HideOptions`] argument, returns a bool.
pub const METHOD_HIDE: &str = "hide";
/// Asks the view to render; returns a bool.
pub const METHOD_RENDER: &str = "render";
/// Form validation: takes the candidate model, returns null when valid.
pub const METHOD_VALIDATE: &str = "validate";

/// A component type: methods receive the tree and the component's id.
pub type ComponentType = Type<ComponentTree, ComponentId>;

/// Builder for component types.
pub type ComponentDescriptor = TypeDescriptor<ComponentTree, ComponentId>;

thread_local! {
    static COMPONENT: Rc<ComponentType> = build_component_type();
}

/// The root type every component type extends.
///
/// Its `show`, `hide` and `render` methods are the built-in lifecycle; a
/// subtype overriding one reaches the built-in through its `Super` handle.
///
/// ```
/// use trellis_class::Options;
/// use trellis_component::{
///     ComponentDescriptor, ComponentTree, METHOD_SHOW, ShowOptions, component_type,
/// };
///
/// let panel = ComponentDescriptor::new("Panel")
///     .parent(&component_type())
///     .method(METHOD_SHOW, |tree, id, sup, args| {
///         // Extra work goes here.
///         sup.call(tree, id, args)
///     })
///     .build();
///
/// let mut tree = ComponentTree::new();
/// let id = tree.create_with(&panel, Options::new());
/// assert!(tree.show(id, ShowOptions::default()));
/// assert!(tree.is_visible(id));
/// ```
pub fn component_type() -> Rc<ComponentType> {
    COMPONENT.with(Rc::clone)
}

fn build_component_type() -> Rc<ComponentType> {
    ComponentDescriptor::new(COMPONENT_TYPE_NAME)
        .method(METHOD_SHOW, |tree, id, _, args| {
            Value::Bool(tree.base_show(id, &ShowOptions::from_args(args)))
        })
        .method(METHOD_HIDE, |tree, id, _, args| {
            Value::Bool(tree.base_hide(id, HideOptions::from_args(args)))
        })
        .method(METHOD_RENDER, |tree, id, _, _| {
            Value::Bool(tree.base_render(id))
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_type_is_shared_and_complete() {
        let a = component_type();
        let b = component_type();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.name(), COMPONENT_TYPE_NAME);
        assert!(a.is_a("Object"));
        for m in [METHOD_SHOW, METHOD_HIDE, METHOD_RENDER] {
            assert!(a.responds_to(m), "missing {m}");
        }
        assert!(!a.responds_to(METHOD_VALIDATE));
    }

    #[test]
    fn render_without_view_reports_false() {
        let mut tree = ComponentTree::new();
        let id = tree.create_with(&component_type(), trellis_class::Options::new());
        assert!(!tree.render(id));
    }
}
