// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view collaborator.
//!
//! Components do not render anything themselves. A component may own one
//! [`View`]; the tree asks it to render on every `show`, and to show or hide
//! alongside the component. After each render the tree emits
//! [`RENDER_COMPLETE`](crate::event::RENDER_COMPLETE) on the component.

use trellis_class::Options;

use crate::types::{ComponentId, Model};

/// What a view may read while rendering.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    /// The owning component.
    pub component: ComponentId,
    /// The component's name, once it has one.
    pub name: Option<&'a str>,
    /// The component's merged options.
    pub options: &'a Options,
    /// Bound model, for model components.
    pub model: Option<&'a Model>,
    /// Bound items, for collection components.
    pub collection: Option<&'a [Model]>,
}

/// An opaque presentation object owned by a component.
pub trait View {
    /// Produce output for the current state.
    fn render(&mut self, cx: &RenderContext<'_>);

    /// Make the output visible.
    fn show(&mut self) {}

    /// Make the output invisible.
    fn hide(&mut self) {}

    /// Release the output; called once when the component is destroyed.
    fn remove(&mut self) {}
}
