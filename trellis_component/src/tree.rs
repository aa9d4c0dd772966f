// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: allocation, structure, lifecycle, events.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde_json::Value;
use trellis_class::{Options, is_truthy};
use trellis_events::emitter::{Emitter, fan_out, listener};

use crate::component::{
    COMPONENT_TYPE_NAME, ComponentType, METHOD_HIDE, METHOD_RENDER, METHOD_SHOW,
};
use crate::config::{FrameworkConfig, OPT_CONTAINER, OPT_EL};
use crate::data::{DataState, Pending};
use crate::error::ComponentError;
use crate::event::{
    COMPONENT_HIDDEN, COMPONENT_SHOWN, ComponentEvent, ComponentListener, EventPayload,
    RENDER_COMPLETE,
};
use crate::store::Store;
use crate::types::{ComponentFlags, ComponentId, HideOptions, ShowOptions, Ticket};
use crate::view::{RenderContext, View};

/// Arena of components and the collaborators they share.
pub struct ComponentTree {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    config: FrameworkConfig,
    defaults: Options,
    pub(crate) store: Option<Box<dyn Store>>,
    pub(crate) pending: BTreeMap<Ticket, Pending>,
    next_ticket: u64,
}

impl core::fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("ComponentTree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("config", &self.config)
            .field("has_store", &self.store.is_some())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Default for ComponentTree {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Node {
    generation: u32,
    pub(crate) ty: Rc<ComponentType>,
    pub(crate) name: Option<String>,
    pub(crate) flags: ComponentFlags,
    pub(crate) options: Options,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: BTreeMap<String, ComponentId>,
    pub(crate) current: Option<ComponentId>,
    // (child name, event name) pairs re-triggered on this node.
    pub(crate) bubbled: BTreeSet<(String, String)>,
    emitter: Emitter<ComponentTree, ComponentEvent>,
    view: Option<Box<dyn View>>,
    pub(crate) data: DataState,
    destroying: bool,
}

impl Node {
    fn new(generation: u32, ty: Rc<ComponentType>, options: Options) -> Self {
        Self {
            generation,
            ty,
            name: None,
            flags: ComponentFlags::from_options(&options),
            options,
            parent: None,
            children: BTreeMap::new(),
            current: None,
            bubbled: BTreeSet::new(),
            emitter: Emitter::new(),
            view: None,
            data: DataState::None,
            destroying: false,
        }
    }
}

/// Lowercase the first character of a type name.
pub(crate) fn default_name(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl ComponentTree {
    /// Create an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameworkConfig::default())
    }

    /// Create an empty tree with `config`.
    pub fn with_config(config: FrameworkConfig) -> Self {
        let defaults = config.effective_defaults();
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            config,
            defaults,
            store: None,
            pending: BTreeMap::new(),
            next_ticket: 0,
        }
    }

    /// The configuration this tree was built with.
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Install the persistence backend for data-bound components.
    pub fn set_store(&mut self, store: Box<dyn Store>) {
        self.store = Some(store);
    }

    /// Builder-style [`ComponentTree::set_store`].
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn Store>) -> Self {
        self.set_store(store);
        self
    }

    // --- allocation ---

    /// Construct a component of type `ty`.
    ///
    /// Options are merged (framework defaults, then each level of `ty` root
    /// first, then `options`) and the result is written back into `options`.
    /// The new component is detached and unnamed; see
    /// [`ComponentTree::add_component`].
    pub fn create(&mut self, ty: &Rc<ComponentType>, options: &mut Options) -> ComponentId {
        if !ty.is_a(COMPONENT_TYPE_NAME) {
            tracing::warn!(
                type_name = %ty.name(),
                "type does not extend Component; lifecycle methods will be missing"
            );
        }
        let mut merged = ty.merge_options(&self.defaults, options);
        if merged.contains(OPT_EL) && merged.contains(OPT_CONTAINER) {
            tracing::warn!(
                type_name = %ty.name(),
                "both `el` and `container` given; ignoring `container`"
            );
            merged.remove(OPT_CONTAINER);
            options.remove(OPT_CONTAINER);
        }

        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, Rc::clone(ty), merged.clone()));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ComponentId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes
                .push(Some(Node::new(generation, Rc::clone(ty), merged.clone())));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ComponentId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = ComponentId::new(idx, generation);
        tracing::trace!(component = ?id, type_name = %ty.name(), "create");
        ty.construct_chain(self, id, &merged);
        id
    }

    /// [`ComponentTree::create`] for callers that do not need the merged options back.
    pub fn create_with(&mut self, ty: &Rc<ComponentType>, mut options: Options) -> ComponentId {
        self.create(ty, &mut options)
    }

    /// Destroy a component and its whole subtree.
    ///
    /// Detaches it from its parent, runs its destruct chain most-derived
    /// first, destroys its remaining children, then releases its view.
    /// Returns false for a stale id.
    pub fn destroy(&mut self, id: ComponentId) -> bool {
        let Some(node) = self.node_mut(id) else {
            tracing::warn!(component = ?id, "destroy on a stale component");
            return false;
        };
        if node.destroying {
            return false;
        }
        node.destroying = true;
        if let Some(parent) = node.parent {
            self.detach(parent, id);
        }

        let ty = Rc::clone(&self.node_ref(id).ty);
        ty.destruct_chain(self, id);

        let children: Vec<ComponentId> = self
            .node(id)
            .map(|n| n.children.values().copied().collect())
            .unwrap_or_default();
        for child in children {
            self.destroy(child);
        }
        if let Some(mut view) = self.node_mut(id).and_then(|n| n.view.take()) {
            view.remove();
        }

        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
        tracing::trace!(component = ?id, "destroyed");
        true
    }

    // --- queries ---

    /// Returns true if `id` refers to a live component.
    pub fn is_alive(&self, id: ComponentId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live components.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if there are no live components.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live components without a parent.
    pub fn roots(&self) -> Vec<ComponentId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Some(n) if n.parent.is_none() =>
                {
                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "ComponentId uses 32-bit indices by design."
                    )]
                    Some(ComponentId::new(i as u32, n.generation))
                }
                _ => None,
            })
            .collect()
    }

    /// The component's name within its parent, once assigned.
    pub fn name_of(&self, id: ComponentId) -> Option<&str> {
        self.node(id)?.name.as_deref()
    }

    /// The component's type.
    pub fn type_of(&self, id: ComponentId) -> Option<&Rc<ComponentType>> {
        self.node(id).map(|n| &n.ty)
    }

    /// The component's parent.
    pub fn parent_of(&self, id: ComponentId) -> Option<ComponentId> {
        self.node(id)?.parent
    }

    /// Lifecycle flags.
    pub fn flags(&self, id: ComponentId) -> Option<ComponentFlags> {
        self.node(id).map(|n| n.flags)
    }

    /// Returns true if the component is live and visible.
    pub fn is_visible(&self, id: ComponentId) -> bool {
        self.flags(id)
            .is_some_and(|f| f.contains(ComponentFlags::VISIBLE))
    }

    /// Merged options.
    pub fn options(&self, id: ComponentId) -> Option<&Options> {
        self.node(id).map(|n| &n.options)
    }

    /// Look up a child by name.
    pub fn get_component(&self, parent: ComponentId, name: &str) -> Option<ComponentId> {
        self.node(parent)?.children.get(name).copied()
    }

    /// Children as (name, id), in name order.
    pub fn children(&self, id: ComponentId) -> Vec<(&str, ComponentId)> {
        self.node(id)
            .map(|n| n.children.iter().map(|(k, v)| (k.as_str(), *v)).collect())
            .unwrap_or_default()
    }

    /// Child names, in name order.
    pub fn child_names(&self, id: ComponentId) -> Vec<&str> {
        self.node(id)
            .map(|n| n.children.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The child most recently shown in singly mode.
    pub fn current_component(&self, id: ComponentId) -> Option<ComponentId> {
        self.node(id)?.current
    }

    // --- structure ---

    /// Name a detached component. A name can be set only once.
    pub fn set_name(&mut self, id: ComponentId, name: &str) -> Result<(), ComponentError> {
        let result = match self.node_mut(id) {
            None => Err(ComponentError::Stale(id)),
            Some(n) if n.parent.is_some() => Err(ComponentError::AlreadyAttached(
                n.name.clone().unwrap_or_default(),
            )),
            Some(n) => match &n.name {
                Some(existing) => Err(ComponentError::NameAlreadySet(existing.clone())),
                None => {
                    n.name = Some(name.to_owned());
                    Ok(())
                }
            },
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "set_name rejected");
        }
        result
    }

    /// Attach `child` under `parent`, returning the name it was registered as.
    ///
    /// The name is `name` if given, else a name set earlier with
    /// [`ComponentTree::set_name`], else the child's type name with its first
    /// letter lowercased.
    pub fn add_component(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
        name: Option<&str>,
    ) -> Result<String, ComponentError> {
        let result = self.try_add_component(parent, child, name);
        if let Err(e) = &result {
            tracing::warn!(parent = %self.label(parent), error = %e, "add_component rejected");
        }
        result
    }

    fn try_add_component(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
        name: Option<&str>,
    ) -> Result<String, ComponentError> {
        if !self.is_alive(parent) {
            return Err(ComponentError::Stale(parent));
        }
        let Some(c) = self.node(child) else {
            return Err(ComponentError::Stale(child));
        };
        if c.parent.is_some() {
            return Err(ComponentError::AlreadyAttached(self.label(child)));
        }
        let mut cur = Some(parent);
        while let Some(p) = cur {
            if p == child {
                return Err(ComponentError::Cycle);
            }
            cur = self.parent_of(p);
        }
        let resolved = match (name, &c.name) {
            (Some(n), Some(existing)) if n != existing => {
                return Err(ComponentError::NameAlreadySet(existing.clone()));
            }
            (Some(n), _) => n.to_owned(),
            (None, Some(existing)) => existing.clone(),
            (None, None) => default_name(c.ty.name()),
        };
        if self.node_ref(parent).children.contains_key(&resolved) {
            return Err(ComponentError::DuplicateName {
                parent: self.label(parent),
                name: resolved,
            });
        }

        self.node_mut_ref(parent)
            .children
            .insert(resolved.clone(), child);
        let c = self.node_mut_ref(child);
        c.parent = Some(parent);
        c.name = Some(resolved.clone());
        Ok(resolved)
    }

    /// Detach and destroy the child called `name`.
    ///
    /// Returns false, logging a warning, if there is no such child.
    pub fn remove_component(&mut self, parent: ComponentId, name: &str) -> bool {
        let Some(child) = self.get_component(parent, name) else {
            tracing::warn!(parent = %self.label(parent), name, "remove_component: no such child");
            return false;
        };
        self.detach(parent, child);
        self.destroy(child)
    }

    fn detach(&mut self, parent: ComponentId, child: ComponentId) {
        let name = self.node(child).and_then(|c| c.name.clone());
        if let Some(p) = self.node_mut(parent) {
            if let Some(name) = &name {
                if p.children.get(name) == Some(&child) {
                    p.children.remove(name);
                }
                p.bubbled.retain(|(c, _)| c != name);
            }
            if p.current == Some(child) {
                p.current = None;
            }
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
    }

    /// Attach a view; returns the previous one.
    pub fn set_view(&mut self, id: ComponentId, view: Box<dyn View>) -> Option<Box<dyn View>> {
        let Some(node) = self.node_mut(id) else {
            tracing::warn!(component = ?id, "set_view on a stale component");
            return None;
        };
        node.view.replace(view)
    }

    // --- dispatch through the component's type ---

    /// Call a method on the component's type.
    pub fn call(
        &mut self,
        id: ComponentId,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ComponentError> {
        let Some(node) = self.node(id) else {
            tracing::warn!(component = ?id, method, "call on a stale component");
            return Err(ComponentError::Stale(id));
        };
        let ty = Rc::clone(&node.ty);
        Ok(ty.invoke(self, id, method, args)?)
    }

    /// Call the implementation of `method` above `declaring` in the component's chain.
    pub fn call_super_from(
        &mut self,
        id: ComponentId,
        declaring: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ComponentError> {
        let Some(node) = self.node(id) else {
            return Err(ComponentError::Stale(id));
        };
        let ty = Rc::clone(&node.ty);
        Ok(ty.call_super_from(self, id, declaring, method, args)?)
    }

    /// Show a component through its type's `show` method.
    ///
    /// Returns true if the component is visible afterwards. Data-bound
    /// components may defer showing until a load completes and return false.
    pub fn show(&mut self, id: ComponentId, opts: ShowOptions) -> bool {
        self.call(id, METHOD_SHOW, &[opts.to_value()])
            .is_ok_and(|v| is_truthy(&v))
    }

    /// Hide a component through its type's `hide` method.
    ///
    /// Returns false if it was already hidden.
    pub fn hide(&mut self, id: ComponentId, opts: HideOptions) -> bool {
        self.call(id, METHOD_HIDE, &[opts.to_value()])
            .is_ok_and(|v| is_truthy(&v))
    }

    /// Render a component through its type's `render` method.
    pub fn render(&mut self, id: ComponentId) -> bool {
        self.call(id, METHOD_RENDER, &[]).is_ok_and(|v| is_truthy(&v))
    }

    /// Show the child called `name`.
    pub fn show_component(&mut self, parent: ComponentId, name: &str, opts: ShowOptions) -> bool {
        let Some(child) = self.get_component(parent, name) else {
            tracing::warn!(parent = %self.label(parent), name, "show_component: no such child");
            return false;
        };
        self.show(child, opts)
    }

    /// Hide the child called `name`.
    pub fn hide_component(&mut self, parent: ComponentId, name: &str, opts: HideOptions) -> bool {
        let Some(child) = self.get_component(parent, name) else {
            tracing::warn!(parent = %self.label(parent), name, "hide_component: no such child");
            return false;
        };
        self.hide(child, opts)
    }

    /// Hide every child not named in `except`, in name order.
    ///
    /// Returns how many children were visible and got hidden.
    pub fn hide_all_sub_components(&mut self, id: ComponentId, except: &[&str]) -> usize {
        let targets = self.children_except(id, except);
        targets
            .into_iter()
            .filter(|c| self.hide(*c, HideOptions::default()))
            .count()
    }

    /// Show every child not named in `except`, in name order.
    ///
    /// Returns how many children report being visible afterwards.
    pub fn show_all_sub_components(&mut self, id: ComponentId, except: &[&str]) -> usize {
        let targets = self.children_except(id, except);
        targets
            .into_iter()
            .filter(|c| self.show(*c, ShowOptions::default()))
            .count()
    }

    fn children_except(&self, id: ComponentId, except: &[&str]) -> Vec<ComponentId> {
        self.node(id)
            .map(|n| {
                n.children
                    .iter()
                    .filter(|(name, _)| !except.contains(&name.as_str()))
                    .map(|(_, c)| *c)
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- built-in lifecycle, reached from the Component type's methods ---

    pub(crate) fn base_show(&mut self, id: ComponentId, opts: &ShowOptions) -> bool {
        let Some(node) = self.node(id) else {
            tracing::warn!(component = ?id, "show on a stale component");
            return false;
        };
        let was_visible = node.flags.contains(ComponentFlags::VISIBLE);

        self.render(id);
        if let Some(view) = self.node_mut(id).and_then(|n| n.view.as_mut()) {
            view.show();
        }
        if was_visible {
            tracing::debug!(component = %self.label(id), "already visible; re-rendered only");
            return true;
        }

        if !opts.silent {
            let name = self.name_of(id).map(str::to_owned);
            self.trigger(
                id,
                COMPONENT_SHOWN,
                EventPayload::Component {
                    name,
                    component: id,
                },
            );
        }
        match self.node_mut(id) {
            Some(node) => {
                node.flags.insert(ComponentFlags::VISIBLE);
                true
            }
            // A listener destroyed it.
            None => false,
        }
    }

    pub(crate) fn base_hide(&mut self, id: ComponentId, opts: HideOptions) -> bool {
        let Some(node) = self.node_mut(id) else {
            tracing::warn!(component = ?id, "hide on a stale component");
            return false;
        };
        if !node.flags.contains(ComponentFlags::VISIBLE) {
            return false;
        }
        if let Some(view) = node.view.as_mut() {
            view.hide();
        }
        let cascade = node.flags.contains(ComponentFlags::CASCADE_HIDE);

        if !opts.silent {
            let name = self.name_of(id).map(str::to_owned);
            self.trigger(
                id,
                COMPONENT_HIDDEN,
                EventPayload::Component {
                    name,
                    component: id,
                },
            );
        }
        if cascade {
            self.hide_all_sub_components(id, &[]);
        }
        match self.node_mut(id) {
            Some(node) => {
                node.flags.remove(ComponentFlags::VISIBLE);
                true
            }
            None => false,
        }
    }

    pub(crate) fn base_render(&mut self, id: ComponentId) -> bool {
        let Some(mut view) = self.node_mut(id).and_then(|n| n.view.take()) else {
            return false;
        };
        if let Some(node) = self.node(id) {
            let cx = RenderContext {
                component: id,
                name: node.name.as_deref(),
                options: &node.options,
                model: node.data.model(),
                collection: node.data.collection(),
            };
            view.render(&cx);
        }
        if let Some(node) = self.node_mut(id) {
            node.view = Some(view);
        }
        self.trigger(id, RENDER_COMPLETE, EventPayload::Render { component: id });
        true
    }

    /// A child announced `component:shown`.
    fn on_child_shown(&mut self, parent: ComponentId, child: ComponentId) {
        let Some(p) = self.node(parent) else {
            return;
        };
        if !p.flags.contains(ComponentFlags::SINGLY) {
            return;
        }
        let Some(c) = self.node(child) else {
            return;
        };
        if c.flags.contains(ComponentFlags::OVERLAY) {
            return;
        }
        // Overlay siblings are exempt from auto-hide as well.
        let siblings: Vec<ComponentId> = p
            .children
            .values()
            .copied()
            .filter(|s| *s != child)
            .filter(|s| {
                self.flags(*s)
                    .is_some_and(|f| !f.contains(ComponentFlags::OVERLAY))
            })
            .collect();
        for s in siblings {
            self.hide(s, HideOptions::default());
        }
        if let Some(p) = self.node_mut(parent) {
            p.current = Some(child);
        }
    }

    // --- events ---

    /// Register `listener` for `event` on `id`.
    pub fn on(&mut self, id: ComponentId, event: &str, listener: ComponentListener) -> bool {
        let Some(node) = self.node_mut(id) else {
            tracing::warn!(component = ?id, event, "on: stale component");
            return false;
        };
        node.emitter.on(event, listener);
        true
    }

    /// Register a listener that fires at most once.
    pub fn once(&mut self, id: ComponentId, event: &str, listener: ComponentListener) -> bool {
        let Some(node) = self.node_mut(id) else {
            tracing::warn!(component = ?id, event, "once: stale component");
            return false;
        };
        node.emitter.once(event, listener);
        true
    }

    /// Register a closure and return its listener handle, for later [`ComponentTree::off`].
    pub fn listen(
        &mut self,
        id: ComponentId,
        event: &str,
        f: impl Fn(&mut Self, &ComponentEvent) + 'static,
    ) -> Option<ComponentListener> {
        let l = listener(f);
        self.on(id, event, Rc::clone(&l)).then_some(l)
    }

    /// Remove the first registration of `listener`; false if none matched.
    pub fn off(&mut self, id: ComponentId, event: &str, listener: &ComponentListener) -> bool {
        self.node_mut(id)
            .is_some_and(|n| n.emitter.off(event, listener))
    }

    /// Fire `event` on `id`.
    ///
    /// Listeners on `id` run first, in registration order, over a snapshot.
    /// Then, if `id` has a parent, the parent's own `component:shown`
    /// handling runs (only for events `id` itself originated), and finally
    /// the event is forwarded to the parent if the parent bubbles this
    /// (child, event) pair.
    pub fn trigger(&mut self, id: ComponentId, event: &str, payload: EventPayload) -> bool {
        if !self.is_alive(id) {
            tracing::warn!(component = ?id, event, "trigger on a stale component");
            return false;
        }
        let event = ComponentEvent {
            name: event.to_owned(),
            source: id,
            payload,
        };
        self.dispatch(id, &event);
        true
    }

    fn dispatch(&mut self, target: ComponentId, event: &ComponentEvent) {
        let debug = self.config.debug;
        let Some(node) = self.node_mut(target) else {
            return;
        };
        let listeners = node.emitter.snapshot(&event.name);
        if debug {
            tracing::debug!(
                target_component = %self.label(target),
                event = %event.name,
                listeners = listeners.len(),
                "dispatch"
            );
        }
        fan_out(&listeners, self, event);

        let Some(node) = self.node(target) else {
            return;
        };
        let (Some(parent), Some(name)) = (node.parent, node.name.clone()) else {
            return;
        };
        if event.name == COMPONENT_SHOWN && event.source == target {
            self.on_child_shown(parent, target);
        }
        let key = (name, event.name.clone());
        if self.node(parent).is_some_and(|p| p.bubbled.contains(&key)) {
            self.dispatch(parent, event);
        }
    }

    /// Re-trigger `event` on `parent` whenever its child `child` fires it.
    ///
    /// Registering the same pair twice has no further effect.
    pub fn bubble(&mut self, parent: ComponentId, child: &str, event: &str) -> bool {
        let label = self.label(parent);
        let Some(p) = self.node_mut(parent) else {
            tracing::warn!(component = ?parent, "bubble on a stale component");
            return false;
        };
        if !p.children.contains_key(child) {
            tracing::warn!(parent = %label, child, event, "bubble: no such child");
            return false;
        }
        p.bubbled.insert((child.to_owned(), event.to_owned()));
        true
    }

    /// Stop bubbling `event` from `child`.
    ///
    /// Returns false, logging a warning, if the pair was never registered.
    pub fn unbubble(&mut self, parent: ComponentId, child: &str, event: &str) -> bool {
        let label = self.label(parent);
        let removed = self
            .node_mut(parent)
            .is_some_and(|p| p.bubbled.remove(&(child.to_owned(), event.to_owned())));
        if !removed {
            tracing::warn!(parent = %label, child, event, "unbubble without a matching bubble");
        }
        removed
    }

    /// Returns true if `parent` bubbles `event` from `child`.
    pub fn is_bubbled(&self, parent: ComponentId, child: &str, event: &str) -> bool {
        self.node(parent).is_some_and(|p| {
            p.bubbled
                .iter()
                .any(|(c, e)| c == child && e == event)
        })
    }

    // --- internals ---

    pub(crate) fn next_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    /// Name for diagnostics: the component's name, else its type's.
    pub(crate) fn label(&self, id: ComponentId) -> String {
        match self.node(id) {
            Some(n) => n
                .name
                .clone()
                .unwrap_or_else(|| format!("<{}>", n.ty.name())),
            None => format!("<stale {id:?}>"),
        }
    }

    pub(crate) fn node(&self, id: ComponentId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    pub(crate) fn node_mut(&mut self, id: ComponentId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        (n.generation == id.1).then_some(n)
    }

    /// Access a node; panics if `id` is stale.
    fn node_ref(&self, id: ComponentId) -> &Node {
        self.node(id).expect("dangling ComponentId")
    }

    /// Access a node mutably; panics if `id` is stale.
    fn node_mut_ref(&mut self, id: ComponentId) -> &mut Node {
        self.node_mut(id).expect("dangling ComponentId")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::component::{ComponentDescriptor, component_type};
    use serde_json::json;
    use std::cell::RefCell;

    pub(crate) type Log = Rc<RefCell<Vec<String>>>;

    pub(crate) struct RecordingView {
        pub(crate) tag: &'static str,
        pub(crate) log: Log,
    }

    impl View for RecordingView {
        fn render(&mut self, _cx: &RenderContext<'_>) {
            self.log.borrow_mut().push(format!("{}:render", self.tag));
        }
        fn show(&mut self) {
            self.log.borrow_mut().push(format!("{}:show", self.tag));
        }
        fn hide(&mut self) {
            self.log.borrow_mut().push(format!("{}:hide", self.tag));
        }
        fn remove(&mut self) {
            self.log.borrow_mut().push(format!("{}:remove", self.tag));
        }
    }

    /// Record every `event` fired on `id` as "event@name".
    pub(crate) fn record(tree: &mut ComponentTree, id: ComponentId, event: &'static str, log: &Log) {
        let log = Rc::clone(log);
        tree.listen(id, event, move |tree, e| {
            let who = tree.label(e.source);
            log.borrow_mut().push(format!("{}@{who}", e.name));
        });
    }

    fn tree_with_children(singly: bool, names: &[&str]) -> (ComponentTree, ComponentId, Vec<ComponentId>) {
        let mut tree = ComponentTree::new();
        let ty = component_type();
        let root = tree.create_with(&ty, Options::new().with("singly", singly));
        let kids = names
            .iter()
            .map(|n| {
                let c = tree.create_with(&ty, Options::new());
                tree.add_component(root, c, Some(n)).unwrap();
                c
            })
            .collect();
        (tree, root, kids)
    }

    #[test]
    fn singly_parent_hides_previous_child() {
        let (mut tree, root, kids) = tree_with_children(true, &["p", "q"]);
        let (p, q) = (kids[0], kids[1]);
        assert!(tree.show(p, ShowOptions::default()));
        assert!(tree.is_visible(p));
        assert!(tree.show(q, ShowOptions::default()));
        assert!(!tree.is_visible(p), "showing q hides p");
        assert!(tree.is_visible(q));
        assert_eq!(tree.current_component(root), Some(q));
    }

    #[test]
    fn non_singly_parent_keeps_siblings() {
        let (mut tree, _, kids) = tree_with_children(false, &["p", "q"]);
        tree.show(kids[0], ShowOptions::default());
        tree.show(kids[1], ShowOptions::default());
        assert!(tree.is_visible(kids[0]));
        assert!(tree.is_visible(kids[1]));
    }

    #[test]
    fn overlay_does_not_hide_siblings() {
        let (mut tree, root, kids) = tree_with_children(true, &["p"]);
        let overlay = tree.create_with(&component_type(), Options::new().with("overlay", true));
        tree.add_component(root, overlay, Some("popup")).unwrap();

        tree.show(kids[0], ShowOptions::default());
        tree.show(overlay, ShowOptions::default());
        assert!(tree.is_visible(kids[0]), "overlay leaves p visible");
        assert!(tree.is_visible(overlay));
        assert_eq!(tree.current_component(root), Some(kids[0]));

        // And a regular sibling being shown does not auto-hide the overlay.
        let r = tree.create_with(&component_type(), Options::new());
        tree.add_component(root, r, Some("r")).unwrap();
        tree.show(r, ShowOptions::default());
        assert!(!tree.is_visible(kids[0]));
        assert!(tree.is_visible(overlay), "overlay is exempt from auto-hide");
    }

    #[test]
    fn shown_is_emitted_before_visibility_changes() {
        let (mut tree, _, kids) = tree_with_children(false, &["p"]);
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        tree.listen(kids[0], COMPONENT_SHOWN, move |tree, e| {
            *s.borrow_mut() = Some(tree.is_visible(e.source));
        });
        tree.show(kids[0], ShowOptions::default());
        assert_eq!(*seen.borrow(), Some(false));
    }

    #[test]
    fn hide_on_hidden_component_is_quiet() {
        let (mut tree, _, kids) = tree_with_children(false, &["p"]);
        let log = Log::default();
        record(&mut tree, kids[0], COMPONENT_HIDDEN, &log);
        assert!(!tree.hide(kids[0], HideOptions::default()));
        assert!(log.borrow().is_empty(), "no event for a no-op hide");

        tree.show(kids[0], ShowOptions::default());
        assert!(tree.hide(kids[0], HideOptions::default()));
        assert_eq!(*log.borrow(), ["component:hidden@p"]);
    }

    #[test]
    fn silent_show_and_hide_emit_nothing() {
        let (mut tree, root, kids) = tree_with_children(true, &["p", "q"]);
        let log = Log::default();
        record(&mut tree, kids[0], COMPONENT_SHOWN, &log);
        record(&mut tree, kids[0], COMPONENT_HIDDEN, &log);
        tree.show(kids[0], ShowOptions::silent());
        tree.hide(kids[0], HideOptions::silent());
        assert!(log.borrow().is_empty());
        assert_eq!(
            tree.current_component(root),
            None,
            "silent show does not notify the parent"
        );
    }

    #[test]
    fn show_rerenders_when_already_visible() {
        let (mut tree, _, kids) = tree_with_children(false, &["p"]);
        let log = Log::default();
        tree.set_view(
            kids[0],
            Box::new(RecordingView {
                tag: "v",
                log: Rc::clone(&log),
            }),
        );
        let events = Log::default();
        record(&mut tree, kids[0], COMPONENT_SHOWN, &events);
        tree.show(kids[0], ShowOptions::default());
        tree.show(kids[0], ShowOptions::default());
        assert_eq!(*log.borrow(), ["v:render", "v:show", "v:render", "v:show"]);
        assert_eq!(events.borrow().len(), 1, "second show does not re-announce");
    }

    #[test]
    fn render_complete_follows_render() {
        let (mut tree, _, kids) = tree_with_children(false, &["p"]);
        let log = Log::default();
        tree.set_view(
            kids[0],
            Box::new(RecordingView {
                tag: "v",
                log: Rc::clone(&log),
            }),
        );
        record(&mut tree, kids[0], RENDER_COMPLETE, &log);
        assert!(tree.render(kids[0]));
        assert_eq!(*log.borrow(), ["v:render", "view:renderComplete@p"]);
    }

    #[test]
    fn hide_cascades_unless_disabled() {
        let mut tree = ComponentTree::new();
        let ty = component_type();
        let outer = tree.create_with(&ty, Options::new());
        let inner = tree.create_with(&ty, Options::new());
        tree.add_component(outer, inner, Some("inner")).unwrap();
        tree.show(outer, ShowOptions::default());
        tree.show(inner, ShowOptions::default());
        tree.hide(outer, HideOptions::default());
        assert!(!tree.is_visible(inner), "children hide with their parent");

        let keep = tree.create_with(&ty, Options::new().with("hide_sub_components", false));
        let kid = tree.create_with(&ty, Options::new());
        tree.add_component(keep, kid, Some("kid")).unwrap();
        tree.show(keep, ShowOptions::default());
        tree.show(kid, ShowOptions::default());
        tree.hide(keep, HideOptions::default());
        assert!(tree.is_visible(kid), "cascading disabled by option");
    }

    #[test]
    fn bubble_forwards_identical_payload_until_unbubbled() {
        let (mut tree, root, kids) = tree_with_children(false, &["child"]);
        let seen: Rc<RefCell<Vec<ComponentEvent>>> = Rc::default();
        let s = Rc::clone(&seen);
        tree.listen(root, "evt", move |_, e| s.borrow_mut().push(e.clone()));

        assert!(tree.bubble(root, "child", "evt"));
        assert!(tree.bubble(root, "child", "evt"), "idempotent");
        let payload = EventPayload::Custom(vec![json!(1), json!("two")]);
        tree.trigger(kids[0], "evt", payload.clone());
        assert_eq!(seen.borrow().len(), 1, "registered once despite two calls");
        assert_eq!(seen.borrow()[0].payload, payload);
        assert_eq!(seen.borrow()[0].source, kids[0]);

        assert!(tree.unbubble(root, "child", "evt"));
        tree.trigger(kids[0], "evt", payload);
        assert_eq!(seen.borrow().len(), 1, "no fan-out after unbubble");
        assert!(!tree.unbubble(root, "child", "evt"), "needs a prior bubble");
        assert!(!tree.bubble(root, "nobody", "evt"));
    }

    #[test]
    fn bubbling_chains_across_levels() {
        let mut tree = ComponentTree::new();
        let ty = component_type();
        let top = tree.create_with(&ty, Options::new());
        let mid = tree.create_with(&ty, Options::new());
        let leaf = tree.create_with(&ty, Options::new());
        tree.add_component(top, mid, Some("mid")).unwrap();
        tree.add_component(mid, leaf, Some("leaf")).unwrap();
        tree.bubble(mid, "leaf", "ping");
        tree.bubble(top, "mid", "ping");
        let log = Log::default();
        record(&mut tree, top, "ping", &log);
        tree.trigger(leaf, "ping", EventPayload::Custom(vec![]));
        assert_eq!(*log.borrow(), ["ping@leaf"]);
    }

    #[test]
    fn add_then_remove_destroys_once_and_frees_name() {
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let ty = ComponentDescriptor::new("Counted")
            .parent(&component_type())
            .destruct(move |_, _| *c.borrow_mut() += 1)
            .build();
        let mut tree = ComponentTree::new();
        let root = tree.create_with(&component_type(), Options::new());
        let x = tree.create_with(&ty, Options::new());
        tree.add_component(root, x, Some("foo")).unwrap();
        tree.bubble(root, "foo", "evt");

        assert!(tree.remove_component(root, "foo"));
        assert_eq!(tree.get_component(root, "foo"), None);
        assert_eq!(*count.borrow(), 1, "destruct ran exactly once");
        assert!(!tree.is_alive(x));
        assert!(!tree.is_bubbled(root, "foo", "evt"), "bubble registrations dropped");
        assert!(!tree.remove_component(root, "foo"), "second removal is a no-op");
        assert_eq!(*count.borrow(), 1);

        let y = tree.create_with(&ty, Options::new());
        assert_eq!(tree.add_component(root, y, Some("foo")), Ok("foo".to_owned()));
    }

    #[test]
    fn destroy_runs_derived_first_then_children() {
        let log = Log::default();
        let (l1, l2, l3) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let a = ComponentDescriptor::new("A")
            .parent(&component_type())
            .construct(move |_, _, _| l1.borrow_mut().push("construct A".into()))
            .destruct(move |_, _| l2.borrow_mut().push("destruct A".into()))
            .build();
        let b = ComponentDescriptor::new("B")
            .parent(&a)
            .destruct(move |tree: &mut ComponentTree, id| {
                let kids = tree.children(id).len();
                l3.borrow_mut().push(format!("destruct B with {kids} children"));
            })
            .build();
        let mut tree = ComponentTree::new();
        let root = tree.create_with(&b, Options::new());
        let kid = tree.create_with(&component_type(), Options::new());
        tree.add_component(root, kid, Some("kid")).unwrap();
        tree.set_view(
            root,
            Box::new(RecordingView {
                tag: "v",
                log: Rc::clone(&log),
            }),
        );
        assert!(tree.destroy(root));
        assert!(!tree.is_alive(kid), "children are destroyed with the parent");
        assert!(tree.is_empty());
        assert_eq!(
            *log.borrow(),
            [
                "construct A",
                "destruct B with 1 children",
                "destruct A",
                "v:remove"
            ]
        );
        assert!(!tree.destroy(root), "stale ids are rejected");
    }

    #[test]
    fn names_default_from_type_and_are_set_once() {
        let contact_list = ComponentDescriptor::new("ContactList")
            .parent(&component_type())
            .build();
        let mut tree = ComponentTree::new();
        let root = tree.create_with(&component_type(), Options::new());
        let a = tree.create_with(&contact_list, Options::new());
        assert_eq!(tree.add_component(root, a, None), Ok("contactList".to_owned()));

        let b = tree.create_with(&contact_list, Options::new());
        assert!(matches!(
            tree.add_component(root, b, None),
            Err(ComponentError::DuplicateName { .. })
        ));
        assert_eq!(tree.set_name(b, "other"), Ok(()));
        assert!(matches!(
            tree.set_name(b, "again"),
            Err(ComponentError::NameAlreadySet(_))
        ));
        assert!(matches!(
            tree.add_component(root, b, Some("third")),
            Err(ComponentError::NameAlreadySet(_))
        ));
        assert_eq!(tree.add_component(root, b, None), Ok("other".to_owned()));
        assert!(matches!(
            tree.set_name(b, "late"),
            Err(ComponentError::AlreadyAttached(_))
        ));
    }

    #[test]
    fn structural_misuse_is_rejected() {
        let (mut tree, root, kids) = tree_with_children(false, &["p"]);
        assert_eq!(
            tree.add_component(kids[0], root, Some("loop")),
            Err(ComponentError::Cycle)
        );
        assert!(matches!(
            tree.add_component(root, kids[0], Some("p")),
            Err(ComponentError::AlreadyAttached(_))
        ));
        assert!(!tree.show_component(root, "missing", ShowOptions::default()));
        assert!(!tree.hide_component(root, "missing", HideOptions::default()));
        assert!(!tree.remove_component(root, "missing"));
        tree.destroy(kids[0]);
        assert!(!tree.show(kids[0], ShowOptions::default()));
        assert!(!tree.trigger(kids[0], "evt", EventPayload::Custom(vec![])));
    }

    #[test]
    fn show_and_hide_all_respect_except() {
        let (mut tree, root, kids) = tree_with_children(false, &["a", "b", "c"]);
        assert_eq!(tree.show_all_sub_components(root, &["b"]), 2);
        assert!(tree.is_visible(kids[0]));
        assert!(!tree.is_visible(kids[1]));
        assert_eq!(tree.hide_all_sub_components(root, &["c"]), 1);
        assert!(tree.is_visible(kids[2]));
        assert_eq!(tree.hide_all_sub_components(root, &[]), 1, "idempotent per child");
    }

    #[test]
    fn overridden_show_reaches_builtin_through_super() {
        let log = Log::default();
        let l = Rc::clone(&log);
        let wizard_step = ComponentDescriptor::new("WizardStep")
            .parent(&component_type())
            .method(METHOD_SHOW, move |tree, id, sup, args| {
                l.borrow_mut().push("before".into());
                let shown = sup.call(tree, id, args);
                l.borrow_mut().push(format!("after visible={}", tree.is_visible(id)));
                shown
            })
            .build();
        let mut tree = ComponentTree::new();
        let step = tree.create_with(&wizard_step, Options::new());
        assert!(tree.show(step, ShowOptions::default()));
        assert_eq!(*log.borrow(), ["before", "after visible=true"]);
    }

    #[test]
    fn call_super_from_skips_the_override() {
        let log = Log::default();
        let l = Rc::clone(&log);
        let panel = ComponentDescriptor::new("Panel")
            .parent(&component_type())
            .method(METHOD_SHOW, move |tree, id, sup, args| {
                l.borrow_mut().push("Panel.show".into());
                sup.call(tree, id, args)
            })
            .build();
        let mut tree = ComponentTree::new();
        let id = tree.create_with(&panel, Options::new());

        let out = tree
            .call_super_from(id, "Panel", METHOD_SHOW, &[ShowOptions::default().to_value()])
            .unwrap();
        assert!(is_truthy(&out));
        assert!(tree.is_visible(id), "built-in show ran");
        assert!(log.borrow().is_empty(), "override was bypassed");

        let err = tree
            .call_super_from(id, "Panel", "collapse", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            ComponentError::Class(trellis_class::ClassError::UnregisteredMethod { .. })
        ));
        let err = tree
            .call_super_from(id, "Sidebar", METHOD_SHOW, &[])
            .unwrap_err();
        assert!(matches!(err, ComponentError::Class(_)), "not in the chain");

        tree.destroy(id);
        assert_eq!(
            tree.call_super_from(id, "Panel", METHOD_SHOW, &[]),
            Err(ComponentError::Stale(id))
        );
    }

    #[test]
    fn options_merge_and_write_back() {
        let a = ComponentDescriptor::new("A")
            .parent(&component_type())
            .option("x", 1)
            .option("y", 1)
            .build();
        let b = ComponentDescriptor::new("B")
            .parent(&a)
            .option("y", 2)
            .build();
        let mut tree = ComponentTree::new();
        let mut supplied = Options::new().with("y", 3).with("z", 1);
        let id = tree.create(&b, &mut supplied);
        let opts = tree.options(id).unwrap();
        assert_eq!(opts.get("x"), Some(&json!(1)));
        assert_eq!(opts.get("y"), Some(&json!(3)));
        assert_eq!(opts.get("z"), Some(&json!(1)));
        assert_eq!(
            supplied.get("singly"),
            Some(&json!(false)),
            "caller sees applied defaults"
        );
        assert_eq!(&supplied, opts);
    }

    #[test]
    fn el_and_container_together_keep_el() {
        let mut tree = ComponentTree::new();
        let mut supplied = Options::new().with("el", "#main").with("container", "#side");
        let id = tree.create(&component_type(), &mut supplied);
        assert_eq!(tree.options(id).unwrap().str("el"), Some("#main"));
        assert!(!tree.options(id).unwrap().contains("container"));
        assert!(!supplied.contains("container"));
    }

    #[test]
    fn visible_option_starts_visible() {
        let mut tree = ComponentTree::new();
        let id = tree.create_with(&component_type(), Options::new().with("visible", true));
        assert!(tree.is_visible(id));
        assert!(tree.hide(id, HideOptions::default()));
    }

    #[test]
    fn configured_defaults_apply() {
        let config = FrameworkConfig::from_toml_str("[defaults]\nsingly = true").unwrap();
        let mut tree = ComponentTree::with_config(config);
        let id = tree.create_with(&component_type(), Options::new());
        assert!(tree.flags(id).unwrap().contains(ComponentFlags::SINGLY));
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut tree = ComponentTree::new();
        let a = tree.create_with(&component_type(), Options::new());
        tree.destroy(a);
        let b = tree.create_with(&component_type(), Options::new());
        assert!(tree.is_alive(b));
        assert!(!tree.is_alive(a));
        if a.0 == b.0 {
            assert!(b.1 > a.1, "generation must increase on reuse");
        }
        assert_eq!(tree.roots(), [b]);
    }

    #[test]
    fn listener_removal_by_handle() {
        let (mut tree, _, kids) = tree_with_children(false, &["p"]);
        let log = Log::default();
        let l = Rc::clone(&log);
        let handle = tree
            .listen(kids[0], "evt", move |_, _| l.borrow_mut().push("fired".into()))
            .unwrap();
        tree.trigger(kids[0], "evt", EventPayload::Custom(vec![]));
        assert!(tree.off(kids[0], "evt", &handle));
        assert!(!tree.off(kids[0], "evt", &handle));
        tree.trigger(kids[0], "evt", EventPayload::Custom(vec![]));
        assert_eq!(*log.borrow(), ["fired"]);
    }

    #[test]
    fn default_name_lowercases_first_letter() {
        assert_eq!(default_name("ItemManager"), "itemManager");
        assert_eq!(default_name("x"), "x");
        assert_eq!(default_name(""), "");
    }
}
