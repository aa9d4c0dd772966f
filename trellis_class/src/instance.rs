// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Standalone instances and instance-bound methods.
//!
//! ## Overview
//!
//! An [`Instance<S>`] pairs a [`Type<S>`] with the state its hooks and
//! methods operate on. [`Type::instantiate`] allocates the state, runs the
//! construct chain, and hands back the instance; [`Instance::destroy`] runs
//! the destruct chain at most once.
//!
//! [`bind_to_instance`] produces a [`BoundMethod`]: a callable permanently
//! tied to one shared instance. The bound method is cached on the instance,
//! so binding the same name twice yields the same callable. That makes bound
//! methods usable as listener identities that can later be removed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::error::ClassError;
use crate::options::Options;
use crate::types::Type;

/// An instance shared between owners and bound methods.
pub type SharedInstance<S> = Rc<RefCell<Instance<S>>>;

/// A constructed object: a type plus its state.
pub struct Instance<S> {
    ty: Rc<Type<S>>,
    state: S,
    bound: BTreeMap<String, BoundMethod>,
    destroyed: bool,
}

impl<S: core::fmt::Debug> core::fmt::Debug for Instance<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.ty.name())
            .field("state", &self.state)
            .field("bound", &self.bound.keys().collect::<Vec<_>>())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl<S: Default> Type<S> {
    /// Allocate state and run the construct chain.
    ///
    /// A missing `config` is replaced by an empty map, so construct hooks
    /// always see a configuration.
    pub fn instantiate(self: &Rc<Self>, config: Option<Options>) -> Instance<S> {
        let config = config.unwrap_or_default();
        let mut state = S::default();
        self.construct_chain(&mut state, (), &config);
        Instance {
            ty: Rc::clone(self),
            state,
            bound: BTreeMap::new(),
            destroyed: false,
        }
    }

    /// [`Type::instantiate`] into a [`SharedInstance`].
    pub fn instantiate_shared(self: &Rc<Self>, config: Option<Options>) -> SharedInstance<S> {
        Rc::new(RefCell::new(self.instantiate(config)))
    }
}

impl<S> Instance<S> {
    /// The instance's type.
    pub fn ty(&self) -> &Rc<Type<S>> {
        &self.ty
    }

    /// Borrow the state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutably borrow the state.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Returns true once [`Instance::destroy`] has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Dispatch a method by name.
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Value, ClassError> {
        if self.destroyed {
            tracing::warn!(type_name = %self.ty.name(), method = name, "call on destroyed instance");
            return Err(ClassError::Destroyed(self.ty.name().to_owned()));
        }
        let ty = Rc::clone(&self.ty);
        ty.invoke(&mut self.state, (), name, args)
    }

    /// Call the ancestor implementation of `declaring::name`.
    pub fn call_super_from(
        &mut self,
        declaring: &str,
        name: &str,
        args: &[Value],
    ) -> Result<Value, ClassError> {
        let ty = Rc::clone(&self.ty);
        ty.call_super_from(&mut self.state, (), declaring, name, args)
    }

    /// Look up a method previously bound with [`bind_to_instance`].
    pub fn bound(&self, name: &str) -> Option<&BoundMethod> {
        self.bound.get(name)
    }

    /// Run the destruct chain, most-derived first.
    ///
    /// Returns false, doing nothing, if the instance was already destroyed.
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            tracing::warn!(type_name = %self.ty.name(), "instance destroyed twice");
            return false;
        }
        let ty = Rc::clone(&self.ty);
        ty.destruct_chain(&mut self.state, ());
        self.destroyed = true;
        self.bound.clear();
        true
    }
}

type BoundFn = dyn Fn(&[Value]) -> Result<Value, ClassError>;

/// A method permanently bound to one instance.
///
/// Equality is identity: two bound methods are equal only if they are the
/// same binding.
#[derive(Clone)]
pub struct BoundMethod {
    name: Rc<str>,
    f: Rc<BoundFn>,
}

impl core::fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for BoundMethod {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl Eq for BoundMethod {}

impl BoundMethod {
    /// Name of the method this was bound from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the method on its instance.
    pub fn call(&self, args: &[Value]) -> Result<Value, ClassError> {
        (self.f)(args)
    }
}

/// Bind `name` to `instance`, caching the binding on the instance.
pub fn bind_to_instance<S: 'static>(
    instance: &SharedInstance<S>,
    name: &str,
) -> Result<BoundMethod, ClassError> {
    {
        let inst = instance.borrow();
        if let Some(existing) = inst.bound.get(name) {
            return Ok(existing.clone());
        }
        if !inst.ty.responds_to(name) {
            tracing::error!(type_name = %inst.ty.name(), method = name, "cannot bind unknown method");
            return Err(ClassError::MissingMethod {
                type_name: inst.ty.name().to_owned(),
                method: name.to_owned(),
            });
        }
    }

    let weak: Weak<RefCell<Instance<S>>> = Rc::downgrade(instance);
    let method_name: Rc<str> = Rc::from(name);
    let captured = Rc::clone(&method_name);
    let f = move |args: &[Value]| {
        let Some(cell) = weak.upgrade() else {
            return Err(ClassError::InstanceDropped(captured.to_string()));
        };
        let Ok(mut inst) = cell.try_borrow_mut() else {
            tracing::warn!(method = %captured, "bound method re-entered its instance");
            return Err(ClassError::Reentrant(captured.to_string()));
        };
        inst.invoke(&captured, args)
    };
    let bound = BoundMethod {
        name: method_name,
        f: Rc::new(f),
    };
    instance
        .borrow_mut()
        .bound
        .insert(name.to_owned(), bound.clone());
    Ok(bound)
}
