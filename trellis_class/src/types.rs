// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Types, methods, and the super-call handle.
//!
//! ## Receivers
//!
//! A [`Type<R, K>`] is generic over the receiver `R` its hooks and methods act
//! on and a copyable key `K` identifying the particular object inside that
//! receiver. Plain instances use their own state as `R` and `()` as `K`; a
//! component tree uses the tree as `R` and the component id as `K`, so that
//! overridden methods can reach siblings and parents.
//!
//! ## Method tables
//!
//! Method tables are flattened when a type is built: a type's table starts as
//! a copy of its parent's and each own method is inserted on top, recording the
//! entry it shadows as its [`Method::base`]. Dispatch and super-calls never
//! walk the chain at call time.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::ClassError;
use crate::options::Options;

/// Name given to the universal root type.
pub const ROOT_TYPE_NAME: &str = "Object";

/// Construct hook: runs once per level, root first.
pub type ConstructHook<R, K> = dyn Fn(&mut R, K, &Options);

/// Destruct and post-construct hook.
pub type Hook<R, K> = dyn Fn(&mut R, K);

/// Body of a method. Receives the super-call handle for its own level.
pub type MethodBody<R, K> = dyn Fn(&mut R, K, &Super<'_, R, K>, &[Value]) -> Value;

/// A method registered on a type.
pub struct Method<R, K = ()> {
    name: String,
    declared_by: String,
    body: Rc<MethodBody<R, K>>,
    base: Option<Rc<Self>>,
}

impl<R, K> core::fmt::Debug for Method<R, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("declared_by", &self.declared_by)
            .field("base", &self.base.as_ref().map(|b| b.declared_by.as_str()))
            .finish_non_exhaustive()
    }
}

impl<R, K> Method<R, K> {
    pub(crate) fn new(
        name: String,
        declared_by: String,
        body: Rc<MethodBody<R, K>>,
        base: Option<Rc<Self>>,
    ) -> Self {
        Self {
            name,
            declared_by,
            body,
            base,
        }
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the type that declared this method.
    pub fn declared_by(&self) -> &str {
        &self.declared_by
    }

    /// The nearest ancestor method with the same name, if any.
    pub fn base(&self) -> Option<&Self> {
        self.base.as_deref()
    }

    /// Invoke the method with a super handle bound to this level.
    pub fn invoke(&self, receiver: &mut R, key: K, args: &[Value]) -> Value {
        let sup = Super { method: self };
        (self.body)(receiver, key, &sup, args)
    }
}

/// Handle passed to a method body for calling the overridden ancestor method.
///
/// Each level receives its own handle, so a chain of overrides can each call
/// one level further up.
pub struct Super<'m, R, K = ()> {
    method: &'m Method<R, K>,
}

impl<R, K> core::fmt::Debug for Super<'_, R, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Super")
            .field("method", &self.method.name)
            .field("from", &self.method.declared_by)
            .finish()
    }
}

impl<R, K> Super<'_, R, K> {
    /// Returns true if an ancestor defines the method.
    pub fn has_base(&self) -> bool {
        self.method.base.is_some()
    }

    /// Name of the method this handle belongs to.
    pub fn method_name(&self) -> &str {
        &self.method.name
    }

    /// Call the nearest ancestor's implementation.
    ///
    /// Returns [`Value::Null`] and logs a warning if no ancestor defines it.
    pub fn call(&self, receiver: &mut R, key: K, args: &[Value]) -> Value {
        match &self.method.base {
            Some(base) => base.invoke(receiver, key, args),
            None => {
                tracing::warn!(
                    method = %self.method.name,
                    declared_by = %self.method.declared_by,
                    "super-call found no ancestor defining the method"
                );
                Value::Null
            }
        }
    }
}

/// A constructible blueprint with a single parent.
pub struct Type<R, K = ()> {
    pub(crate) name: String,
    pub(crate) parent: Option<Rc<Self>>,
    pub(crate) construct: Option<Rc<ConstructHook<R, K>>>,
    pub(crate) destruct: Option<Rc<Hook<R, K>>>,
    // Resolved: own hook or the nearest ancestor's.
    pub(crate) constructed: Option<Rc<Hook<R, K>>>,
    pub(crate) methods: BTreeMap<String, Rc<Method<R, K>>>,
    pub(crate) options: Options,
    pub(crate) fields: Options,
}

impl<R, K> core::fmt::Debug for Type<R, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<R, K> Type<R, K> {
    /// A fresh universal root: no parent, no hooks, no methods.
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            name: String::from(ROOT_TYPE_NAME),
            parent: None,
            construct: None,
            destruct: None,
            constructed: None,
            methods: BTreeMap::new(),
            options: Options::new(),
            fields: Options::new(),
        })
    }

    /// Type name, for diagnostics and default component names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent type, `None` only for a root.
    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// Levels in the chain, root first, `self` last.
    pub fn chain(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut cur = Some(self);
        while let Some(t) = cur {
            out.push(t);
            cur = t.parent.as_deref();
        }
        out.reverse();
        out
    }

    /// Returns true if `name` is this type or one of its ancestors.
    pub fn is_a(&self, name: &str) -> bool {
        let mut cur = Some(self);
        while let Some(t) = cur {
            if t.name == name {
                return true;
            }
            cur = t.parent.as_deref();
        }
        false
    }

    /// Resolve a method by name.
    pub fn method(&self, name: &str) -> Option<&Rc<Method<R, K>>> {
        self.methods.get(name)
    }

    /// Returns true if the chain defines `name`.
    pub fn responds_to(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Options declared at this level only.
    pub fn declared_options(&self) -> &Options {
        &self.options
    }

    /// Resolve a data field, most-derived declaration first.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let mut cur = Some(self);
        while let Some(t) = cur {
            if let Some(v) = t.fields.get(name) {
                return Some(v);
            }
            cur = t.parent.as_deref();
        }
        None
    }

    /// Merge `defaults`, every level's declared options (root first), then
    /// `supplied`.
    ///
    /// The result is written back into `supplied` and also returned.
    pub fn merge_options(&self, defaults: &Options, supplied: &mut Options) -> Options {
        let chain = self.chain();
        let merged = Options::merge(
            core::iter::once(defaults)
                .chain(chain.iter().map(|t| &t.options))
                .chain(core::iter::once(&*supplied)),
        );
        *supplied = merged.clone();
        merged
    }
}

impl<R, K: Copy> Type<R, K> {
    /// Dispatch `name` on `key`.
    pub fn invoke(
        &self,
        receiver: &mut R,
        key: K,
        name: &str,
        args: &[Value],
    ) -> Result<Value, ClassError> {
        let Some(method) = self.methods.get(name) else {
            tracing::error!(type_name = %self.name, method = name, "no such method");
            return Err(ClassError::MissingMethod {
                type_name: self.name.clone(),
                method: String::from(name),
            });
        };
        Ok(method.invoke(receiver, key, args))
    }

    /// Call the ancestor implementation of `name` as seen from `declaring`.
    ///
    /// This is the dynamic counterpart of [`Super::call`] for code that does
    /// not hold a handle. The pair (`declaring`, `name`) must be a method
    /// registered on a type in this chain. If several levels share the name
    /// `declaring`, the most derived one is used.
    pub fn call_super_from(
        &self,
        receiver: &mut R,
        key: K,
        declaring: &str,
        name: &str,
        args: &[Value],
    ) -> Result<Value, ClassError> {
        let registered = self
            .chain()
            .into_iter()
            .rev()
            .find(|t| t.name == declaring)
            .and_then(|t| t.methods.get(name))
            .filter(|m| m.declared_by == declaring)
            .cloned();
        let Some(method) = registered else {
            tracing::error!(
                declaring,
                method = name,
                "super-call from a method that is not registered on a type"
            );
            return Err(ClassError::UnregisteredMethod {
                declaring: String::from(declaring),
                method: String::from(name),
            });
        };
        Ok(Super { method: &method }.call(receiver, key, args))
    }

    /// Run every level's `construct` root first, then the resolved
    /// `constructed` hook once.
    pub fn construct_chain(&self, receiver: &mut R, key: K, config: &Options) {
        for level in self.chain() {
            if let Some(construct) = &level.construct {
                construct(receiver, key, config);
            }
        }
        if let Some(constructed) = &self.constructed {
            constructed(receiver, key);
        }
    }

    /// Run every level's `destruct`, most-derived first.
    pub fn destruct_chain(&self, receiver: &mut R, key: K) {
        let mut cur = Some(self);
        while let Some(t) = cur {
            if let Some(destruct) = &t.destruct {
                destruct(receiver, key);
            }
            cur = t.parent.as_deref();
        }
    }
}
