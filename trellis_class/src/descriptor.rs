// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builder for [`Type`]s.

use std::rc::Rc;

use serde_json::Value;

use crate::options::Options;
use crate::types::{ConstructHook, Hook, Method, MethodBody, Super, Type};

enum ParentSpec<R, K> {
    /// No parent key given; extend a fresh root.
    Default,
    Given(Rc<Type<R, K>>),
    /// The parent key was given but empty.
    Missing,
}

/// Describes a type before it is built.
///
/// ```
/// use serde_json::{Value, json};
/// use trellis_class::TypeDescriptor;
///
/// let base = TypeDescriptor::<Vec<String>>::new("Base")
///     .method("greet", |log, (), _, _| {
///         log.push("base".into());
///         json!("hi")
///     })
///     .build();
/// let derived = TypeDescriptor::new("Derived")
///     .parent(&base)
///     .method("greet", |log: &mut Vec<String>, (), sup, args: &[Value]| {
///         log.push("derived".into());
///         sup.call(log, (), args)
///     })
///     .build();
///
/// let mut log = Vec::new();
/// assert_eq!(derived.invoke(&mut log, (), "greet", &[]), Ok(json!("hi")));
/// assert_eq!(log, ["derived", "base"]);
/// ```
pub struct TypeDescriptor<R, K = ()> {
    name: String,
    parent: ParentSpec<R, K>,
    construct: Option<Rc<ConstructHook<R, K>>>,
    destruct: Option<Rc<Hook<R, K>>>,
    constructed: Option<Rc<Hook<R, K>>>,
    methods: Vec<(String, Rc<MethodBody<R, K>>)>,
    options: Options,
    fields: Options,
}

impl<R, K> core::fmt::Debug for TypeDescriptor<R, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field(
                "methods",
                &self.methods.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("options", &self.options)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl<R, K> TypeDescriptor<R, K> {
    /// Start a descriptor with a fixed name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: ParentSpec::Default,
            construct: None,
            destruct: None,
            constructed: None,
            methods: Vec::new(),
            options: Options::new(),
            fields: Options::new(),
        }
    }

    /// Start a descriptor whose name is computed.
    pub fn named_by(name: impl FnOnce() -> String) -> Self {
        Self::new(name())
    }

    /// Extend `parent`.
    #[must_use]
    pub fn parent(mut self, parent: &Rc<Type<R, K>>) -> Self {
        self.parent = ParentSpec::Given(Rc::clone(parent));
        self
    }

    /// Extend `parent` if present.
    ///
    /// Passing `None` here is treated as a caller mistake: the built type
    /// extends a fresh root and a warning is logged.
    #[must_use]
    pub fn parent_opt(mut self, parent: Option<&Rc<Type<R, K>>>) -> Self {
        self.parent = match parent {
            Some(p) => ParentSpec::Given(Rc::clone(p)),
            None => ParentSpec::Missing,
        };
        self
    }

    /// Hook run once at this level during construction, after every ancestor's.
    #[must_use]
    pub fn construct(mut self, f: impl Fn(&mut R, K, &Options) + 'static) -> Self {
        self.construct = Some(Rc::new(f));
        self
    }

    /// Hook run once at this level during destruction, before every ancestor's.
    #[must_use]
    pub fn destruct(mut self, f: impl Fn(&mut R, K) + 'static) -> Self {
        self.destruct = Some(Rc::new(f));
        self
    }

    /// Hook run once after the whole construct chain; inherited if not given.
    #[must_use]
    pub fn constructed(mut self, f: impl Fn(&mut R, K) + 'static) -> Self {
        self.constructed = Some(Rc::new(f));
        self
    }

    /// Declare or override a method.
    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&mut R, K, &Super<'_, R, K>, &[Value]) -> Value + 'static,
    ) -> Self {
        let name = name.into();
        self.methods.retain(|(n, _)| *n != name);
        self.methods.push((name, Rc::new(body)));
        self
    }

    /// Declare a default option at this level.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.set(key, value);
        self
    }

    /// Declare several default options at this level.
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options.extend_from(&options);
        self
    }

    /// Declare a data field shared by every instance.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.set(key, value);
        self
    }

    /// Build the type, flattening the method table.
    pub fn build(self) -> Rc<Type<R, K>> {
        let parent = match self.parent {
            ParentSpec::Given(p) => p,
            ParentSpec::Default => Type::root(),
            ParentSpec::Missing => {
                tracing::warn!(
                    type_name = %self.name,
                    "parent given but empty; extending the root type instead"
                );
                Type::root()
            }
        };

        let mut methods = parent.methods.clone();
        for (name, body) in self.methods {
            let base = parent.methods.get(&name).cloned();
            let method = Method::new(name.clone(), self.name.clone(), body, base);
            methods.insert(name, Rc::new(method));
        }
        let constructed = self.constructed.or_else(|| parent.constructed.clone());

        Rc::new(Type {
            name: self.name,
            parent: Some(parent),
            construct: self.construct,
            destruct: self.destruct,
            constructed,
            methods,
            options: self.options,
            fields: self.fields,
        })
    }
}
