// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=trellis_class --heading-base-level=0

//! Trellis Class: single-inheritance types with explicit super-calls.
//!
//! ## Overview
//!
//! A [`Type`] is built from a [`TypeDescriptor`]: a name, at most one parent,
//! optional `construct`/`destruct`/`constructed` hooks, methods, declared
//! option defaults, and shared data fields.
//!
//! - Construction runs every level's `construct` hook root first, then the
//!   resolved `constructed` hook once.
//! - Destruction runs every level's `destruct` hook most-derived first.
//! - Methods are resolved most-derived first. An override reaches the method
//!   it shadows through the [`Super`] handle it is called with; the shadowed
//!   method is captured when the type is built, so there is no chain walk at
//!   call time.
//! - Option defaults merge root first, and caller-supplied options win over
//!   every declared layer. See [`Type::merge_options`].
//!
//! ## Receivers
//!
//! Types are generic over the receiver `R` their hooks and methods act on and
//! a copyable key `K`. A standalone [`Instance`] uses its own state as `R` and
//! `()` as `K`. A container of many objects (for example a component tree) can
//! use itself as `R` and an object id as `K`, so methods can reach neighbours.
//!
//! ## Minimal usage
//!
//! ```
//! use serde_json::{Value, json};
//! use trellis_class::{Options, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let base = TypeDescriptor::<Greeter>::new("Greeter")
//!     .option("greeting", "hello")
//!     .construct(|g, (), cfg| g.greeting = cfg.str("greeting").unwrap_or_default().to_owned())
//!     .method("greet", |g, (), _, _| json!(g.greeting))
//!     .build();
//! let shouty = TypeDescriptor::new("Shouty")
//!     .parent(&base)
//!     .method("greet", |g: &mut Greeter, (), sup, args: &[Value]| {
//!         let quiet = sup.call(g, (), args);
//!         json!(quiet.as_str().unwrap_or_default().to_uppercase())
//!     })
//!     .build();
//!
//! let mut config = Options::new();
//! let config = shouty.merge_options(&Options::new(), &mut config);
//! let mut g = shouty.instantiate(Some(config));
//! assert_eq!(g.invoke("greet", &[]), Ok(json!("HELLO")));
//! ```

mod descriptor;
mod error;
mod instance;
mod options;
mod types;

pub use descriptor::TypeDescriptor;
pub use error::ClassError;
pub use instance::{BoundMethod, Instance, SharedInstance, bind_to_instance};
pub use options::{Options, is_truthy};
pub use types::{ConstructHook, Hook, Method, MethodBody, ROOT_TYPE_NAME, Super, Type};
