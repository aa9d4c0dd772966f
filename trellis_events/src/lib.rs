// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=trellis_events --heading-base-level=0

//! Trellis Events: a synchronous, ordered event emitter.
//!
//! ## Overview
//!
//! [`Emitter<C, A>`](crate::emitter::Emitter) maps event names to ordered listener lists.
//! Listeners receive a mutable context `C` and a payload `A`.
//!
//! - `on` appends and never de-duplicates.
//! - `off` removes the first registration of the same listener (pointer identity); unknown listeners are a no-op.
//! - `trigger` calls the listeners registered when it was called, in registration order, synchronously.
//!   Listeners added or removed while a trigger runs take effect on the next trigger.
//! - A panicking listener is not caught; the panic reaches the caller of `trigger`.
//!
//! ## Minimal usage
//!
//! ```
//! use trellis_events::emitter::{Emitter, listener};
//!
//! let mut em: Emitter<Vec<String>, String> = Emitter::new();
//! let hello = listener(|log: &mut Vec<String>, who: &String| log.push(format!("hello {who}")));
//! em.on("greet", hello.clone());
//!
//! let mut log = Vec::new();
//! em.trigger(&mut log, "greet", &"world".to_owned());
//! em.off("greet", &hello);
//! em.trigger(&mut log, "greet", &"again".to_owned());
//! assert_eq!(log, ["hello world"]);
//! ```

pub mod emitter;
