// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by type dispatch and bound methods.

/// Failure of a dynamic dispatch through a [`Type`](crate::Type).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClassError {
    /// No type in the chain defines the method.
    #[error("`{type_name}` has no method `{method}`")]
    MissingMethod {
        /// Most-derived type that was searched.
        type_name: String,
        /// Requested method name.
        method: String,
    },
    /// A super-call named a method that was never registered on the declaring type.
    #[error("`{declaring}::{method}` is not a registered method; cannot call super")]
    UnregisteredMethod {
        /// Type the caller claimed to be declared on.
        declaring: String,
        /// Method name.
        method: String,
    },
    /// The instance has already run its destruct chain.
    #[error("instance of `{0}` has been destroyed")]
    Destroyed(String),
    /// A bound method was called after its instance was dropped.
    #[error("bound method `{0}` outlived its instance")]
    InstanceDropped(String),
    /// A bound method was called while its instance was already borrowed.
    #[error("bound method `{0}` re-entered its own instance")]
    Reentrant(String),
}
