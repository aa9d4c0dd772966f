// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use trellis_class::ClassError;

use crate::types::ComponentId;

/// Usage errors reported by tree operations.
///
/// Every variant is also logged at warning level where it is raised; the tree
/// is left unchanged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    /// The id refers to a destroyed component.
    #[error("component {0:?} has been destroyed")]
    Stale(ComponentId),
    /// The parent already has a child with this name.
    #[error("`{parent}` already has a child named `{name}`")]
    DuplicateName {
        /// Parent's name.
        parent: String,
        /// Conflicting child name.
        name: String,
    },
    /// The component already belongs to a parent.
    #[error("component `{0}` is already attached to a parent")]
    AlreadyAttached(String),
    /// The component's name was already set.
    #[error("component is already named `{0}`")]
    NameAlreadySet(String),
    /// Adding the component would make it its own ancestor.
    #[error("a component cannot contain itself or one of its ancestors")]
    Cycle,
    /// Dispatch through the component's type failed.
    #[error(transparent)]
    Class(#[from] ClassError),
}

/// Failure to load a [`FrameworkConfig`](crate::FrameworkConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML source did not parse or did not match the schema.
    #[error("invalid framework config: {0}")]
    Toml(#[from] toml::de::Error),
}
