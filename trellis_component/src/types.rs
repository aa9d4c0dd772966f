// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the component tree: ids, flags, lifecycle options, records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_class::Options;

/// Identifier for a component in a [`ComponentTree`](crate::ComponentTree).
///
/// A slot index plus a generation counter. Destroying a component frees its
/// slot; reusing the slot bumps the generation, so a stale id never aliases a
/// newer component. See [`ComponentTree::is_alive`](crate::ComponentTree::is_alive).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ComponentId(pub(crate) u32, pub(crate) u32);

impl ComponentId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Per-component lifecycle flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ComponentFlags: u8 {
        /// The last lifecycle call was `show`.
        const VISIBLE      = 0b0000_0001;
        /// At most one non-overlay child is visible at a time.
        const SINGLY       = 0b0000_0010;
        /// Exempt from a singly parent's auto-hide.
        const OVERLAY      = 0b0000_0100;
        /// `hide` also hides every child.
        const CASCADE_HIDE = 0b0000_1000;
    }
}

impl Default for ComponentFlags {
    fn default() -> Self {
        Self::CASCADE_HIDE
    }
}

impl ComponentFlags {
    /// Derive flags from merged options.
    pub fn from_options(options: &Options) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::VISIBLE, options.flag(crate::config::OPT_VISIBLE));
        flags.set(Self::SINGLY, options.flag(crate::config::OPT_SINGLY));
        flags.set(Self::OVERLAY, options.flag(crate::config::OPT_OVERLAY));
        // Cascading is on unless explicitly disabled.
        flags.set(
            Self::CASCADE_HIDE,
            options
                .get(crate::config::OPT_HIDE_SUB_COMPONENTS)
                .is_none_or(trellis_class::is_truthy),
        );
        flags
    }
}

/// Options for [`ComponentTree::show`](crate::ComponentTree::show).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowOptions {
    /// Do not emit `component:shown`.
    pub silent: bool,
    /// Model components: fetch this id, then show.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Model components: adopt this model and show without fetching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
    /// Collection components: load with these query parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Options>,
}

impl ShowOptions {
    /// Silent show.
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    /// Show after fetching the model with `id`.
    pub fn with_id(id: impl Into<Value>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Show with an already-fetched model.
    pub fn with_model(model: Model) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    /// Show after loading with `query`.
    pub fn with_query(query: Options) -> Self {
        Self {
            query: Some(query),
            ..Self::default()
        }
    }

    /// The same options without the data-loading fields.
    #[must_use]
    pub fn without_data(&self) -> Self {
        Self {
            silent: self.silent,
            ..Self::default()
        }
    }

    /// Encode as a method argument.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode from the first method argument; missing or malformed is default.
    pub fn from_args(args: &[Value]) -> Self {
        args.first()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

/// Options for [`ComponentTree::hide`](crate::ComponentTree::hide).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HideOptions {
    /// Do not emit `component:hidden`.
    pub silent: bool,
}

impl HideOptions {
    /// Silent hide.
    pub fn silent() -> Self {
        Self { silent: true }
    }

    /// Encode as a method argument.
    pub fn to_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode from the first method argument; missing or malformed is default.
    pub fn from_args(args: &[Value]) -> Self {
        args.first()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

/// A data record bound to a model component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    /// Server identity; `None` for records that were never saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Attribute values.
    pub attributes: Options,
}

impl Model {
    /// A new, unsaved record.
    pub fn new(attributes: Options) -> Self {
        Self {
            id: None,
            attributes,
        }
    }

    /// A record with a known id.
    pub fn with_id(id: impl Into<Value>, attributes: Options) -> Self {
        Self {
            id: Some(id.into()),
            attributes,
        }
    }

    /// Returns true if the record was never saved.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Look up an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// A copy with `changes` applied over the attributes.
    #[must_use]
    pub fn merged(&self, changes: &Options) -> Self {
        let mut out = self.clone();
        out.attributes.extend_from(changes);
        out
    }
}

/// Describes a persistence reply, successful or not.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Status code, HTTP-like.
    pub status: u16,
    /// Human-readable detail.
    pub message: String,
}

impl Response {
    /// Build a response.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl core::fmt::Display for Response {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

/// Identifies one in-flight persistence request.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Ticket(pub(crate) u64);

impl Ticket {
    /// Raw value, for logging or store-side bookkeeping.
    pub fn get(self) -> u64 {
        self.0
    }
}
