// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Framework configuration threaded into a [`ComponentTree`](crate::ComponentTree).

use serde::{Deserialize, Serialize};
use trellis_class::Options;

use crate::error::ConfigError;

/// Start visible.
pub const OPT_VISIBLE: &str = "visible";
/// Only one non-overlay child visible at a time.
pub const OPT_SINGLY: &str = "singly";
/// Exempt from a singly parent's auto-hide.
pub const OPT_OVERLAY: &str = "overlay";
/// Hide children when hiding; defaults to true.
pub const OPT_HIDE_SUB_COMPONENTS: &str = "hide_sub_components";
/// Element the view renders into.
pub const OPT_EL: &str = "el";
/// Container the view appends to; mutually exclusive with [`OPT_EL`].
pub const OPT_CONTAINER: &str = "container";
/// Store resource name for data-bound components.
pub const OPT_RESOURCE: &str = "resource";
/// Initial query for collection components.
pub const OPT_QUERY: &str = "query";
/// Initial model (JSON) for model components.
pub const OPT_MODEL: &str = "model";

/// Option defaults applied before any type-declared option.
pub fn builtin_defaults() -> Options {
    Options::new()
        .with(OPT_VISIBLE, false)
        .with(OPT_SINGLY, false)
        .with(OPT_OVERLAY, false)
        .with(OPT_HIDE_SUB_COMPONENTS, true)
}

/// Framework-wide settings.
///
/// ```
/// use trellis_component::FrameworkConfig;
///
/// let config = FrameworkConfig::from_toml_str(
///     r#"
///     debug = true
///
///     [defaults]
///     hide_sub_components = false
///     "#,
/// )
/// .unwrap();
/// assert!(config.debug);
/// let defaults = config.effective_defaults();
/// assert!(!defaults.flag("hide_sub_components"));
/// assert!(defaults.contains("singly"), "builtin defaults are kept");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameworkConfig {
    /// Log every event dispatch at debug level.
    pub debug: bool,
    /// Option defaults layered over [`builtin_defaults`].
    pub defaults: Options,
}

impl FrameworkConfig {
    /// Parse from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// [`builtin_defaults`] with this config's overrides applied.
    pub fn effective_defaults(&self) -> Options {
        Options::merge([&builtin_defaults(), &self.defaults])
    }
}
