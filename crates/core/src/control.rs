//! Reserved `aside-*` metadata keys.
//!
//! Control keys configure resolution and are never displayed. They are read
//! in one validation pass; anything else carrying the control prefix is
//! reported and excluded.

use serde_json::Value as JsonValue;

use crate::Metadata;
use crate::error::{AsideWarning, Diagnostics};

/// Prefix shared by every control key.
pub const CONTROL_PREFIX: &str = "aside-";
/// Forces (`true`) or suppresses (`false`) the aside.
pub const SHOW_KEY: &str = "aside-show";
/// Orders attributes by display name when true.
pub const SORT_KEY: &str = "aside-sort";
/// Embedded-link reference to the aside image.
pub const IMAGE_KEY: &str = "aside-image";
/// Prefix selecting displayed attributes.
pub const PREFIX_KEY: &str = "aside-prefix";

/// Returns true when `key` is reserved for aside configuration.
pub fn is_control_key(key: &str) -> bool {
    key.starts_with(CONTROL_PREFIX)
}

/// Validated control values with their defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlKeys {
    /// Explicit show flag; `None` defers to the prefix.
    pub show: Option<bool>,
    /// Sort attributes by display name (default `true`).
    pub sort: bool,
    /// Image link reference, if any.
    pub image: Option<String>,
    /// Attribute key prefix (default empty).
    pub prefix: String,
}

impl Default for ControlKeys {
    fn default() -> Self {
        Self {
            show: None,
            sort: true,
            image: None,
            prefix: String::new(),
        }
    }
}

impl ControlKeys {
    /// Reads control keys from a metadata mapping.
    ///
    /// Null values count as absent. Wrong-typed values fall back to the
    /// default and unknown `aside-*` keys are reported.
    pub fn from_metadata(metadata: &Metadata, diagnostics: &mut Diagnostics) -> Self {
        let mut keys = ControlKeys::default();

        for (key, value) in metadata {
            if !is_control_key(key) {
                continue;
            }
            match key.as_str() {
                SHOW_KEY => match value {
                    JsonValue::Null => {}
                    JsonValue::Bool(flag) => keys.show = Some(*flag),
                    _ => diagnostics.warn(invalid(key, "a boolean")),
                },
                SORT_KEY => match value {
                    JsonValue::Null => {}
                    JsonValue::Bool(flag) => keys.sort = *flag,
                    _ => diagnostics.warn(invalid(key, "a boolean")),
                },
                IMAGE_KEY => match value {
                    JsonValue::Null => {}
                    JsonValue::String(link) if link.is_empty() => {}
                    JsonValue::String(link) => keys.image = Some(link.clone()),
                    _ => diagnostics.warn(invalid(key, "a link string")),
                },
                PREFIX_KEY => match value {
                    JsonValue::Null => {}
                    JsonValue::String(prefix) => keys.prefix = prefix.clone(),
                    _ => diagnostics.warn(invalid(key, "a string")),
                },
                _ => diagnostics.warn(AsideWarning::UnknownControlKey { key: key.clone() }),
            }
        }

        keys
    }

    /// Whether an aside should be rendered at all.
    ///
    /// An explicit `false` always hides it. Without an explicit `true`, a
    /// non-empty prefix is required.
    pub fn participates(&self) -> bool {
        match self.show {
            Some(false) => false,
            Some(true) => true,
            None => !self.prefix.is_empty(),
        }
    }
}

fn invalid(key: &str, expected: &'static str) -> AsideWarning {
    AsideWarning::InvalidControlValue {
        key: key.to_string(),
        expected,
    }
}
