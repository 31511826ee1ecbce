//! Turns a metadata mapping into the rows of an aside.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value as JsonValue;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::Metadata;
use crate::control::{ControlKeys, is_control_key};
use crate::error::Diagnostics;

/// One displayed attribute: the label after prefix stripping and its raw value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    /// Display name.
    pub name: String,
    /// Untouched metadata value.
    pub value: JsonValue,
}

impl Attribute {
    /// Creates an attribute row.
    pub fn new(name: impl Into<String>, value: JsonValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Outcome of resolving one metadata mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAside {
    /// Effective show flag as read from metadata.
    pub show: Option<bool>,
    /// Whether rows were sorted by display name.
    pub sort: bool,
    /// Prefix used to select rows.
    pub prefix: String,
    /// Image link reference, if any.
    pub image: Option<String>,
    /// Rows in display order.
    pub attributes: Vec<Attribute>,
}

/// Resolves an aside from metadata, discarding diagnostics.
pub fn resolve(metadata: Option<&Metadata>) -> Option<ResolvedAside> {
    resolve_with_diagnostics(metadata, &mut Diagnostics::new())
}

/// Resolves an aside from metadata.
///
/// Returns `None` when the metadata is absent or empty, or when the control
/// keys suppress the aside.
pub fn resolve_with_diagnostics(
    metadata: Option<&Metadata>,
    diagnostics: &mut Diagnostics,
) -> Option<ResolvedAside> {
    let metadata = metadata.filter(|m| !m.is_empty())?;
    let controls = ControlKeys::from_metadata(metadata, diagnostics);

    if !controls.participates() {
        log::debug!(
            "aside suppressed (show={:?}, prefix={:?})",
            controls.show,
            controls.prefix
        );
        return None;
    }

    let prefix = controls.prefix.as_str();
    let mut attributes: Vec<Attribute> = metadata
        .iter()
        .filter(|(key, _)| !is_control_key(key))
        .filter_map(|(key, value)| {
            key.strip_prefix(prefix)
                .map(|name| Attribute::new(name, value.clone()))
        })
        .collect();

    if controls.sort {
        sort_attributes(&mut attributes);
    }

    log::debug!("aside resolved with {} rows", attributes.len());

    Some(ResolvedAside {
        show: controls.show,
        sort: controls.sort,
        prefix: controls.prefix,
        image: controls.image,
        attributes,
    })
}

/// Stable sort of rows by display name using [`collate`].
pub fn sort_attributes(attributes: &mut [Attribute]) {
    attributes.sort_by(|a, b| collate(&a.name, &b.name));
}

/// Human-oriented name ordering.
///
/// Names compare by their base letters first, ignoring case and accents,
/// so `élan` sorts beside `elan`. Ties fall back to case-folded and then
/// raw ordering so the result is total.
pub fn collate(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded(a).cmp(folded(b)))
        .then_with(|| a.cmp(b))
}

fn base_letters(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn folded(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().flat_map(char::to_lowercase)
}
