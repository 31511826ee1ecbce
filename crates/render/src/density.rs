//! Applies density toggles to rendered aside HTML.

use std::borrow::Cow;

use aside_core::DensityToggles;
use aside_core::layout::{COMPACT_CLASS, WIDE_CLASS};
use lol_html::{ElementContentHandlers, RewriteStrSettings, Selector, element, rewrite_str};
use thiserror::Error;

use crate::fragment::{CONTAINER_CLASS, CONTENT_CLASS};

/// Errors raised while rewriting HTML.
#[derive(Debug, Error)]
pub enum DensityError {
    /// lol_html could not rewrite the input.
    #[error("Density rewrite failed: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

/// Sets or clears the density classes in `html`.
///
/// Toggles that are `None` leave their class untouched. Applying the same
/// toggles twice gives the same output as applying them once.
pub fn apply_density(html: &str, toggles: &DensityToggles) -> Result<String, DensityError> {
    let element_content_handlers = density_handlers(*toggles);
    if element_content_handlers.is_empty() {
        return Ok(html.to_string());
    }

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers,
            ..RewriteStrSettings::new()
        },
    )?;
    Ok(output)
}

fn density_handlers(
    toggles: DensityToggles,
) -> Vec<(Cow<'static, Selector>, ElementContentHandlers<'static>)> {
    let mut handlers = Vec::new();
    let container_toggles: Vec<(&'static str, bool)> = [
        toggles.aside_compact.map(|on| (COMPACT_CLASS, on)),
        toggles.wide.map(|on| (WIDE_CLASS, on)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if !container_toggles.is_empty() {
        let selector = format!(".{}", CONTAINER_CLASS);
        handlers.push(element!(selector, move |el| {
            let mut classes = el.get_attribute("class").unwrap_or_default();
            for (class, on) in &container_toggles {
                classes = toggle_class(&classes, class, *on);
            }
            el.set_attribute("class", &classes)?;
            Ok(())
        }));
    }

    if let Some(on) = toggles.content_compact {
        let selector = format!(".{}", CONTENT_CLASS);
        handlers.push(element!(selector, move |el| {
            let classes = el.get_attribute("class").unwrap_or_default();
            el.set_attribute("class", &toggle_class(&classes, COMPACT_CLASS, on))?;
            Ok(())
        }));
    }

    handlers
}

/// Adds or removes one class from a class attribute value.
pub fn toggle_class(classes: &str, class: &str, on: bool) -> String {
    let mut list: Vec<&str> = classes
        .split_ascii_whitespace()
        .filter(|existing| *existing != class)
        .collect();
    if on {
        list.push(class);
    }
    list.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = "<div class=\"aside-container frontmatter-aside aside-compact\"><table class=\"aside-content\"></table></div>";

    #[test]
    fn toggle_class_is_idempotent() {
        assert_eq!(toggle_class("a b", "c", true), "a b c");
        assert_eq!(toggle_class("a b c", "c", true), "a b c");
        assert_eq!(toggle_class("a c b", "c", false), "a b");
        assert_eq!(toggle_class("", "c", false), "");
    }

    #[test]
    fn expands_container_and_stacks_table() {
        let toggles = DensityToggles {
            aside_compact: Some(false),
            content_compact: Some(true),
            wide: None,
        };
        let out = apply_density(HTML, &toggles).unwrap();
        assert_eq!(
            out,
            "<div class=\"aside-container frontmatter-aside\"><table class=\"aside-content aside-compact\"></table></div>"
        );
    }

    #[test]
    fn applying_twice_matches_applying_once() {
        let toggles = DensityToggles {
            aside_compact: Some(true),
            content_compact: Some(false),
            wide: Some(true),
        };
        let once = apply_density(HTML, &toggles).unwrap();
        let twice = apply_density(&once, &toggles).unwrap();
        assert_eq!(once, twice);
        assert!(once.contains("aside-container frontmatter-aside aside-compact aside-wide"));
    }

    #[test]
    fn empty_toggles_leave_html_alone() {
        assert_eq!(apply_density(HTML, &DensityToggles::default()).unwrap(), HTML);
    }
}
