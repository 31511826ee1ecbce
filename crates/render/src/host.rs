//! Services the host application provides to the renderer.

use std::collections::HashMap;

/// Resolves internal links against the host's document store.
pub trait LinkResolver {
    /// Returns a loadable URL for the resource a link points at.
    ///
    /// `None` means the target does not exist; callers omit the resource.
    fn resource_path(&self, target: &str, source_path: &str) -> Option<String>;

    /// Returns the `href` used for an internal link.
    fn link_href(&self, target: &str, _source_path: &str) -> String {
        target.to_string()
    }
}

/// Converts a display string into inline markup scoped to a source document.
pub trait MarkdownRenderer {
    /// Renders `text` written in the document at `source_path`.
    fn render(&self, text: &str, source_path: &str, links: &dyn LinkResolver) -> String;
}

/// Resolver for hosts without a resource store: nothing resolves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl LinkResolver for NoLinks {
    fn resource_path(&self, _target: &str, _source_path: &str) -> Option<String> {
        None
    }
}

/// Resolver backed by a fixed table of link targets to resource URLs.
///
/// Useful when the host resolves every resource up front.
#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    resources: HashMap<String, String>,
}

impl ResourceMap {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one entry.
    pub fn insert(&mut self, target: impl Into<String>, url: impl Into<String>) {
        self.resources.insert(target.into(), url.into());
    }

    /// Builder form of [`ResourceMap::insert`].
    pub fn with(mut self, target: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert(target, url);
        self
    }
}

impl FromIterator<(String, String)> for ResourceMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}

impl LinkResolver for ResourceMap {
    fn resource_path(&self, target: &str, _source_path: &str) -> Option<String> {
        self.resources.get(target).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_map_resolves_known_targets() {
        let map = ResourceMap::new().with("portrait.png", "app://vault/portrait.png");
        assert_eq!(
            map.resource_path("portrait.png", "notes/aria.md").as_deref(),
            Some("app://vault/portrait.png")
        );
        assert_eq!(map.resource_path("missing.png", "notes/aria.md"), None);
        assert_eq!(map.link_href("Home#Kin", "notes/aria.md"), "Home#Kin");
    }

    #[test]
    fn no_links_never_resolves() {
        assert_eq!(NoLinks.resource_path("a.png", ""), None);
    }
}
