//! Aside fragments: the structure handed back to the host.

use std::fmt::Write as _;

use aside_core::layout::COMPACT_CLASS;
use aside_core::{
    ASIDE_LANGUAGE, AsideError, FormatOptions, Metadata, PLACEHOLDER, ResolvedAside,
    extract_frontmatter, find_config_blocks, format_value, resolve, resolve_block,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::host::{LinkResolver, MarkdownRenderer};
use crate::markdown::{InlineMarkdown, secondary_spans, split_alias};

/// Root class of every aside.
pub const CONTAINER_CLASS: &str = "aside-container";
/// Extra root class for asides driven by frontmatter.
pub const FRONTMATTER_CLASS: &str = "frontmatter-aside";
/// Class of the attribute table.
pub const CONTENT_CLASS: &str = "aside-content";
/// Class of the placeholder paragraph.
pub const ERROR_CLASS: &str = "aside-error";

static FIRST_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(.+?)\]\]").expect("link pattern is valid"));

/// Where a view reads its aside from. A deployment picks one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// Document frontmatter with `aside-*` control keys.
    #[default]
    Frontmatter,
    /// Fenced `aside` configuration blocks.
    ConfigBlock,
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsideRow {
    /// Display name.
    pub name: String,
    /// Rendered markup, one entry per display string.
    pub blocks: Vec<String>,
}

/// Rendered aside, ready for the host to attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AsideFragment {
    /// A populated aside.
    Aside {
        /// Root container classes.
        classes: Vec<String>,
        /// Resolved image URL.
        image: Option<String>,
        /// Table rows in display order.
        rows: Vec<AsideRow>,
    },
    /// Shown instead of the table when configuration could not be read.
    Placeholder {
        /// Root container classes.
        classes: Vec<String>,
        /// User-visible message.
        message: String,
    },
}

impl AsideFragment {
    /// The fixed "Unable to display aside" fragment.
    pub fn placeholder() -> Self {
        AsideFragment::Placeholder {
            classes: vec![CONTAINER_CLASS.to_string()],
            message: PLACEHOLDER.to_string(),
        }
    }

    /// Whether this is the placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, AsideFragment::Placeholder { .. })
    }

    /// Serializes the fragment as an HTML string.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        match self {
            AsideFragment::Aside {
                classes,
                image,
                rows,
            } => {
                open_container(&mut html, classes);
                if let Some(src) = image {
                    write!(
                        html,
                        "<img src=\"{}\">",
                        html_escape::encode_double_quoted_attribute(src)
                    )
                    .ok();
                }
                write!(html, "<table class=\"{}\">", CONTENT_CLASS).ok();
                for row in rows {
                    write!(
                        html,
                        "<tr><td><p>{}</p></td><td>",
                        html_escape::encode_text(&row.name)
                    )
                    .ok();
                    for block in &row.blocks {
                        html.push_str("<div>");
                        html.push_str(block);
                        html.push_str("</div>");
                    }
                    html.push_str("</td></tr>");
                }
                html.push_str("</table></div>");
            }
            AsideFragment::Placeholder { classes, message } => {
                open_container(&mut html, classes);
                write!(
                    html,
                    "<p class=\"{}\">{}</p></div>",
                    ERROR_CLASS,
                    html_escape::encode_text(message)
                )
                .ok();
            }
        }
        html
    }
}

fn open_container(html: &mut String, classes: &[String]) {
    write!(
        html,
        "<div class=\"{}\">",
        html_escape::encode_double_quoted_attribute(&classes.join(" "))
    )
    .ok();
}

/// Renders resolved asides through the host's services.
pub struct AsideRenderer {
    links: Box<dyn LinkResolver>,
    markdown: Box<dyn MarkdownRenderer>,
    format: FormatOptions,
}

impl AsideRenderer {
    /// Renderer using the built-in markdown renderer.
    pub fn new(links: impl LinkResolver + 'static) -> Self {
        Self {
            links: Box::new(links),
            markdown: Box::new(InlineMarkdown::default()),
            format: FormatOptions::default(),
        }
    }

    /// Replaces the markdown renderer.
    pub fn with_markdown(mut self, markdown: impl MarkdownRenderer + 'static) -> Self {
        self.markdown = Box::new(markdown);
        self
    }

    /// Replaces the formatting rules.
    pub fn with_format(mut self, format: FormatOptions) -> Self {
        self.format = format;
        self
    }

    /// Renders an already resolved aside.
    pub fn render(
        &self,
        aside: &ResolvedAside,
        trigger: Trigger,
        source_path: &str,
    ) -> AsideFragment {
        let mut classes = vec![CONTAINER_CLASS.to_string()];
        if trigger == Trigger::Frontmatter {
            classes.push(FRONTMATTER_CLASS.to_string());
        }
        classes.push(COMPACT_CLASS.to_string());

        let image = aside
            .image
            .as_deref()
            .and_then(|link| self.image_source(link, source_path));

        let rows = aside
            .attributes
            .iter()
            .map(|attribute| AsideRow {
                name: attribute.name.clone(),
                blocks: format_value(&attribute.value, &self.format)
                    .iter()
                    .map(|text| {
                        let html = self.markdown.render(text, source_path, self.links.as_ref());
                        secondary_spans(&html)
                    })
                    .collect(),
            })
            .collect();

        AsideFragment::Aside {
            classes,
            image,
            rows,
        }
    }

    /// Resolves and renders frontmatter metadata.
    pub fn render_frontmatter(
        &self,
        metadata: Option<&Metadata>,
        source_path: &str,
    ) -> Option<AsideFragment> {
        resolve(metadata).map(|aside| self.render(&aside, Trigger::Frontmatter, source_path))
    }

    /// Parses and renders a configuration block body.
    ///
    /// Unreadable configuration renders the placeholder.
    pub fn render_block(&self, source: &str, source_path: &str) -> AsideFragment {
        match resolve_block(source) {
            Ok(aside) => self.render(&aside, Trigger::ConfigBlock, source_path),
            Err(err) => {
                log::warn!("{}: {}", source_path, err);
                AsideFragment::placeholder()
            }
        }
    }

    /// Renders every aside a whole document produces under `trigger`.
    pub fn render_document(
        &self,
        document: &str,
        source_path: &str,
        trigger: Trigger,
    ) -> Result<Vec<AsideFragment>, AsideError> {
        match trigger {
            Trigger::Frontmatter => {
                let extraction = extract_frontmatter(document)?;
                let metadata = extraction.present.then_some(&extraction.metadata);
                Ok(self
                    .render_frontmatter(metadata, source_path)
                    .into_iter()
                    .collect())
            }
            Trigger::ConfigBlock => Ok(find_config_blocks(document, ASIDE_LANGUAGE)
                .iter()
                .map(|block| self.render_block(&block.body, source_path))
                .collect()),
        }
    }

    /// URL for the first `[[...]]` link in an image reference.
    fn image_source(&self, link: &str, source_path: &str) -> Option<String> {
        let inner = FIRST_LINK.captures(link)?.get(1)?.as_str();
        let (target, _) = split_alias(inner);
        let resolved = self.links.resource_path(target, source_path);
        if resolved.is_none() {
            log::debug!("aside image '{}' did not resolve", target);
        }
        resolved
    }
}

impl std::fmt::Debug for AsideRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsideRenderer")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
