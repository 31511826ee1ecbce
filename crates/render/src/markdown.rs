//! Default inline markdown renderer.
//!
//! Wikilinks are not CommonMark, so links are expanded into regular
//! markdown links before the text goes through markdown-rs. Resolved embeds
//! are held back as tokens and written as `<img>` tags afterwards, so host
//! resource schemes never pass the URL sanitizer.

use aside_core::{SECONDARY_CLASS, SECONDARY_CLOSE, SECONDARY_OPEN};
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::host::{LinkResolver, MarkdownRenderer};

static WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(!?)\[\[([^\[\]]+?)\]\]").expect("wikilink pattern is valid"));

static EMBED_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E002}([0-9]+)\u{E003}").expect("embed token pattern is valid"));

const EMBED_OPEN: char = '\u{E002}';
const EMBED_CLOSE: char = '\u{E003}';

/// Parser and compiler switches for cell markdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown constructs.
    pub gfm: bool,
    /// Pass raw HTML through instead of escaping it. Only for trusted notes.
    pub raw_html: bool,
    /// Enable math constructs ($inline$ and $$block$$).
    pub math: bool,
}

impl MarkdownOptions {
    /// Defaults for attribute cells: GFM, raw HTML escaped.
    pub const fn cells() -> Self {
        Self {
            gfm: true,
            raw_html: false,
            math: false,
        }
    }

    /// Convert to markdown-rs `Options`.
    pub fn to_markdown(self) -> markdown::Options {
        let mut constructs = markdown::Constructs {
            html_flow: self.raw_html,
            html_text: self.raw_html,
            ..Default::default()
        };

        if self.gfm {
            constructs.gfm_autolink_literal = true;
            constructs.gfm_footnote_definition = true;
            constructs.gfm_label_start_footnote = true;
            constructs.gfm_strikethrough = true;
            constructs.gfm_table = true;
            constructs.gfm_task_list_item = true;
        }

        if self.math {
            constructs.math_flow = true;
            constructs.math_text = true;
        }

        markdown::Options {
            parse: markdown::ParseOptions {
                constructs,
                math_text_single_dollar: self.math,
                ..markdown::ParseOptions::default()
            },
            compile: markdown::CompileOptions {
                allow_dangerous_html: self.raw_html,
                allow_dangerous_protocol: false,
                gfm_tagfilter: self.gfm,
                ..markdown::CompileOptions::default()
            },
        }
    }
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self::cells()
    }
}

/// Renders cell text with markdown-rs.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineMarkdown {
    options: MarkdownOptions,
}

impl InlineMarkdown {
    /// Renderer with the given switches.
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }
}

impl MarkdownRenderer for InlineMarkdown {
    fn render(&self, text: &str, source_path: &str, links: &dyn LinkResolver) -> String {
        let (prepared, embeds) = expand_wikilinks(text, source_path, links);
        match markdown::to_html_with_options(&prepared, &self.options.to_markdown()) {
            Ok(html) => restore_embeds(html.trim_end(), &embeds),
            Err(message) => {
                log::warn!("markdown render failed for {}: {}", source_path, message);
                format!("<p>{}</p>", html_escape::encode_text(text))
            }
        }
    }
}

/// A resolved `![[...]]` embed waiting for its `<img>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Embed {
    url: String,
    label: String,
}

/// Rewrites `[[target|alias]]` into markdown links and resolvable
/// `![[target]]` embeds into tokens indexing the returned embeds.
///
/// Unresolvable embeds fall back to their label as plain text.
fn expand_wikilinks(
    text: &str,
    source_path: &str,
    links: &dyn LinkResolver,
) -> (String, Vec<Embed>) {
    let text = text.replace([EMBED_OPEN, EMBED_CLOSE], "");
    let mut embeds = Vec::new();

    let expanded = WIKILINK.replace_all(&text, |caps: &Captures<'_>| {
        let embed = !caps[1].is_empty();
        let (target, label) = split_alias(&caps[2]);

        if embed {
            return match links.resource_path(target, source_path) {
                Some(url) => {
                    embeds.push(Embed {
                        url,
                        label: label.to_string(),
                    });
                    format!("{EMBED_OPEN}{}{EMBED_CLOSE}", embeds.len() - 1)
                }
                None => escape_label(label),
            };
        }

        let href = links.link_href(target, source_path);
        format!("[{}](<{}>)", escape_label(label), escape_destination(&href))
    });

    (expanded.into_owned(), embeds)
}

fn restore_embeds(html: &str, embeds: &[Embed]) -> String {
    if embeds.is_empty() {
        return html.to_string();
    }
    EMBED_TOKEN
        .replace_all(html, |caps: &Captures<'_>| {
            let embed = caps[1].parse::<usize>().ok().and_then(|i| embeds.get(i));
            match embed {
                Some(embed) => format!(
                    "<img src=\"{}\" alt=\"{}\" />",
                    html_escape::encode_double_quoted_attribute(&embed.url),
                    html_escape::encode_double_quoted_attribute(&embed.label)
                ),
                None => String::new(),
            }
        })
        .into_owned()
}

/// Turns secondary-text markers in rendered HTML into spans.
///
/// Markers in text become `<span class="aside-secondary">` boundaries;
/// markers that ended up inside `alt` attributes are removed.
pub fn secondary_spans(html: &str) -> String {
    if !html.contains([SECONDARY_OPEN, SECONDARY_CLOSE]) {
        return html.to_string();
    }

    let open = format!("<span class=\"{}\">", SECONDARY_CLASS);
    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("[alt]", |el| {
                if let Some(alt) = el.get_attribute("alt") {
                    el.set_attribute("alt", &alt.replace([SECONDARY_OPEN, SECONDARY_CLOSE], ""))?;
                }
                Ok(())
            })],
            document_content_handlers: vec![doc_text!(move |chunk| {
                let text = chunk.as_str();
                if text.contains([SECONDARY_OPEN, SECONDARY_CLOSE]) {
                    let replaced = text
                        .replace(SECONDARY_OPEN, &open)
                        .replace(SECONDARY_CLOSE, "</span>");
                    chunk.replace(&replaced, ContentType::Html);
                }
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    );

    match rewritten {
        Ok(out) => out,
        Err(err) => {
            log::warn!("secondary text rewrite failed: {}", err);
            html.replace([SECONDARY_OPEN, SECONDARY_CLOSE], "")
        }
    }
}

/// Splits `target|alias`; the label defaults to the target.
pub(crate) fn split_alias(inner: &str) -> (&str, &str) {
    match inner.split_once('|') {
        Some((target, alias)) if !alias.trim().is_empty() => (target.trim(), alias.trim()),
        Some((target, _)) => (target.trim(), target.trim()),
        None => (inner.trim(), inner.trim()),
    }
}

fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars() {
        if matches!(ch, '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn escape_destination(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            '<' | '>' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NoLinks, ResourceMap};

    fn render(text: &str) -> String {
        InlineMarkdown::default().render(text, "notes/aria.md", &NoLinks)
    }

    #[test]
    fn plain_text_becomes_paragraph() {
        assert_eq!(render("Mage"), "<p>Mage</p>");
        assert_eq!(render("**Mage**"), "<p><strong>Mage</strong></p>");
    }

    #[test]
    fn section_alias_is_the_visible_label() {
        assert_eq!(
            render("[[Home#Kin|Kin]]"),
            "<p><a href=\"Home#Kin\">Kin</a></p>"
        );
    }

    #[test]
    fn unaliased_link_shows_target() {
        assert_eq!(
            render("[[Elsewhere]]"),
            "<p><a href=\"Elsewhere\">Elsewhere</a></p>"
        );
    }

    #[test]
    fn resolvable_embed_becomes_image() {
        let links = ResourceMap::new().with("sigil.png", "app://sigil.png");
        let html = InlineMarkdown::default().render("![[sigil.png]]", "a.md", &links);
        assert_eq!(html, "<p><img src=\"app://sigil.png\" alt=\"sigil.png\" /></p>");
    }

    #[test]
    fn embed_attributes_are_escaped() {
        let links = ResourceMap::new().with("a.png", "app://x\" onerror=\"alert(1)");
        let html = InlineMarkdown::default().render("![[a.png|Seal]]", "a.md", &links);
        assert_eq!(
            html,
            "<p><img src=\"app://x&quot; onerror=&quot;alert(1)\" alt=\"Seal\" /></p>"
        );
    }

    #[test]
    fn unresolvable_embed_keeps_label() {
        let (text, embeds) = expand_wikilinks("![[gone.png|Gone]]", "a.md", &NoLinks);
        assert_eq!(text, "Gone");
        assert!(embeds.is_empty());
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render("<img src=x onerror=alert(1)>");
        assert!(!html.contains("<img"), "{html}");
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"), "{html}");
    }

    #[test]
    fn script_urls_are_dropped() {
        let html = render("[x](javascript:alert(1))");
        assert!(!html.contains("javascript:"), "{html}");
        assert!(html.contains(">x</a>"), "{html}");
    }

    #[test]
    fn forged_embed_tokens_are_ignored() {
        let links = ResourceMap::new().with("a.png", "app://a.png");
        let html = InlineMarkdown::default().render("\u{E002}0\u{E003} ![[a.png]]", "a.md", &links);
        assert_eq!(html, "<p>0 <img src=\"app://a.png\" alt=\"a.png\" /></p>");
    }

    #[test]
    fn trusted_raw_html_opt_in() {
        let markdown = InlineMarkdown::new(MarkdownOptions {
            raw_html: true,
            ..MarkdownOptions::cells()
        });
        assert_eq!(
            markdown.render("a <kbd>b</kbd>", "a.md", &NoLinks),
            "<p>a <kbd>b</kbd></p>"
        );
    }

    #[test]
    fn secondary_markers_become_spans() {
        let html = render(&format!("Mage {SECONDARY_OPEN}(retired){SECONDARY_CLOSE}"));
        assert_eq!(
            secondary_spans(&html),
            "<p>Mage <span class=\"aside-secondary\">(retired)</span></p>"
        );
    }

    #[test]
    fn secondary_spans_keep_escaped_text() {
        let html = render(&format!("{SECONDARY_OPEN}(<b>){SECONDARY_CLOSE}"));
        assert_eq!(
            secondary_spans(&html),
            "<p><span class=\"aside-secondary\">(&lt;b&gt;)</span></p>"
        );
    }

    #[test]
    fn split_alias_handles_empty_alias() {
        assert_eq!(split_alias("Page|"), ("Page", "Page"));
        assert_eq!(split_alias(" Page | Shown "), ("Page", "Shown"));
    }

    #[test]
    fn labels_escape_brackets() {
        let (text, _) = expand_wikilinks("[[Page|a]b]]", "a.md", &NoLinks);
        assert_eq!(text, "[[Page|a]b]]");
        assert_eq!(escape_label("x[y]"), "x\\[y\\]");
    }
}
