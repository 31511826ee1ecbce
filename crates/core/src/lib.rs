#![deny(missing_docs)]
//! Aside core: frontmatter resolution, value formatting, and density breakpoints.

/// Embedded `aside` configuration blocks.
pub mod block;
/// Fenced code block scanning.
pub mod code_fence;
/// Reserved `aside-*` control keys.
pub mod control;
/// Core error and diagnostic types.
pub mod error;
/// Attribute value formatting.
pub mod format;
/// YAML frontmatter extraction helpers.
pub mod frontmatter;
/// Width breakpoints for density classes.
pub mod layout;
/// Metadata to aside resolution.
pub mod resolver;
/// Persisted user settings.
pub mod settings;
/// Template block insertion.
pub mod template;

/// Metadata mapping as supplied by the host, keys in document order.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub use block::{BlockConfig, BlockConfigError, PLACEHOLDER, resolve_block};
pub use code_fence::{ASIDE_LANGUAGE, FencedBlock, find_config_blocks};
pub use control::{CONTROL_PREFIX, ControlKeys, is_control_key};
pub use error::{AsideError, AsideWarning, Diagnostics, SourceLocation};
pub use format::{
    FormatOptions, SECONDARY_CLASS, SECONDARY_CLOSE, SECONDARY_OPEN, format_value,
    mark_parentheticals, rewrite_section_links,
};
pub use frontmatter::{
    FrontmatterError, FrontmatterExtraction, extract_frontmatter, metadata_from_document,
};
pub use layout::{Breakpoints, DensityToggles, LayoutMode, Measurements, respond};
pub use resolver::{Attribute, ResolvedAside, collate, resolve, resolve_with_diagnostics};
pub use settings::{AsideSettings, FileSettingsStore, SettingsError, SettingsStore};
pub use template::{
    FsTemplateSource, InsertOutcome, TemplateError, TemplateSource, insert_template_block,
};
