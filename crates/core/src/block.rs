//! Embedded `aside` configuration blocks.
//!
//! A fenced block tagged `aside` uses its own small vocabulary:
//!
//! ```yaml
//! thumbnail: "[[portrait.png]]"
//! sortContent: false
//! content:
//!   name: Aria
//!   class: Mage
//! ```

use serde::Deserialize;
use thiserror::Error;

use crate::Metadata;
use crate::error::SourceLocation;
use crate::resolver::{Attribute, ResolvedAside, sort_attributes};

/// Text shown in place of the table when a block cannot be read.
pub const PLACEHOLDER: &str = "Unable to display aside";

/// Errors emitted while reading an embedded configuration block.
#[derive(Debug, Error)]
pub enum BlockConfigError {
    /// YAML failed to parse or did not match the block vocabulary.
    #[error("Aside block parse error: {message}")]
    Parse {
        /// Parser message.
        message: String,
        /// Position inside the block body, when the parser reports one.
        location: Option<SourceLocation>,
    },
}

impl BlockConfigError {
    fn from_yaml(err: serde_yaml::Error) -> Self {
        let location = err
            .location()
            .map(|loc| SourceLocation::new(loc.line(), loc.column()));
        BlockConfigError::Parse {
            message: err.to_string(),
            location,
        }
    }

    /// Parser position, if known.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            BlockConfigError::Parse { location, .. } => location.as_ref(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    content: Option<Metadata>,
    #[serde(default)]
    sort_content: Option<bool>,
    #[serde(flatten)]
    unknown: Metadata,
}

/// Parsed configuration block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockConfig {
    /// Image link reference.
    pub thumbnail: Option<String>,
    /// Rows to display, keys in block order.
    pub content: Metadata,
    /// Sort rows by name (default `true`).
    pub sort_content: bool,
}

impl BlockConfig {
    /// Parses a block body.
    pub fn parse(source: &str) -> Result<Self, BlockConfigError> {
        let raw = if source.trim().is_empty() {
            RawBlock::default()
        } else {
            serde_yaml::from_str::<RawBlock>(source).map_err(BlockConfigError::from_yaml)?
        };

        for key in raw.unknown.keys() {
            log::warn!("aside block key '{}' is not recognised", key);
        }

        Ok(Self {
            thumbnail: raw.thumbnail.filter(|link| !link.is_empty()),
            content: raw.content.unwrap_or_default(),
            sort_content: raw.sort_content.unwrap_or(true),
        })
    }

    /// Converts the block into the shared resolved form.
    ///
    /// A block is always shown; it has no prefix or control keys.
    pub fn into_resolved(self) -> ResolvedAside {
        let mut attributes: Vec<Attribute> = self
            .content
            .into_iter()
            .map(|(name, value)| Attribute::new(name, value))
            .collect();
        if self.sort_content {
            sort_attributes(&mut attributes);
        }

        ResolvedAside {
            show: Some(true),
            sort: self.sort_content,
            prefix: String::new(),
            image: self.thumbnail,
            attributes,
        }
    }
}

/// Parses and resolves a block body in one step.
pub fn resolve_block(source: &str) -> Result<ResolvedAside, BlockConfigError> {
    BlockConfig::parse(source).map(BlockConfig::into_resolved)
}
