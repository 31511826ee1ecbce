use thiserror::Error;

use crate::block::BlockConfigError;
use crate::frontmatter::FrontmatterError;
use crate::settings::SettingsError;
use crate::template::TemplateError;

/// Line and column inside parsed YAML, both 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Umbrella error for aside operations that can fail.
#[derive(Debug, Error)]
pub enum AsideError {
    /// Frontmatter could not be extracted.
    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),
    /// An embedded configuration block could not be read.
    #[error(transparent)]
    BlockConfig(#[from] BlockConfigError),
    /// Settings could not be decoded or encoded.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// A template could not be loaded.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Non-fatal findings collected while reading control keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsideWarning {
    /// A key carrying the control prefix that is not a known control key.
    UnknownControlKey {
        /// Full metadata key (e.g. `aside-color`).
        key: String,
    },
    /// A known control key holding a value of the wrong type.
    InvalidControlValue {
        /// Full metadata key.
        key: String,
        /// Human-readable description of the accepted type.
        expected: &'static str,
    },
}

impl AsideWarning {
    /// Metadata key the warning refers to.
    pub fn key(&self) -> &str {
        match self {
            AsideWarning::UnknownControlKey { key } => key,
            AsideWarning::InvalidControlValue { key, .. } => key,
        }
    }
}

impl std::fmt::Display for AsideWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsideWarning::UnknownControlKey { key } => {
                write!(f, "unknown control key '{}' ignored", key)
            }
            AsideWarning::InvalidControlValue { key, expected } => {
                write!(f, "control key '{}' expects {}; using default", key, expected)
            }
        }
    }
}

/// Collection of warnings gathered during a single resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Warnings in the order they were found.
    pub warnings: Vec<AsideWarning>,
}

impl Diagnostics {
    /// Create a new empty diagnostics collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and forward it to the log.
    pub fn warn(&mut self, warning: AsideWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get total count of all diagnostics
    pub fn count(&self) -> usize {
        self.warnings.len()
    }
}
