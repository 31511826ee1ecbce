//! The "insert aside block" command.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::code_fence::ASIDE_LANGUAGE;
use crate::settings::AsideSettings;

/// Errors raised while loading a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template exists at the configured path.
    #[error("Aside template not found: {path}")]
    NotFound {
        /// Configured template path.
        path: String,
    },
    /// The template exists but could not be read.
    #[error("Failed to read aside template {path}: {source}")]
    Read {
        /// Configured template path.
        path: String,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
}

/// Host storage the template is read from.
pub trait TemplateSource {
    /// Reads the template at a storage-relative path.
    fn read_template(&self, path: &str) -> Result<String, TemplateError>;
}

/// Templates read from a directory on disk (e.g. a vault root).
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    /// Source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for FsTemplateSource {
    fn read_template(&self, path: &str) -> Result<String, TemplateError> {
        let relative = Path::new(path);
        // Paths may not escape the root.
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(TemplateError::NotFound { path: path.into() });
        }

        std::fs::read_to_string(self.root.join(relative)).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound { path: path.into() }
            } else {
                TemplateError::Read {
                    path: path.into(),
                    source,
                }
            }
        })
    }
}

/// Result of running the insert command against an editor buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Buffer text after insertion.
    pub text: String,
    /// Byte offset just after the inserted block.
    pub cursor: usize,
    /// Transient message for the user, if the template could not be used.
    pub notice: Option<String>,
}

/// Wraps a template body in an `aside` fence.
pub fn template_block(body: &str) -> String {
    let body = body.trim_end_matches(['\r', '\n']);
    format!("```{ASIDE_LANGUAGE}\n{body}\n```\n")
}

/// Inserts an aside block at `cursor`, pre-filled from the configured template.
///
/// A template that cannot be read produces a notice and an empty block.
pub fn insert_template_block(
    text: &str,
    cursor: usize,
    settings: &AsideSettings,
    source: &dyn TemplateSource,
) -> InsertOutcome {
    let (body, notice) = load_template_body(settings, source);

    let mut at = cursor.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }

    let mut block = String::new();
    if at > 0 && !text[..at].ends_with('\n') {
        block.push('\n');
    }
    block.push_str(&template_block(&body));

    let mut out = String::with_capacity(text.len() + block.len());
    out.push_str(&text[..at]);
    out.push_str(&block);
    out.push_str(&text[at..]);

    InsertOutcome {
        text: out,
        cursor: at + block.len(),
        notice,
    }
}

fn load_template_body(
    settings: &AsideSettings,
    source: &dyn TemplateSource,
) -> (String, Option<String>) {
    let path = settings.template_path.trim();
    if path.is_empty() {
        return (String::new(), None);
    }
    match source.read_template(path) {
        Ok(body) => (body, None),
        Err(err) => {
            log::warn!("{}", err);
            (String::new(), Some(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapSource(HashMap<&'static str, &'static str>);

    impl TemplateSource for MapSource {
        fn read_template(&self, path: &str) -> Result<String, TemplateError> {
            self.0
                .get(path)
                .map(|body| body.to_string())
                .ok_or_else(|| TemplateError::NotFound { path: path.into() })
        }
    }

    fn settings(path: &str) -> AsideSettings {
        AsideSettings {
            template_path: path.into(),
            ..Default::default()
        }
    }

    fn source() -> MapSource {
        MapSource(HashMap::from([("sheet.yaml", "content:\n  name: \n")]))
    }

    #[test]
    fn inserts_template_contents() {
        let outcome = insert_template_block("", 0, &settings("sheet.yaml"), &source());
        assert_eq!(outcome.text, "```aside\ncontent:\n  name: \n```\n");
        assert_eq!(outcome.cursor, outcome.text.len());
        assert_eq!(outcome.notice, None);
    }

    #[test]
    fn missing_template_notifies_and_inserts_empty_block() {
        let outcome = insert_template_block("# Aria\n", 7, &settings("gone.yaml"), &source());
        assert_eq!(outcome.text, "# Aria\n```aside\n\n```\n");
        assert_eq!(
            outcome.notice.as_deref(),
            Some("Aside template not found: gone.yaml")
        );
    }

    #[test]
    fn empty_path_inserts_silently() {
        let outcome = insert_template_block("", 0, &settings(""), &source());
        assert_eq!(outcome.text, "```aside\n\n```\n");
        assert_eq!(outcome.notice, None);
    }

    #[test]
    fn mid_line_cursor_starts_a_new_line() {
        let outcome = insert_template_block("ab", 1, &settings(""), &source());
        assert_eq!(outcome.text, "a\n```aside\n\n```\nb");
        assert_eq!(&outcome.text[outcome.cursor..], "b");
    }

    #[test]
    fn cursor_is_clamped_to_char_boundary() {
        let outcome = insert_template_block("é", 1, &settings(""), &source());
        assert_eq!(outcome.text, "```aside\n\n```\né");
        let past_end = insert_template_block("x\n", 99, &settings(""), &source());
        assert_eq!(past_end.text, "x\n```aside\n\n```\n");
    }

    #[test]
    fn fs_source_rejects_escaping_paths() {
        let source = FsTemplateSource::new(std::env::temp_dir());
        assert!(matches!(
            source.read_template("../etc/passwd"),
            Err(TemplateError::NotFound { .. })
        ));
    }

    #[test]
    fn fs_source_reads_files() {
        let dir = std::env::temp_dir().join(format!("aside-template-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("t.yaml"), "thumbnail: x\n").unwrap();
        let source = FsTemplateSource::new(&dir);
        assert_eq!(source.read_template("t.yaml").unwrap(), "thumbnail: x\n");
        assert!(matches!(
            source.read_template("missing.yaml"),
            Err(TemplateError::NotFound { .. })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
