use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::Metadata;
use crate::error::SourceLocation;

const FENCE: &str = "---";

/// Frontmatter split off a note.
#[derive(Debug)]
pub struct FrontmatterExtraction {
    /// Parsed mapping, keys in document order.
    pub metadata: Metadata,
    /// Whether the note opened with a `---` block.
    pub present: bool,
    /// Byte offset of the first line after the closing fence.
    pub body_start: usize,
}

/// Errors emitted while reading frontmatter.
#[derive(Debug, Error)]
pub enum FrontmatterError {
    /// Opening `---` with no closing fence.
    #[error("Unterminated YAML frontmatter block: expected closing '---'")]
    Unterminated,
    /// YAML failed to parse.
    #[error("Frontmatter parse error: {message}")]
    Parse {
        /// Parser message.
        message: String,
        /// Position in the note, when the parser reports one.
        location: Option<SourceLocation>,
    },
    /// Frontmatter was a scalar or a list.
    #[error("Frontmatter must be a YAML mapping at the top level")]
    InvalidRootType,
}

impl FrontmatterError {
    fn parse(message: impl ToString) -> Self {
        FrontmatterError::Parse {
            message: message.to_string(),
            location: None,
        }
    }
}

/// Splits YAML frontmatter off a note and parses it.
///
/// Leading blank lines and a byte-order mark are skipped. A note whose first
/// non-blank line is not `---` has no frontmatter.
pub fn extract_frontmatter(input: &str) -> Result<FrontmatterExtraction, FrontmatterError> {
    let Some(span) = locate(input)? else {
        return Ok(FrontmatterExtraction {
            metadata: Metadata::new(),
            present: false,
            body_start: 0,
        });
    };

    let metadata = parse_yaml_mapping(span.yaml).map_err(|err| match err {
        FrontmatterError::Parse {
            message,
            location: Some(loc),
        } => FrontmatterError::Parse {
            message,
            location: Some(SourceLocation::new(loc.line + span.first_line - 1, loc.column)),
        },
        other => other,
    })?;

    Ok(FrontmatterExtraction {
        metadata,
        present: true,
        body_start: span.body_start,
    })
}

/// Frontmatter mapping of a note, or `None` when absent or unreadable.
///
/// Malformed frontmatter is logged.
pub fn metadata_from_document(input: &str) -> Option<Metadata> {
    match extract_frontmatter(input) {
        Ok(extraction) => extraction.present.then_some(extraction.metadata),
        Err(err) => {
            log::warn!("ignoring frontmatter: {}", err);
            None
        }
    }
}

/// Parses a YAML mapping into metadata. Blank or `null` YAML is an empty mapping.
pub(crate) fn parse_yaml_mapping(yaml: &str) -> Result<Metadata, FrontmatterError> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }

    let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|err| {
        let location = err
            .location()
            .map(|loc| SourceLocation::new(loc.line(), loc.column()));
        FrontmatterError::Parse {
            message: err.to_string(),
            location,
        }
    })?;

    match serde_json::to_value(value).map_err(FrontmatterError::parse)? {
        JsonValue::Null => Ok(Metadata::new()),
        JsonValue::Object(map) => Ok(map),
        _ => Err(FrontmatterError::InvalidRootType),
    }
}

struct Span<'a> {
    yaml: &'a str,
    /// 1-based line of the first YAML line.
    first_line: usize,
    body_start: usize,
}

struct Line<'a> {
    text: &'a str,
    start: usize,
    end: usize,
    number: usize,
}

fn lines_from(input: &str, offset: usize) -> impl Iterator<Item = Line<'_>> {
    let mut start = offset;
    input[offset..]
        .split_inclusive('\n')
        .enumerate()
        .map(move |(index, raw)| {
            let line = Line {
                text: raw.trim_end_matches(['\n', '\r']),
                start,
                end: start + raw.len(),
                number: index + 1,
            };
            start += raw.len();
            line
        })
}

fn locate(input: &str) -> Result<Option<Span<'_>>, FrontmatterError> {
    let offset = if input.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };
    let mut lines = lines_from(input, offset).skip_while(|line| line.text.trim().is_empty());

    let Some(opening) = lines.next().filter(|line| line.text == FENCE) else {
        return Ok(None);
    };

    let closing = lines
        .find(|line| line.text == FENCE)
        .ok_or(FrontmatterError::Unterminated)?;

    Ok(Some(Span {
        yaml: input[opening.end..closing.start].trim_end_matches(['\r', '\n']),
        first_line: opening.number + 1,
        body_start: closing.end,
    }))
}
