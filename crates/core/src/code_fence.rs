//! Fenced code block scanning.
//!
//! Embedded aside configuration lives in fenced blocks tagged with the
//! `aside` language. This module tracks fence state line by line and
//! collects the bodies of blocks whose info string names a given language.

/// Language tag that marks an embedded aside configuration block.
pub const ASIDE_LANGUAGE: &str = "aside";

/// Fence parsing phases tracked across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FencePhase {
    /// Not currently inside a fence.
    #[default]
    Outside,
    /// Within fence contents.
    InsideFence,
}

/// Current fence state (phase, marker, and length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FenceState {
    /// Current fence phase.
    pub phase: FencePhase,
    /// Fence marker character (``` or ~~~).
    pub marker: Option<char>,
    /// Length of the opening fence (number of ` or ~ characters).
    pub length: usize,
}

/// What a single line did to the fence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceEvent<'a> {
    /// The line opened a fence with the given info string (trimmed).
    Open {
        /// Text after the fence markers.
        info: &'a str,
    },
    /// The line closed the current fence.
    Close,
    /// The line is content of an open fence.
    Content,
    /// The line is outside any fence.
    Text,
}

/// Advance fence state based on a single line of text.
pub fn advance_fence_state(line: &str, state: FenceState) -> (FenceState, FenceEvent<'_>) {
    let line = line.trim_end_matches('\r');
    let (visual_indent, byte_offset) = leading_whitespace_info(line);
    let after_indent = &line[byte_offset..];

    match state.phase {
        // CommonMark: fences take 0-3 spaces of indentation
        FencePhase::Outside if visual_indent <= 3 => {
            match detect_fence_marker_with_length(after_indent) {
                Some((marker, length)) => {
                    let info = after_indent[length * marker.len_utf8()..].trim();
                    // Backtick fences may not carry backticks in their info string
                    if marker == '`' && info.contains('`') {
                        return (state, FenceEvent::Text);
                    }
                    let next = FenceState {
                        phase: FencePhase::InsideFence,
                        marker: Some(marker),
                        length,
                    };
                    (next, FenceEvent::Open { info })
                }
                None => (state, FenceEvent::Text),
            }
        }
        FencePhase::Outside => (state, FenceEvent::Text),
        FencePhase::InsideFence => {
            if visual_indent <= 3
                && let Some((marker, closer_len)) = closing_fence(after_indent)
                && Some(marker) == state.marker
                && closer_len >= state.length
            {
                (FenceState::default(), FenceEvent::Close)
            } else {
                (state, FenceEvent::Content)
            }
        }
    }
}

/// A fenced block whose info string matched the requested language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Full info string after the opening markers.
    pub info: String,
    /// Block body without the fences, lines joined with `\n`.
    pub body: String,
    /// 1-based line number of the opening fence.
    pub start_line: usize,
    /// Whether the block was closed before the end of the document.
    pub closed: bool,
}

/// Collects every fenced block whose info string's first word is `language`.
///
/// An unclosed block runs to the end of the document, as in CommonMark.
pub fn find_config_blocks(document: &str, language: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut state = FenceState::default();
    let mut current: Option<(FencedBlock, Vec<&str>)> = None;

    for (index, line) in document.lines().enumerate() {
        let (next_state, event) = advance_fence_state(line, state);
        state = next_state;

        match event {
            FenceEvent::Open { info } => {
                let lang = info.split_whitespace().next().unwrap_or("");
                if lang == language {
                    let block = FencedBlock {
                        info: info.to_string(),
                        body: String::new(),
                        start_line: index + 1,
                        closed: false,
                    };
                    current = Some((block, Vec::new()));
                }
            }
            FenceEvent::Content => {
                if let Some((_, lines)) = current.as_mut() {
                    lines.push(line);
                }
            }
            FenceEvent::Close => {
                if let Some((mut block, lines)) = current.take() {
                    block.body = lines.join("\n");
                    block.closed = true;
                    blocks.push(block);
                }
            }
            FenceEvent::Text => {}
        }
    }

    if let Some((mut block, lines)) = current.take() {
        log::debug!("aside block at line {} is never closed", block.start_line);
        block.body = lines.join("\n");
        blocks.push(block);
    }

    blocks
}

/// Returns (visual_columns, byte_offset) for leading whitespace.
/// Visual columns expand tabs to 4-column boundaries per CommonMark.
fn leading_whitespace_info(line: &str) -> (usize, usize) {
    let mut col = 0;
    let mut bytes = 0;
    for b in line.bytes() {
        match b {
            b' ' => {
                col += 1;
                bytes += 1;
            }
            b'\t' => {
                col += 4 - (col % 4);
                bytes += 1;
            }
            _ => break,
        }
    }
    (col, bytes)
}

fn detect_fence_marker_with_length(after_indent: &str) -> Option<(char, usize)> {
    let mut chars = after_indent.chars();
    let first = chars.next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run_len = 1 + chars.take_while(|c| *c == first).count();
    (run_len >= 3).then_some((first, run_len))
}

/// A closing fence is a run of markers followed only by whitespace.
fn closing_fence(after_indent: &str) -> Option<(char, usize)> {
    let (marker, length) = detect_fence_marker_with_length(after_indent)?;
    after_indent[length..]
        .chars()
        .all(char::is_whitespace)
        .then_some((marker, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_and_closes_backtick_fence() {
        let (open_state, event) = advance_fence_state("```aside", FenceState::default());
        assert_eq!(event, FenceEvent::Open { info: "aside" });
        assert_eq!(open_state.marker, Some('`'));

        let (inner_state, event) = advance_fence_state("content: {}", open_state);
        assert_eq!(event, FenceEvent::Content);

        let (closed, event) = advance_fence_state("```", inner_state);
        assert_eq!(event, FenceEvent::Close);
        assert_eq!(closed, FenceState::default());
    }

    #[test]
    fn deeply_indented_fence_not_opened() {
        let (state, event) = advance_fence_state("    ```aside", FenceState::default());
        assert_eq!(event, FenceEvent::Text);
        assert_eq!(state.phase, FencePhase::Outside);
    }

    #[test]
    fn mismatched_marker_does_not_close() {
        let (state, _) = advance_fence_state("~~~aside", FenceState::default());
        let (state, event) = advance_fence_state("```", state);
        assert_eq!(event, FenceEvent::Content);
        assert_eq!(state.marker, Some('~'));
    }

    #[test]
    fn shorter_closer_does_not_close_longer_fence() {
        let (state, _) = advance_fence_state("````aside", FenceState::default());
        let (state, event) = advance_fence_state("```", state);
        assert_eq!(event, FenceEvent::Content);
        let (_, event) = advance_fence_state("`````", state);
        assert_eq!(event, FenceEvent::Close);
    }

    #[test]
    fn closer_with_info_string_is_content() {
        let (state, _) = advance_fence_state("```aside", FenceState::default());
        let (_, event) = advance_fence_state("```js", state);
        assert_eq!(event, FenceEvent::Content);
    }

    #[test]
    fn finds_only_matching_language() {
        let doc = "# Note\n\n```js\nlet x = 1;\n```\n\n```aside\nthumbnail: \"[[a.png]]\"\ncontent:\n  name: Aria\n```\ntext";
        let blocks = find_config_blocks(doc, ASIDE_LANGUAGE);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_line, 7);
        assert!(blocks[0].closed);
        assert_eq!(
            blocks[0].body,
            "thumbnail: \"[[a.png]]\"\ncontent:\n  name: Aria"
        );
    }

    #[test]
    fn aside_fence_nested_in_longer_fence_is_ignored() {
        let doc = "````md\n```aside\ncontent: {}\n```\n````\n";
        assert!(find_config_blocks(doc, ASIDE_LANGUAGE).is_empty());
    }

    #[test]
    fn unclosed_block_runs_to_end() {
        let doc = "```aside\r\ncontent:\r\n  a: 1\r\n";
        let blocks = find_config_blocks(doc, ASIDE_LANGUAGE);
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].closed);
        assert_eq!(blocks[0].body, "content:\n  a: 1");
    }

    #[test]
    fn info_string_extra_words_are_kept() {
        let blocks = find_config_blocks("~~~ aside wide\n~~~", ASIDE_LANGUAGE);
        assert_eq!(blocks[0].info, "aside wide");
        assert_eq!(blocks[0].body, "");
    }
}
