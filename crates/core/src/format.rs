//! Attribute value formatting.
//!
//! A raw metadata value becomes zero or more display strings, each later
//! rendered as its own block inside the attribute's cell.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Class applied to wrapped parenthetical text.
pub const SECONDARY_CLASS: &str = "aside-secondary";
/// Marks the start of secondary text in a display string.
///
/// A private-use character, so it survives markdown rendering as plain text;
/// the renderer turns each marker pair into a [`SECONDARY_CLASS`] span.
pub const SECONDARY_OPEN: char = '\u{E000}';
/// Marks the end of secondary text in a display string.
pub const SECONDARY_CLOSE: char = '\u{E001}';

/// Matches `[[target#section]]` links that carry no alias yet.
static SECTION_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^\[\]|]+?#([^\[\]|]+?))\]\]").expect("section link pattern is valid")
});

/// Optional formatting rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Wrap `(...)` runs in a secondary-styled span.
    #[serde(alias = "wrapParentheticals")]
    pub wrap_parentheticals: bool,
}

/// Formats one raw value into its display strings.
///
/// Arrays expand element-wise; falsy elements are dropped.
pub fn format_value(value: &JsonValue, options: &FormatOptions) -> Vec<String> {
    let elements: &[JsonValue] = match value {
        JsonValue::Array(items) => items,
        other => std::slice::from_ref(other),
    };

    elements
        .iter()
        .filter(|element| is_truthy(element))
        .map(|element| format_text(&display_string(element), options))
        .collect()
}

/// Applies the text rewrites to an already stringified value.
///
/// Marker characters already present in the value are removed, so only
/// the formatter can introduce secondary text.
pub fn format_text(text: &str, options: &FormatOptions) -> String {
    let text = if text.contains([SECONDARY_OPEN, SECONDARY_CLOSE]) {
        Cow::Owned(text.replace([SECONDARY_OPEN, SECONDARY_CLOSE], ""))
    } else {
        Cow::Borrowed(text)
    };
    let text = if options.wrap_parentheticals {
        Cow::Owned(mark_parentheticals(&text).into_owned())
    } else {
        text
    };
    rewrite_section_links(&text).into_owned()
}

/// Truthiness of a metadata value.
///
/// `null`, `false`, zero and the empty string are falsy. Collections are
/// truthy even when empty.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Generic string conversion of a metadata value.
pub fn display_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(flag) => flag.to_string(),
        JsonValue::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.to_string()
            } else if let Some(uint) = number.as_u64() {
                uint.to_string()
            } else {
                number.as_f64().map(float_string).unwrap_or_default()
            }
        }
        JsonValue::String(text) => text.clone(),
        JsonValue::Array(items) => items
            .iter()
            .map(display_string)
            .collect::<Vec<_>>()
            .join(","),
        JsonValue::Object(_) => value.to_string(),
    }
}

/// Shortest round-trip form; exponent notation below 1e-6 and from 1e21 up.
fn float_string(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        let exp = format!("{:e}", value);
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    } else {
        value.to_string()
    }
}

/// Gives `[[page#section]]` links an explicit `|section` alias.
///
/// Links without a `#`, or that already carry an alias, are untouched.
pub fn rewrite_section_links(text: &str) -> Cow<'_, str> {
    SECTION_LINK.replace_all(text, "[[${1}|${2}]]")
}

/// Surrounds balanced `(...)` runs with [`SECONDARY_OPEN`] and [`SECONDARY_CLOSE`].
///
/// Parentheses inside `[[...]]` links and markdown link destinations are
/// left alone, as are unbalanced ones.
pub fn mark_parentheticals(text: &str) -> Cow<'_, str> {
    if !text.contains('(') {
        return Cow::Borrowed(text);
    }

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut copied = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"[[") {
            i = text[i + 2..].find("]]").map_or(bytes.len(), |end| i + 2 + end + 2);
            continue;
        }
        if bytes[i..].starts_with(b"](") {
            i = matching_paren(bytes, i + 1).map_or(bytes.len(), |end| end + 1);
            continue;
        }
        if bytes[i] == b'(' && let Some(end) = matching_paren(bytes, i) {
            out.push_str(&text[copied..i]);
            out.push(SECONDARY_OPEN);
            out.push_str(&text[i..=end]);
            out.push(SECONDARY_CLOSE);
            copied = end + 1;
            i = end + 1;
            continue;
        }
        i += 1;
    }

    if copied == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

/// Index of the `)` balancing the `(` at `open`.
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in bytes[open..].iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn plain(value: JsonValue) -> Vec<String> {
        format_value(&value, &FormatOptions::default())
    }

    #[test]
    fn scalar_becomes_single_string() {
        assert_eq!(plain(json!("Aria")), ["Aria"]);
        assert_eq!(plain(json!(42)), ["42"]);
        assert_eq!(plain(json!(2.5)), ["2.5"]);
        assert_eq!(plain(json!(3.0)), ["3"]);
        assert_eq!(plain(json!(true)), ["true"]);
    }

    #[test]
    fn extreme_floats_use_exponents() {
        assert_eq!(plain(json!(1e21)), ["1e+21"]);
        assert_eq!(plain(json!(1.5e300)), ["1.5e+300"]);
        assert_eq!(plain(json!(1e20)), ["100000000000000000000"]);
        assert_eq!(plain(json!(0.000001)), ["0.000001"]);
        assert_eq!(plain(json!(1.5e-7)), ["1.5e-7"]);
        assert_eq!(plain(json!(-2e-9)), ["-2e-9"]);
    }

    #[test]
    fn falsy_values_are_dropped() {
        assert!(plain(json!(null)).is_empty());
        assert!(plain(json!(false)).is_empty());
        assert!(plain(json!(0)).is_empty());
        assert!(plain(json!(0.0)).is_empty());
        assert!(plain(json!("")).is_empty());
    }

    #[test]
    fn array_drops_empty_elements() {
        assert_eq!(plain(json!(["a", "", "b"])), ["a", "b"]);
        assert_eq!(plain(json!([1, null, 0, "x"])), ["1", "x"]);
        assert!(plain(json!([])).is_empty());
    }

    #[test]
    fn nested_values_use_generic_conversion() {
        assert_eq!(plain(json!([["a", "b"], {"k": 1}])), ["a,b", "{\"k\":1}"]);
    }

    #[test]
    fn section_links_gain_alias() {
        assert_eq!(plain(json!("[[Page#Section]]")), ["[[Page#Section|Section]]"]);
        assert_eq!(plain(json!("[[Page]]")), ["[[Page]]"]);
        assert_eq!(
            rewrite_section_links("See [[A#b]] and [[C#d e]]."),
            "See [[A#b|b]] and [[C#d e|d e]]."
        );
    }

    #[test]
    fn aliased_and_local_links_are_untouched() {
        assert_eq!(rewrite_section_links("[[A#b|Custom]]"), "[[A#b|Custom]]");
        assert_eq!(rewrite_section_links("[[#Local]]"), "[[#Local]]");
    }

    #[test]
    fn rewrite_applies_inside_arrays() {
        assert_eq!(
            plain(json!(["[[Home#Kin]]", "[[Elsewhere]]"])),
            ["[[Home#Kin|Kin]]", "[[Elsewhere]]"]
        );
    }

    fn secondary(text: &str) -> String {
        format!("{SECONDARY_OPEN}{text}{SECONDARY_CLOSE}")
    }

    #[test]
    fn parentheticals_are_opt_in() {
        assert_eq!(plain(json!("Mage (retired)")), ["Mage (retired)"]);

        let options = FormatOptions {
            wrap_parentheticals: true,
        };
        assert_eq!(
            format_value(&json!("Mage (retired)"), &options),
            [format!("Mage {}", secondary("(retired)"))]
        );
    }

    #[test]
    fn parenthetical_marking_skips_links() {
        assert_eq!(mark_parentheticals("[[Page (old)]]"), "[[Page (old)]]");
        assert_eq!(
            mark_parentheticals("[site](https://x.io/a_(b)) (note)"),
            format!("[site](https://x.io/a_(b)) {}", secondary("(note)"))
        );
        assert_eq!(mark_parentheticals("open (ended"), "open (ended");
        assert_eq!(
            mark_parentheticals("Élan (née Voss)"),
            format!("Élan {}", secondary("(née Voss)"))
        );
        assert_eq!(
            mark_parentheticals("a (b (c) d) e"),
            format!("a {} e", secondary("(b (c) d)"))
        );
    }

    #[test]
    fn marking_runs_before_link_rewrite() {
        let options = FormatOptions {
            wrap_parentheticals: true,
        };
        assert_eq!(
            format_text("(see [[Lore#Origins]])", &options),
            secondary("(see [[Lore#Origins|Origins]])")
        );
    }

    #[test]
    fn stray_markers_in_values_are_dropped() {
        let smuggled = format!("a{SECONDARY_OPEN}b{SECONDARY_CLOSE}c");
        assert_eq!(plain(json!(smuggled)), ["abc"]);
    }

    #[test]
    fn options_accept_camel_case() {
        let options: FormatOptions =
            serde_json::from_str(r#"{"wrapParentheticals": true}"#).unwrap();
        assert!(options.wrap_parentheticals);
        let defaults: FormatOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, FormatOptions::default());
    }

    proptest! {
        #[test]
        fn formatting_is_idempotent(items in proptest::collection::vec("[a-z#\\[\\]() ]{0,12}", 0..6)) {
            let value = json!(items);
            let options = FormatOptions { wrap_parentheticals: true };
            prop_assert_eq!(format_value(&value, &options), format_value(&value, &options));
        }

        #[test]
        fn output_never_contains_empty_strings(items in proptest::collection::vec("[a-z]{0,3}", 0..8)) {
            let out = plain(json!(items));
            prop_assert!(out.iter().all(|s| !s.is_empty()));
        }
    }
}
