//! Best-effort analysis of content stream bytes

use crate::constants::PREVIEW_CHARS;
use lopdf::content::Content;

/// Operators that put marks on the page
const PAINTING_OPERATORS: &[&str] = &[
    "S", "s", "f", "F", "f*", "B", "B*", "b", "b*", "Tj", "TJ", "'", "\"", "Do", "sh", "BI",
];

/// Whether decoded content contains drawing operators.
///
/// The bytes are parsed as a content stream first. Streams lopdf cannot
/// parse fall back to a token scan: any whitespace-delimited token of one
/// or two ASCII letters counts as an operator.
pub fn has_draw_operators(bytes: &[u8]) -> bool {
    match Content::decode(bytes) {
        Ok(content) => content
            .operations
            .iter()
            .any(|op| PAINTING_OPERATORS.contains(&op.operator.as_str())),
        Err(_) => bytes
            .split(|b| b.is_ascii_whitespace())
            .any(|token| (1..=2).contains(&token.len()) && token.iter().all(u8::is_ascii_alphabetic)),
    }
}

/// First characters of the content as text, newlines escaped
pub fn preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(PREVIEW_CHARS)
        .collect::<String>()
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_stroke() {
        assert!(has_draw_operators(b"0 0 m 100 100 l S"));
    }

    #[test]
    fn test_detects_text() {
        assert!(has_draw_operators(b"BT /F1 12 Tf 10 10 Td (Hi) Tj ET"));
    }

    #[test]
    fn test_state_only_is_not_drawing() {
        assert!(!has_draw_operators(b"q 1 0 0 1 0 0 cm Q"));
        assert!(!has_draw_operators(b""));
    }

    #[test]
    fn test_preview_escapes_newlines() {
        assert_eq!(preview(b"q\nQ"), "q\\nQ");
    }
}
