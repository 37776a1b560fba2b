// src/core/scanner/parser.rs

use tracing::debug;
use crate::core::models::ParsedDocument;

/// Parses a security.txt body into an ordered field mapping.
///
/// Each non-empty line is split on its first `:` only, so values such as URLs
/// keep their own colons. The name is taken verbatim; the value loses the
/// optional whitespace that follows the colon and nothing else. Later
/// occurrences of a name overwrite earlier ones. Lines without any colon are
/// skipped.
pub fn parse(raw: &str) -> ParsedDocument {
    let mut document = ParsedDocument::new();

    // `lines` splits on `\n` and drops a trailing `\r`, so CRLF files behave like LF ones.
    for (index, line) in raw.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                if document.contains_field(name) {
                    debug!(line = index + 1, field = name, "Duplicate field, keeping the later value.");
                }
                document.insert(name, value.trim_start_matches([' ', '\t']));
            }
            None => {
                debug!(line = index + 1, "Skipping line without a field separator.");
            }
        }
    }

    document
}
