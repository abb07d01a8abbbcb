// Streaming tool-call argument reassembly
//
// `update_file` arguments arrive as arbitrary JSON fragments. The live preview
// scans the partial text for the `new_content` string value and decodes it
// approximately; the exact value only comes from parsing the complete
// arguments once the stream has ended.

use serde::Deserialize;

/// JSON key carrying the rewritten file
pub const CONTENT_KEY: &str = "new_content";

#[derive(Debug, Deserialize)]
struct UpdateFileArgs {
    new_content: String,
}

/// Accumulates `function.arguments` fragments for one tool call
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    arguments: String,
    preview: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment
    ///
    /// Returns the decoded content when it is non-empty and differs from the
    /// previous preview.
    pub fn push(&mut self, fragment: &str) -> Option<&str> {
        if fragment.is_empty() {
            return None;
        }
        self.arguments.push_str(fragment);

        let decoded = partial_string_value(&self.arguments, CONTENT_KEY).map(decode_partial)?;
        if decoded.is_empty() || decoded == self.preview {
            return None;
        }
        self.preview = decoded;
        Some(&self.preview)
    }

    /// Raw accumulated arguments
    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    /// Latest live preview
    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Exact `new_content` from a full JSON parse of the arguments
    pub fn parse_final(&self) -> Result<String, serde_json::Error> {
        serde_json::from_str::<UpdateFileArgs>(&self.arguments).map(|args| args.new_content)
    }

    /// Final content: the parsed value, or the preview if parsing fails
    pub fn finish(self) -> Option<String> {
        match self.parse_final() {
            Ok(content) => Some(content),
            Err(e) => {
                log::warn!(
                    "[ai] Tool arguments did not parse ({} bytes): {}",
                    self.arguments.len(),
                    e
                );
                if self.preview.is_empty() {
                    None
                } else {
                    Some(self.preview)
                }
            }
        }
    }
}

/// Raw escaped text after `"key"` `:` `"` (whitespace allowed around the colon)
///
/// Returns `None` until the opening quote of the value has arrived.
pub fn partial_string_value<'a>(json: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("\"{}\"", key);
    let mut search_from = 0;

    while let Some(found) = json[search_from..].find(&needle) {
        let after_key = search_from + found + needle.len();
        let rest = json[after_key..].trim_start();
        if let Some(after_colon) = rest.strip_prefix(':') {
            let value = after_colon.trim_start();
            if let Some(raw) = value.strip_prefix('"') {
                return Some(raw);
            }
            if !value.is_empty() {
                // Not a string value; keep looking
                search_from = after_key;
                continue;
            }
            return None;
        }
        if !rest.is_empty() {
            search_from = after_key;
            continue;
        }
        return None;
    }
    None
}

/// Best-effort unescape of a partial JSON string body
///
/// Handles `\"`, `\\`, `\n`, `\r` and `\t`; other escapes are kept verbatim.
/// Stops at the first unescaped quote, and drops a trailing lone backslash
/// whose escape has not arrived yet.
pub fn decode_partial(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(fragments: &[&str]) -> (Vec<String>, ToolCallAccumulator) {
        let mut acc = ToolCallAccumulator::new();
        let mut updates = Vec::new();
        for fragment in fragments {
            if let Some(update) = acc.push(fragment) {
                updates.push(update.to_string());
            }
        }
        (updates, acc)
    }

    #[test]
    fn test_documented_fragments() {
        let (updates, acc) = feed(&["{\"new_content\": \"Hel", "lo, w", "orld!\"}"]);
        assert_eq!(updates, vec!["Hel", "Hello, w", "Hello, world!"]);
        assert_eq!(acc.finish().as_deref(), Some("Hello, world!"));
    }

    #[test]
    fn test_whitespace_around_colon() {
        let (updates, _) = feed(&["{ \"new_content\" \n :\t \"abc"]);
        assert_eq!(updates, vec!["abc"]);
    }

    #[test]
    fn test_no_update_before_value_starts() {
        let (updates, acc) = feed(&["{\"new_", "content\"", ":"]);
        assert!(updates.is_empty());
        assert_eq!(acc.preview(), "");
    }

    #[test]
    fn test_split_escape_sequences() {
        let (updates, acc) = feed(&[
            "{\"new_content\":\"line1\\",
            "nline2 \\",
            "\"q\\",
            "\\ \\t\"}",
        ]);
        assert_eq!(updates.first().map(String::as_str), Some("line1"));
        assert_eq!(acc.preview(), "line1\nline2 \"q\\ \t");
        assert_eq!(acc.finish().as_deref(), Some("line1\nline2 \"q\\ \t"));
    }

    #[test]
    fn test_final_parse_overrides_approximate_preview() {
        let (_, acc) = feed(&["{\"new_content\":\"caf\\u00e9\"}"]);
        assert_eq!(acc.preview(), "caf\\u00e9");
        assert_eq!(acc.finish().as_deref(), Some("café"));
    }

    #[test]
    fn test_unparseable_arguments_keep_preview() {
        let (_, acc) = feed(&["{\"new_content\":\"partial"]);
        assert!(acc.parse_final().is_err());
        assert_eq!(acc.finish().as_deref(), Some("partial"));
    }

    #[test]
    fn test_any_chunking_yields_exact_value() {
        let value = "fn main() {\n\tprintln!(\"hi \\\\ there\");\r\n}\n";
        let json = serde_json::json!({ "new_content": value }).to_string();
        let chars: Vec<char> = json.chars().collect();

        for size in 1..=7 {
            let fragments: Vec<String> = chars
                .chunks(size)
                .map(|chunk| chunk.iter().collect())
                .collect();
            let mut acc = ToolCallAccumulator::new();
            let mut previous = String::new();
            for fragment in &fragments {
                if let Some(update) = acc.push(fragment) {
                    assert!(update.starts_with(&previous) && update.len() > previous.len());
                    previous = update.to_string();
                }
            }
            assert_eq!(acc.preview(), value);
            assert_eq!(acc.finish().as_deref(), Some(value));
        }
    }

    #[test]
    fn test_decoder_never_panics_on_odd_input() {
        for raw in ["\\", "\\\\\\", "\"", "ü\\", "\\u12", "a\\qb"] {
            let _ = decode_partial(raw);
        }
        assert_eq!(decode_partial("a\\qb"), "a\\qb");
        assert_eq!(decode_partial("ab\\"), "ab");
    }

    #[test]
    fn test_key_appearing_inside_other_value() {
        let json = "{\"note\":\"new_content\",\"new_content\":\"real";
        // First match is a value, not a key
        assert_eq!(partial_string_value(json, CONTENT_KEY), Some("real"));
    }
}
