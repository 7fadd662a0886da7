//! Best-effort parsing of an incomplete JSON document.
//!
//! Used while streaming structured output: the accumulated text is closed
//! off (open string, open arrays and objects) and parsed. If the tail is a
//! half-written key or literal, the document is cut back to the last
//! complete member and closed there instead.

use serde_json::Value;

/// Parse the longest valid object prefix of `text`, or `None` if nothing
/// usable has arrived yet. Leading prose or a code fence before the first
/// `{` is skipped.
pub fn parse_partial(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let body = &text[start..];

    let scan = scan(body);
    if scan.stack.is_empty() {
        // Complete document, possibly followed by a closing fence
        let end = scan.complete_at.unwrap_or(body.len());
        return serde_json::from_str(&body[..end]).ok();
    }

    let mut candidate = body.to_string();
    if scan.in_string {
        if scan.pending_escape {
            candidate.pop();
        }
        candidate.push('"');
    }
    candidate.extend(scan.stack.iter().rev());
    if let Ok(value) = serde_json::from_str(&candidate) {
        return Some(value);
    }

    let (cut, closers) = scan.last_cut?;
    let mut candidate = body[..cut].trim_end().trim_end_matches(',').to_string();
    candidate.extend(closers.iter().rev());
    serde_json::from_str(&candidate).ok()
}

struct Scan {
    stack: Vec<char>,
    in_string: bool,
    pending_escape: bool,
    /// Byte offset just past the outermost closing brace.
    complete_at: Option<usize>,
    /// Latest offset where the document can be cut and closed, with the
    /// closers needed at that point.
    last_cut: Option<(usize, Vec<char>)>,
}

fn scan(body: &str) -> Scan {
    let mut state = Scan {
        stack: Vec::new(),
        in_string: false,
        pending_escape: false,
        complete_at: None,
        last_cut: None,
    };

    for (i, c) in body.char_indices() {
        if state.in_string {
            if state.pending_escape {
                state.pending_escape = false;
            } else if c == '\\' {
                state.pending_escape = true;
            } else if c == '"' {
                state.in_string = false;
            }
            continue;
        }
        match c {
            '"' => state.in_string = true,
            '{' => {
                state.stack.push('}');
                state.last_cut = Some((i + 1, state.stack.clone()));
            }
            '[' => {
                state.stack.push(']');
                state.last_cut = Some((i + 1, state.stack.clone()));
            }
            '}' | ']' => {
                state.stack.pop();
                if state.stack.is_empty() {
                    state.complete_at = Some(i + 1);
                    break;
                }
                state.last_cut = Some((i + 1, state.stack.clone()));
            }
            ',' => state.last_cut = Some((i, state.stack.clone())),
            _ => {}
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nothing_yet() {
        assert_eq!(parse_partial(""), None);
        assert_eq!(parse_partial("```json\n"), None);
    }

    #[test]
    fn test_open_string_value_is_closed() {
        let value = parse_partial(r#"{"answer":"Rama went to the fo"#).unwrap();
        assert_eq!(value, json!({"answer": "Rama went to the fo"}));
    }

    #[test]
    fn test_half_written_key_is_dropped() {
        let value = parse_partial(r#"{"answer":"Rama","expla"#).unwrap();
        assert_eq!(value, json!({"answer": "Rama"}));
    }

    #[test]
    fn test_key_without_value_is_dropped() {
        let value = parse_partial(r#"{"answer":"Rama", "explanation": "#).unwrap();
        assert_eq!(value, json!({"answer": "Rama"}));
    }

    #[test]
    fn test_nested_arrays() {
        let value =
            parse_partial(r#"{"textualBasis":{"kanda":"Sundara Kanda","citations":["Sundara Kanda 1.1","Sun"#)
                .unwrap();
        assert_eq!(
            value,
            json!({"textualBasis": {"kanda": "Sundara Kanda", "citations": ["Sundara Kanda 1.1", "Sun"]}})
        );
    }

    #[test]
    fn test_partial_number_is_cut() {
        let value = parse_partial(r#"{"sarga":[1,2,3"#).unwrap();
        assert_eq!(value, json!({"sarga": [1, 2, 3]}));

        let value = parse_partial(r#"{"a":"x","confidence":0."#).unwrap();
        assert_eq!(value, json!({"a": "x"}));
    }

    #[test]
    fn test_escape_at_end() {
        let value = parse_partial(r#"{"answer":"the \"ten chariot\" king \"#).unwrap();
        assert_eq!(value, json!({"answer": "the \"ten chariot\" king "}));
    }

    #[test]
    fn test_complete_document_with_fence() {
        let value = parse_partial("```json\n{\"why\":\"scope\"}\n```").unwrap();
        assert_eq!(value, json!({"why": "scope"}));
    }
}
