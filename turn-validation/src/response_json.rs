//! Recovering JSON objects from free-form model replies.
//!
//! Models wrap JSON in prose, stop mid-object when they hit their token limit,
//! leave trailing commas, and echo `<placeholder>` tokens from the format they
//! were shown. The parser takes the first object in the text and repairs those
//! defects before handing it to `serde_json`.

use serde_json::{Map, Value};

/// Extracts the first JSON object in `text`, repairing common defects.
///
/// Returns `None` when there is no `{`, when a closer does not match the open
/// structure, when the text ends inside an escape sequence, when the repaired
/// text still fails to parse, or when the object is empty.
#[must_use]
pub fn parse_json(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut repaired = String::with_capacity(text.len() - start + 8);
    let mut chars = text[start..].chars().peekable();

    while let Some(ch) = chars.next() {
        if in_string {
            repaired.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                repaired.push(ch);
            }
            '{' => {
                closers.push('}');
                repaired.push(ch);
            }
            '[' => {
                closers.push(']');
                repaired.push(ch);
            }
            '}' | ']' => {
                if closers.pop() != Some(ch) {
                    return None;
                }
                strip_trailing_comma(&mut repaired);
                repaired.push(ch);
                if closers.is_empty() {
                    break;
                }
            }
            '<' => {
                let mut name = String::new();
                while let Some(next) = chars.next_if(|next| is_placeholder_char(*next)) {
                    name.push(next);
                }
                if !name.trim().is_empty() && chars.next_if_eq(&'>').is_some() {
                    repaired.push_str(&Value::String(format!("<{name}>")).to_string());
                } else {
                    repaired.push('<');
                    repaired.push_str(&name);
                }
            }
            _ => repaired.push(ch),
        }
    }

    if in_string {
        if escaped {
            return None;
        }
        repaired.push('"');
    }
    if !closers.is_empty() {
        strip_trailing_comma(&mut repaired);
        while let Some(closer) = closers.pop() {
            repaired.push(closer);
        }
    }

    match serde_json::from_str::<Value>(&repaired).ok()? {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}

/// Extracts every recoverable object, one per line, in line order.
///
/// When no single line yields an object the whole text is parsed instead, which
/// recovers pretty-printed JSON spanning several lines.
#[must_use]
pub fn parse_all_objects(text: &str) -> Vec<Map<String, Value>> {
    let objects: Vec<_> = text.lines().filter_map(parse_json).collect();
    if objects.is_empty() {
        parse_json(text).into_iter().collect()
    } else {
        objects
    }
}

fn is_placeholder_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ' ')
}

fn strip_trailing_comma(repaired: &mut String) {
    let trimmed = repaired.trim_end().len();
    if repaired[..trimmed].ends_with(',') {
        repaired.truncate(trimmed - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn finds_objects_inside_prose() {
        assert_eq!(
            parse_json("Hello { \"foo\": \"bar\" } World"),
            Some(object(json!({"foo": "bar"})))
        );
    }

    #[test]
    fn closes_truncated_structures() {
        assert_eq!(
            parse_json("{\"foo\":\"bar\",\"baz\":{\"qux\":[1,2,3"),
            Some(object(json!({"foo": "bar", "baz": {"qux": [1, 2, 3]}})))
        );
        assert_eq!(
            parse_json("{\"text\":\"cut off mid"),
            Some(object(json!({"text": "cut off mid"})))
        );
        assert_eq!(
            parse_json("{\"list\":[1,2,"),
            Some(object(json!({"list": [1, 2]})))
        );
    }

    #[test]
    fn removes_trailing_commas_and_quotes_placeholders() {
        assert_eq!(
            parse_json("{\"a\": [1, 2,], \"b\": <value>,}"),
            Some(object(json!({"a": [1, 2], "b": "<value>"})))
        );
        assert_eq!(
            parse_json("{\"path\": \"a\\\\b\\/c \\\"q\\\"\"}"),
            Some(object(json!({"path": "a\\b/c \"q\""})))
        );
    }

    #[test]
    fn rejects_unrecoverable_text() {
        for text in ["", "no braces", "{", "{}", "{\"a\": [1}", "{\"a\": \"b\\", "{\"a\":}"] {
            assert_eq!(parse_json(text), None, "{text}");
        }
    }

    #[test]
    fn parses_one_object_per_line() {
        let text = "{\"foo\":\"bar\"}\nnoise\n{\"foo\":2}";
        let objects = parse_all_objects(text);
        assert_eq!(
            objects,
            vec![object(json!({"foo": "bar"})), object(json!({"foo": 2}))]
        );
    }

    #[test]
    fn falls_back_to_multi_line_objects() {
        let text = "Here you go:\n{\n  \"foo\": \"bar\",\n  \"n\": 1\n}";
        assert_eq!(
            parse_all_objects(text),
            vec![object(json!({"foo": "bar", "n": 1}))]
        );
        assert!(parse_all_objects("nothing here").is_empty());
    }
}
