//! Inline state serialization.
//!
//! State is emitted as JSON assigned to a window global. The JSON is escaped
//! so it can never close the surrounding `<script>` element or break a
//! JavaScript string literal.

use serde_json::{Map, Value};

/// `window.<global>=<json>;`
pub fn state_script(global: &str, state: &Map<String, Value>) -> String {
    format!("window.{}={};", global, to_script_json(&Value::Object(state.clone())))
}

/// `<jsonp>("<route>",<json>);` for side files loaded with `<script src>`.
pub fn jsonp_script(callback: &str, key: &str, value: &Value) -> String {
    format!("{}({},{});", callback, Value::String(key.to_string()), value)
}

/// JSON with `<`, `>`, `/`, U+2028 and U+2029 escaped.
pub fn to_script_json(value: &Value) -> String {
    let json = value.to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '/' => out.push_str("\\u002F"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_script() {
        let mut state = Map::new();
        state.insert("data".into(), json!([{ "title": "Hi" }]));
        assert_eq!(
            state_script("__APP__", &state),
            r#"window.__APP__={"data":[{"title":"Hi"}]};"#
        );
    }

    #[test]
    fn test_script_json_cannot_close_tag() {
        let json = to_script_json(&json!({ "html": "</script><script>alert(1)</script>" }));
        assert!(!json.contains("</script>"));
        assert!(json.contains("\\u003C\\u002Fscript\\u003E"));

        // Still valid JSON with the same value.
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back["html"], "</script><script>alert(1)</script>");
    }

    #[test]
    fn test_line_separators_escaped() {
        let json = to_script_json(&json!("a\u{2028}b\u{2029}c"));
        assert_eq!(json, "\"a\\u2028b\\u2029c\"");
    }

    #[test]
    fn test_jsonp_script() {
        assert_eq!(
            jsonp_script("__APP_JSONP__", "/about", &json!({ "data": [] })),
            r#"__APP_JSONP__("/about",{"data":[]});"#
        );
    }
}
