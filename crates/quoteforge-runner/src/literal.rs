//! Lowering JSON values into script literals.
//!
//! The schema document is exposed to generated code as a global constant.
//! Rather than registering a host value, the document is printed as a
//! script literal and compiled together with the function, so the unit the
//! engine runs is self-contained text.

use serde_json::Value;

/// Render `value` as a single-line script expression.
///
/// Objects become object maps with quoted keys, `null` becomes `()`, and
/// numbers keep their integer or floating-point nature.
pub fn to_script_literal(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("()"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else {
                // u64 above i64::MAX or a real float: both become floats.
                let f = n.as_f64().unwrap_or(0.0);
                let text = f.to_string();
                out.push_str(&text);
                if !text.contains('.') {
                    out.push_str(".0");
                }
            }
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push_str("#{");
            for (idx, (key, item)) in map.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_string(out, key);
                out.push_str(": ");
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::to_script_literal;

    #[test]
    fn scalars() {
        assert_eq!(to_script_literal(&json!(null)), "()");
        assert_eq!(to_script_literal(&json!(true)), "true");
        assert_eq!(to_script_literal(&json!(-42)), "-42");
        assert_eq!(to_script_literal(&json!(2.5)), "2.5");
        assert_eq!(to_script_literal(&json!(1e3)), "1000.0");
    }

    #[test]
    fn strings_are_escaped() {
        let literal = to_script_literal(&json!("say \"hi\"\n\\ done\u{1}"));
        assert_eq!(literal, r#""say \"hi\"\n\\ done\u0001""#);
    }

    #[test]
    fn nested_objects_stay_on_one_line() {
        let literal = to_script_literal(&json!({
            "type": "object",
            "properties": { "product": { "enum": ["flyers", "posters"] } }
        }));
        assert!(!literal.contains('\n'));
        assert!(literal.starts_with("#{"));
        assert!(literal.contains(r#""enum": ["flyers", "posters"]"#));
    }
}
