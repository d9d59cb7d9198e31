//! Java properties rendering

use std::collections::BTreeMap;

/// Render properties as `key = value` lines, keys sorted.
///
/// Fails on an empty key since it cannot be read back.
pub fn encode_properties(properties: &BTreeMap<String, String>) -> Result<String, String> {
    let mut out = String::new();
    for (key, value) in properties {
        if key.is_empty() {
            return Err("property key must not be empty".to_string());
        }
        out.push_str(&format!("{} = {}\n", escape_key(key), escape_value(value)));
    }
    Ok(out)
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            ' ' | ':' | '=' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            _ => push_escaped(&mut out, c),
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        if i == 0 && c == ' ' {
            out.push_str("\\ ");
        } else {
            push_escaped(&mut out, c);
        }
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{000c}' => out.push_str("\\f"),
        _ => out.push(c),
    }
}
