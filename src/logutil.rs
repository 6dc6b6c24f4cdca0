//! Logging helpers for strings authored by game content (recipe names, tags,
//! property keys and values) so log records stay single-line and bounded.

use std::fmt::Write;

use crate::world::types::PropertyValue;

const MAX_PREVIEW: usize = 120;
const MAX_LIST_ITEMS: usize = 8;

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Other control characters become `\xNN`; long strings are cut with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Compact rendering of a property value for log records.
pub fn preview_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Null => "null".to_string(),
        PropertyValue::Number(n) => n.to_string(),
        PropertyValue::String(s) => format!("\"{}\"", escape_log(s)),
        PropertyValue::Bool(b) => b.to_string(),
        PropertyValue::Object(id) => id.to_string(),
        PropertyValue::Numbers(items) => preview_list(items.iter().map(|n| n.to_string())),
        PropertyValue::Strings(items) => {
            preview_list(items.iter().map(|s| format!("\"{}\"", escape_log(s))))
        }
        PropertyValue::Bools(items) => preview_list(items.iter().map(|b| b.to_string())),
        PropertyValue::Objects(items) => preview_list(items.iter().map(|id| id.to_string())),
    }
}

fn preview_list(items: impl ExactSizeIterator<Item = String>) -> String {
    let total = items.len();
    let shown: Vec<String> = items.take(MAX_LIST_ITEMS).collect();
    if total > shown.len() {
        format!("[{}, … +{}]", shown.join(", "), total - shown.len())
    } else {
        format!("[{}]", shown.join(", "))
    }
}
