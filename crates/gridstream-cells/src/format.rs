//! Value -> canonical cell text.
//!
//! Formatting is total and deterministic: every value has exactly one text
//! form, independent of locale.

use chrono::SecondsFormat;

use gridstream_core::config::BooleanStyle;
use gridstream_core::schema::ColumnKind;
use gridstream_core::value::Value;

/// Canonical text of one (row, column) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedCell {
    text: String,
    kind: ColumnKind,
}

impl FormattedCell {
    pub fn new(text: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in UTF-16 code units, the unit cell limits are expressed in.
    pub fn utf16_len(&self) -> usize {
        crate::chunk::utf16_len(&self.text)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFormatter {
    boolean_style: BooleanStyle,
}

impl ValueFormatter {
    pub fn new(boolean_style: BooleanStyle) -> Self {
        Self { boolean_style }
    }

    pub fn format(&self, value: Value, kind: ColumnKind) -> FormattedCell {
        FormattedCell::new(self.text(value), kind)
    }

    pub fn text(&self, value: Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Text(s) => s,
            Value::Bool(b) => match (self.boolean_style, b) {
                (BooleanStyle::Words, true) => "true".into(),
                (BooleanStyle::Words, false) => "false".into(),
                (BooleanStyle::Digits, true) => "1".into(),
                (BooleanStyle::Digits, false) => "0".into(),
            },
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => format_float(f),
            Value::Uuid(u) => u.hyphenated().to_string(),
            Value::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Micros, true),
            Value::Json(v) => escape_controls(v.to_string()),
        }
    }
}

/// serde_json escapes only C0 controls. DEL and the C1 range can only
/// appear inside string literals, where a `\uXXXX` escape is equivalent.
fn escape_controls(json: String) -> String {
    if !json.chars().any(char::is_control) {
        return json;
    }
    let mut out = String::with_capacity(json.len() + 8);
    for ch in json.chars() {
        if ch.is_control() {
            out.push_str(&format!("\\u{:04x}", ch as u32));
        } else {
            out.push(ch);
        }
    }
    out
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".into()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.into()
    } else {
        // Shortest round-trip representation, never in exponent form.
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn text(v: Value) -> String {
        ValueFormatter::default().text(v)
    }

    #[test]
    fn scalars() {
        assert_eq!(text(Value::Null), "");
        assert_eq!(text(Value::Text("héllo".into())), "héllo");
        assert_eq!(text(Value::Bool(true)), "true");
        assert_eq!(text(Value::Int(-42)), "-42");
        assert_eq!(text(Value::UInt(u64::MAX)), "18446744073709551615");
        assert_eq!(text(Value::Float(0.1)), "0.1");
        assert_eq!(text(Value::Float(3.0)), "3");
        assert_eq!(text(Value::Float(1e21)), "1000000000000000000000");
    }

    #[test]
    fn non_finite_floats() {
        assert_eq!(text(Value::Float(f64::NAN)), "NaN");
        assert_eq!(text(Value::Float(f64::INFINITY)), "Infinity");
        assert_eq!(text(Value::Float(f64::NEG_INFINITY)), "-Infinity");
    }

    #[test]
    fn digit_booleans() {
        let f = ValueFormatter::new(BooleanStyle::Digits);
        assert_eq!(f.text(Value::Bool(true)), "1");
        assert_eq!(f.text(Value::Bool(false)), "0");
    }

    #[test]
    fn uuid_is_hyphenated_lowercase() {
        let id = Uuid::parse_str("A1B2C3D4-E5F6-4711-8899-AABBCCDDEEFF").unwrap();
        assert_eq!(text(Value::Uuid(id)), "a1b2c3d4-e5f6-4711-8899-aabbccddeeff");
    }

    #[test]
    fn timestamps_are_utc_iso8601_with_fraction() {
        let dt = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 1).unwrap();
        assert_eq!(text(Value::DateTime(dt)), "2024-02-29T23:59:01.000000Z");
    }

    #[test]
    fn structured_values_are_compact_and_escaped() {
        let v = serde_json::json!({"a": [1, 2], "b": "line\nbreak\u{1}"});
        let out = text(Value::Json(v));
        assert_eq!(out, r#"{"a":[1,2],"b":"line\nbreak\u0001"}"#);
        assert!(!out.chars().any(|c| c.is_control()));
    }

    #[test]
    fn structured_values_escape_del_and_c1_controls() {
        let v = serde_json::json!({"k": "a\u{7f}b\u{85}c"});
        let out = text(Value::Json(v));
        assert_eq!(out, r#"{"k":"a\u007fb\u0085c"}"#);
        assert!(!out.chars().any(char::is_control));
        let back: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(back["k"], "a\u{7f}b\u{85}c");
    }

    #[test]
    fn kind_travels_with_the_text() {
        let cell = ValueFormatter::default().format(Value::Int(5), ColumnKind::Number);
        assert_eq!(cell.kind(), ColumnKind::Number);
        assert_eq!(cell.text(), "5");
        assert_eq!(cell.len(), 1);
        assert_eq!(FormattedCell::new("äb", ColumnKind::Text).utf16_len(), 2);
        assert_eq!(FormattedCell::new("ä😀", ColumnKind::Text).utf16_len(), 3);
    }
}
