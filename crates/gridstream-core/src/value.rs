//! Cell values extracted from rows.
//!
//! `Value` is the closed set of things an accessor can hand to the formatter.
//! Structured payloads stay as `serde_json::Value` until formatting.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Map a JSON value onto the cell value space. Scalars become their
    /// native variants; arrays and objects stay structured.
    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    // serde_json numbers are always representable as f64 without
                    // the arbitrary_precision feature.
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Json(other.clone()),
        }
    }
}

/// Borrowing conversion used by generated accessors.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_owned())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! to_value_via {
    ($variant:ident as $target:ty: $($t:ty),+) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::$variant(<$target>::from(*self))
                }
            }
        )+
    };
}

to_value_via!(Int as i64: i8, i16, i32, i64);
to_value_via!(UInt as u64: u8, u16, u32, u64);
to_value_via!(Float as f64: f32, f64);

impl ToValue for usize {
    fn to_value(&self) -> Value {
        Value::UInt(*self as u64)
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl ToValue for DateTime<FixedOffset> {
    fn to_value(&self) -> Value {
        Value::DateTime(self.with_timezone(&Utc))
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::from_json(self)
    }
}

impl ToValue for serde_json::Map<String, serde_json::Value> {
    fn to_value(&self) -> Value {
        Value::Json(serde_json::Value::Object(self.clone()))
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

macro_rules! from_via_to_value {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    v.to_value()
                }
            }

            impl From<Option<$t>> for Value {
                fn from(v: Option<$t>) -> Self {
                    v.to_value()
                }
            }
        )+
    };
}

from_via_to_value!(
    String,
    &str,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    Uuid,
    DateTime<Utc>,
    DateTime<FixedOffset>,
    serde_json::Value
);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn json_scalars_map_to_native_variants() {
        assert_eq!(Value::from_json(&serde_json::json!(null)), Value::Null);
        assert_eq!(Value::from_json(&serde_json::json!(-3)), Value::Int(-3));
        assert_eq!(
            Value::from_json(&serde_json::json!(u64::MAX)),
            Value::UInt(u64::MAX)
        );
        assert_eq!(Value::from_json(&serde_json::json!(1.5)), Value::Float(1.5));
        assert_eq!(
            Value::from_json(&serde_json::json!("x")),
            Value::Text("x".into())
        );
        assert!(matches!(
            Value::from_json(&serde_json::json!({"a": 1})),
            Value::Json(_)
        ));
    }

    #[test]
    fn offsets_normalize_to_utc() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let Value::DateTime(utc) = local.to_value() else {
            panic!("expected a timestamp");
        };
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn options_and_conversions() {
        assert_eq!(Option::<i32>::None.to_value(), Value::Null);
        assert_eq!(Value::from(Some(7u8)), Value::UInt(7));
        assert_eq!(Value::from("abc"), Value::Text("abc".into()));
        assert_eq!(Value::from(2.5f32), Value::Float(2.5));
    }
}
