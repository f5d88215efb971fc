//! Bind values and their polarity.
//!
//! Every value a caller can bind is a [`BindValue`]. Polarity drives the
//! removal rules: `NULL`, `false`, and sequences made only of negative
//! elements are *negative*; everything else is *positive*.

use chrono::{NaiveDate, NaiveDateTime};

/// A value bound into a SQL parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    DateTime(NaiveDateTime),
    /// Ordered sequence, expanded into IN lists.
    List(Vec<BindValue>),
}

impl BindValue {
    /// Returns true when the value is negative: `Null`, `false`, or a
    /// sequence whose every element is negative (the empty sequence
    /// included).
    #[must_use]
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) => true,
            Self::List(items) => items.iter().all(Self::is_negative),
            _ => false,
        }
    }

    /// Returns the SQL representation for inline use.
    ///
    /// Used for `IN (NULL)` emission and diagnostics; bound parameters never
    /// go through this path.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::to_sql_inline).collect();
                format!("({})", inner.join(", "))
            }
        }
    }

    /// Returns the bare text of the value, as used by `%concat` and the
    /// verbatim splice functions. Negative scalars contribute nothing.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Blob(b) => b.iter().map(|byte| format!("{byte:02X}")).collect(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::plain_text).collect();
                inner.join(",")
            }
        }
    }
}

impl From<serde_json::Value> for BindValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

/// Trait for types that can be converted to a [`BindValue`].
pub trait ToBindValue {
    /// Converts the value.
    fn to_bind_value(self) -> BindValue;
}

impl ToBindValue for BindValue {
    fn to_bind_value(self) -> BindValue {
        self
    }
}

impl ToBindValue for bool {
    fn to_bind_value(self) -> BindValue {
        BindValue::Bool(self)
    }
}

impl ToBindValue for i64 {
    fn to_bind_value(self) -> BindValue {
        BindValue::Int(self)
    }
}

impl ToBindValue for i32 {
    fn to_bind_value(self) -> BindValue {
        BindValue::Int(i64::from(self))
    }
}

impl ToBindValue for i16 {
    fn to_bind_value(self) -> BindValue {
        BindValue::Int(i64::from(self))
    }
}

impl ToBindValue for u32 {
    fn to_bind_value(self) -> BindValue {
        BindValue::Int(i64::from(self))
    }
}

impl ToBindValue for f64 {
    fn to_bind_value(self) -> BindValue {
        BindValue::Float(self)
    }
}

impl ToBindValue for f32 {
    fn to_bind_value(self) -> BindValue {
        BindValue::Float(f64::from(self))
    }
}

impl ToBindValue for String {
    fn to_bind_value(self) -> BindValue {
        BindValue::Text(self)
    }
}

impl ToBindValue for &str {
    fn to_bind_value(self) -> BindValue {
        BindValue::Text(String::from(self))
    }
}

impl ToBindValue for NaiveDate {
    fn to_bind_value(self) -> BindValue {
        BindValue::Date(self)
    }
}

impl ToBindValue for NaiveDateTime {
    fn to_bind_value(self) -> BindValue {
        BindValue::DateTime(self)
    }
}

impl ToBindValue for &[u8] {
    fn to_bind_value(self) -> BindValue {
        BindValue::Blob(self.to_vec())
    }
}

impl<T: ToBindValue> ToBindValue for Option<T> {
    fn to_bind_value(self) -> BindValue {
        match self {
            Some(v) => v.to_bind_value(),
            None => BindValue::Null,
        }
    }
}

impl<T: ToBindValue> ToBindValue for Vec<T> {
    fn to_bind_value(self) -> BindValue {
        BindValue::List(self.into_iter().map(ToBindValue::to_bind_value).collect())
    }
}
