//! Values that can be assigned to template parameters.

use std::fmt::Display;

use kstring::KString;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(KString),
}

impl ParamValue {
    /// Perl-style falsiness: null, false, 0, 0.0, the empty string
    /// and the string "0". Everything else, including "00", " " and
    /// "0value", is true.
    pub fn is_falsy(&self) -> bool {
        match self {
            ParamValue::Null => true,
            ParamValue::Bool(b) => !b,
            ParamValue::Int(i) => *i == 0,
            ParamValue::Float(f) => *f == 0.0,
            ParamValue::Str(s) => s.is_empty() || s.as_str() == "0",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// The text inserted into a template for this value.
    pub fn to_text(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Bool(b) => if *b { "1".into() } else { String::new() },
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Str(s) => s.as_str().into(),
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(KString::from_ref(s))
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(KString::from_string(s))
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        ParamValue::Str(KString::from_ref(s))
    }
}

impl From<KString> for ParamValue {
    fn from(s: KString) -> Self {
        ParamValue::Str(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(i: $t) -> Self {
                    ParamValue::Int(i.into())
                }
            }
        )*
    }
}
from_int!(i8, i16, i32, i64, u8, u16, u32);

// Values beyond i64 keep all their digits as a string.
macro_rules! from_wide_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(i: $t) -> Self {
                    match i64::try_from(i) {
                        Ok(i) => ParamValue::Int(i),
                        Err(_) => ParamValue::Str(KString::from_string(i.to_string())),
                    }
                }
            }
        )*
    }
}
from_wide_int!(isize, usize, u64);

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<f32> for ParamValue {
    fn from(f: f32) -> Self {
        ParamValue::Float(f.into())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

impl From<&Value> for ParamValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) =>
                if let Some(i) = n.as_i64() {
                    ParamValue::Int(i)
                } else if n.is_u64() {
                    // above i64::MAX, keep all digits
                    ParamValue::Str(KString::from_string(n.to_string()))
                } else {
                    ParamValue::Float(n.as_f64().unwrap_or(f64::NAN))
                },
            Value::String(s) => ParamValue::from(s),
            // No structured parameters; hand over the JSON text
            Value::Array(_) | Value::Object(_) =>
                ParamValue::Str(KString::from_string(v.to_string())),
        }
    }
}

impl From<Value> for ParamValue {
    fn from(v: Value) -> Self {
        ParamValue::from(&v)
    }
}

/// Which values `set_param` silently drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default,
         serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalsyPolicy {
    /// Drop every falsy value (see `ParamValue::is_falsy`). This
    /// makes it impossible to set "" or 0 through `set_param`;
    /// `set_params` does not skip anything.
    #[default]
    Legacy,
    /// Drop only `ParamValue::Null`.
    NullOnly,
}

impl FalsyPolicy {
    pub fn skips(self, value: &ParamValue) -> bool {
        match self {
            FalsyPolicy::Legacy => value.is_falsy(),
            FalsyPolicy::NullOnly => value.is_null(),
        }
    }
}
