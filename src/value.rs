use serde::{Deserialize, Serialize};

/// A value bound to a statement parameter or decoded from a result column.
///
/// The same enum serves both directions so helper code never branches on
/// driver types. Decoding only ever produces `Integer`, `Float`, `Text`,
/// `Blob` or `Null`; `Bool` exists for the bind side, where it is stored as
/// a 0/1 integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer value (64-bit)
    Integer(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value, bound as a 0/1 integer
    Bool(bool),
    /// Binary data
    Blob(Vec<u8>),
    /// NULL value
    Null,
}

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let Value::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Integer(0) => Some(false),
            Value::Integer(1) => Some(true),
            _ => None,
        }
    }

    /// Classify a float for binding: a number binds as an exact integer only
    /// when it has no fractional component and fits the engine's native
    /// integer width, otherwise it binds as floating-point.
    #[must_use]
    pub(crate) fn as_exact_integer(f: f64) -> Option<i64> {
        if !f.is_finite() || f.fract() != 0.0 {
            return None;
        }
        // i64::MIN is exactly representable as f64; i64::MAX is not, so the
        // upper bound is the first power of two past it.
        if (-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&f) {
            Some(f as i64)
        } else {
            None
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

/// Parameters for one bind cycle: an ordered sequence bound positionally
/// (1-based), or name/value pairs resolved through the engine's parameter
/// name lookup.
///
/// Recognized name syntaxes are `?`, `?NNN`, `:VVV`, `@VVV` and `$VVV`; the
/// sigil is part of the name used for resolution. Names the compiled program
/// does not contain are silently ignored and the slot stays NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Values bound to parameters 1..=N in order.
    Positional(Vec<Value>),
    /// Name/value pairs resolved via the engine's name-to-position lookup.
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<Value>,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}
