//! JSON expectations for response bodies and event payloads
//!
//! `Expect` describes the shape a `serde_json::Value` should have. Exact
//! values, subset objects and type wildcards can be mixed freely:
//!
//! ```text
//! Expect::object([
//!     ("topic", Expect::equal("movie-created")),
//!     ("key", Expect::equal("7")),
//!     ("movie", Expect::object_containing([("id", Expect::equal(7))])),
//! ])
//! ```

use std::fmt;

use serde_json::Value;

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone)]
pub enum Expect {
    /// Deep equality (numbers compared by value)
    Equal(Value),

    /// Any JSON string
    AnyString,

    /// Any JSON number
    AnyNumber,

    /// Any value, including null
    Anything,

    /// An object whose listed keys match; `exact` also forbids other keys
    Object {
        fields: Vec<(String, Expect)>,
        exact: bool,
    },

    /// An array matching element-for-element
    Array(Vec<Expect>),

    /// An array where each expectation matches at least one element
    ArrayContaining(Vec<Expect>),

    /// An array where no expectation matches any element
    NotArrayContaining(Vec<Expect>),
}

impl Expect {
    pub fn equal(value: impl Into<Value>) -> Self {
        Expect::Equal(value.into())
    }

    pub fn any_string() -> Self {
        Expect::AnyString
    }

    pub fn any_number() -> Self {
        Expect::AnyNumber
    }

    pub fn anything() -> Self {
        Expect::Anything
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Expect)>) -> Self {
        Expect::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            exact: true,
        }
    }

    pub fn object_containing<K: Into<String>>(fields: impl IntoIterator<Item = (K, Expect)>) -> Self {
        Expect::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            exact: false,
        }
    }

    pub fn array(items: impl IntoIterator<Item = Expect>) -> Self {
        Expect::Array(items.into_iter().collect())
    }

    pub fn array_containing(items: impl IntoIterator<Item = Expect>) -> Self {
        Expect::ArrayContaining(items.into_iter().collect())
    }

    pub fn not_array_containing(items: impl IntoIterator<Item = Expect>) -> Self {
        Expect::NotArrayContaining(items.into_iter().collect())
    }

    /// Subset match in the style of `toMatchObject`: objects may carry extra
    /// keys at any depth, arrays must have the same length.
    pub fn matching(value: Value) -> Self {
        match value {
            Value::Object(map) => Expect::Object {
                fields: map.into_iter().map(|(k, v)| (k, Expect::matching(v))).collect(),
                exact: false,
            },
            Value::Array(items) => Expect::Array(items.into_iter().map(Expect::matching).collect()),
            other => Expect::Equal(other),
        }
    }

    /// Add or replace a field on an object expectation. No-op on other variants.
    pub fn with_field(mut self, key: impl Into<String>, expect: Expect) -> Self {
        if let Expect::Object { fields, .. } = &mut self {
            let key = key.into();
            match fields.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = expect,
                None => fields.push((key, expect)),
            }
        }
        self
    }

    /// Check `actual` against this expectation
    pub fn check(&self, actual: &Value) -> E2eResult<()> {
        self.check_at("$", actual)
            .map_err(|m| E2eError::AssertionFailed(m.to_string()))
    }

    pub fn matches(&self, actual: &Value) -> bool {
        self.check_at("$", actual).is_ok()
    }

    fn check_at(&self, path: &str, actual: &Value) -> Result<(), Mismatch> {
        let mismatch = |expected: String| Mismatch {
            path: path.to_string(),
            expected,
            actual: actual.clone(),
        };

        match self {
            Expect::Equal(expected) => {
                if json_eq(expected, actual) {
                    Ok(())
                } else {
                    Err(mismatch(expected.to_string()))
                }
            }
            Expect::AnyString => match actual {
                Value::String(_) => Ok(()),
                _ => Err(mismatch("any string".to_string())),
            },
            Expect::AnyNumber => match actual {
                Value::Number(_) => Ok(()),
                _ => Err(mismatch("any number".to_string())),
            },
            Expect::Anything => Ok(()),
            Expect::Object { fields, exact } => {
                let map = actual
                    .as_object()
                    .ok_or_else(|| mismatch("an object".to_string()))?;

                for (key, expect) in fields {
                    let child = format!("{}.{}", path, key);
                    match map.get(key) {
                        Some(value) => expect.check_at(&child, value)?,
                        None => {
                            return Err(Mismatch {
                                path: child,
                                expected: expect.to_string(),
                                actual: Value::Null,
                            }
                            .missing())
                        }
                    }
                }

                if *exact {
                    if let Some(extra) = map.keys().find(|k| !fields.iter().any(|(f, _)| f == *k)) {
                        return Err(mismatch(format!("no key '{}'", extra)));
                    }
                }
                Ok(())
            }
            Expect::Array(items) => {
                let values = actual
                    .as_array()
                    .ok_or_else(|| mismatch("an array".to_string()))?;
                if values.len() != items.len() {
                    return Err(mismatch(format!("an array of length {}", items.len())));
                }
                for (i, (expect, value)) in items.iter().zip(values).enumerate() {
                    expect.check_at(&format!("{}[{}]", path, i), value)?;
                }
                Ok(())
            }
            Expect::ArrayContaining(items) => {
                let values = actual
                    .as_array()
                    .ok_or_else(|| mismatch("an array".to_string()))?;
                for expect in items {
                    if !values.iter().any(|v| expect.matches(v)) {
                        return Err(mismatch(format!("an array containing {}", expect)));
                    }
                }
                Ok(())
            }
            Expect::NotArrayContaining(items) => {
                let values = actual
                    .as_array()
                    .ok_or_else(|| mismatch("an array".to_string()))?;
                for expect in items {
                    if let Some(pos) = values.iter().position(|v| expect.matches(v)) {
                        return Err(mismatch(format!(
                            "an array not containing {} (found at index {})",
                            expect, pos
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expect::Equal(v) => write!(f, "{}", v),
            Expect::AnyString => f.write_str("<any string>"),
            Expect::AnyNumber => f.write_str("<any number>"),
            Expect::Anything => f.write_str("<anything>"),
            Expect::Object { fields, exact } => {
                f.write_str(if *exact { "{" } else { "{.., " })?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{}\": {}", k, v)?;
                }
                f.write_str("}")
            }
            Expect::Array(items) | Expect::ArrayContaining(items) | Expect::NotArrayContaining(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug)]
struct Mismatch {
    path: String,
    expected: String,
    actual: Value,
}

impl Mismatch {
    fn missing(self) -> Self {
        Self {
            expected: format!("{} (key missing)", self.expected),
            ..self
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}: expected {}, got {}", self.path, self.expected, self.actual)
    }
}

/// Structural equality where `2010` and `2010.0` are the same number
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b)),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}

/// Check an HTTP status code
pub fn expect_status(actual: u16, expected: u16) -> E2eResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "expected HTTP status {}, got {}",
            expected, actual
        )))
    }
}
