//! Forgiving `deserialize_with` helpers for upstream payloads.
//!
//! Upstream quiz and content data is model output passed through verbatim, so
//! a single odd field must never sink the whole body. These helpers turn a
//! value of the wrong shape into "absent" and leave validation to the domain
//! constructors.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T> Lenient<T> {
    fn ok(self) -> Option<T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Invalid(_) => None,
        }
    }
}

/// JSON scalar as sent by loosely typed producers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Other(IgnoredAny),
}

impl Scalar {
    /// Text form of strings and numbers; `None` for anything else.
    pub(crate) fn into_text(self) -> Option<String> {
        match self {
            Scalar::Text(text) => Some(text),
            Scalar::Integer(number) => Some(number.to_string()),
            Scalar::Float(number) => Some(number.to_string()),
            Scalar::Bool(_) | Scalar::Other(_) => None,
        }
    }

    /// Integer form of integral numbers and numeric strings.
    pub(crate) fn into_integer(self) -> Option<i64> {
        match self {
            Scalar::Integer(number) => Some(number),
            #[allow(clippy::cast_possible_truncation)]
            Scalar::Float(number) if number.fract() == 0.0 && number.abs() < 9.0e15 => {
                Some(number as i64)
            }
            Scalar::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

/// `Option<T>` that decodes a value of the wrong shape as `None`.
///
/// # Errors
///
/// Only fails on malformed input the deserializer itself rejects.
pub fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Lenient<T>>::deserialize(deserializer)?.and_then(Lenient::ok))
}

/// `Vec<T>` that skips elements of the wrong shape, and reads a non-list as
/// empty.
///
/// # Errors
///
/// Only fails on malformed input the deserializer itself rejects.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = lenient_option::<D, Vec<Lenient<T>>>(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().filter_map(Lenient::ok).collect())
}

/// Text from a string or number; anything else reads as empty.
///
/// # Errors
///
/// Only fails on malformed input the deserializer itself rejects.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_text(deserializer)?.unwrap_or_default())
}

/// Like [`text`], but absent instead of empty.
///
/// # Errors
///
/// Only fails on malformed input the deserializer itself rejects.
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.and_then(Scalar::into_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "lenient_option")]
        count: Option<u32>,
        #[serde(default, deserialize_with = "lenient_list")]
        names: Vec<String>,
        #[serde(default, deserialize_with = "text")]
        label: String,
    }

    fn read(json: &str) -> Loose {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn wrong_shapes_read_as_absent() {
        let loose = read(r#"{"count":"many","names":{"a":1},"label":{"x":[]}}"#);
        assert_eq!(loose.count, None);
        assert!(loose.names.is_empty());
        assert_eq!(loose.label, "");
    }

    #[test]
    fn odd_list_elements_are_skipped() {
        let loose = read(r#"{"count":3,"names":["a",7,"b",null],"label":12}"#);
        assert_eq!(loose.count, Some(3));
        assert_eq!(loose.names, ["a", "b"]);
        assert_eq!(loose.label, "12");
    }

    #[test]
    fn scalar_integers_accept_numeric_text() {
        let parse = |json: &str| serde_json::from_str::<Scalar>(json).unwrap().into_integer();
        assert_eq!(parse("2"), Some(2));
        assert_eq!(parse("2.0"), Some(2));
        assert_eq!(parse(r#"" 1 ""#), Some(1));
        assert_eq!(parse("1.5"), None);
        assert_eq!(parse(r#""b""#), None);
        assert_eq!(parse("[1]"), None);
    }
}
