//! Conversion of raw values into typed storage.
//!
//! Parsers form a chain. A parser that does not handle the target type
//! answers [`ParseError::NotParseable`] and the next one is tried.

use crate::provider::RawValue;
use crate::value::Value;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::marker::PhantomData;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The parser does not handle the target type.
    #[error("value is not parseable by this parser")]
    NotParseable,

    #[error("no parser for type {type_name}")]
    NoParser { type_name: &'static str },

    #[error("unable to parse {type_name}: {source}")]
    Invalid {
        type_name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Strategy writing a raw value into typed storage.
pub trait Parser: Send + Sync {
    fn parse(&self, raw: &RawValue, target: &mut dyn Value) -> Result<(), ParseError>;
}

impl<F> Parser for F
where
    F: Fn(&RawValue, &mut dyn Value) -> Result<(), ParseError> + Send + Sync,
{
    fn parse(&self, raw: &RawValue, target: &mut dyn Value) -> Result<(), ParseError> {
        self(raw, target)
    }
}

/// Parser handling exactly one target type.
pub struct TypedParser<T, F> {
    convert: F,
    _target: PhantomData<fn() -> T>,
}

impl<T, F> Parser for TypedParser<T, F>
where
    T: Value,
    F: Fn(&RawValue) -> anyhow::Result<T> + Send + Sync,
{
    fn parse(&self, raw: &RawValue, target: &mut dyn Value) -> Result<(), ParseError> {
        let Some(slot) = target.downcast_mut::<T>() else {
            return Err(ParseError::NotParseable);
        };

        *slot = (self.convert)(raw).map_err(|source| ParseError::Invalid {
            type_name: std::any::type_name::<T>(),
            source,
        })?;
        Ok(())
    }
}

/// Parser for `T` built from a conversion function.
pub fn typed<T, F>(convert: F) -> TypedParser<T, F>
where
    T: Value,
    F: Fn(&RawValue) -> anyhow::Result<T> + Send + Sync,
{
    TypedParser {
        convert,
        _target: PhantomData,
    }
}

/// Parser for any `T: FromStr`, reading the text form of the value.
pub fn from_str<T>() -> TypedParser<T, impl Fn(&RawValue) -> anyhow::Result<T> + Send + Sync>
where
    T: Value + FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    typed(|raw: &RawValue| Ok(raw.as_text().parse::<T>()?))
}

/// Parser for comma-separated lists of `T`.
pub fn list<T>() -> TypedParser<Vec<T>, impl Fn(&RawValue) -> anyhow::Result<Vec<T>> + Send + Sync>
where
    T: Clone + FromStr + 'static,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    typed(|raw: &RawValue| {
        raw.items()
            .iter()
            .map(|item| item.parse::<T>().map_err(anyhow::Error::from))
            .collect()
    })
}

/// Booleans: an empty value is `true`, so a bare `--flag` enables it.
pub fn parse_bool(text: &str) -> anyhow::Result<bool> {
    match text {
        "" | "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(anyhow!("invalid boolean {other:?}")),
    }
}

macro_rules! from_str_parsers {
    ($parsers:ident; $($ty:ty),* $(,)?) => {
        $($parsers.push(Arc::new(from_str::<$ty>()));)*
    };
}

macro_rules! list_parsers {
    ($parsers:ident; $($ty:ty),* $(,)?) => {
        $($parsers.push(Arc::new(list::<$ty>()));)*
    };
}

/// Parsers for the scalar and list types supported out of the box.
pub fn default_parsers() -> Vec<Arc<dyn Parser>> {
    let mut parsers: Vec<Arc<dyn Parser>> = Vec::new();

    from_str_parsers!(parsers; String, PathBuf, char);
    parsers.push(Arc::new(typed(|raw: &RawValue| parse_bool(&raw.as_text()))));
    from_str_parsers!(
        parsers;
        i8, i16, i32, i64, i128, isize,
        u8, u16, u32, u64, u128, usize,
        f32, f64,
        SocketAddr, IpAddr, Ipv4Addr, Ipv6Addr,
    );

    parsers.push(Arc::new(typed(|raw: &RawValue| {
        Ok::<Duration, anyhow::Error>(humantime::parse_duration(&raw.as_text())?)
    })));
    parsers.push(Arc::new(typed(|raw: &RawValue| {
        Ok::<DateTime<Utc>, anyhow::Error>(
            DateTime::parse_from_rfc3339(&raw.as_text())?.with_timezone(&Utc),
        )
    })));
    parsers.push(Arc::new(typed(|raw: &RawValue| {
        Ok::<regex_lite::Regex, anyhow::Error>(regex_lite::Regex::new(&raw.as_text())?)
    })));

    list_parsers!(parsers; String, i32, i64, u16, u32, u64, usize, f32, f64);
    parsers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_into<T: Value>(raw: impl Into<RawValue>, target: &mut T) -> Result<(), ParseError> {
        let raw = raw.into();
        for parser in default_parsers() {
            match parser.parse(&raw, target) {
                Err(ParseError::NotParseable) => continue,
                other => return other,
            }
        }
        Err(ParseError::NoParser {
            type_name: std::any::type_name::<T>(),
        })
    }

    #[test]
    fn test_bool_forms() {
        for text in ["", "1", "t", "T", "true", "TRUE", "True"] {
            assert!(parse_bool(text).unwrap(), "{text:?}");
        }
        for text in ["0", "f", "F", "false", "FALSE", "False"] {
            assert!(!parse_bool(text).unwrap(), "{text:?}");
        }
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn test_scalars() {
        let mut port = 0u16;
        parse_into("8080", &mut port).unwrap();
        assert_eq!(port, 8080);

        let mut ratio = 0f64;
        parse_into(RawValue::Structured(json!(0.25)), &mut ratio).unwrap();
        assert_eq!(ratio, 0.25);

        let mut timeout = Duration::ZERO;
        parse_into("1m 30s", &mut timeout).unwrap();
        assert_eq!(timeout, Duration::from_secs(90));

        let mut addr: SocketAddr = "0.0.0.0:0".parse().unwrap();
        parse_into("127.0.0.1:9000", &mut addr).unwrap();
        assert_eq!(addr.port(), 9000);

        let mut at = DateTime::<Utc>::default();
        parse_into("2024-05-01T10:00:00+02:00", &mut at).unwrap();
        assert_eq!(at.to_rfc3339(), "2024-05-01T08:00:00+00:00");

        let mut pattern = regex_lite::Regex::new("").unwrap();
        parse_into("^api-[0-9]+$", &mut pattern).unwrap();
        assert!(pattern.is_match("api-12"));
    }

    #[test]
    fn test_lists() {
        let mut hosts: Vec<String> = Vec::new();
        parse_into(" a, b,, c ", &mut hosts).unwrap();
        assert_eq!(hosts, vec!["a", "b", "c"]);

        let mut ports: Vec<u16> = Vec::new();
        parse_into(RawValue::Structured(json!([80, 443])), &mut ports).unwrap();
        assert_eq!(ports, vec![80, 443]);
    }

    #[test]
    fn test_invalid_value() {
        let mut workers = 0u32;
        let err = parse_into("many", &mut workers).unwrap_err();
        assert!(matches!(err, ParseError::Invalid { type_name: "u32", .. }));
    }

    #[test]
    fn test_unknown_type_falls_through() {
        #[derive(Debug, Clone, Default)]
        struct Opaque;

        let mut opaque: Vec<Opaque> = Vec::new();
        let err = parse_into("x", &mut opaque).unwrap_err();
        assert!(matches!(err, ParseError::NoParser { .. }));
    }

    #[test]
    fn test_closure_parser() {
        let upper = |raw: &RawValue, target: &mut dyn Value| match target.downcast_mut::<String>() {
            Some(slot) => {
                *slot = raw.as_text().to_uppercase();
                Ok(())
            }
            None => Err(ParseError::NotParseable),
        };

        let mut name = String::new();
        upper.parse(&RawValue::from("api"), &mut name).unwrap();
        assert_eq!(name, "API");
        assert!(matches!(
            upper.parse(&RawValue::from("1"), &mut 0u8),
            Err(ParseError::NotParseable)
        ));
    }
}
