//! Variables-format dispatch and decoding.
//!
//! The core consumes a [`Value`] tree uniformly regardless of which
//! decoder produced it; this module is the only place that knows about the
//! individual format crates.

use super::{Number, Value};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported variables-document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON.
    Json,
    /// YAML (`.yaml` or `.yml`).
    Yaml,
    /// TOML.
    Toml,
}

impl Format {
    /// Returns the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }

    /// Detects the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatDetection`] if the extension is missing or
    /// not recognized.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some(ext) => Err(Error::FormatDetection(format!(
                "unsupported file extension: .{ext}"
            ))),
            None => Err(Error::FormatDetection(format!(
                "cannot detect format, file has no extension: {}",
                path.display()
            ))),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(Error::FormatDetection(format!("unknown format: {s}"))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Decodes raw bytes in the given format into a [`Value`] tree.
///
/// # Errors
///
/// Returns [`Error::Decode`] carrying the underlying decoder's message and
/// the originating format.
pub fn decode(bytes: &[u8], format: Format) -> Result<Value> {
    match format {
        Format::Json => {
            let doc: serde_json::Value =
                serde_json::from_slice(bytes).map_err(|e| Error::Decode {
                    format,
                    message: e.to_string(),
                })?;
            Ok(from_json(doc))
        },
        Format::Yaml => {
            let text = std::str::from_utf8(bytes).map_err(|e| Error::Decode {
                format,
                message: format!("invalid utf-8: {e}"),
            })?;
            let doc: serde_yaml_ng::Value =
                serde_yaml_ng::from_str(text).map_err(|e| Error::Decode {
                    format,
                    message: e.to_string(),
                })?;
            from_yaml(doc)
        },
        Format::Toml => {
            let text = std::str::from_utf8(bytes).map_err(|e| Error::Decode {
                format,
                message: format!("invalid utf-8: {e}"),
            })?;
            let doc: toml::Value = toml::from_str(text).map_err(|e| Error::Decode {
                format,
                message: e.to_string(),
            })?;
            Ok(from_toml(doc))
        },
    }
}

fn from_json(doc: serde_json::Value) -> Value {
    match doc {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(
            n.as_i64()
                .map_or_else(|| Number::Float(n.as_f64().unwrap_or(f64::NAN)), Number::Int),
        ),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Seq(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect(),
        ),
    }
}

fn from_yaml(doc: serde_yaml_ng::Value) -> Result<Value> {
    match doc {
        serde_yaml_ng::Value::Null => Ok(Value::Null),
        serde_yaml_ng::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_yaml_ng::Value::Number(n) => Ok(Value::Number(n.as_i64().map_or_else(
            || Number::Float(n.as_f64().unwrap_or(f64::NAN)),
            Number::Int,
        ))),
        serde_yaml_ng::Value::String(s) => Ok(Value::String(s)),
        serde_yaml_ng::Value::Sequence(items) => Ok(Value::Seq(
            items.into_iter().map(from_yaml).collect::<Result<_>>()?,
        )),
        serde_yaml_ng::Value::Mapping(entries) => {
            let mut map = BTreeMap::new();
            for (key, item) in entries {
                map.insert(yaml_key(key)?, from_yaml(item)?);
            }
            Ok(Value::Map(map))
        },
        serde_yaml_ng::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

/// Coerces a YAML mapping key to a string.
///
/// Scalar keys (strings, numbers, booleans) take their literal form;
/// anything else cannot address a path segment and is a decode error.
fn yaml_key(key: serde_yaml_ng::Value) -> Result<String> {
    match key {
        serde_yaml_ng::Value::String(s) => Ok(s),
        serde_yaml_ng::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml_ng::Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::Decode {
            format: Format::Yaml,
            message: format!("mapping key must be a scalar, got {other:?}"),
        }),
    }
}

fn from_toml(doc: toml::Value) -> Value {
    match doc {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(Number::Int(i)),
        toml::Value::Float(f) => Value::Number(Number::Float(f)),
        toml::Value::Boolean(b) => Value::Bool(b),
        // The value union has no datetime variant; templates see the
        // RFC 3339 text.
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Seq(items.into_iter().map(from_toml).collect()),
        toml::Value::Table(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, from_toml(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(Format::from_str("json").unwrap(), Format::Json);
        assert_eq!(Format::from_str("YAML").unwrap(), Format::Yaml);
        assert_eq!(Format::from_str("yml").unwrap(), Format::Yaml);
        assert_eq!(Format::from_str("toml").unwrap(), Format::Toml);
        assert!(Format::from_str("csv").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            Format::from_path(Path::new("vars.json")).unwrap(),
            Format::Json
        );
        assert_eq!(
            Format::from_path(Path::new("vars.yml")).unwrap(),
            Format::Yaml
        );
        assert_eq!(
            Format::from_path(Path::new("dir/vars.toml")).unwrap(),
            Format::Toml
        );
        assert!(Format::from_path(Path::new("vars.txt")).is_err());
        assert!(Format::from_path(Path::new("vars")).is_err());
    }

    #[test]
    fn test_decode_json() {
        let v = decode(br#"{"x": 1, "s": "hi", "f": 1.5, "b": true, "n": null}"#, Format::Json)
            .unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(map["x"], Value::from(1i64));
        assert_eq!(map["s"], Value::from("hi"));
        assert_eq!(map["f"], Value::from(1.5));
        assert_eq!(map["b"], Value::Bool(true));
        assert_eq!(map["n"], Value::Null);
    }

    #[test]
    fn test_decode_yaml() {
        let v = decode(b"items:\n  - 1\n  - 2\n  - 3\n", Format::Yaml).unwrap();
        let map = v.as_map().unwrap();
        let items = map["items"].as_seq().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Value::from(1i64));
    }

    #[test]
    fn test_decode_yaml_numeric_key() {
        let v = decode(b"2024: leap\n", Format::Yaml).unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(map["2024"], Value::from("leap"));
    }

    #[test]
    fn test_decode_toml() {
        let v = decode(b"x = 1\n[server]\nhost = \"localhost\"\n", Format::Toml).unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(map["x"], Value::from(1i64));
        let server = map["server"].as_map().unwrap();
        assert_eq!(server["host"], Value::from("localhost"));
    }

    #[test]
    fn test_decode_error_carries_format() {
        let err = decode(b"{ not json", Format::Json).unwrap_err();
        match err {
            Error::Decode { format, .. } => assert_eq!(format, Format::Json),
            other => panic!("expected decode error, got {other}"),
        }
    }

    #[test]
    fn test_same_document_across_formats() {
        let json = decode(br#"{"x": 1}"#, Format::Json).unwrap();
        let yaml = decode(b"x: 1\n", Format::Yaml).unwrap();
        let toml = decode(b"x = 1\n", Format::Toml).unwrap();
        assert_eq!(json, yaml);
        assert_eq!(yaml, toml);
    }
}
