//! Dotted property paths and the pure functions that read, write and expand
//! them over JSON documents.
//!
//! Host documents address nested fields with dotted keys such as
//! `system.attributes.ac.flat`. Update instructions keep those keys flat and
//! only expand them into nested objects when handed over.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DomainError;

/// Prefixes under which actor documents store the data that roll data mirrors.
const DOCUMENT_DATA_PREFIXES: [&str; 2] = ["system.", "data."];

/// A validated dotted property path.
///
/// Every segment is non-empty and made of ASCII letters, digits, `_` or `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyPath(String);

impl PropertyPath {
    /// Parse and validate a dotted path.
    ///
    /// # Examples
    ///
    /// ```
    /// use summoner_domain::common::PropertyPath;
    ///
    /// let path = PropertyPath::parse("system.attributes.ac.flat").unwrap();
    /// assert_eq!(path.segments().count(), 4);
    /// assert!(PropertyPath::parse("system..ac").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DomainError::invalid_path(input, "path is empty"));
        }

        for segment in input.split('.') {
            if segment.is_empty() {
                return Err(DomainError::invalid_path(input, "empty segment"));
            }
            if let Some(bad) = segment
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
            {
                return Err(DomainError::invalid_path(
                    input,
                    format!("unexpected character '{}'", bad),
                ));
            }
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The same field addressed inside roll data.
    ///
    /// Roll data mirrors the document's system data at its root, so
    /// `system.attributes.prof` becomes `attributes.prof`. Paths outside the
    /// system data are returned unchanged.
    pub fn roll_data_path(&self) -> &str {
        DOCUMENT_DATA_PREFIXES
            .iter()
            .find_map(|prefix| self.0.strip_prefix(prefix))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PropertyPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PropertyPath> for String {
    fn from(value: PropertyPath) -> Self {
        value.0
    }
}

impl AsRef<str> for PropertyPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Read the value at a dotted path.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use summoner_domain::common::get_property;
///
/// let data = json!({"attributes": {"prof": 3}});
/// assert_eq!(get_property(&data, "attributes.prof"), Some(&json!(3)));
/// assert_eq!(get_property(&data, "attributes.missing"), None);
/// ```
pub fn get_property<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Write a value at a dotted path, creating intermediate objects.
///
/// A `null` target becomes an object. Walking through an existing non-object
/// value is an error rather than a silent no-op.
pub fn set_property(target: &mut Value, path: &str, value: Value) -> Result<(), DomainError> {
    let path = PropertyPath::parse(path)?;
    let segments: Vec<&str> = path.segments().collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(DomainError::invalid_path(path.as_str(), "path is empty"));
    };

    let mut current = target;
    for segment in parents {
        current = child_object(current, path.as_str(), segment)?
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    child_object(current, path.as_str(), last)?.insert(last.to_string(), value);
    Ok(())
}

fn child_object<'a>(
    value: &'a mut Value,
    path: &str,
    segment: &str,
) -> Result<&'a mut Map<String, Value>, DomainError> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value
        .as_object_mut()
        .ok_or_else(|| DomainError::path_conflict(path, segment))
}

/// Expand a flat mapping of dotted keys into a nested object.
///
/// Nested object values are expanded as well, so `{"a": {"b.c": 1}}` and
/// `{"a.b.c": 1}` produce the same document.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use summoner_domain::common::expand_object;
///
/// let expanded = expand_object([("system.save.dc", json!(15)), ("_id", json!("x"))]).unwrap();
/// assert_eq!(expanded, json!({"_id": "x", "system": {"save": {"dc": 15}}}));
/// ```
pub fn expand_object<I, K>(flat: I) -> Result<Value, DomainError>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut expanded = Value::Object(Map::new());
    for (key, value) in flat {
        let value = match value {
            Value::Object(map) => expand_object(map)?,
            other => other,
        };
        set_property(&mut expanded, key.as_ref(), value)?;
    }
    Ok(expanded)
}

/// Flatten a nested object into dotted keys. Inverse of [`expand_object`].
///
/// Arrays and empty objects are kept as leaf values.
pub fn flatten_object(value: &Value) -> BTreeMap<String, Value> {
    let mut flat = BTreeMap::new();
    flatten_into(value, None, &mut flat);
    flat
}

fn flatten_into(value: &Value, prefix: Option<&str>, flat: &mut BTreeMap<String, Value>) {
    match (value, prefix) {
        (Value::Object(map), _) if !map.is_empty() => {
            for (key, child) in map {
                let path = match prefix {
                    Some(prefix) => format!("{}.{}", prefix, key),
                    None => key.clone(),
                };
                flatten_into(child, Some(&path), flat);
            }
        }
        (_, Some(prefix)) => {
            flat.insert(prefix.to_string(), value.clone());
        }
        (_, None) => {}
    }
}
