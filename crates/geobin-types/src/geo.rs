//! Discovered geographic points and the paths that locate them.
//!
//! A [`Geo`] is the normalized result of geo detection: a GeoJSON-shaped
//! geometry, an optional accuracy radius, and the [`GeoPath`] at which it
//! was found in the source document.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use ts_rs::TS;

/// One step into a JSON document: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum PathSegment {
    /// Array index.
    Index(usize),
    /// Object key.
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "[{i}]"),
            Self::Key(k) => write!(f, ".{k}"),
        }
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

/// Location of a value within a JSON document.
///
/// The empty path is the document root. Paths only grow: every descent
/// produces a new path one segment longer than its parent.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPath(pub Vec<PathSegment>);

impl GeoPath {
    /// The document root.
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the value stored under `key` in the object at this path.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.push(PathSegment::Key(key.into()))
    }

    /// Path of the element at `index` in the array at this path.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    /// Number of segments (0 at the root).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the document root.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The segments from the root outwards.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len().saturating_add(1));
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for GeoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for GeoPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// `{"type": "Point", "coordinates": [lng, lat]}`.
pub fn point_geometry(lng: Number, lat: Number) -> Value {
    serde_json::json!({
        "type": "Point",
        "coordinates": [Value::Number(lng), Value::Number(lat)],
    })
}

/// A geographic point discovered in a payload.
///
/// Serialized as `{"geo": <geometry>, "radius": <number>?, "path": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Geo {
    /// GeoJSON `Point` geometry, either synthesized or the verbatim
    /// object found in the payload.
    #[serde(rename = "geo")]
    pub geometry: Value,

    /// Accuracy or distance radius found next to the coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub radius: Option<f64>,

    /// Where the point was found.
    pub path: GeoPath,
}

impl Geo {
    /// Build a synthesized `{"type": "Point", "coordinates": [lng, lat]}`
    /// geometry, keeping the original number representations.
    #[cfg(test)]
    pub fn point(lng: Number, lat: Number, radius: Option<f64>, path: GeoPath) -> Self {
        Self {
            geometry: point_geometry(lng, lat),
            radius,
            path,
        }
    }

    /// The `[lng, lat]` pair as floats, if the geometry carries one.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match self.geometry.get("coordinates")?.as_array()?.as_slice() {
            [lng, lat] => Some((lng.as_f64()?, lat.as_f64()?)),
            _ => None,
        }
    }
}
