//! Classification of JSON objects as geographic points.
//!
//! An object is a *direct match* when it is either an embedded GeoJSON
//! `Point` or a loosely-keyed latitude/longitude object. Matching is
//! checked in that order; the first rule that applies wins.
//!
//! # Key aliases
//!
//! Each role is resolved by consulting the **first present** key in the
//! table below. Later aliases are ignored once an earlier one is present,
//! even if the earlier value turns out not to be numeric.
//!
//! | Role | Keys, in preference order |
//! |------|---------------------------|
//! | latitude | `lat`, `latitude`, `y` |
//! | longitude | `lng`, `lon`, `long`, `longitude`, `x` |
//! | radius | `dst`, `dist`, `distance`, `rad`, `radius`, `acc`, `accuracy` |
//! | geo reference | `geo`, `loc`, `location`, `coord`, `coordinate`, `coords`, `coordinates` |

use geobin_types::point_geometry;
use serde_json::{Map, Number, Value};

/// Keys that may hold a latitude.
pub const LAT_KEYS: [&str; 3] = ["lat", "latitude", "y"];

/// Keys that may hold a longitude.
pub const LNG_KEYS: [&str; 5] = ["lng", "lon", "long", "longitude", "x"];

/// Keys that may hold an accuracy or distance radius.
pub const RADIUS_KEYS: [&str; 7] = ["dst", "dist", "distance", "rad", "radius", "acc", "accuracy"];

/// Keys whose value may itself be (or describe) a point.
pub const GEO_REF_KEYS: [&str; 7] = [
    "geo",
    "loc",
    "location",
    "coord",
    "coordinate",
    "coords",
    "coordinates",
];

/// A direct match, before it is tagged with a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// GeoJSON geometry (verbatim or synthesized).
    pub geometry: Value,
    /// Radius found alongside synthesized coordinates.
    pub radius: Option<f64>,
}

impl Point {
    fn synthesized([lng, lat]: [Number; 2], radius: Option<f64>) -> Self {
        Self {
            geometry: point_geometry(lng, lat),
            radius,
        }
    }
}

/// Classify `object`, taking ownership only when it matches.
///
/// Returns the object back unchanged when it is not a direct match so the
/// caller can keep walking its children without cloning.
pub fn match_object(object: Map<String, Value>) -> Result<Point, Map<String, Value>> {
    if is_geojson_point(&object) {
        return Ok(Point {
            geometry: Value::Object(object),
            radius: None,
        });
    }
    loose_point(&object).ok_or(object)
}

/// Whether `key` names a nested geo reference.
pub fn is_geo_ref_key(key: &str) -> bool {
    GEO_REF_KEYS.contains(&key)
}

/// `{"type": "Point", "coordinates": [a, b]}` with two numbers.
pub fn is_geojson_point(object: &Map<String, Value>) -> bool {
    object.get("type").and_then(Value::as_str) == Some("Point")
        && object.get("coordinates").and_then(coordinate_pair).is_some()
}

/// A loosely-keyed point: lat/lng aliases, or a `[lng, lat]` pair under a
/// geo reference key.
pub fn loose_point(object: &Map<String, Value>) -> Option<Point> {
    let coordinates = lat_lng(object).or_else(|| {
        first_present(object, &GEO_REF_KEYS).and_then(coordinate_pair)
    })?;
    let radius = first_present(object, &RADIUS_KEYS).and_then(Value::as_f64);
    Some(Point::synthesized(coordinates, radius))
}

fn lat_lng(object: &Map<String, Value>) -> Option<[Number; 2]> {
    let lat = number(first_present(object, &LAT_KEYS)?)?;
    let lng = number(first_present(object, &LNG_KEYS)?)?;
    Some([lng.clone(), lat.clone()])
}

fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

fn coordinate_pair(value: &Value) -> Option<[Number; 2]> {
    match value.as_array()?.as_slice() {
        [lng, lat] => Some([number(lng)?.clone(), number(lat)?.clone()]),
        _ => None,
    }
}

const fn number(value: &Value) -> Option<&Number> {
    match value {
        Value::Number(n) => Some(n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => Map::from_iter([(String::from("value"), other)]),
        }
    }

    fn point(lng: i64, lat: i64) -> Value {
        json!({"type": "Point", "coordinates": [lng, lat]})
    }

    #[test]
    fn geojson_point_is_kept_verbatim() {
        let source = json!({"type": "Point", "coordinates": [1, -1], "bbox": [0, 0, 2, 2]});
        let matched = match_object(object(source.clone())).unwrap();
        assert_eq!(matched.geometry, source);
        assert_eq!(matched.radius, None);
    }

    #[test]
    fn geojson_point_rejects_bad_coordinates() {
        assert!(!is_geojson_point(&object(json!({"type": "Point", "coordinates": "psyche!"}))));
        assert!(!is_geojson_point(&object(json!({"type": "Point", "coordinates": [1, 2, 3]}))));
        assert!(!is_geojson_point(&object(json!({"type": "Point", "coordinates": [1, "2"]}))));
        assert!(!is_geojson_point(&object(json!({"type": "LineString", "coordinates": [1, 2]}))));
    }

    #[test]
    fn every_lat_lng_alias_pair_matches() {
        for lat_key in LAT_KEYS {
            for lng_key in LNG_KEYS {
                let mut source = Map::new();
                source.insert(lat_key.to_owned(), json!(-10));
                source.insert(lng_key.to_owned(), json!(10));
                let matched = loose_point(&source);
                assert_eq!(
                    matched.map(|p| p.geometry),
                    Some(point(10, -10)),
                    "{lat_key}/{lng_key}"
                );
            }
        }
    }

    #[test]
    fn every_radius_alias_is_attached() {
        for radius_key in RADIUS_KEYS {
            let mut source = object(json!({"x": 10, "y": -10}));
            source.insert(radius_key.to_owned(), json!(5));
            let matched = loose_point(&source).unwrap();
            assert_eq!(matched.geometry, point(10, -10));
            assert_eq!(matched.radius, Some(5.0), "{radius_key}");
        }
    }

    #[test]
    fn non_numeric_radius_is_ignored() {
        let matched = loose_point(&object(json!({"x": 1, "y": 2, "accuracy": "high"}))).unwrap();
        assert_eq!(matched.radius, None);
    }

    #[test]
    fn every_geo_ref_key_accepts_a_coordinate_pair() {
        for geo_key in GEO_REF_KEYS {
            let mut source = Map::new();
            source.insert(geo_key.to_owned(), json!([10, -10]));
            let matched = loose_point(&source).unwrap();
            assert_eq!(matched.geometry, point(10, -10), "{geo_key}");
            assert!(is_geo_ref_key(geo_key));
        }
        assert!(!is_geo_ref_key("geos"));
    }

    #[test]
    fn missing_or_non_numeric_role_is_not_a_match() {
        assert!(loose_point(&object(json!({"lat": 1}))).is_none());
        assert!(loose_point(&object(json!({"lng": 1}))).is_none());
        assert!(loose_point(&object(json!({"lat": "1", "lng": 2}))).is_none());
        assert!(loose_point(&object(json!({"lat": null, "lng": 2}))).is_none());
    }

    #[test]
    fn first_present_alias_wins() {
        // `lat` is preferred over `y`, `lng` over `x`.
        let matched = loose_point(&object(json!({"lat": 1, "y": 2, "lng": 3, "x": 4}))).unwrap();
        assert_eq!(matched.geometry, point(3, 1));

        // The preferred alias is the only one consulted for its role.
        assert!(loose_point(&object(json!({"lat": "n/a", "y": 2, "x": 4}))).is_none());
    }

    #[test]
    fn float_coordinates_keep_their_representation() {
        let matched =
            loose_point(&object(json!({"latitude": 45.5, "longitude": -122.25}))).unwrap();
        assert_eq!(
            matched.geometry,
            json!({"type": "Point", "coordinates": [-122.25, 45.5]})
        );
    }

    #[test]
    fn unmatched_object_is_handed_back() {
        let source = object(json!({"foo": "bar", "nested": {"x": 1, "y": 2}}));
        let returned = match_object(source.clone()).unwrap_err();
        assert_eq!(returned, source);
    }

    #[test]
    fn geojson_takes_precedence_over_loose_keys() {
        let source = json!({"type": "Point", "coordinates": [5, 6], "lat": 1, "lng": 2});
        let matched = match_object(object(source.clone())).unwrap();
        assert_eq!(matched.geometry, source);
    }
}
