//! Cardinality normalization for the BusTime wire format.
//!
//! The API collapses a one-element result set to a bare object and a
//! multi-element set to a list, under the same field name. Every container
//! field must go through [`one_or_many`] (serde) or [`normalize`] (tree
//! level); forgetting this was the recurring bug in every consumer of the
//! raw feed, so the rule lives here and nowhere else.
//!
//! Also here: [`coerce_string`], because XML text nodes are always strings
//! but the JSON rendering occasionally uses real numbers for the same
//! fields.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a field that may be a bare object or a list of objects into
/// a uniform `Vec`.
///
/// Use with `#[serde(default, deserialize_with = "one_or_many")]` so an
/// absent container becomes an empty `Vec`.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values,
        OneOrMany::One(value) => vec![value],
    })
}

/// Tree-level form of the same rule.
///
/// A list is returned as its elements, a bare value is wrapped in a
/// one-element sequence, and `Null` (absent) is an empty sequence.
pub fn normalize(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Deserialize a scalar that may arrive as a JSON string, number, or
/// boolean into a `String`.
pub fn coerce_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Number(n) => n.to_string(),
        Scalar::Flag(b) => b.to_string(),
    })
}

/// Optional-field variant of [`coerce_string`]; `null` and absent both map
/// to `None`. Use with `#[serde(default, deserialize_with = "coerce_opt_string")]`.
pub fn coerce_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Text(s)) => Some(s),
        Some(Scalar::Number(n)) => Some(n.to_string()),
        Some(Scalar::Flag(b)) => Some(b.to_string()),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Container {
        #[serde(default, deserialize_with = "one_or_many")]
        stop: Vec<Item>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        stpid: String,
    }

    #[test]
    fn bare_object_becomes_single_element() {
        let c: Container = serde_json::from_value(json!({"stop": {"stpid": "4123"}})).unwrap();
        assert_eq!(c.stop.len(), 1);
        assert_eq!(c.stop[0].stpid, "4123");
    }

    #[test]
    fn list_stays_list() {
        let c: Container =
            serde_json::from_value(json!({"stop": [{"stpid": "1"}, {"stpid": "2"}]})).unwrap();
        assert_eq!(c.stop.len(), 2);
    }

    #[test]
    fn absent_container_is_empty() {
        let c: Container = serde_json::from_value(json!({})).unwrap();
        assert!(c.stop.is_empty());
    }

    #[test]
    fn normalize_wraps_bare_value() {
        let out = normalize(json!({"rt": "28X"}));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn normalize_passes_list_through() {
        let input = json!([{"rt": "28X"}, {"rt": "61C"}]);
        let out = normalize(input.clone());
        assert_eq!(Value::Array(out), input);
    }

    #[test]
    fn normalize_null_is_empty() {
        assert!(normalize(Value::Null).is_empty());
    }

    #[test]
    fn coerce_accepts_strings_and_numbers() {
        #[derive(Deserialize)]
        struct Pos {
            #[serde(deserialize_with = "coerce_string")]
            lat: String,
            #[serde(deserialize_with = "coerce_string")]
            lon: String,
        }

        let p: Pos = serde_json::from_value(json!({"lat": "40.44", "lon": -80.0})).unwrap();
        assert_eq!(p.lat, "40.44");
        assert_eq!(p.lon, "-80.0");
    }

    proptest! {
        /// Normalized output length always equals the true cardinality.
        #[test]
        fn normalized_length_matches_cardinality(n in 0usize..20) {
            let value = if n == 1 {
                json!({"vid": "1"})
            } else {
                Value::Array((0..n).map(|i| json!({"vid": i.to_string()})).collect())
            };
            prop_assert_eq!(normalize(value).len(), n);
        }
    }
}
