//! Nested query-string encoding and decoding.
//!
//! The listing API takes bracket-indexed parameters (`sort[0][field]=...`),
//! so plain form encoding is not enough. This module renders an ordered
//! parameter map to that format and parses it back. Spaces encode as `%20`,
//! never `+`.

use serde_json::{Map, Value};

/// Parameter map passed to listing requests. Iteration order is preserved
/// end to end.
pub type Params = Map<String, Value>;

/// Encode a parameter map into a canonical bracket-indexed query string.
///
/// Scalars render as `key=value`, lists as `key[i]=value`, nested maps as
/// `key[sub]=value` (recursively), and nulls as `key=`. Keys and values are
/// percent-encoded. Encoding is associative: encoding two maps and joining
/// with `&` equals encoding their merge.
pub fn encode(params: &Params) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        encode_into(key, value, &mut pairs);
    }
    pairs.join("&")
}

fn encode_into(key: &str, value: &Value, pairs: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                encode_into(&format!("{}[{}]", key, index), item, pairs);
            }
        }
        Value::Object(map) => {
            for (sub_key, item) in map {
                encode_into(&format!("{}[{}]", key, sub_key), item, pairs);
            }
        }
        Value::Null => pairs.push(format!("{}=", escape(key))),
        Value::String(text) => pairs.push(format!("{}={}", escape(key), escape(text))),
        other => pairs.push(format!("{}={}", escape(key), escape(&other.to_string()))),
    }
}

/// Decode a bracket-indexed query string back into a parameter map.
///
/// All scalar values decode as strings. Numeric bracket segments rebuild
/// list positions (gaps padded with null), empty segments append, and other
/// segments rebuild nested maps. A key whose bracket sequence does not
/// parse is kept as a literal key.
pub fn decode(text: &str) -> Params {
    let mut params = Params::new();

    for pair in text.split('&').filter(|pair| !pair.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = unescape(raw_key);
        let value = Value::String(unescape(raw_value));

        match parse_key(&key) {
            Some((base, segments)) => {
                let slot = params.entry(base).or_insert(Value::Null);
                place(slot, &segments, value);
            }
            None => {
                params.insert(key, value);
            }
        }
    }

    params
}

/// Percent-encode one text fragment (space becomes `%20`).
pub fn escape(part: &str) -> String {
    urlencoding::encode(part).into_owned()
}

/// Percent-encode and concatenate fragments with no separator.
///
/// Used for path segment construction, e.g. table names containing spaces.
pub fn escape_join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|part| escape(part.as_ref()))
        .collect()
}

fn unescape(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

enum Segment {
    Index(usize),
    Append,
    Key(String),
}

/// Split `base[seg][seg]...` into its base key and bracket segments.
/// Returns None when the key is not a well-formed bracket sequence, in
/// which case the whole key is treated as literal.
fn parse_key(key: &str) -> Option<(String, Vec<Segment>)> {
    let open = key.find('[')?;
    let base = &key[..open];
    if base.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return None;
        }
        let close = rest.find(']')?;
        let segment = &rest[1..close];
        segments.push(if segment.is_empty() {
            Segment::Append
        } else if let Ok(index) = segment.parse::<usize>() {
            Segment::Index(index)
        } else {
            Segment::Key(segment.to_string())
        });
        rest = &rest[close + 1..];
    }

    Some((base.to_string(), segments))
}

fn place(slot: &mut Value, segments: &[Segment], value: Value) {
    let (segment, rest) = match segments.split_first() {
        Some(split) => split,
        None => {
            *slot = value;
            return;
        }
    };

    match segment {
        Segment::Key(sub_key) => {
            if !matches!(slot, Value::Object(_)) {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(map) = slot {
                let child = map.entry(sub_key.clone()).or_insert(Value::Null);
                place(child, rest, value);
            }
        }
        Segment::Index(index) => {
            if !matches!(slot, Value::Array(_)) {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                while items.len() <= *index {
                    items.push(Value::Null);
                }
                place(&mut items[*index], rest, value);
            }
        }
        Segment::Append => {
            if !matches!(slot, Value::Array(_)) {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                items.push(Value::Null);
                let last = items.len() - 1;
                place(&mut items[last], rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_encoding_simple_params() {
        let params = params(json!({"maxRecords": 50, "view": "Master"}));
        assert_eq!(encode(&params), "maxRecords=50&view=Master");
    }

    #[test]
    fn test_encoding_arrays_uses_indices() {
        let params = params(json!({
            "maxRecords": 50,
            "view": "Master",
            "fields": ["Quality", "Price"],
        }));

        assert_eq!(
            encode(&params),
            "maxRecords=50&view=Master&fields%5B0%5D=Quality&fields%5B1%5D=Price"
        );
    }

    #[test]
    fn test_encoding_arrays_of_objects() {
        let params = params(json!({"sort": [
            {"field": "Quality", "direction": "desc"},
            {"field": "Price", "direction": "asc"},
        ]}));

        assert_eq!(
            encode(&params),
            "sort%5B0%5D%5Bfield%5D=Quality&sort%5B0%5D%5Bdirection%5D=desc\
             &sort%5B1%5D%5Bfield%5D=Price&sort%5B1%5D%5Bdirection%5D=asc"
        );
    }

    #[test]
    fn test_encoding_is_associative() {
        let left = params(json!({"view": "Master"}));
        let right = params(json!({"fields": ["Quality"]}));
        let mut merged = left.clone();
        merged.extend(right.clone());

        let joined = format!("{}&{}", encode(&left), encode(&right));
        assert_eq!(joined, encode(&merged));
    }

    #[test]
    fn test_decode_nested_query() {
        let query = "maxRecords=3&pageSize=1\
                     &sort%5B0%5D%5Bfield%5D=Quality&sort%5B0%5D%5Bdirection%5D=asc";
        let decoded = decode(query);

        assert_eq!(
            Value::Object(decoded),
            json!({
                "maxRecords": "3",
                "pageSize": "1",
                "sort": [{"field": "Quality", "direction": "asc"}],
            })
        );
    }

    #[test]
    fn test_params_fuzzing_round_trip() {
        let input = params(json!({
            "an explicit nil": null,
            "horror": [1, 2, [{"mic": "check"}, {"one": "two"}]],
            "view": "A name with spaces",
        }));

        let decoded = decode(&encode(&input));
        assert_eq!(
            Value::Object(decoded),
            json!({
                "an explicit nil": "",
                "horror": ["1", "2", [{"mic": "check"}, {"one": "two"}]],
                "view": "A name with spaces",
            })
        );
    }

    #[test]
    fn test_decode_pads_array_gaps_with_null() {
        let decoded = decode("fields%5B2%5D=Quality");
        assert_eq!(
            Value::Object(decoded),
            json!({"fields": [null, null, "Quality"]})
        );
    }

    #[test]
    fn test_decode_unparsable_brackets_as_literal_key() {
        let decoded = decode("a%5Bb=1");
        assert_eq!(Value::Object(decoded), json!({"a[b": "1"}));
    }

    #[test]
    fn test_escaping_one_string() {
        assert_eq!(escape("test string"), "test%20string");
    }

    #[test]
    fn test_escaping_many_strings() {
        assert_eq!(escape_join(["test", "string"]), "teststring");
    }
}
