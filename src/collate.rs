//! Order-preserving binary encoding of index keys
//!
//! Index keys are JSON values collated the way the catalog views have always
//! been ordered:
//!
//! `null < false < true < numbers < strings < arrays < objects`
//!
//! Strings compare by code point, arrays element by element (a proper prefix
//! sorts first), objects pair by pair in key order. [`encode_key`] turns a
//! value into bytes whose plain byte-wise order is exactly that collation, so
//! any byte-ordered store (a SQLite BLOB index, a `BTreeMap<Vec<u8>, _>`)
//! can answer range scans over structured keys.
//!
//! # Format
//!
//! ```text
//! null      01
//! false     02
//! true      03
//! number    04 <8 bytes, sign-flipped big-endian f64>
//! string    05 <utf-8, 00 escaped as 00 ff> 00 01
//! array     06 <element>* 00
//! object    07 (<string> <value>)* 00
//! ```

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Appended to a name to bound a prefix range from above
pub const HIGH_SUFFIX: char = '\u{fff0}';

const TAG_END: u8 = 0x00;
const TAG_NULL: u8 = 0x01;
const TAG_FALSE: u8 = 0x02;
const TAG_TRUE: u8 = 0x03;
const TAG_NUMBER: u8 = 0x04;
const TAG_STRING: u8 = 0x05;
const TAG_ARRAY: u8 = 0x06;
const TAG_OBJECT: u8 = 0x07;

/// Key that sorts before every real key
pub fn low_sentinel() -> Value {
    Value::Null
}

/// Key that sorts after every string, array and real object key
///
/// Real objects always start with an ASCII field name, and U+FFF0 sorts after those.
pub fn high_sentinel() -> Value {
    let mut map = Map::new();
    map.insert(HIGH_SUFFIX.to_string(), Value::String(String::new()));
    Value::Object(map)
}

/// `prefix` followed by [`HIGH_SUFFIX`]: sorts after every string starting with `prefix`
pub fn prefix_upper_bound(prefix: &str) -> String {
    let mut bound = String::with_capacity(prefix.len() + HIGH_SUFFIX.len_utf8());
    bound.push_str(prefix);
    bound.push(HIGH_SUFFIX);
    bound
}

/// Encode a key so that byte order equals collation order
pub fn encode_key(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

/// Compare two keys in collation order
pub fn compare(a: &Value, b: &Value) -> Ordering {
    encode_key(a).cmp(&encode_key(b))
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(false) => out.push(TAG_FALSE),
        Value::Bool(true) => out.push(TAG_TRUE),
        Value::Number(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(&encode_f64(n.as_f64().unwrap_or(0.0)));
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            encode_str(s, out);
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            for item in items {
                encode_into(item, out);
            }
            out.push(TAG_END);
        }
        Value::Object(map) => {
            out.push(TAG_OBJECT);
            for (key, item) in map {
                out.push(TAG_STRING);
                encode_str(key, out);
                encode_into(item, out);
            }
            out.push(TAG_END);
        }
    }
}

fn encode_str(s: &str, out: &mut Vec<u8>) {
    for &byte in s.as_bytes() {
        out.push(byte);
        if byte == 0x00 {
            out.push(0xff);
        }
    }
    out.extend_from_slice(&[0x00, 0x01]);
}

/// Flip the sign bit of positives and every bit of negatives
fn encode_f64(n: f64) -> [u8; 8] {
    let bits = n.to_bits();
    let ordered = if bits >> 63 == 0 {
        bits ^ (1 << 63)
    } else {
        !bits
    };
    ordered.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_ascending(values: &[Value]) {
        for pair in values.windows(2) {
            assert_eq!(
                compare(&pair[0], &pair[1]),
                Ordering::Less,
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_type_order() {
        assert_ascending(&[
            json!(null),
            json!(false),
            json!(true),
            json!(-5),
            json!(0),
            json!(2.5),
            json!(10),
            json!(""),
            json!("a"),
            json!([]),
            json!({}),
        ]);
    }

    #[test]
    fn test_string_order() {
        assert_ascending(&[
            json!("a"),
            json!("a\u{0}"),
            json!("ab"),
            json!("b"),
            json!("int"),
            json!("int32"),
            json!(prefix_upper_bound("int")),
            json!("string"),
        ]);
    }

    #[test]
    fn test_array_prefix_sorts_first() {
        assert_ascending(&[
            json!(["int"]),
            json!(["int", null]),
            json!(["int", "bool"]),
            json!(["int", "bool", "x"]),
            json!(["int", "string"]),
            json!(["int", high_sentinel()]),
            json!(["string"]),
        ]);
    }

    #[test]
    fn test_high_sentinel_beats_structured_nodes() {
        assert_ascending(&[
            json!({"array": "int"}),
            json!({"byRef": "int"}),
            json!({"tuple": ["int", "int"]}),
            high_sentinel(),
        ]);
        assert_eq!(compare(&json!({"args": ["int"], "tyCon": "list"}), &high_sentinel()), Ordering::Less);
    }

    #[test]
    fn test_equal_keys_encode_identically() {
        let a = json!(["int", {"tuple": ["a", "b"]}, ["x", "y"]]);
        let b = json!(["int", {"tuple": ["a", "b"]}, ["x", "y"]]);
        assert_eq!(encode_key(&a), encode_key(&b));
        assert_eq!(compare(&a, &b), Ordering::Equal);
    }
}
