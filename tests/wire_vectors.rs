//! Byte-exact conformance tests against known BOSS encodings.

#![allow(clippy::unwrap_used)]

use boss_codec::{dump, dump_all, load, load_all, Binder, CodecError, Value};
use num_bigint::BigInt;

fn hex(text: &str) -> Vec<u8> {
    text.split_whitespace()
        .map(|byte| u8::from_str_radix(byte, 16).unwrap())
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Both directions: `value` encodes to `encoded` and decodes back from it.
fn assert_vector(value: Value, encoded: &str) {
    assert_eq!(to_hex(&dump(&value).unwrap()), encoded, "encoding {value:?}");
    assert_eq!(load(&hex(encoded)).unwrap(), value, "decoding {encoded}");
}

// ============================================================================
// INTEGERS
// ============================================================================

#[test]
fn test_small_integers() {
    assert_vector(Value::from(0), "00");
    assert_vector(Value::from(7), "38");
    assert_vector(Value::from(17), "88");
    assert_vector(Value::from(22), "B0");
    assert_vector(Value::from(23), "B8 17");
    assert_vector(Value::from(30), "B8 1E");
    assert_vector(Value::from(31), "B8 1F");
    assert_vector(Value::from(99), "B8 63");
    assert_vector(Value::from(331), "C0 4B 01");
}

#[test]
fn test_negative_integers() {
    assert_vector(Value::from(-7), "3A");
    assert_vector(Value::from(-17), "8A");
    assert_vector(Value::from(-99), "BA 63");
    assert_vector(Value::from(-331), "C2 4B 01");
}

#[test]
fn test_long_integers() {
    assert_vector(Value::from(13457559825i64), "D8 11 11 22 22 03");
    assert_vector(Value::from(-13457559825i64), "DA 11 11 22 22 03");
    assert_vector(Value::from(4919112987704430865i64), "F0 11 11 22 22 33 33 44 44");
    assert_vector(Value::from(-4919112987704430865i64), "F2 11 11 22 22 33 33 44 44");
}

#[test]
fn test_big_integers() {
    let big = BigInt::parse_bytes(b"97152833356252188945", 10).unwrap();
    assert_vector(Value::big(big.clone()), "F8 89 11 11 22 22 33 33 44 44 05");
    assert_vector(Value::big(-big), "FA 89 11 11 22 22 33 33 44 44 05");
}

#[test]
fn test_decoded_width() {
    assert!(matches!(load(&hex("C0 4B 01")).unwrap(), Value::Int(331)));
    assert!(matches!(load(&hex("C0 FF FF")).unwrap(), Value::Int(65535)));
    assert!(matches!(load(&hex("C8 00 00 01")).unwrap(), Value::Int(65536)));
    assert!(matches!(load(&hex("C8 40 42 0F")).unwrap(), Value::Int(1_000_000)));
    assert!(matches!(
        load(&hex("D8 11 11 22 22 03")).unwrap(),
        Value::Long(13457559825)
    ));
    assert!(matches!(
        load(&hex("F8 89 11 11 22 22 33 33 44 44 05")).unwrap(),
        Value::BigInt(_)
    ));
}

#[test]
fn test_integer_sweep() {
    for i in 0..800i64 {
        assert_eq!(load(&dump(&Value::from(i)).unwrap()).unwrap(), Value::from(i));
        assert_eq!(load(&dump(&Value::from(-i)).unwrap()).unwrap(), Value::from(-i));
    }
}

// ============================================================================
// CONSTANTS AND DOUBLES
// ============================================================================

#[test]
fn test_constants() {
    assert_vector(Value::from(true), "61");
    assert_vector(Value::from(false), "69");
    assert_vector(Value::from(1.0), "11");
    assert_vector(Value::from(-1.0), "21");
    assert_vector(Value::from(0.0), "09");
    assert_vector(Value::Null, "05");
}

#[test]
fn test_double() {
    assert_vector(Value::from(17.37e-111), "39 3C BD FC B1 F9 E2 24 29");
}

// ============================================================================
// TEXT AND BINARIES
// ============================================================================

#[test]
fn test_text() {
    assert_vector(Value::from("Hello"), "2B 48 65 6C 6C 6F");
    let cyrillic = Value::from("Абвгд");
    assert_eq!(load(&dump(&cyrillic).unwrap()).unwrap(), cyrillic);
}

#[test]
fn test_binary() {
    assert_vector(Value::bytes(vec![0u8, 1, 2, 3, 4, 5]), "34 00 01 02 03 04 05");
}

// ============================================================================
// CONTAINERS
// ============================================================================

#[test]
fn test_lists() {
    assert_vector(
        Value::list([
            Value::from(0),
            Value::from(true),
            Value::from(false),
            Value::from(1.0),
            Value::from(-1.0),
            Value::from("hello!"),
        ]),
        "36 00 61 69 11 21 33 68 65 6C 6C 6F 21",
    );
    assert_vector(Value::list([10, 20, 1, 2]), "26 50 A0 08 10");
}

#[test]
fn test_repeated_binaries_decode_equal() {
    let ba = Value::bytes(vec![0u8, 1, 2, 3, 4, 5]);
    let decoded = load(&dump(&Value::list([ba.clone(), ba.clone()])).unwrap()).unwrap();
    let items = decoded.as_list().unwrap();
    assert_eq!(items, [ba.clone(), ba]);
}

#[test]
fn test_dictionary() {
    let dict = Value::dict(Binder::new().with("hello", "world"));
    assert_vector(dict, "0F 2B 68 65 6C 6C 6F 2B 77 6F 72 6C 64");
}

#[test]
fn test_integer_keys_rejected() {
    // {"one": "two", "Great": true, 172: false}
    let result = load(&hex(
        "1F 1B 6F 6E 65 1B 74 77 6F 2B 47 72 65 61 74 61 B8 AC 69",
    ));
    assert!(matches!(result, Err(CodecError::MalformedStream(_))));
}

// ============================================================================
// BACK-REFERENCES
// ============================================================================

#[test]
fn test_repeated_strings() {
    let source = Value::list(["Hello", "World", "Hello", "Hello", "Hello", "World"]);
    assert_vector(
        source,
        "36 2B 48 65 6C 6C 6F 2B 57 6F 72 6C 64 15 15 15 1D",
    );
}

#[test]
fn test_shared_sublist() {
    let sub = Value::list([Value::from("Hello"), Value::from(1), Value::from(2)]);
    let tree = Value::list([
        Value::from(10),
        Value::Null,
        sub.clone(),
        Value::from("Hello"),
        Value::Null,
        sub.clone(),
        sub,
    ]);
    let encoded = "3E 50 05 1E 2B 48 65 6C 6C 6F 08 10 1D 05 15 15";
    assert_vector(tree, encoded);

    let decoded = load(&hex(encoded)).unwrap();
    let items = decoded.as_list().unwrap();
    assert!(items[2].ptr_eq(&items[5]));
    assert!(items[5].ptr_eq(&items[6]));
}

#[test]
fn test_shared_nested_maps() {
    let b = Value::dict(Binder::new().with("foo", "bar").with("bar", "buzz"));
    let root = Value::dict(
        Binder::new()
            .with("a", b.clone())
            .with("b", b.clone())
            .with("c", b),
    );
    let decoded = load(&dump(&root).unwrap()).unwrap();
    let binder = decoded.as_binder().unwrap();
    assert_eq!(binder.get_binder("c").unwrap().get_str("bar"), Some("buzz"));
    assert!(binder.get("a").unwrap().ptr_eq(binder.get("c").unwrap()));
}

#[test]
fn test_cache_spans_values_in_one_session() {
    let bytes = dump_all([&Value::from("abc"), &Value::from("abc")]).unwrap();
    assert_eq!(to_hex(&bytes), "1B 61 62 63 0D");
    assert_eq!(
        load_all(&bytes).unwrap(),
        vec![Value::from("abc"), Value::from("abc")]
    );
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

#[test]
fn test_timestamp() {
    let time = Value::timestamp_secs(1375965738).unwrap();
    assert_vector(time, "79 2A 24 0E 10 85");
}

// ============================================================================
// STREAM MODE
// ============================================================================

#[test]
fn test_stream_mode_recorded_input() {
    // "The string", CREF 1, stream marker, "The string" twice.
    let bytes = hex(
        "53 54 68 65 20 73 74 72 69 6E 67 0D 81 \
         53 54 68 65 20 73 74 72 69 6E 67 \
         53 54 68 65 20 73 74 72 69 6E 67",
    );
    let values = load_all(&bytes).unwrap();
    assert_eq!(values.len(), 4);
    assert!(values.iter().all(|v| v.as_str() == Some("The string")));
}
