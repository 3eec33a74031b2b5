//! Property-based tests using proptest
//!
//! These tests check codec invariants across randomly generated values:
//! decoding inverts encoding, encoding is deterministic, and stream mode
//! agrees with tree mode on content.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use boss_codec::config::StreamCacheConfig;
use boss_codec::{dump, load, load_all, Binder, Reader, Value, Writer};
use num_bigint::BigInt;
use proptest::prelude::*;
use std::io::Cursor;

/// Values without floats (NaN breaks equality) or typed objects.
fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        "[a-z]{0,12}".prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::bytes),
        (0i64..4_000_000_000).prop_map(|s| Value::timestamp_secs(s).expect("in range")),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::list),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..8)
                .prop_map(|pairs| Value::dict(pairs.into_iter().collect::<Binder>())),
        ]
    })
}

// Property: any value survives encode then decode
proptest! {
    #[test]
    fn prop_value_roundtrip(value in arb_value()) {
        let bytes = dump(&value).expect("encoding should not fail");
        let decoded = load(&bytes).expect("decoding should not fail");
        prop_assert_eq!(decoded, value);
    }
}

// Property: encoding is deterministic
proptest! {
    #[test]
    fn prop_encoding_deterministic(value in arb_value()) {
        prop_assert_eq!(dump(&value).unwrap(), dump(&value).unwrap());
    }
}

// Property: integers keep their value whatever width they decode to
proptest! {
    #[test]
    fn prop_integer_roundtrip(v in any::<i64>()) {
        let decoded = load(&dump(&Value::from(v)).unwrap()).unwrap();
        prop_assert_eq!(decoded.as_i64(), Some(v));
    }

    #[test]
    fn prop_big_integer_roundtrip(digits in "-?[1-9][0-9]{0,60}") {
        let big = BigInt::parse_bytes(digits.as_bytes(), 10).unwrap();
        let decoded = load(&dump(&Value::big(big.clone())).unwrap()).unwrap();
        prop_assert_eq!(decoded.to_big_int(), Some(big));
    }
}

// Property: finite doubles keep their exact bits (except -0.0, which becomes 0.0)
proptest! {
    #[test]
    fn prop_double_roundtrip(d in any::<f64>().prop_filter("not NaN", |d| !d.is_nan())) {
        let decoded = load(&dump(&Value::from(d)).unwrap()).unwrap();
        prop_assert_eq!(decoded.as_f64(), Some(d));
    }
}

// Property: text of any Unicode content round trips
proptest! {
    #[test]
    fn prop_text_roundtrip(text in ".{0,200}") {
        let decoded = load(&dump(&Value::from(text.as_str())).unwrap()).unwrap();
        prop_assert_eq!(decoded.as_str(), Some(text.as_str()));
    }
}

// Property: a repeated string costs a single byte after its first occurrence
proptest! {
    #[test]
    fn prop_repeats_are_references(text in "[a-z]{1,20}", times in 2usize..10) {
        let list = Value::list(vec![Value::from(text.as_str()); times]);
        let once = dump(&Value::list([text.as_str()])).unwrap();
        let bytes = dump(&list).unwrap();
        prop_assert_eq!(bytes.len(), once.len() + times - 1);
    }
}

// Property: stream mode decodes the same sequence tree mode does
proptest! {
    #[test]
    fn prop_stream_mode_matches_tree_mode(
        words in prop::collection::vec("[a-d]{1,3}", 1..200),
        entries in 1usize..8,
        size in 1usize..4,
    ) {
        let values: Vec<Value> = words.iter().map(|w| Value::from(w.as_str())).collect();
        let limits = StreamCacheConfig { max_cache_entries: entries, max_item_size: size };

        let mut writer = Writer::new(Vec::new()).with_stream_limits(limits);
        writer.set_stream_mode().unwrap();
        writer.write_all(&values).unwrap();
        prop_assert!(writer.stats().entries <= entries);

        let mut reader = Reader::new(Cursor::new(writer.into_inner())).with_stream_limits(limits);
        let mut decoded = Vec::new();
        while let Some(value) = reader.try_read().unwrap() {
            decoded.push(value);
        }
        prop_assert_eq!(&decoded, &values);

        let mut tree = Writer::new(Vec::new());
        tree.write_all(&values).unwrap();
        prop_assert_eq!(load_all(&tree.into_inner()).unwrap(), values);
    }
}

// Property: arbitrary input never panics the decoder
proptest! {
    #[test]
    fn prop_decode_garbage_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = load_all(&data);
    }
}
