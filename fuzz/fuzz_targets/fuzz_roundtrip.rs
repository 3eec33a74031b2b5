#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Whatever decodes cleanly must encode and decode to the same value
    if let Ok(value) = boss_codec::load(data) {
        if let Ok(bytes) = boss_codec::dump(&value) {
            let again = boss_codec::load(&bytes).expect("re-encoded value must decode");
            assert_eq!(again, value);
        }
    }
});
