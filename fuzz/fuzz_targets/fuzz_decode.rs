#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decode every value in arbitrary input - test for panics, crashes, runaway allocation
    let _ = boss_codec::load_all(data);
});
