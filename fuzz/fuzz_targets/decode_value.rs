#![no_main]

use libfuzzer_sys::fuzz_target;
use adso::Value;

fuzz_target!(|data: &[u8]| {
    // Decoding must never panic, and whatever decodes must re-encode
    // into bytes that decode again. Byte equality is not expected since
    // non-finite floats collapse to null on encode.
    if let Ok(value) = Value::decode(data) {
        let encoded = value.to_vec();
        Value::decode(&encoded)
            .expect("re-decoding an encoded value failed");
    }
});
