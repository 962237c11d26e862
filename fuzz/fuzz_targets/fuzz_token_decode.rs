#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(decoded) = keygate::auth::token::decode(s) {
            // Anything that decodes must re-encode to an equivalent token.
            let again = keygate::auth::token::encode(&decoded.date, &decoded.key);
            if decoded.key == decoded.key.to_uppercase() {
                assert_eq!(again, s.to_lowercase());
            }
        }
    }
});
