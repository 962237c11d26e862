#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(candidate) = keygate::gateway::extract_candidate_token(s) {
            assert!(candidate.chars().count() > 10);
            assert!(!candidate.contains('/'));
        }
    }
});
