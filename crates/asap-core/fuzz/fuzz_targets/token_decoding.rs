#![no_main]

use asap_core::jwt::decode_unverified;
use asap_core::validation::validate_issuer_and_key_id;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    // Unverified decoding must reject garbage without panicking
    if let Ok(unverified) = decode_unverified(token) {
        if let (Some(iss), Some(kid)) = (unverified.issuer(), unverified.key_id()) {
            let _ = validate_issuer_and_key_id(iss, kid);
        }
    }

    // Treat the input as "issuer|key id" to hit path segment checks directly
    if let Some((iss, kid)) = token.split_once('|') {
        let _ = validate_issuer_and_key_id(iss, kid);
    }
});
