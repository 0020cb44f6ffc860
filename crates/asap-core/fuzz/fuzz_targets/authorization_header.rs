#![no_main]

use asap_core::config::AuthenticatorConfig;
use asap_core::Authenticator;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tokio::runtime::Runtime;

struct Harness {
    runtime: Runtime,
    authenticator: Authenticator,
}

fn harness() -> &'static Harness {
    static HARNESS: OnceLock<Harness> = OnceLock::new();
    HARNESS.get_or_init(|| Harness {
        runtime: tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("fuzz runtime"),
        // Insecure mode resolves every key locally, so no network is touched
        authenticator: Authenticator::new(AuthenticatorConfig::insecure("fuzz-audience"))
            .expect("fuzz authenticator"),
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(header) = std::str::from_utf8(data) else {
        return;
    };

    let harness = harness();
    let _ = harness
        .runtime
        .block_on(harness.authenticator.authenticate(Some(header)));
});
