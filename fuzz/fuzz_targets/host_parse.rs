#![no_main]

use libfuzzer_sys::fuzz_target;
use passmill_core::host::{host_of, parse_uri_host};

fuzz_target!(|data: &[u8]| {
    // Host extraction must never panic, and validation only ever filters
    // what the raw parser returned.
    if let Ok(s) = std::str::from_utf8(data) {
        let raw = parse_uri_host(s);
        if let Some(host) = host_of(s) {
            assert_eq!(raw, Some(host.as_str()));
        }

        let lowered = s.to_lowercase();
        let _ = host_of(&lowered);
    }
});
