#![no_main]

use libfuzzer_sys::fuzz_target;
use passmill_core::DerivationRequest;

fuzz_target!(|data: &[u8]| {
    // Split the input into passphrase, identity, site, version and salt
    // fields. Construction must return Ok or Err, never panic, and an
    // accepted request is always normalized.
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let mut fields = s.splitn(5, '\n');
    let passphrase = fields.next().unwrap_or("");
    let identity = fields.next().unwrap_or("");
    let site = fields.next().unwrap_or("");
    let version = fields.next().unwrap_or("");
    let salt = fields.next().unwrap_or("");

    if let Ok(request) = DerivationRequest::web(passphrase, identity, site, version, salt) {
        assert_eq!(request.identity(), request.identity().trim());
        assert!(request.host().is_some());
        assert!(request.version().unwrap_or(0) >= 1);
    }
    let _ = DerivationRequest::app(passphrase, identity, version, salt);
    let _ = DerivationRequest::wallet(passphrase, identity, Some(version), salt);
});
