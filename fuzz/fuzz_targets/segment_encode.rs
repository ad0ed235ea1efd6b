#![no_main]

use libfuzzer_sys::fuzz_target;
use passmill_core::bitcoin_keys::keypair_from_scalar;
use passmill_core::encoder::{encode_password, PASSWORD_LEN};

fuzz_target!(|data: &[u8]| {
    // Any 32-byte segment encodes to a full-length password, and the key
    // deriver either accepts the scalar or rejects it cleanly.
    let Ok(segment) = <[u8; 32]>::try_from(data) else {
        return;
    };
    assert_eq!(encode_password(&segment).len(), PASSWORD_LEN);
    let _ = keypair_from_scalar(&segment);
});
