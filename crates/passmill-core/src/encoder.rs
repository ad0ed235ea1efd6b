//! Password encoding
//!
//! Turns a 32-byte key material segment into a 20-character password that
//! satisfies common site rules (upper, lower, digit, symbol):
//!
//! ```text
//! base64(segment)[..18] + SYMBOLS[segment[31] % 10] + digit(segment[30] % 10)
//! ```
//!
//! The base64 alphabet is the standard one, so the first 18 characters may
//! themselves contain `+` and `/`. The mapping is fixed: changing it changes
//! every password ever derived.

use crate::pipeline::SEGMENT_LEN;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

/// Symbol table indexed by the last byte of the segment.
pub const SYMBOLS: [char; 10] = ['!', '@', '#', '$', '%', '?', '&', '*', '+', '-'];

/// Characters kept from the base64 encoding.
pub const BASE_LEN: usize = 18;

/// Length of every generated password.
pub const PASSWORD_LEN: usize = BASE_LEN + 2;

/// Encode a key material segment as a password.
///
/// # Example
/// ```
/// use passmill_core::encoder::encode_password;
/// let segment: [u8; 32] = std::array::from_fn(|i| i as u8);
/// assert_eq!(encode_password(&segment), "AAECAwQFBgcICQoLDA@0");
/// ```
pub fn encode_password(segment: &[u8; SEGMENT_LEN]) -> String {
    let encoded = Zeroizing::new(STANDARD.encode(segment));
    let symbol = SYMBOLS[(segment[SEGMENT_LEN - 1] % 10) as usize];
    let digit = char::from(b'0' + segment[SEGMENT_LEN - 2] % 10);

    let mut password = String::with_capacity(PASSWORD_LEN);
    password.push_str(&encoded[..BASE_LEN]);
    password.push(symbol);
    password.push(digit);
    password
}
