//! Bitcoin keypairs from derived key material
//!
//! Wallet mode turns the second 32-byte key material segment into a mainnet
//! secp256k1 keypair: a compressed WIF private key, the 33-byte compressed
//! public key and its legacy P2PKH address.

use bitcoin::{Address, Network, PrivateKey};
use secp256k1::{Secp256k1, SecretKey};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key hex: {0}")]
    InvalidHex(String),
    #[error("Private key must be 32 bytes, got {0}")]
    InvalidLength(usize),
    #[error("Scalar is not a valid secp256k1 private key")]
    InvalidScalar,
}

/// Everything a wallet needs to import or watch the derived key.
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct BitcoinKeyData {
    /// 64 lowercase hex characters
    pub private_key_hex: String,
    /// Mainnet, compressed
    pub private_key_wif: String,
    /// Compressed SEC1, 66 hex characters
    pub public_key_hex: String,
    /// Legacy P2PKH address (`1...`)
    pub address: String,
}

impl fmt::Debug for BitcoinKeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitcoinKeyData")
            .field("private_key_hex", &"<redacted>")
            .field("private_key_wif", &"<redacted>")
            .field("public_key_hex", &self.public_key_hex)
            .field("address", &self.address)
            .finish()
    }
}

/// Build the keypair for a 32-byte scalar.
///
/// Fails if the scalar is zero or not below the curve order.
pub fn keypair_from_scalar(scalar: &[u8; 32]) -> Result<BitcoinKeyData, KeyError> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(scalar).map_err(|_| KeyError::InvalidScalar)?;
    let private_key = PrivateKey::new(secret_key, Network::Bitcoin);
    let public_key = private_key.public_key(&secp);
    let address = Address::p2pkh(public_key.pubkey_hash(), Network::Bitcoin);

    Ok(BitcoinKeyData {
        private_key_hex: hex::encode(scalar),
        private_key_wif: private_key.to_wif(),
        public_key_hex: hex::encode(public_key.to_bytes()),
        address: address.to_string(),
    })
}

/// Build the keypair for a hex-encoded private key.
///
/// # Example
/// ```
/// use passmill_core::bitcoin_keys::keypair_from_hex;
/// let one = format!("{:0>64}", "1");
/// let keys = keypair_from_hex(&one).unwrap();
/// assert_eq!(keys.address, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
/// ```
pub fn keypair_from_hex(private_key_hex: &str) -> Result<BitcoinKeyData, KeyError> {
    let bytes = Zeroizing::new(
        hex::decode(private_key_hex.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?,
    );
    let scalar: Zeroizing<[u8; 32]> = Zeroizing::new(
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?,
    );
    keypair_from_scalar(&scalar)
}
