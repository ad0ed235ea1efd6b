//! Key derivation pipeline
//!
//! ```text
//! identity_hash = SHA-512(identity)
//! master_key    = HMAC(passphrase material, identity_hash)
//! context       = identity "@" host [":v" version] [":" extra_salt]
//! kd_salt       = SHA-512(context)
//! key_material  = KDF(master_key, kd_salt)
//! ```
//!
//! Every public field ends up in the KDF salt, so changing any one of them
//! changes the output.
//!
//! # Pipeline versions
//!
//! Each version fixes its primitives and constants forever. Changing any of
//! them changes every derived secret, so new behaviour gets a new version.
//!
//! | Version | HMAC key            | KDF                           | Wallet |
//! |---------|---------------------|-------------------------------|--------|
//! | V1      | passphrase          | PBKDF2-HMAC-SHA256 ×25 000    | no     |
//! | V2      | passphrase          | scrypt N=2^14 r=8 p=1         | version required |
//! | V3      | SHA-512(passphrase) | scrypt N=2^14 r=8 p=1         | version optional |
//!
//! HMAC hashes keys longer than its block (128 bytes for SHA-512), so under
//! V2 such a passphrase and its own SHA-512 digest derive identical secrets.
//! V3 always keys with the digest.

use crate::memory::LockedBuffer;
use crate::request::{DerivationRequest, Mode, ValidationError};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

/// scrypt cost: N = 2^14, about 16 MiB of memory with r = 8.
pub const SCRYPT_LOG_N: u8 = 14;
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;

pub const PBKDF2_ROUNDS: u32 = 25_000;

/// Bytes of key material per consumer (password, Bitcoin key).
pub const SEGMENT_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum KdfError {
    #[error("Invalid KDF parameters: {0}")]
    InvalidParams(String),
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),
}

/// The KDF stage and its fixed constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfFamily {
    /// HMAC-SHA-256 master key, PBKDF2-HMAC-SHA256 stretch. Password only.
    Pbkdf2HmacSha256 { rounds: u32 },
    /// HMAC-SHA-512 master key, scrypt stretch.
    ScryptHmacSha512 { log_n: u8, r: u32, p: u32 },
}

/// Everything that distinguishes one pipeline version from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineParams {
    pub family: KdfFamily,
    /// Use SHA-512(passphrase) rather than the raw passphrase as HMAC key.
    pub prehash_passphrase: bool,
    pub supports_wallet: bool,
    /// Wallet requests without a version are rejected.
    pub wallet_requires_version: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVersion {
    V1,
    V2,
    #[default]
    V3,
}

impl PipelineVersion {
    pub const ALL: [PipelineVersion; 3] = [Self::V1, Self::V2, Self::V3];

    pub const fn params(self) -> PipelineParams {
        match self {
            Self::V1 => PipelineParams {
                family: KdfFamily::Pbkdf2HmacSha256 {
                    rounds: PBKDF2_ROUNDS,
                },
                prehash_passphrase: false,
                supports_wallet: false,
                wallet_requires_version: false,
            },
            Self::V2 => PipelineParams {
                family: KdfFamily::ScryptHmacSha512 {
                    log_n: SCRYPT_LOG_N,
                    r: SCRYPT_R,
                    p: SCRYPT_P,
                },
                prehash_passphrase: false,
                supports_wallet: true,
                wallet_requires_version: true,
            },
            Self::V3 => PipelineParams {
                family: KdfFamily::ScryptHmacSha512 {
                    log_n: SCRYPT_LOG_N,
                    r: SCRYPT_R,
                    p: SCRYPT_P,
                },
                prehash_passphrase: true,
                supports_wallet: true,
                wallet_requires_version: false,
            },
        }
    }

    /// Reject requests this version cannot serve.
    pub fn check(self, request: &DerivationRequest) -> Result<(), ValidationError> {
        let params = self.params();
        if request.mode() != Mode::Wallet {
            return Ok(());
        }
        if !params.supports_wallet {
            return Err(ValidationError::UnsupportedMode {
                mode: Mode::Wallet,
                pipeline: self.to_string(),
            });
        }
        if params.wallet_requires_version && request.version().is_none() {
            return Err(ValidationError::MissingVersion(Mode::Wallet));
        }
        Ok(())
    }

    /// KDF output length: one segment for a password, two when a Bitcoin key
    /// is derived as well.
    pub fn output_len(self, mode: Mode) -> usize {
        if mode == Mode::Wallet && self.params().supports_wallet {
            2 * SEGMENT_LEN
        } else {
            SEGMENT_LEN
        }
    }

    /// Run the whole pipeline for an already-checked request.
    pub fn derive_key_material(self, request: &DerivationRequest) -> Result<KeyMaterial, KdfError> {
        let params = self.params();
        let context = Zeroizing::new(context_string(
            request.identity(),
            request.host(),
            request.version(),
            request.extra_salt(),
        ));
        let output_len = self.output_len(request.mode());

        log::debug!(
            "Deriving {} bytes with pipeline {} for {} mode",
            output_len,
            self,
            request.mode()
        );

        let id_hash = identity_hash(request.identity());
        let master = master_key(&params, request.passphrase(), &id_hash)?;
        let salt = kd_salt(&context);

        let mut raw = LockedBuffer::new(output_len);
        stretch(&params.family, &master, &salt[..], raw.as_mut_slice())?;

        KeyMaterial::from_raw(raw.as_slice())
    }
}

impl fmt::Display for PipelineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
            Self::V3 => write!(f, "v3"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown pipeline version: {0:?} (expected v1, v2 or v3)")]
pub struct UnknownPipeline(pub String);

impl FromStr for PipelineVersion {
    type Err = UnknownPipeline;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Self::V1),
            "v2" | "2" => Ok(Self::V2),
            "v3" | "3" => Ok(Self::V3),
            other => Err(UnknownPipeline(other.to_string())),
        }
    }
}

/// Build the context string hashed into the KDF salt.
///
/// The host is empty outside web mode; the version segment is dropped when
/// there is no version and the salt segment when the salt is empty.
pub fn context_string(identity: &str, host: Option<&str>, version: Option<u32>, extra_salt: &str) -> String {
    let mut context = format!("{}@{}", identity, host.unwrap_or(""));
    if let Some(version) = version {
        context.push_str(&format!(":v{}", version));
    }
    if !extra_salt.is_empty() {
        context.push(':');
        context.push_str(extra_salt);
    }
    context
}

/// SHA-512 of the lowercased identity.
pub fn identity_hash(identity: &str) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Sha512::digest(identity.as_bytes()));
    out
}

/// SHA-512 of the context string.
pub fn kd_salt(context: &str) -> Zeroizing<[u8; 64]> {
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&Sha512::digest(context.as_bytes()));
    out
}

/// HMAC the identity hash under the passphrase (or its SHA-512).
///
/// 64 bytes for the scrypt family, 32 for PBKDF2.
pub fn master_key(
    params: &PipelineParams,
    passphrase: &str,
    identity_hash: &[u8; 64],
) -> Result<Zeroizing<Vec<u8>>, KdfError> {
    let key: Zeroizing<Vec<u8>> = if params.prehash_passphrase {
        Zeroizing::new(Sha512::digest(passphrase.as_bytes()).to_vec())
    } else {
        Zeroizing::new(passphrase.as_bytes().to_vec())
    };

    let tag = match params.family {
        KdfFamily::Pbkdf2HmacSha256 { .. } => {
            let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&key)
                .map_err(|e| KdfError::InvalidParams(e.to_string()))?;
            mac.update(identity_hash);
            mac.finalize().into_bytes().to_vec()
        }
        KdfFamily::ScryptHmacSha512 { .. } => {
            let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(&key)
                .map_err(|e| KdfError::InvalidParams(e.to_string()))?;
            mac.update(identity_hash);
            mac.finalize().into_bytes().to_vec()
        }
    };

    Ok(Zeroizing::new(tag))
}

/// The expensive stage. Fills `out` completely.
fn stretch(family: &KdfFamily, master: &[u8], salt: &[u8], out: &mut [u8]) -> Result<(), KdfError> {
    match *family {
        KdfFamily::Pbkdf2HmacSha256 { rounds } => {
            pbkdf2::pbkdf2_hmac::<Sha256>(master, salt, rounds, out);
            Ok(())
        }
        KdfFamily::ScryptHmacSha512 { log_n, r, p } => {
            let params = scrypt::Params::new(log_n, r, p, out.len())
                .map_err(|e| KdfError::InvalidParams(format!("scrypt: {}", e)))?;
            scrypt::scrypt(master, salt, &params, out)
                .map_err(|e| KdfError::DerivationFailed(format!("scrypt: {}", e)))
        }
    }
}

/// Derived bytes split into their consumers. Zeroized on drop.
pub struct KeyMaterial {
    password: Zeroizing<[u8; SEGMENT_LEN]>,
    bitcoin: Option<Zeroizing<[u8; SEGMENT_LEN]>>,
}

impl KeyMaterial {
    /// First segment feeds the password, the optional second the Bitcoin key.
    pub fn from_raw(raw: &[u8]) -> Result<Self, KdfError> {
        let mut password = Zeroizing::new([0u8; SEGMENT_LEN]);
        let bitcoin = match raw.len() {
            SEGMENT_LEN => None,
            len if len == 2 * SEGMENT_LEN => {
                let mut segment = Zeroizing::new([0u8; SEGMENT_LEN]);
                segment.copy_from_slice(&raw[SEGMENT_LEN..]);
                Some(segment)
            }
            other => {
                return Err(KdfError::DerivationFailed(format!(
                    "unexpected key material length {}",
                    other
                )))
            }
        };
        password.copy_from_slice(&raw[..SEGMENT_LEN]);
        Ok(Self { password, bitcoin })
    }

    pub fn password_segment(&self) -> &[u8; SEGMENT_LEN] {
        &self.password
    }

    pub fn bitcoin_segment(&self) -> Option<&[u8; SEGMENT_LEN]> {
        self.bitcoin.as_deref()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("password", &"<redacted>")
            .field("bitcoin", &self.bitcoin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
