//! Passmill Core
//!
//! Deterministic passwords and Bitcoin keys from one passphrase.
//!
//! # Derivation
//!
//! From a passphrase plus public context (identity, site host, version,
//! optional extra salt):
//! - Web: a password for `username` at a site's host
//! - App: a password for an application name
//! - Wallet: a password and a mainnet Bitcoin keypair
//!
//! The same inputs always give the same outputs and nothing is stored. A
//! passphrase has to reach the top strength score before anything is
//! derived.
//!
//! ```no_run
//! use passmill_core::{DerivationRequest, Deriver};
//!
//! let request = DerivationRequest::web(
//!     "correct horse battery staple",
//!     "alice",
//!     "https://www.example.com/login",
//!     "1",
//!     "",
//! )?;
//! if let Some(result) = Deriver::default().process(&request)? {
//!     println!("{}", result.password);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bitcoin_keys;
pub mod derive;
pub mod encoder;
pub mod entropy;
pub mod host;
pub mod memory;
pub mod pipeline;
pub mod request;

pub use bitcoin_keys::{keypair_from_hex, keypair_from_scalar, BitcoinKeyData, KeyError};
pub use derive::{DerivationResult, DeriveError, Deriver};
pub use encoder::encode_password;
pub use entropy::{
    EntropyGate, EstimatorError, HeuristicEstimator, PasswordStrength, StrengthEstimate, StrengthEstimator,
    DEFAULT_WEAK_TERMS, MAX_SCORE,
};
pub use host::host_of;
pub use pipeline::{KdfError, PipelineVersion};
pub use request::{parse_version, DerivationRequest, Mode, RequestForm, Target, ValidationError};
