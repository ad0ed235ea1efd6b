//! Request → result orchestration
//!
//! ```text
//! DerivationRequest ─► pipeline check ─► entropy gate ─► KDF ─┬─► password
//!                                                            └─► bitcoin keys (wallet)
//! ```
//!
//! [`Deriver::derive`] reports every failure as a [`DeriveError`].
//! [`Deriver::process`] folds rejections (invalid input, weak passphrase)
//! into `Ok(None)`; external-library failures still surface as `Err`.

use crate::bitcoin_keys::{keypair_from_scalar, BitcoinKeyData, KeyError};
use crate::encoder::encode_password;
use crate::entropy::{EntropyGate, EstimatorError, GateError, HeuristicEstimator, StrengthEstimator};
use crate::pipeline::{KdfError, PipelineVersion};
use crate::request::{DerivationRequest, Mode, RequestForm, ValidationError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Passphrase too weak: score {score} of {required} required")]
    EntropyTooLow { score: u8, required: u8 },
    #[error(transparent)]
    Estimator(#[from] EstimatorError),
    #[error(transparent)]
    Kdf(#[from] KdfError),
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl DeriveError {
    /// Whether this is an ordinary refusal to derive rather than a failure
    /// of one of the underlying libraries.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::EntropyTooLow { .. })
    }
}

impl From<GateError> for DeriveError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::TooWeak { score, required } => Self::EntropyTooLow { score, required },
            GateError::Estimator(e) => Self::Estimator(e),
        }
    }
}

/// One derivation's output. Secret fields are zeroized on drop.
#[derive(Serialize, Zeroize, ZeroizeOnDrop)]
pub struct DerivationResult {
    #[zeroize(skip)]
    pub mode: Mode,
    #[zeroize(skip)]
    pub pipeline: PipelineVersion,
    pub identity: String,
    /// Canonical host, web mode only
    pub host: Option<String>,
    pub version: Option<u32>,
    pub extra_salt: String,
    pub password: String,
    /// Estimated bits of the passphrase
    pub passphrase_entropy: f64,
    /// Estimated bits of the generated password
    pub password_entropy: f64,
    /// Wallet mode only
    pub bitcoin: Option<BitcoinKeyData>,
}

impl fmt::Debug for DerivationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationResult")
            .field("mode", &self.mode)
            .field("pipeline", &self.pipeline)
            .field("identity", &self.identity)
            .field("host", &self.host)
            .field("version", &self.version)
            .field("extra_salt", &self.extra_salt)
            .field("password", &"<redacted>")
            .field("passphrase_entropy", &self.passphrase_entropy)
            .field("password_entropy", &self.password_entropy)
            .field("bitcoin", &self.bitcoin)
            .finish()
    }
}

/// Runs derivations with one pipeline version and one strength estimator.
///
/// Holds no per-call state; a single `Deriver` can serve any number of
/// requests.
#[derive(Debug, Clone)]
pub struct Deriver<E = HeuristicEstimator> {
    estimator: E,
    pipeline: PipelineVersion,
    gate: EntropyGate,
}

impl Default for Deriver<HeuristicEstimator> {
    fn default() -> Self {
        Self::new(HeuristicEstimator::default(), PipelineVersion::default())
    }
}

impl<E: StrengthEstimator> Deriver<E> {
    pub fn new(estimator: E, pipeline: PipelineVersion) -> Self {
        Self {
            estimator,
            pipeline,
            gate: EntropyGate,
        }
    }

    pub fn pipeline(&self) -> PipelineVersion {
        self.pipeline
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Derive the secrets for `request`.
    pub fn derive(&self, request: &DerivationRequest) -> Result<DerivationResult, DeriveError> {
        self.pipeline.check(request)?;

        let known_inputs = request.known_inputs();
        let passphrase_estimate = self
            .gate
            .check(&self.estimator, request.passphrase(), &known_inputs)?;

        let material = self.pipeline.derive_key_material(request)?;
        let password = encode_password(material.password_segment());

        let password_estimate = self.estimator.score_and_estimate(&password, &known_inputs)?;

        let bitcoin = match material.bitcoin_segment() {
            Some(segment) => Some(keypair_from_scalar(segment)?),
            None => None,
        };

        log::info!(
            "Derived {} secret for {:?} with pipeline {}{}",
            request.mode(),
            request.identity(),
            self.pipeline,
            if bitcoin.is_some() { " (with bitcoin key)" } else { "" }
        );

        Ok(DerivationResult {
            mode: request.mode(),
            pipeline: self.pipeline,
            identity: request.identity().to_string(),
            host: request.host().map(str::to_string),
            version: request.version(),
            extra_salt: request.extra_salt().to_string(),
            password,
            passphrase_entropy: passphrase_estimate.entropy_bits,
            password_entropy: password_estimate.entropy_bits,
            bitcoin,
        })
    }

    /// Like [`derive`](Self::derive), but a rejected request yields `Ok(None)`.
    pub fn process(&self, request: &DerivationRequest) -> Result<Option<DerivationResult>, DeriveError> {
        match self.derive(request) {
            Ok(result) => Ok(Some(result)),
            Err(e) if e.is_rejection() => {
                log::debug!("Derivation rejected: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Validate a loose form and process it.
    pub fn process_form(
        &self,
        form: &RequestForm,
        passphrase: &str,
    ) -> Result<Option<DerivationResult>, DeriveError> {
        match form.into_request(passphrase) {
            Ok(request) => self.process(&request),
            Err(e) => {
                log::debug!("Derivation rejected: {}", e);
                Ok(None)
            }
        }
    }
}
