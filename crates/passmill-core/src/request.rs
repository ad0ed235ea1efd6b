//! Derivation requests
//!
//! A [`DerivationRequest`] is the normalized, validated form of what a user
//! typed. Every constructor trims all fields, lowercases the identity and the
//! site URI, parses the version and resolves the web host, so an invalid
//! request cannot be built and the pipeline never sees one.
//!
//! [`RequestForm`] is the loose field bag that front-ends (the CLI, a config
//! file, a UI) collect before a mode-specific constructor is picked.

use crate::host::host_of;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

/// Which kind of secret is being derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Website password: username + site
    Web,
    /// Application password: app name
    App,
    /// Bitcoin keypair: wallet name
    Wallet,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Web => write!(f, "web"),
            Mode::App => write!(f, "app"),
            Mode::Wallet => write!(f, "wallet"),
        }
    }
}

impl FromStr for Mode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Mode::Web),
            "app" => Ok(Mode::App),
            "wallet" | "btc" => Ok(Mode::Wallet),
            other => Err(ValidationError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Passphrase is empty")]
    EmptyPassphrase,
    #[error("{0} mode requires a non-empty identity")]
    EmptyIdentity(Mode),
    #[error("Site has no valid domain or IPv4 host: {0:?}")]
    InvalidHost(String),
    #[error("Version is not a number: {0:?}")]
    InvalidVersion(String),
    #[error("Version must be >= 1, got {0}")]
    NonPositiveVersion(i64),
    #[error("{0} mode requires a version")]
    MissingVersion(Mode),
    #[error("Unknown mode: {0:?}")]
    UnknownMode(String),
    #[error("{mode} mode is not supported by pipeline {pipeline}")]
    UnsupportedMode { mode: Mode, pipeline: String },
}

/// Mode-specific, already-normalized request fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Web {
        username: String,
        site_uri: String,
        host: String,
        version: u32,
    },
    App {
        app_name: String,
        version: u32,
    },
    Wallet {
        wallet_name: String,
        version: Option<u32>,
    },
}

/// A validated derivation request.
///
/// The passphrase is trimmed but never case-folded, and is zeroized when the
/// request is dropped.
#[derive(Clone)]
pub struct DerivationRequest {
    passphrase: Zeroizing<String>,
    target: Target,
    extra_salt: String,
}

impl DerivationRequest {
    /// Web-mode request. Fails unless `site_uri` resolves to a valid host.
    pub fn web(
        passphrase: &str,
        username: &str,
        site_uri: &str,
        version: &str,
        extra_salt: &str,
    ) -> Result<Self, ValidationError> {
        let passphrase = normalize_passphrase(passphrase)?;
        let username = normalize_identity(username, Mode::Web)?;
        let site_uri = site_uri.trim().to_lowercase();
        let host = host_of(&site_uri).ok_or_else(|| ValidationError::InvalidHost(site_uri.clone()))?;
        let version = parse_version(version)?;

        Ok(Self {
            passphrase,
            target: Target::Web {
                username,
                site_uri,
                host,
                version,
            },
            extra_salt: extra_salt.trim().to_string(),
        })
    }

    /// App-mode request.
    pub fn app(
        passphrase: &str,
        app_name: &str,
        version: &str,
        extra_salt: &str,
    ) -> Result<Self, ValidationError> {
        let passphrase = normalize_passphrase(passphrase)?;
        let app_name = normalize_identity(app_name, Mode::App)?;
        let version = parse_version(version)?;

        Ok(Self {
            passphrase,
            target: Target::App { app_name, version },
            extra_salt: extra_salt.trim().to_string(),
        })
    }

    /// Wallet-mode request. Whether a missing version is acceptable is up to
    /// the pipeline version (see `PipelineVersion::check`).
    pub fn wallet(
        passphrase: &str,
        wallet_name: &str,
        version: Option<&str>,
        extra_salt: &str,
    ) -> Result<Self, ValidationError> {
        let passphrase = normalize_passphrase(passphrase)?;
        let wallet_name = normalize_identity(wallet_name, Mode::Wallet)?;
        let version = version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(parse_version)
            .transpose()?;

        Ok(Self {
            passphrase,
            target: Target::Wallet {
                wallet_name,
                version,
            },
            extra_salt: extra_salt.trim().to_string(),
        })
    }

    pub fn mode(&self) -> Mode {
        match self.target {
            Target::Web { .. } => Mode::Web,
            Target::App { .. } => Mode::App,
            Target::Wallet { .. } => Mode::Wallet,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Username, app name or wallet name, lowercased.
    pub fn identity(&self) -> &str {
        match &self.target {
            Target::Web { username, .. } => username,
            Target::App { app_name, .. } => app_name,
            Target::Wallet { wallet_name, .. } => wallet_name,
        }
    }

    /// Canonical host; only web requests have one.
    pub fn host(&self) -> Option<&str> {
        match &self.target {
            Target::Web { host, .. } => Some(host),
            _ => None,
        }
    }

    pub fn version(&self) -> Option<u32> {
        match self.target {
            Target::Web { version, .. } | Target::App { version, .. } => Some(version),
            Target::Wallet { version, .. } => version,
        }
    }

    pub fn extra_salt(&self) -> &str {
        &self.extra_salt
    }

    pub(crate) fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Non-secret values the user typed, for the strength estimator to
    /// penalize if the passphrase merely echoes them.
    pub fn known_inputs(&self) -> Vec<String> {
        let mut inputs = vec![self.identity().to_string()];
        if let Target::Web { site_uri, host, .. } = &self.target {
            inputs.push(site_uri.clone());
            if host != site_uri {
                inputs.push(host.clone());
            }
        }
        inputs.push(self.extra_salt.clone());
        inputs.retain(|s| !s.is_empty());
        inputs
    }
}

impl fmt::Debug for DerivationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationRequest")
            .field("passphrase", &"<redacted>")
            .field("target", &self.target)
            .field("extra_salt", &self.extra_salt)
            .finish()
    }
}

fn normalize_passphrase(passphrase: &str) -> Result<Zeroizing<String>, ValidationError> {
    let trimmed = passphrase.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyPassphrase);
    }
    Ok(Zeroizing::new(trimmed.to_string()))
}

fn normalize_identity(identity: &str, mode: Mode) -> Result<String, ValidationError> {
    let normalized = identity.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ValidationError::EmptyIdentity(mode));
    }
    Ok(normalized)
}

/// Parse a version field. Only whole numbers >= 1 are accepted.
pub fn parse_version(raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::InvalidVersion(trimmed.to_string()))?;
    if value < 1 {
        return Err(ValidationError::NonPositiveVersion(value));
    }
    u32::try_from(value).map_err(|_| ValidationError::InvalidVersion(trimmed.to_string()))
}

/// Loosely typed request fields as a front-end collects them.
///
/// `identity` holds the username, app name or wallet name depending on
/// `mode`; `site` is only read in web mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestForm {
    pub mode: Option<Mode>,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub salt: String,
}

impl RequestForm {
    /// Pick the constructor for `mode` and build a validated request.
    pub fn into_request(&self, passphrase: &str) -> Result<DerivationRequest, ValidationError> {
        let mode = self
            .mode
            .ok_or_else(|| ValidationError::UnknownMode(String::new()))?;
        let version = self.version.as_deref().map(str::trim).filter(|v| !v.is_empty());

        match mode {
            Mode::Web => DerivationRequest::web(
                passphrase,
                &self.identity,
                &self.site,
                version.ok_or(ValidationError::MissingVersion(Mode::Web))?,
                &self.salt,
            ),
            Mode::App => DerivationRequest::app(
                passphrase,
                &self.identity,
                version.ok_or(ValidationError::MissingVersion(Mode::App))?,
                &self.salt,
            ),
            Mode::Wallet => DerivationRequest::wallet(passphrase, &self.identity, version, &self.salt),
        }
    }
}
