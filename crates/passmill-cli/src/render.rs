//! Output formatting for derivation results.

use anyhow::{Context, Result};
use passmill_core::{BitcoinKeyData, DerivationResult, Mode, PipelineVersion};
use serde::Serialize;
use std::fmt::Write;
use zeroize::Zeroizing;

/// Human-readable block, one `label: value` per line.
pub fn render_text(result: &DerivationResult, show_entropy: bool) -> Zeroizing<String> {
    let mut out = Zeroizing::new(String::new());

    // Writing to a String cannot fail.
    let _ = writeln!(out, "mode:       {}", result.mode);
    let _ = writeln!(out, "pipeline:   {}", result.pipeline);
    let _ = writeln!(out, "identity:   {}", result.identity);
    if let Some(host) = &result.host {
        let _ = writeln!(out, "host:       {}", host);
    }
    if let Some(version) = result.version {
        let _ = writeln!(out, "version:    {}", version);
    }
    if !result.extra_salt.is_empty() {
        let _ = writeln!(out, "salt:       {}", result.extra_salt);
    }
    let _ = writeln!(out, "password:   {}", result.password);
    if show_entropy {
        let _ = writeln!(
            out,
            "entropy:    passphrase {:.1} bits, password {:.1} bits",
            result.passphrase_entropy, result.password_entropy
        );
    }
    if let Some(keys) = &result.bitcoin {
        let _ = writeln!(out, "bitcoin:");
        let _ = writeln!(out, "  private key (hex): {}", keys.private_key_hex);
        let _ = writeln!(out, "  private key (WIF): {}", keys.private_key_wif);
        let _ = writeln!(out, "  public key:        {}", keys.public_key_hex);
        let _ = writeln!(out, "  address:           {}", keys.address);
    }

    out
}

/// Borrowed view of a result, serialized without an intermediate copy.
#[derive(Serialize)]
struct JsonView<'a> {
    mode: Mode,
    pipeline: PipelineVersion,
    identity: &'a str,
    host: Option<&'a str>,
    version: Option<u32>,
    extra_salt: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    passphrase_entropy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_entropy: Option<f64>,
    bitcoin: Option<&'a BitcoinKeyData>,
}

impl<'a> JsonView<'a> {
    fn new(result: &'a DerivationResult, show_entropy: bool) -> Self {
        Self {
            mode: result.mode,
            pipeline: result.pipeline,
            identity: &result.identity,
            host: result.host.as_deref(),
            version: result.version,
            extra_salt: &result.extra_salt,
            password: &result.password,
            passphrase_entropy: show_entropy.then_some(result.passphrase_entropy),
            password_entropy: show_entropy.then_some(result.password_entropy),
            bitcoin: result.bitcoin.as_ref(),
        }
    }
}

/// Pretty-printed JSON object.
pub fn render_json(result: &DerivationResult, show_entropy: bool) -> Result<Zeroizing<String>> {
    let rendered = serde_json::to_string_pretty(&JsonView::new(result, show_entropy))
        .context("Failed to serialize result")?;
    Ok(Zeroizing::new(rendered))
}
