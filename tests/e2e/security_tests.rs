//! Security-specific tests.
//!
//! These tests verify:
//! 1. No failure path produces a placeholder secret
//! 2. Secrets stay out of Debug output
//! 3. Secret containers are wiped
//! 4. Malformed inputs don't panic
//! 5. Invalid scalars are refused by the key deriver

use passmill_core::bitcoin_keys::{keypair_from_hex, keypair_from_scalar, KeyError};
use passmill_core::entropy::{EstimatorError, PasswordStrength, StrengthEstimate, StrengthEstimator};
use passmill_core::memory::LockedBuffer;
use passmill_core::pipeline::{KeyMaterial, PipelineVersion};
use passmill_core::{host_of, DerivationRequest, DeriveError, Deriver, RequestForm};
use zeroize::Zeroize;

const PASSPHRASE: &str = "correct horse battery staple";

/// Estimator that accepts everything; isolates the pipeline from the gate.
struct AcceptAll;

impl StrengthEstimator for AcceptAll {
    fn score_and_estimate(&self, _: &str, _: &[String]) -> Result<StrengthEstimate, EstimatorError> {
        Ok(StrengthEstimate {
            score: 4,
            entropy_bits: 256.0,
            strength: PasswordStrength::Excellent,
            warnings: Vec::new(),
        })
    }
}

// ============================================================================
// 1. No placeholder secrets
// ============================================================================

#[test]
fn test_rejections_never_return_a_password() {
    let deriver = Deriver::default();
    let weak = DerivationRequest::web("password", "alice", "www.example.com", "1", "").unwrap();

    match deriver.derive(&weak) {
        Err(DeriveError::EntropyTooLow { score, required }) => {
            assert!(score < required);
        }
        other => panic!("expected EntropyTooLow, got {:?}", other.map(|r| r.mode)),
    }
}

#[test]
fn test_estimator_failure_is_not_a_rejection() {
    struct Broken;
    impl StrengthEstimator for Broken {
        fn score_and_estimate(&self, _: &str, _: &[String]) -> Result<StrengthEstimate, EstimatorError> {
            Err(EstimatorError::Failed("offline".into()))
        }
    }

    let request = DerivationRequest::app(PASSPHRASE, "myapp", "1", "").unwrap();
    let err = Deriver::new(Broken, PipelineVersion::V3).process(&request).unwrap_err();
    assert!(!err.is_rejection());
}

#[test]
fn test_gate_runs_before_any_derivation() {
    // With the gate satisfied the same request derives, so a rejection can
    // only come from the gate itself.
    let request = DerivationRequest::web("hunter2 hunter2", "alice", "www.example.com", "1", "").unwrap();
    assert!(Deriver::default().process(&request).unwrap().is_none());
    assert!(Deriver::new(AcceptAll, PipelineVersion::V3)
        .process(&request)
        .unwrap()
        .is_some());
}

// ============================================================================
// 2. Debug output
// ============================================================================

#[test]
fn test_request_debug_redacts_passphrase() {
    let request = DerivationRequest::web(PASSPHRASE, "alice", "www.example.com", "1", "").unwrap();
    let debug = format!("{:?}", request);
    assert!(!debug.contains("horse"));
    assert!(debug.contains("alice"));
}

#[test]
fn test_result_debug_redacts_secrets() {
    let request = DerivationRequest::wallet(PASSPHRASE, "savings", None, "").unwrap();
    let result = Deriver::default().derive(&request).unwrap();
    let debug = format!("{:?}", result);

    assert!(!debug.contains(&result.password));
    let keys = result.bitcoin.as_ref().unwrap();
    assert!(!debug.contains(&keys.private_key_hex));
    assert!(!debug.contains(&keys.private_key_wif));
    assert!(debug.contains(&keys.address));
}

#[test]
fn test_key_material_debug_redacted() {
    let material = KeyMaterial::from_raw(&[0x5A; 64]).unwrap();
    let debug = format!("{:?}", material);
    assert!(!debug.contains("90"));
}

// ============================================================================
// 3. Wiping
// ============================================================================

#[test]
fn test_bitcoin_key_data_zeroize() {
    let mut keys = keypair_from_hex("a9b736d87e7bc0886e74e9ec28d7627eadf0bdb01bf098119fbc7152820e1889").unwrap();
    keys.zeroize();
    assert!(keys.private_key_hex.is_empty());
    assert!(keys.private_key_wif.is_empty());
    assert!(keys.address.is_empty());
}

#[test]
fn test_result_zeroize_clears_secrets() {
    let request = DerivationRequest::wallet(PASSPHRASE, "savings", None, "").unwrap();
    let mut result = Deriver::default().derive(&request).unwrap();
    result.zeroize();

    assert!(result.password.is_empty());
    assert!(result.identity.is_empty());
    assert!(result.bitcoin.is_none());
}

#[test]
fn test_locked_buffer_sizes() {
    for len in [0, 32, 64, 4096] {
        let buf = LockedBuffer::new(len);
        assert_eq!(buf.len(), len);
        assert!(buf.as_slice().iter().all(|&b| b == 0));
    }
}

// ============================================================================
// 4. Malformed inputs
// ============================================================================

#[test]
fn test_hostile_uris_do_not_panic() {
    let inputs = [
        "",
        ":",
        "://",
        "////",
        "http://",
        "http://@",
        "http://:80",
        "http://[::1]/",
        "http://user@:pass@host/",
        "\u{0}\u{1}\u{2}",
        "http://例え.テスト/",
        "http://ex\u{301}ample.com/",
        "ftp://a.b.c.d.e.f.g.h.i.j.k.l.m.n.o.p.q.r.s.t.u.v.w.x.y.z",
    ];
    for input in inputs {
        let _ = host_of(input);
    }

    let long = format!("https://{}.com/", "a".repeat(10_000));
    assert_eq!(host_of(&long), None);
}

#[test]
fn test_hostile_forms_do_not_panic() {
    let deriver = Deriver::new(AcceptAll, PipelineVersion::V3);
    let versions = ["", "0", "-0", "+1", "99999999999999999999", "1e3", "٣"];
    for version in versions {
        let form: RequestForm = serde_json::from_value(serde_json::json!({
            "mode": "app",
            "identity": "myapp",
            "version": version,
        }))
        .unwrap();
        let _ = deriver.process_form(&form, PASSPHRASE);
    }
}

#[test]
fn test_unicode_identity_is_deterministic() {
    let deriver = Deriver::new(AcceptAll, PipelineVersion::V3);
    let a = DerivationRequest::app(PASSPHRASE, "ÉCOLE", "1", "").unwrap();
    let b = DerivationRequest::app(PASSPHRASE, "école", "1", "").unwrap();

    let a = deriver.derive(&a).unwrap();
    let b = deriver.derive(&b).unwrap();
    assert_eq!(a.identity, "école");
    assert_eq!(a.password, b.password);
}

// ============================================================================
// 5. Scalar validation
// ============================================================================

#[test]
fn test_curve_order_boundary() {
    // n - 1 is the largest valid scalar, n itself is invalid.
    let n_minus_1 = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140";
    let n = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

    assert!(keypair_from_hex(n_minus_1).is_ok());
    assert!(matches!(keypair_from_hex(n), Err(KeyError::InvalidScalar)));
}

#[test]
fn test_zero_scalar_refused() {
    assert!(matches!(keypair_from_scalar(&[0u8; 32]), Err(KeyError::InvalidScalar)));
}
