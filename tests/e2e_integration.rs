//! End-to-end integration test for Passmill.
//!
//! Drives complete derivations through the public API, from raw user input to
//! the final password and Bitcoin keys. Exercises:
//!
//! 1. Known-answer vectors for every pipeline version and mode
//! 2. Determinism and input normalization
//! 3. Sensitivity to every public field
//! 4. Entropy gate and validation rejections
//! 5. Password policy
//!
//! Run with: cargo test --test e2e_integration

use passmill_core::encoder::{PASSWORD_LEN, SYMBOLS};
use passmill_core::{
    DerivationRequest, DerivationResult, DeriveError, Deriver, HeuristicEstimator, Mode, PipelineVersion,
    RequestForm, ValidationError,
};

const PASSPHRASE: &str = "correct horse battery staple";

fn deriver(pipeline: PipelineVersion) -> Deriver {
    Deriver::new(HeuristicEstimator::default(), pipeline)
}

fn web(user: &str, site: &str, version: &str, salt: &str) -> DerivationResult {
    let request = DerivationRequest::web(PASSPHRASE, user, site, version, salt).unwrap();
    Deriver::default().process(&request).unwrap().expect("derivation accepted")
}

// ============================================================================
// 1. Known-answer vectors
// ============================================================================

#[test]
fn test_v3_web_vector() {
    let result = web("alice", "https://www.example.com/login", "1", "");
    assert_eq!(result.password, "Ob0Pr/g6Va/uIKcvEe&2");
    assert_eq!(result.pipeline, PipelineVersion::V3);
    assert_eq!(result.mode, Mode::Web);
}

#[test]
fn test_v3_web_ipv4_with_salt_vector() {
    let result = web("bob", "http://127.0.0.1/admin", "3", "s3cr3t-token");
    assert_eq!(result.password, "2f9hqyXjlgk+02lJyc%6");
    assert_eq!(result.host.as_deref(), Some("127.0.0.1"));
    assert_eq!(result.extra_salt, "s3cr3t-token");
}

#[test]
fn test_v2_web_vector() {
    let request = DerivationRequest::web(PASSPHRASE, "alice", "https://www.example.com/login", "1", "").unwrap();
    let result = deriver(PipelineVersion::V2).process(&request).unwrap().unwrap();
    assert_eq!(result.password, "tSxqeza2E3dIF00WPg*6");
}

#[test]
fn test_v1_web_vector() {
    let request = DerivationRequest::web(PASSPHRASE, "alice", "https://www.example.com/login", "1", "").unwrap();
    let result = deriver(PipelineVersion::V1).process(&request).unwrap().unwrap();
    assert_eq!(result.password, "PHtDGGJXRHBLkHmqzC@9");
}

#[test]
fn test_v3_app_vector() {
    let request = DerivationRequest::app(PASSPHRASE, "myapp", "1", "").unwrap();
    let result = Deriver::default().process(&request).unwrap().unwrap();
    assert_eq!(result.password, "2h2ynlMRoZyT/W1U9a&8");
    assert_eq!(result.host, None);
    assert!(result.bitcoin.is_none());
}

#[test]
fn test_v3_wallet_vector() {
    let request = DerivationRequest::wallet(PASSPHRASE, "savings", None, "").unwrap();
    let result = Deriver::default().process(&request).unwrap().unwrap();

    assert_eq!(result.password, "Kh4EzOGGn/ad2+/OVx+9");
    let keys = result.bitcoin.as_ref().expect("wallet mode derives keys");
    assert_eq!(
        keys.private_key_hex,
        "a9b736d87e7bc0886e74e9ec28d7627eadf0bdb01bf098119fbc7152820e1889"
    );
    assert_eq!(
        keys.private_key_wif,
        "L2ucgS6nA2g4UzPoSa8DVxPmCixmHZ4SLTASgxyzngKgb4ZFYftT"
    );
    assert_eq!(
        keys.public_key_hex,
        "038eb32c6e38cbdf3de1dd5b4fc2c28bafdedd9d47eb1a24a9be2822934982bdfe"
    );
    assert_eq!(keys.address, "1PBLT5ph2XzomRtrvWwd9ijgrGLmjxgaAd");
}

#[test]
fn test_v2_wallet_vector() {
    let request = DerivationRequest::wallet(PASSPHRASE, "savings", Some("1"), "").unwrap();
    let result = deriver(PipelineVersion::V2).process(&request).unwrap().unwrap();

    assert_eq!(result.password, "6/0nZAcKo36MohhsC/*5");
    let keys = result.bitcoin.as_ref().unwrap();
    assert_eq!(
        keys.private_key_wif,
        "KwyufKG6QbA7uH2BjEC7Dac4DTUbew4qNkhQi1Xuzd2gcmLX9MiX"
    );
    assert_eq!(
        keys.public_key_hex,
        "0221361ec2bb732e8ad1fb68322db812bf56f67bd1ee73b997ed5110ccd96b6f4d"
    );
    assert_eq!(keys.address, "15DvMtusFym186pPhdjhB7xGMs9hhGngXV");
}

/// A wallet shares its password with the app of the same name and version:
/// the first 32 bytes of scrypt output do not depend on the output length.
#[test]
fn test_wallet_password_matches_app_password() {
    let app = DerivationRequest::app(PASSPHRASE, "myapp", "1", "").unwrap();
    let wallet = DerivationRequest::wallet(PASSPHRASE, "myapp", Some("1"), "").unwrap();

    let app_result = Deriver::default().process(&app).unwrap().unwrap();
    let wallet_result = Deriver::default().process(&wallet).unwrap().unwrap();

    assert_eq!(app_result.password, wallet_result.password);
    let keys = wallet_result.bitcoin.as_ref().unwrap();
    assert_eq!(
        keys.private_key_wif,
        "KxmAEdXkH2x4Q5BCbtcYRMpYiRH7TfSD67q9pSrjCoiDE52q8xdf"
    );
    assert_eq!(keys.address, "1MhuL6tYt719tCPSk2fmTADMnSPxd8LQas");
}

// ============================================================================
// 2. Determinism & normalization
// ============================================================================

#[test]
fn test_repeated_derivations_identical() {
    let request = DerivationRequest::wallet(PASSPHRASE, "savings", None, "").unwrap();
    let deriver = Deriver::default();

    let first = deriver.process(&request).unwrap().unwrap();
    let second = deriver.process(&request).unwrap().unwrap();

    assert_eq!(first.password, second.password);
    let (a, b) = (first.bitcoin.as_ref().unwrap(), second.bitcoin.as_ref().unwrap());
    assert_eq!(a.private_key_wif, b.private_key_wif);
    assert_eq!(a.address, b.address);
}

#[test]
fn test_case_and_whitespace_normalized() {
    let canonical = web("alice", "https://www.example.com/login", "1", "");
    let messy = web("  Alice ", " HTTPS://WWW.EXAMPLE.COM/Login ", " 1 ", "");

    assert_eq!(messy.identity, "alice");
    assert_eq!(messy.host.as_deref(), Some("www.example.com"));
    assert_eq!(canonical.password, messy.password);
}

#[test]
fn test_passphrase_is_trimmed_not_case_folded() {
    let padded = DerivationRequest::web(
        "  correct horse battery staple\n",
        "alice",
        "www.example.com",
        "1",
        "",
    )
    .unwrap();
    let shouting = DerivationRequest::web(
        "Correct Horse Battery Staple",
        "alice",
        "www.example.com",
        "1",
        "",
    )
    .unwrap();

    let deriver = Deriver::default();
    let padded = deriver.process(&padded).unwrap().unwrap();
    let shouting = deriver.process(&shouting).unwrap().unwrap();

    assert_eq!(padded.password, "Ob0Pr/g6Va/uIKcvEe&2");
    assert_ne!(shouting.password, padded.password);
}

#[test]
fn test_only_host_of_site_matters() {
    let a = web("alice", "https://www.example.com/login", "1", "");
    let b = web("alice", "http://www.example.com:8080/account?tab=2", "1", "");
    let c = web("alice", "www.example.com", "1", "");
    assert_eq!(a.password, b.password);
    assert_eq!(a.password, c.password);
}

// ============================================================================
// 3. Sensitivity
// ============================================================================

#[test]
fn test_every_public_field_changes_password() {
    let base = web("alice", "https://www.example.com/login", "1", "").password.clone();

    let variants = [
        web("alice", "https://www.example.com/login", "2", ""),
        web("alice", "https://www.example.com/login", "1", "x"),
        web("alice", "https://www.example.org/login", "1", ""),
        web("bob", "https://www.example.com/login", "1", ""),
    ];
    let expected = [
        "XPVcZ92roOfgDgzmrX+2",
        "8Bnh9CDGW3HZIB1p5F&0",
        "l48e9Hh1L6sJq5bruj@4",
        "eiFzwa2JylBeUwklOQ#9",
    ];

    for (variant, expected) in variants.iter().zip(expected) {
        assert_ne!(variant.password, base);
        assert_eq!(variant.password, expected);
    }
}

#[test]
fn test_one_character_salt_change() {
    let x = web("alice", "www.example.com", "1", "x");
    let y = web("alice", "www.example.com", "1", "y");
    assert_eq!(y.password, "yjPj7r7gwwCad+yK5Z+6");
    assert_ne!(x.password, y.password);
}

#[test]
fn test_app_and_web_contexts_differ() {
    let app = DerivationRequest::app(PASSPHRASE, "alice", "1", "").unwrap();
    let app = Deriver::default().process(&app).unwrap().unwrap();
    assert_eq!(app.password, "wZqDpf/eLOVOcxBglP&8");
    assert_ne!(app.password, web("alice", "www.example.com", "1", "").password);
}

#[test]
fn test_pipeline_versions_disagree() {
    let request = DerivationRequest::web(PASSPHRASE, "alice", "www.example.com", "1", "").unwrap();
    let passwords: Vec<String> = PipelineVersion::ALL
        .iter()
        .map(|v| deriver(*v).process(&request).unwrap().unwrap().password.clone())
        .collect();

    assert_ne!(passwords[0], passwords[1]);
    assert_ne!(passwords[1], passwords[2]);
    assert_ne!(passwords[0], passwords[2]);
}

// ============================================================================
// 4. Rejections
// ============================================================================

#[test]
fn test_weak_passphrase_yields_nothing() {
    for weak in ["password", "letmein", "P@ssw0rd", "correcthorsebatterystaple"] {
        let request = DerivationRequest::web(weak, "alice", "www.example.com", "1", "").unwrap();
        assert!(
            Deriver::default().process(&request).unwrap().is_none(),
            "{weak:?} should be rejected"
        );
    }
}

#[test]
fn test_passphrase_echoing_identity_rejected() {
    let passphrase = "tangerine submarine wobbles quietly";

    let unrelated = DerivationRequest::app(passphrase, "myapp", "1", "").unwrap();
    assert!(Deriver::default().process(&unrelated).unwrap().is_some());

    let echo = DerivationRequest::app(passphrase, passphrase, "1", "").unwrap();
    let err = Deriver::default().derive(&echo).unwrap_err();
    assert!(matches!(err, DeriveError::EntropyTooLow { score: 0, .. }));
}

#[test]
fn test_invalid_hosts_rejected_at_construction() {
    for site in ["not a uri", "http://999.999.1.1/x", "http://localhost/", "", "http://x.com/"] {
        let err = DerivationRequest::web(PASSPHRASE, "alice", site, "1", "").unwrap_err();
        assert!(
            matches!(err, ValidationError::InvalidHost(_)),
            "{site:?} gave {err:?}"
        );
    }
}

#[test]
fn test_bad_versions_rejected() {
    for version in ["0", "-1", "abc", "1.5", ""] {
        assert!(DerivationRequest::app(PASSPHRASE, "myapp", version, "").is_err());
    }
}

#[test]
fn test_form_rejections_are_sentinels() {
    let deriver = Deriver::default();

    let no_mode = RequestForm {
        identity: "alice".into(),
        ..RequestForm::default()
    };
    assert!(deriver.process_form(&no_mode, PASSPHRASE).unwrap().is_none());

    let no_identity = RequestForm {
        mode: Some(Mode::App),
        version: Some("1".into()),
        ..RequestForm::default()
    };
    assert!(deriver.process_form(&no_identity, PASSPHRASE).unwrap().is_none());

    let empty_passphrase = RequestForm {
        mode: Some(Mode::Wallet),
        identity: "savings".into(),
        ..RequestForm::default()
    };
    assert!(deriver.process_form(&empty_passphrase, "   ").unwrap().is_none());
}

#[test]
fn test_form_from_json() {
    let form: RequestForm = serde_json::from_str(
        r#"{"mode":"web","identity":"Alice","site":"https://www.example.com/login","version":"1"}"#,
    )
    .unwrap();
    let result = Deriver::default().process_form(&form, PASSPHRASE).unwrap().unwrap();
    assert_eq!(result.password, "Ob0Pr/g6Va/uIKcvEe&2");
}

#[test]
fn test_wallet_rules_per_pipeline() {
    let unversioned = DerivationRequest::wallet(PASSPHRASE, "savings", None, "").unwrap();
    let versioned = DerivationRequest::wallet(PASSPHRASE, "savings", Some("1"), "").unwrap();

    assert!(deriver(PipelineVersion::V1).process(&versioned).unwrap().is_none());
    assert!(deriver(PipelineVersion::V2).process(&unversioned).unwrap().is_none());
    assert!(deriver(PipelineVersion::V2).process(&versioned).unwrap().is_some());
    assert!(deriver(PipelineVersion::V3).process(&unversioned).unwrap().is_some());
}

// ============================================================================
// 5. Password policy
// ============================================================================

#[test]
fn test_password_policy_across_inputs() {
    let sites = ["www.example.com", "www.example.org", "accounts.example.net", "10.0.0.1"];
    for (i, site) in sites.iter().enumerate() {
        let result = web("alice", site, &(i + 1).to_string(), "");
        let password = &result.password;

        assert_eq!(password.chars().count(), PASSWORD_LEN, "{password}");
        assert!(password.chars().any(|c| SYMBOLS.contains(&c)), "{password}");
        assert!(password.chars().any(|c| c.is_ascii_digit()), "{password}");
        assert!(password.is_ascii());
    }
}

#[test]
fn test_entropy_reported() {
    let result = web("alice", "www.example.com", "1", "");
    assert!(result.passphrase_entropy >= 100.0);
    assert!(result.password_entropy > 0.0);
}
