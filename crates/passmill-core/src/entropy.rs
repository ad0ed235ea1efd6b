//! Passphrase strength estimation and the entropy gate
//!
//! Every derived secret is only as strong as the passphrase behind it, so a
//! derivation only runs when the passphrase reaches the top score. The
//! scorer sits behind [`StrengthEstimator`] so integrators can swap in their
//! own; [`HeuristicEstimator`] is the built-in one.
//!
//! # Scores
//!
//! | Score | Level     | Bits    |
//! |-------|-----------|---------|
//! | 0     | Dangerous | < 28    |
//! | 1     | Weak      | 28–35   |
//! | 2     | Fair      | 36–59   |
//! | 3     | Strong    | 60–99   |
//! | 4     | Excellent | ≥ 100   |
//!
//! # Important
//!
//! Unlike a strength meter, [`EntropyGate`] is a hard gate: anything below
//! [`MAX_SCORE`] gets no output at all.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Highest score an estimator reports, and the score the gate requires.
pub const MAX_SCORE: u8 = 4;

/// Extra terms penalized on top of the built-in common-password list.
pub const DEFAULT_WEAK_TERMS: &[&str] = &["secret", "password"];

/// Known inputs shorter than this are not treated as dictionary words.
const MIN_KNOWN_INPUT_LEN: usize = 3;

/// Strength level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PasswordStrength {
    /// < 28 bits: trivially crackable
    Dangerous,
    /// 28–35 bits: vulnerable to targeted attack
    Weak,
    /// 36–59 bits: adequate for casual threats
    Fair,
    /// 60–99 bits: resistant to well-funded attackers
    Strong,
    /// ≥ 100 bits: good enough to derive from
    Excellent,
}

impl PasswordStrength {
    /// Classify an entropy estimate.
    pub fn from_bits(bits: f64) -> Self {
        if bits < 28.0 {
            Self::Dangerous
        } else if bits < 36.0 {
            Self::Weak
        } else if bits < 60.0 {
            Self::Fair
        } else if bits < 100.0 {
            Self::Strong
        } else {
            Self::Excellent
        }
    }

    /// Score in `0..=MAX_SCORE`.
    pub fn score(&self) -> u8 {
        match self {
            Self::Dangerous => 0,
            Self::Weak => 1,
            Self::Fair => 2,
            Self::Strong => 3,
            Self::Excellent => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Dangerous => "Dangerous: trivially crackable",
            Self::Weak => "Weak: vulnerable to targeted attacks",
            Self::Fair => "Fair: adequate for casual threats only",
            Self::Strong => "Strong: resistant to well-funded attackers, but not enough to derive from",
            Self::Excellent => "Excellent: strong enough to derive secrets from",
        }
    }
}

/// Result of scoring one candidate string.
#[derive(Debug, Clone, Serialize)]
pub struct StrengthEstimate {
    /// 0..=4
    pub score: u8,
    /// Estimated entropy in bits
    pub entropy_bits: f64,
    pub strength: PasswordStrength,
    /// Human-readable issues (empty if none)
    pub warnings: Vec<String>,
}

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Strength estimation failed: {0}")]
    Failed(String),
}

/// Scores a candidate string, penalizing it for echoing `known_inputs`.
pub trait StrengthEstimator {
    fn score_and_estimate(
        &self,
        candidate: &str,
        known_inputs: &[String],
    ) -> Result<StrengthEstimate, EstimatorError>;
}

/// Common weak passwords and crypto-flavoured words.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "12345678",
    "qwerty",
    "abc123",
    "monkey",
    "1234567",
    "letmein",
    "trustno1",
    "dragon",
    "baseball",
    "iloveyou",
    "master",
    "sunshine",
    "ashley",
    "bailey",
    "shadow",
    "123456789",
    "1234567890",
    "password1",
    "bitcoin",
    "satoshi",
    "nakamoto",
    "hodl",
    "moon",
    "lambo",
    "seed",
    "wallet",
    "crypto",
];

/// Deterministic character-class estimator.
///
/// Every occurrence of a dictionary term (common passwords, the configured
/// weak terms, and any known input of three or more characters) counts as a
/// single character, so `alice2024` scores far lower for a user named alice.
/// Then:
/// - bits = effective length × log2(charset size)
/// - penalties for repeated characters, sequential runs, single-class input
/// - bonus for passphrases of four or more words
#[derive(Debug, Clone)]
pub struct HeuristicEstimator {
    weak_terms: Vec<String>,
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::with_weak_terms(DEFAULT_WEAK_TERMS.iter().copied())
    }
}

impl HeuristicEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configured weak terms (the built-in list always applies).
    pub fn with_weak_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let weak_terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { weak_terms }
    }

    pub fn weak_terms(&self) -> &[String] {
        &self.weak_terms
    }

    /// Estimate the entropy of `candidate`.
    ///
    /// # Example
    /// ```
    /// use passmill_core::entropy::{HeuristicEstimator, MAX_SCORE};
    /// let estimator = HeuristicEstimator::default();
    /// let estimate = estimator.estimate("correct horse battery staple", &[]);
    /// assert_eq!(estimate.score, MAX_SCORE);
    /// assert_eq!(estimator.estimate("password", &[]).score, 0);
    /// ```
    pub fn estimate(&self, candidate: &str, known_inputs: &[String]) -> StrengthEstimate {
        let mut warnings = Vec::new();

        if candidate.is_empty() {
            return StrengthEstimate {
                score: 0,
                entropy_bits: 0.0,
                strength: PasswordStrength::Dangerous,
                warnings: vec!["Passphrase is empty".to_string()],
            };
        }

        let len = candidate.chars().count() as f64;
        let lower = candidate.to_lowercase();

        // Dictionary terms shrink the effective length.
        let mut effective_len = len;
        let mut echoed_input = false;
        let mut common_word = false;

        let builtin = COMMON_PASSWORDS
            .iter()
            .copied()
            .chain(self.weak_terms.iter().map(String::as_str))
            .map(|t| (t, false));
        let user = known_inputs
            .iter()
            .map(|k| k.trim())
            .filter(|k| k.chars().count() >= MIN_KNOWN_INPUT_LEN)
            .map(|k| (k, true));

        let known_lower: Vec<(String, bool)> = builtin
            .chain(user)
            .map(|(t, is_user)| (t.to_lowercase(), is_user))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        for (term, is_user) in &known_lower {
            if !seen.insert(term.as_str()) {
                continue;
            }
            let occurrences = lower.matches(term.as_str()).count();
            if occurrences == 0 {
                continue;
            }
            let term_len = term.chars().count() as f64;
            effective_len -= occurrences as f64 * (term_len - 1.0);
            if *is_user {
                echoed_input = true;
            } else {
                common_word = true;
            }
        }
        if effective_len < 1.0 {
            effective_len = 1.0;
        }
        if common_word {
            warnings.push("Contains a commonly used password or word".to_string());
        }
        if echoed_input {
            warnings.push("Contains your username, site, app or wallet name".to_string());
        }

        // Character class analysis
        let mut has_lower = false;
        let mut has_upper = false;
        let mut has_digit = false;
        let mut has_symbol = false;
        let mut has_unicode = false;

        for ch in candidate.chars() {
            if ch.is_ascii_lowercase() {
                has_lower = true;
            } else if ch.is_ascii_uppercase() {
                has_upper = true;
            } else if ch.is_ascii_digit() {
                has_digit = true;
            } else if ch.is_ascii_punctuation() || ch == ' ' {
                has_symbol = true;
            } else {
                has_unicode = true;
            }
        }

        let mut charset_size: f64 = 0.0;
        if has_lower {
            charset_size += 26.0;
        }
        if has_upper {
            charset_size += 26.0;
        }
        if has_digit {
            charset_size += 10.0;
        }
        if has_symbol {
            charset_size += 33.0;
        }
        if has_unicode {
            charset_size += 100.0;
        }
        if charset_size < 1.0 {
            charset_size = 1.0;
        }

        let mut entropy = effective_len * charset_size.log2();

        let unique_chars: HashSet<char> = candidate.chars().collect();
        let unique_ratio = unique_chars.len() as f64 / len;
        if unique_ratio < 0.5 {
            entropy -= (1.0 - unique_ratio) * entropy * 0.3;
            warnings.push("Too many repeated characters".to_string());
        }

        let sequential_count = count_sequential(candidate);
        if sequential_count > 2 {
            entropy -= sequential_count as f64 * 2.0;
            warnings.push("Contains sequential patterns".to_string());
        }

        if (has_lower != has_upper) && !has_digit && !has_symbol {
            entropy *= 0.85;
            if len < 12.0 {
                warnings.push("Single character class: add numbers, symbols, or mixed case".to_string());
            }
        }

        // Word-based entropy beats character-based for the same length.
        let word_count = candidate.split_whitespace().count();
        if word_count >= 4 {
            entropy += (word_count as f64 - 3.0) * 3.0;
        }

        if entropy < 0.0 {
            entropy = 0.0;
        }

        if len < 8.0 {
            warnings.push("Passphrase is very short (< 8 characters)".to_string());
        } else if len < 12.0 {
            warnings.push("Consider a longer passphrase (12+ characters recommended)".to_string());
        }

        let strength = PasswordStrength::from_bits(entropy);

        StrengthEstimate {
            score: strength.score(),
            entropy_bits: entropy,
            strength,
            warnings,
        }
    }
}

impl StrengthEstimator for HeuristicEstimator {
    fn score_and_estimate(
        &self,
        candidate: &str,
        known_inputs: &[String],
    ) -> Result<StrengthEstimate, EstimatorError> {
        Ok(self.estimate(candidate, known_inputs))
    }
}

/// Count sequential character runs (abc, 321, ...)
fn count_sequential(candidate: &str) -> usize {
    let chars: Vec<u32> = candidate.chars().map(|c| c as u32).collect();
    let mut count = 0;

    for window in chars.windows(3) {
        let (a, b, c) = (window[0], window[1], window[2]);
        if b == a + 1 && c == b + 1 {
            count += 1;
        }
        if a > 1 && b == a - 1 && c == b - 1 {
            count += 1;
        }
    }

    count
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Passphrase too weak: score {score} of {required} required")]
    TooWeak { score: u8, required: u8 },
    #[error(transparent)]
    Estimator(#[from] EstimatorError),
}

/// Refuses to let a derivation run on a passphrase below [`MAX_SCORE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EntropyGate;

impl EntropyGate {
    pub const REQUIRED_SCORE: u8 = MAX_SCORE;

    /// Score `passphrase` and pass it through only at the maximum score.
    pub fn check<E>(
        &self,
        estimator: &E,
        passphrase: &str,
        known_inputs: &[String],
    ) -> Result<StrengthEstimate, GateError>
    where
        E: StrengthEstimator + ?Sized,
    {
        let estimate = estimator.score_and_estimate(passphrase, known_inputs)?;
        if estimate.score < Self::REQUIRED_SCORE {
            log::warn!(
                "Passphrase rejected by entropy gate (score {}, {:.1} bits)",
                estimate.score,
                estimate.entropy_bits
            );
            return Err(GateError::TooWeak {
                score: estimate.score,
                required: Self::REQUIRED_SCORE,
            });
        }
        Ok(estimate)
    }
}
