//! Vanity constraint matching for node identifiers.

use crate::config::ConfigError;
use crate::crypto::NODE_ID_PREFIX;

/// Characters that can appear in a CB58 node id body.
pub const CB58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Longest possible node id body (20-byte payload + 4-byte checksum in base58).
pub const MAX_NODE_ID_BODY_LEN: usize = 33;

/// A prefix/suffix pattern a node id must satisfy.
///
/// When matching is case-insensitive the prefix and suffix are stored
/// lower-cased, and candidates are lower-cased before comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchConstraint {
    prefix: String,
    suffix: String,
    case_sensitive: bool,
}

impl SearchConstraint {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>, case_sensitive: bool) -> Self {
        let normalize = |s: String| if case_sensitive { s } else { s.to_lowercase() };

        Self {
            prefix: normalize(prefix.into()),
            suffix: normalize(suffix.into()),
            case_sensitive,
        }
    }

    /// A constraint every identifier satisfies.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Returns true if neither a prefix nor a suffix is required.
    pub fn is_unconstrained(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }

    /// Tests an identifier against this constraint.
    ///
    /// The `NodeID-` scheme tag is stripped before anchoring.
    #[inline]
    pub fn matches(&self, identifier: &str) -> bool {
        if self.is_unconstrained() {
            return true;
        }

        let body = identifier.strip_prefix(NODE_ID_PREFIX).unwrap_or(identifier);
        if self.case_sensitive {
            body.starts_with(&self.prefix) && body.ends_with(&self.suffix)
        } else {
            let folded = body.to_lowercase();
            folded.starts_with(&self.prefix) && folded.ends_with(&self.suffix)
        }
    }

    /// Rejects patterns no node id can ever satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, part) in [("prefix", &self.prefix), ("suffix", &self.suffix)] {
            if let Some(c) = part.chars().find(|&c| !self.is_encodable(c)) {
                return Err(ConfigError::InvalidPattern(format!(
                    "{} contains '{}', which never appears in a node ID",
                    label, c
                )));
            }
        }

        let total = self.prefix.len() + self.suffix.len();
        if total > MAX_NODE_ID_BODY_LEN {
            return Err(ConfigError::InvalidPattern(format!(
                "Combined prefix + suffix cannot be longer than {} characters",
                MAX_NODE_ID_BODY_LEN
            )));
        }

        Ok(())
    }

    fn is_encodable(&self, c: char) -> bool {
        self.alphabet_hits(c) > 0
    }

    /// Number of alphabet characters that compare equal to `c`.
    fn alphabet_hits(&self, c: char) -> u64 {
        CB58_ALPHABET
            .chars()
            .filter(|&a| {
                if self.case_sensitive {
                    a == c
                } else {
                    a.to_ascii_lowercase() == c
                }
            })
            .count() as u64
    }

    /// Returns the expected number of attempts to find a match.
    ///
    /// Treats every character position as uniformly distributed over the
    /// base58 alphabet; a case-insensitive letter usually has two hits.
    pub fn estimated_difficulty(&self) -> u64 {
        let base = CB58_ALPHABET.len() as u64;
        self.prefix
            .chars()
            .chain(self.suffix.chars())
            .fold(1u64, |acc, c| acc.saturating_mul(base / self.alphabet_hits(c).max(1)))
    }

    /// Returns a human-readable difficulty estimate.
    pub fn difficulty_description(&self) -> String {
        let diff = self.estimated_difficulty();
        match diff {
            0..=1_000 => "Very Easy (seconds)".into(),
            1_001..=100_000 => "Easy (minutes)".into(),
            100_001..=10_000_000 => "Medium (hours)".into(),
            10_000_001..=1_000_000_000 => "Hard (days)".into(),
            _ => "Very Hard (weeks or more)".into(),
        }
    }
}

/// Tests `identifier` against `constraint`.
#[inline]
pub fn matches(identifier: &str, constraint: &SearchConstraint) -> bool {
    constraint.matches(identifier)
}
