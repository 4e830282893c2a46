//! Correlation tokens.
//!
//! A token has the shape `<ownerId>:<suffix>`. It is generated once when an
//! invoker is built and reused for every command that invoker issues, so it
//! scopes a whole conversation to one panel rather than one request.
//!
//! Two suffix strategies exist:
//! - [`TokenStrategy::Random`]: lower-case hex of a random `u64`. Uniqueness is
//!   probabilistic and no registry is kept.
//! - [`TokenStrategy::Sequential`]: a process-wide monotonic counter. Unique for
//!   the lifetime of the process.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::constants::{GLOBAL_FAULT_TOKEN, TOKEN_SEPARATOR};

/// Opaque string binding a request to its eventual responses.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Wrap an existing token value, e.g. one read off the wire.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The reserved token addressing every invoker.
    #[must_use]
    pub fn global_fault() -> Self {
        Self(GLOBAL_FAULT_TOKEN.to_string())
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Owner part of the token (everything before the last separator).
    #[must_use]
    pub fn owner(&self) -> &str {
        self.0
            .rsplit_once(TOKEN_SEPARATOR)
            .map_or(self.0.as_str(), |(owner, _)| owner)
    }

    /// Whether this is the reserved global fault token.
    #[must_use]
    pub fn is_global_fault(&self) -> bool {
        self.0 == GLOBAL_FAULT_TOKEN
    }

}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CorrelationToken {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// How token suffixes are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStrategy {
    /// Random hex suffix.
    #[default]
    Random,
    /// Process-wide monotonic counter.
    Sequential,
}

impl std::str::FromStr for TokenStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!("unknown token strategy: {other}")),
        }
    }
}

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Generate a token with a random suffix for `owner_id`.
#[must_use]
pub fn new_token(owner_id: &str) -> CorrelationToken {
    let suffix: u64 = rand::random();
    CorrelationToken(format!("{owner_id}{TOKEN_SEPARATOR}{suffix:x}"))
}

/// Token factory applying a configured [`TokenStrategy`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenGenerator {
    strategy: TokenStrategy,
}

impl TokenGenerator {
    /// Create a generator for the given strategy.
    #[must_use]
    pub fn new(strategy: TokenStrategy) -> Self {
        Self { strategy }
    }

    /// Produce a fresh token for `owner_id`.
    #[must_use]
    pub fn next(&self, owner_id: &str) -> CorrelationToken {
        match self.strategy {
            TokenStrategy::Random => new_token(owner_id),
            TokenStrategy::Sequential => {
                let n = SEQUENCE.fetch_add(1, Ordering::Relaxed);
                CorrelationToken(format!("{owner_id}{TOKEN_SEPARATOR}{n}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn random_token_has_owner_prefix() {
        let token = new_token("cmdView");
        assert!(token.as_str().starts_with("cmdView:"), "got: {token}");
        assert!(token.as_str().len() > "cmdView:".len());
    }

    #[test]
    fn random_suffix_is_hex() {
        let token = new_token("v");
        let (_, suffix) = token.as_str().split_once(':').unwrap();
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()), "got: {suffix}");
    }

    #[test]
    fn random_tokens_do_not_repeat_in_practice() {
        let tokens: HashSet<_> = (0..1000).map(|_| new_token("panel")).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn sequential_tokens_are_unique_and_increasing() {
        let generator = TokenGenerator::new(TokenStrategy::Sequential);
        let a = generator.next("p");
        let b = generator.next("p");
        assert_ne!(a, b);
        let n = |t: &CorrelationToken| t.as_str()[2..].parse::<u64>().unwrap();
        assert!(n(&b) > n(&a));
    }

    #[test]
    fn owner_splits_on_last_separator() {
        let token = CorrelationToken::from_string("view:sub:abc");
        assert_eq!(token.owner(), "view:sub");
        let bare = CorrelationToken::from_string("noseparator");
        assert_eq!(bare.owner(), "noseparator");
    }

    #[test]
    fn global_fault_token_is_recognized() {
        assert!(CorrelationToken::global_fault().is_global_fault());
        assert!(!new_token("server").is_global_fault());
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("Random".parse::<TokenStrategy>(), Ok(TokenStrategy::Random));
        assert_eq!(
            "SEQUENTIAL".parse::<TokenStrategy>(),
            Ok(TokenStrategy::Sequential)
        );
        assert!("uuid".parse::<TokenStrategy>().is_err());
    }

    #[test]
    fn strategy_serializes_lowercase() {
        let json = serde_json::to_string(&TokenStrategy::Sequential).unwrap();
        assert_eq!(json, "\"sequential\"");
    }
}
