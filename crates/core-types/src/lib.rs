use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error taxonomy shared across the automation kernel crates.
///
/// Executor failures travel through the message router back to the session
/// coordinator as these variants; the coordinator records them on the active
/// session and never retries on its own.
#[derive(Debug, Error, Clone)]
pub enum AutomationError {
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("decision service error: {0}")]
    DecisionService(String),
    #[error("step limit exceeded after {0} steps")]
    StepLimitExceeded(u32),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("another automation task is already in progress")]
    Busy,
    #[error("task cancelled")]
    Cancelled,
    #[error("{0}")]
    Message(String),
}

impl AutomationError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }
}

/// Identifier of one automation session (one observe-decide-act task run).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prefix marking an opaque element token minted by the element registry.
pub const ELEMENT_TOKEN_PREFIX: &str = "agent-id";

/// Generation-tagged handle to a registered page element.
///
/// The `pass` component is the observation pass that minted the token, so a
/// token surviving past the next registry rebuild is structurally stale
/// rather than a silent lookup miss. Tokens render as
/// `agent-id-<pass>-<index>` and are only valid within the page context that
/// minted them; the coordinator treats them as opaque strings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ElementToken {
    pub pass: u64,
    pub index: u64,
}

impl ElementToken {
    pub fn new(pass: u64, index: u64) -> Self {
        Self { pass, index }
    }

    /// Whether a selector string claims to be an element token.
    ///
    /// A claiming-but-malformed selector must still be routed through the
    /// registry path so it fails with `ElementNotFound` instead of being
    /// misread as a literal document query.
    pub fn is_token(selector: &str) -> bool {
        selector.starts_with(ELEMENT_TOKEN_PREFIX)
    }
}

impl fmt::Display for ElementToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", ELEMENT_TOKEN_PREFIX, self.pass, self.index)
    }
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("malformed element token: {0}")]
pub struct TokenParseError(pub String);

impl FromStr for ElementToken {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(ELEMENT_TOKEN_PREFIX)
            .and_then(|r| r.strip_prefix('-'))
            .ok_or_else(|| TokenParseError(s.to_string()))?;
        let (pass, index) = rest
            .split_once('-')
            .ok_or_else(|| TokenParseError(s.to_string()))?;
        let pass = pass
            .parse::<u64>()
            .map_err(|_| TokenParseError(s.to_string()))?;
        let index = index
            .parse::<u64>()
            .map_err(|_| TokenParseError(s.to_string()))?;
        Ok(Self { pass, index })
    }
}

impl Serialize for ElementToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ElementToken {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_through_display() {
        let token = ElementToken::new(3, 17);
        assert_eq!(token.to_string(), "agent-id-3-17");
        assert_eq!("agent-id-3-17".parse::<ElementToken>().unwrap(), token);
    }

    #[test]
    fn token_prefix_is_detected_even_when_malformed() {
        assert!(ElementToken::is_token("agent-id-7"));
        assert!(ElementToken::is_token("agent-id-1-2"));
        assert!(!ElementToken::is_token("#search-input"));
    }

    #[test]
    fn malformed_tokens_fail_to_parse() {
        assert!("agent-id-7".parse::<ElementToken>().is_err());
        assert!("agent-id-x-y".parse::<ElementToken>().is_err());
        assert!("button".parse::<ElementToken>().is_err());
    }
}
