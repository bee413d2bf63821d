use serde::{Deserialize, Serialize};

/// Tuning knobs for the observe-decide-act loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Hard ceiling on loop iterations per task. A session still in
    /// progress when the ceiling is reached finishes as timed out.
    pub max_steps: u32,
    /// Delay between an executed command and the next observation, giving
    /// the page time to settle.
    pub settle_ms: u64,
    /// Per-call budget for the decision service. An overrun counts as a
    /// transport failure, not a slow decision.
    pub decision_timeout_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            settle_ms: 1000,
            decision_timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = LoopConfig::default();
        assert_eq!(config.max_steps, 20);
        assert_eq!(config.settle_ms, 1000);
        assert_eq!(config.decision_timeout_ms, 30_000);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: LoopConfig = serde_json::from_str(r#"{"max_steps": 5}"#).unwrap();
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.settle_ms, 1000);
    }
}
