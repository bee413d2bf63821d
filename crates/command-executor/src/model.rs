use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use trolley_core_types::AutomationError;

/// Commands the decision service may dispatch.
///
/// The first four form the abstract command set; the rest are legacy
/// single-shot heuristics kept for backwards compatibility with the older
/// voice command path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandKind {
    Click,
    Type,
    Scroll,
    Stop,
    SearchProduct,
    AddToCart,
    ViewCart,
    NavigateTo,
    FilterProducts,
    SelectProduct,
}

impl FromStr for CommandKind {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click" => Ok(Self::Click),
            "type" => Ok(Self::Type),
            "scroll" => Ok(Self::Scroll),
            "stop" => Ok(Self::Stop),
            "search_product" => Ok(Self::SearchProduct),
            "add_to_cart" => Ok(Self::AddToCart),
            "view_cart" => Ok(Self::ViewCart),
            "navigate_to" => Ok(Self::NavigateTo),
            "filter_products" => Ok(Self::FilterProducts),
            "select_product" => Ok(Self::SelectProduct),
            other => Err(AutomationError::InvalidParameter(format!(
                "unknown command '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Structured result of one executed command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub status: OutcomeStatus,
    pub message: String,
}

impl ExecOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Fixed delays used by the executor.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ExecutorTiming {
    /// Settle delay after scrolling a click target into view.
    /// Default: 500
    pub scroll_settle_ms: u64,
    /// How long the transient click highlight stays visible before the
    /// click is dispatched (and again before restoration).
    /// Default: 200
    pub highlight_ms: u64,
    /// Inter-character delay while typing.
    /// Default: 30
    pub keystroke_ms: u64,
    /// Settle delay after an explicit scroll command.
    /// Default: 300
    pub scroll_command_settle_ms: u64,
    /// Pause between filling a search input and firing the submit path.
    /// Default: 300
    pub search_submit_delay_ms: u64,
}

impl Default for ExecutorTiming {
    fn default() -> Self {
        Self {
            scroll_settle_ms: 500,
            highlight_ms: 200,
            keystroke_ms: 30,
            scroll_command_settle_ms: 300,
            search_submit_delay_ms: 300,
        }
    }
}

impl ExecutorTiming {
    /// Zero delays, for tests that drive the executor in a tight loop.
    pub fn instant() -> Self {
        Self {
            scroll_settle_ms: 0,
            highlight_ms: 0,
            keystroke_ms: 0,
            scroll_command_settle_ms: 0,
            search_submit_delay_ms: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
    Top,
    Bottom,
}

impl FromStr for ScrollDirection {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            other => Err(AutomationError::InvalidParameter(format!(
                "invalid scroll direction '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScrollAmount {
    Small,
    Medium,
    Large,
    Page,
}

impl ScrollAmount {
    /// Pixel delta; `Page` maps to the current viewport height.
    pub fn pixels(&self, viewport_height: f64) -> f64 {
        match self {
            Self::Small => 200.0,
            Self::Medium => 500.0,
            Self::Large => 1000.0,
            Self::Page => viewport_height,
        }
    }
}

impl FromStr for ScrollAmount {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "page" => Ok(Self::Page),
            other => Err(AutomationError::InvalidParameter(format!(
                "invalid scroll amount '{other}'"
            ))),
        }
    }
}

/// Pull a string parameter out of a loosely-typed parameter object, trying
/// aliases in order.
pub(crate) fn str_param(params: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = params.get(key).and_then(|v| v.as_str()) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

pub(crate) fn require_str_param(
    params: &serde_json::Value,
    keys: &[&str],
) -> Result<String, AutomationError> {
    str_param(params, keys).ok_or_else(|| {
        AutomationError::InvalidParameter(format!("missing parameter '{}'", keys[0]))
    })
}

pub(crate) fn sleep_ms(ms: u64) -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(ms))
}
