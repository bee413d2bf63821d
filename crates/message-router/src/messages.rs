//! Request/response envelopes crossing the process boundary.
//!
//! Field and tag names follow the extension wire schema
//! (`OBSERVE_PAGE` / `EXECUTE_COMMAND` messages with a `success` envelope).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use trolley_command_executor::ExecOutcome;
use trolley_page_observer::PageSnapshot;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageRequest {
    ObservePage,
    ExecuteCommand {
        command: String,
        #[serde(default)]
        parameters: Value,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_data: Option<PageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResponse {
    pub fn observed(page: PageSnapshot) -> Self {
        Self {
            success: true,
            page_data: Some(page),
            result: None,
            error: None,
        }
    }

    pub fn executed(result: ExecOutcome) -> Self {
        Self {
            success: true,
            page_data: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            page_data: None,
            result: None,
            error: Some(error.into()),
        }
    }
}
