//! Decision service port and clients.
//!
//! The wire schema matches what the automation backend expects: camelCase
//! request fields, a decision object carrying `action`, `parameters`,
//! `status` and an optional `reason` for logging.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use trolley_core_types::{AutomationError, SessionId};
use trolley_page_observer::PageSnapshot;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub task: String,
    pub page_data: PageSnapshot,
    pub session_id: SessionId,
    pub step_count: u32,
}

/// One decision from the service. `status` stays `in_progress` until the
/// service considers the task done; `action = "stop"` is an equivalent
/// completion signal some backends send instead.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_status() -> String {
    "in_progress".to_string()
}

impl Decision {
    pub fn is_complete(&self) -> bool {
        self.status == "completed" || self.action.as_deref() == Some("stop")
    }
}

#[async_trait]
pub trait DecisionPort: Send + Sync {
    async fn decide(&self, request: &DecisionRequest) -> Result<Decision, AutomationError>;
}

/// HTTP client for a remote decision endpoint.
pub struct HttpDecisionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDecisionClient {
    /// `base_url` is the service root; the decide route is appended.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/web-automation/decide", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl DecisionPort for HttpDecisionClient {
    async fn decide(&self, request: &DecisionRequest) -> Result<Decision, AutomationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| AutomationError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AutomationError::DecisionService(format!(
                "decision endpoint returned {}",
                response.status()
            )));
        }

        let decision: Decision = response
            .json()
            .await
            .map_err(|err| AutomationError::DecisionService(err.to_string()))?;
        debug!(action = ?decision.action, status = %decision.status, "decision received");
        Ok(decision)
    }
}

/// Canned decision sequence for tests and the offline demo. Replays the
/// scripted decisions in order, then keeps answering `completed`.
pub struct ScriptedDecisions {
    script: Mutex<std::vec::IntoIter<Decision>>,
}

impl ScriptedDecisions {
    pub fn new(script: Vec<Decision>) -> Self {
        Self {
            script: Mutex::new(script.into_iter()),
        }
    }

    /// Convenience for scripting a command step.
    pub fn step(action: &str, parameters: Value, reason: &str) -> Decision {
        Decision {
            action: Some(action.to_string()),
            parameters,
            status: default_status(),
            message: None,
            reason: Some(reason.to_string()),
            error: None,
        }
    }

    pub fn done(message: &str) -> Decision {
        Decision {
            action: None,
            parameters: Value::Null,
            status: "completed".to_string(),
            message: Some(message.to_string()),
            reason: None,
            error: None,
        }
    }
}

#[async_trait]
impl DecisionPort for ScriptedDecisions {
    async fn decide(&self, _request: &DecisionRequest) -> Result<Decision, AutomationError> {
        let next = self.script.lock().unwrap().next();
        Ok(next.unwrap_or_else(|| ScriptedDecisions::done("script exhausted")))
    }
}
