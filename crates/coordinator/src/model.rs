//! Session records and the task result envelope returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use trolley_command_executor::ExecOutcome;
use trolley_core_types::SessionId;

/// Lifecycle of one automation session.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    Completed,
    Error,
    TimedOut,
    Cancelled,
}

impl SessionStatus {
    /// Whether the session has reached a final state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }
}

/// One executed loop iteration. Failed executions are recorded too, so the
/// step history explains why a session ended in error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub action: String,
    pub parameters: Value,
    pub result: ExecOutcome,
    pub timestamp: DateTime<Utc>,
}

/// Full record of one task run, kept by the coordinator and returned inside
/// the final [`TaskEnvelope`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub task: String,
    pub status: SessionStatus,
    pub steps: Vec<Step>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Session {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            task: task.into(),
            status: SessionStatus::Pending,
            steps: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn finish(&mut self, status: SessionStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    pub fn finish_with_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.finish(SessionStatus::Error);
    }
}

/// Result envelope handed back to whoever started the task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub session: Session,
}

impl TaskEnvelope {
    pub fn from_session(session: Session) -> Self {
        match session.status {
            SessionStatus::Completed => Self {
                success: true,
                message: Some("task completed".into()),
                error: None,
                session,
            },
            status => {
                let error = session
                    .error
                    .clone()
                    .unwrap_or_else(|| default_failure_message(status).into());
                Self {
                    success: false,
                    message: None,
                    error: Some(error),
                    session,
                }
            }
        }
    }
}

fn default_failure_message(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::TimedOut => "task exceeded the step limit",
        SessionStatus::Cancelled => "task cancelled",
        SessionStatus::Error => "task failed",
        _ => "task did not complete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(SessionStatus::InProgress).unwrap(),
            "in_progress"
        );
        assert_eq!(
            serde_json::to_value(SessionStatus::TimedOut).unwrap(),
            "timed_out"
        );
    }

    #[test]
    fn envelope_reflects_terminal_status() {
        let mut session = Session::new("buy milk");
        session.finish(SessionStatus::Completed);
        let envelope = TaskEnvelope::from_session(session);
        assert!(envelope.success);
        assert!(envelope.error.is_none());

        let mut session = Session::new("buy milk");
        session.finish(SessionStatus::TimedOut);
        let envelope = TaskEnvelope::from_session(session);
        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("task exceeded the step limit"));
    }
}
