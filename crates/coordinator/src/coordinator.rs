//! The observe-decide-act loop.
//!
//! One coordinator drives one page channel. Tasks are strictly serial: a
//! second `run_task` while one is in flight is rejected rather than queued,
//! matching how a single page can only be driven by one task at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use trolley_command_executor::ExecOutcome;
use trolley_core_types::AutomationError;
use trolley_message_router::{PageChannel, PageRequest, PageResponse};

use crate::config::LoopConfig;
use crate::decision::{DecisionPort, DecisionRequest};
use crate::metrics;
use crate::model::{Session, SessionStatus, Step, TaskEnvelope};

pub struct SessionCoordinator {
    config: LoopConfig,
    channel: Arc<dyn PageChannel>,
    decider: Arc<dyn DecisionPort>,
    busy: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

/// Clears the busy flag when a task run ends, whatever the exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionCoordinator {
    pub fn new(
        config: LoopConfig,
        channel: Arc<dyn PageChannel>,
        decider: Arc<dyn DecisionPort>,
    ) -> Self {
        Self {
            config,
            channel,
            decider,
            busy: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Cancel the task currently in flight, if any. The running loop notices
    /// at its next checkpoint and finishes the session as cancelled.
    pub fn cancel(&self) {
        self.cancel.lock().unwrap().cancel();
    }

    /// Run one task to completion. Returns `Busy` if another task is already
    /// in flight; every other failure mode is folded into the envelope.
    #[instrument(skip(self))]
    pub async fn run_task(&self, task: &str) -> Result<TaskEnvelope, AutomationError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AutomationError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let cancel = CancellationToken::new();
        *self.cancel.lock().unwrap() = cancel.clone();

        let mut session = Session::new(task);
        session.status = SessionStatus::InProgress;
        info!(session = %session.id, task, "task started");

        self.drive(&mut session, &cancel).await;

        metrics::record_session_finished(session.status);
        info!(
            session = %session.id,
            status = ?session.status,
            steps = session.steps.len(),
            "task finished"
        );
        Ok(TaskEnvelope::from_session(session))
    }

    async fn drive(&self, session: &mut Session, cancel: &CancellationToken) {
        for step_count in 0..self.config.max_steps {
            // Give the page time to settle after the previous command.
            if step_count > 0 {
                let settle = sleep(Duration::from_millis(self.config.settle_ms));
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = settle => {}
                }
            }
            if cancel.is_cancelled() {
                session.finish(SessionStatus::Cancelled);
                session.error = Some(AutomationError::Cancelled.to_string());
                return;
            }

            let page_data = match self.observe().await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(session = %session.id, %err, "observation failed");
                    session.finish_with_error(err.to_string());
                    return;
                }
            };

            let request = DecisionRequest {
                task: session.task.clone(),
                page_data,
                session_id: session.id.clone(),
                step_count,
            };
            let decision = match self.decide(&request).await {
                Ok(decision) => decision,
                Err(err) => {
                    warn!(session = %session.id, %err, "decision failed");
                    session.finish_with_error(err.to_string());
                    return;
                }
            };

            if let Some(error) = decision.error {
                session.finish_with_error(format!("decision service error: {error}"));
                return;
            }
            if decision.is_complete() {
                if let Some(message) = decision.message {
                    info!(session = %session.id, message, "task reported complete");
                }
                session.finish(SessionStatus::Completed);
                return;
            }

            let Some(action) = decision.action else {
                session.finish_with_error("decision carried neither an action nor completion");
                return;
            };

            let response = match self
                .channel
                .request(PageRequest::ExecuteCommand {
                    command: action.clone(),
                    parameters: decision.parameters.clone(),
                })
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    session.finish_with_error(err.to_string());
                    return;
                }
            };
            let result = match response {
                PageResponse {
                    success: true,
                    result: Some(result),
                    ..
                } => result,
                PageResponse { error, .. } => {
                    ExecOutcome::error(error.unwrap_or_else(|| "command failed".into()))
                }
            };

            let ok = result.is_success();
            metrics::record_step(ok);
            session.steps.push(Step {
                action,
                parameters: decision.parameters,
                result,
                timestamp: chrono::Utc::now(),
            });
            if !ok {
                let message = session
                    .steps
                    .last()
                    .map(|step| step.result.message.clone())
                    .unwrap_or_default();
                session.finish_with_error(message);
                return;
            }
        }

        // Ran out of steps while the service still wanted more.
        session.error = Some(AutomationError::StepLimitExceeded(self.config.max_steps).to_string());
        session.finish(SessionStatus::TimedOut);
    }

    async fn observe(&self) -> Result<trolley_page_observer::PageSnapshot, AutomationError> {
        let response = self.channel.request(PageRequest::ObservePage).await?;
        match response {
            PageResponse {
                success: true,
                page_data: Some(snapshot),
                ..
            } => Ok(snapshot),
            PageResponse { error, .. } => Err(AutomationError::Transport(
                error.unwrap_or_else(|| "observation returned no page data".into()),
            )),
        }
    }

    async fn decide(
        &self,
        request: &DecisionRequest,
    ) -> Result<crate::decision::Decision, AutomationError> {
        let budget = Duration::from_millis(self.config.decision_timeout_ms);
        match timeout(budget, self.decider.decide(request)).await {
            Ok(result) => result,
            Err(_) => Err(AutomationError::Transport(format!(
                "decision service did not answer within {}ms",
                self.config.decision_timeout_ms
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Decision, ScriptedDecisions};
    use async_trait::async_trait;
    use serde_json::json;
    use trolley_page_observer::PageSnapshot;

    fn empty_snapshot() -> PageSnapshot {
        PageSnapshot {
            url: "https://shop.example/".into(),
            title: "Shop".into(),
            elements: vec![],
        }
    }

    /// Page stub answering every observation with the same snapshot and
    /// every command with a canned outcome.
    struct StubPage {
        exec_result: ExecOutcome,
        delay: Duration,
    }

    impl StubPage {
        fn ok() -> Self {
            Self {
                exec_result: ExecOutcome::success("done"),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl PageChannel for StubPage {
        async fn request(&self, request: PageRequest) -> Result<PageResponse, AutomationError> {
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            Ok(match request {
                PageRequest::ObservePage => PageResponse::observed(empty_snapshot()),
                PageRequest::ExecuteCommand { .. } => {
                    PageResponse::executed(self.exec_result.clone())
                }
            })
        }
    }

    fn fast_config() -> LoopConfig {
        LoopConfig {
            max_steps: 20,
            settle_ms: 0,
            decision_timeout_ms: 200,
        }
    }

    fn clicking_forever() -> Arc<ScriptedDecisions> {
        let script = (0..64)
            .map(|_| ScriptedDecisions::step("click", json!({"selector": "#next"}), "keep going"))
            .collect();
        Arc::new(ScriptedDecisions::new(script))
    }

    #[tokio::test]
    async fn service_that_never_finishes_times_out_at_the_step_ceiling() {
        let coordinator = SessionCoordinator::new(
            fast_config(),
            Arc::new(StubPage::ok()),
            clicking_forever(),
        );

        let envelope = coordinator.run_task("buy milk").await.unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.session.status, SessionStatus::TimedOut);
        assert_eq!(envelope.session.steps.len(), 20);
    }

    #[tokio::test]
    async fn immediate_completion_ends_with_zero_steps() {
        let decider = Arc::new(ScriptedDecisions::new(vec![ScriptedDecisions::done(
            "already on the right page",
        )]));
        let coordinator =
            SessionCoordinator::new(fast_config(), Arc::new(StubPage::ok()), decider);

        let envelope = coordinator.run_task("open the cart").await.unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.session.status, SessionStatus::Completed);
        assert!(envelope.session.steps.is_empty());
    }

    #[tokio::test]
    async fn concurrent_tasks_are_rejected_not_queued() {
        let page = Arc::new(StubPage {
            exec_result: ExecOutcome::success("done"),
            delay: Duration::from_millis(50),
        });
        let coordinator = Arc::new(SessionCoordinator::new(
            fast_config(),
            page,
            clicking_forever(),
        ));

        let first = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.run_task("task one").await })
        };
        sleep(Duration::from_millis(10)).await;

        let err = coordinator.run_task("task two").await.unwrap_err();
        assert!(matches!(err, AutomationError::Busy));

        coordinator.cancel();
        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancel_finishes_the_session_as_cancelled() {
        let page = Arc::new(StubPage {
            exec_result: ExecOutcome::success("done"),
            delay: Duration::from_millis(20),
        });
        let coordinator = Arc::new(SessionCoordinator::new(
            LoopConfig {
                settle_ms: 20,
                ..fast_config()
            },
            page,
            clicking_forever(),
        ));

        let run = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.run_task("task").await })
        };
        sleep(Duration::from_millis(30)).await;
        coordinator.cancel();

        let envelope = run.await.unwrap().unwrap();
        assert_eq!(envelope.session.status, SessionStatus::Cancelled);
        assert!(!envelope.success);
    }

    #[tokio::test]
    async fn slow_decision_service_fails_the_session() {
        struct SlowDecider;

        #[async_trait]
        impl DecisionPort for SlowDecider {
            async fn decide(
                &self,
                _request: &DecisionRequest,
            ) -> Result<Decision, AutomationError> {
                sleep(Duration::from_secs(5)).await;
                Ok(Decision::default())
            }
        }

        let coordinator = SessionCoordinator::new(
            fast_config(),
            Arc::new(StubPage::ok()),
            Arc::new(SlowDecider),
        );

        let envelope = coordinator.run_task("task").await.unwrap();
        assert_eq!(envelope.session.status, SessionStatus::Error);
        assert!(envelope.error.unwrap().contains("did not answer"));
    }

    #[tokio::test]
    async fn failed_command_is_recorded_before_the_session_errors() {
        let page = Arc::new(StubPage {
            exec_result: ExecOutcome::error("element not found: #gone"),
            delay: Duration::ZERO,
        });
        let coordinator = SessionCoordinator::new(fast_config(), page, clicking_forever());

        let envelope = coordinator.run_task("task").await.unwrap();
        assert_eq!(envelope.session.status, SessionStatus::Error);
        assert_eq!(envelope.session.steps.len(), 1);
        assert!(!envelope.session.steps[0].result.is_success());
    }

    #[tokio::test]
    async fn a_new_task_is_not_poisoned_by_an_earlier_cancel() {
        let coordinator = SessionCoordinator::new(
            fast_config(),
            Arc::new(StubPage::ok()),
            Arc::new(ScriptedDecisions::new(vec![ScriptedDecisions::done("ok")])),
        );

        coordinator.cancel();
        let envelope = coordinator.run_task("task").await.unwrap();
        assert_eq!(envelope.session.status, SessionStatus::Completed);
    }
}
