use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounterVec, Opts, Registry};
use tracing::error;

use crate::model::SessionStatus;

lazy_static! {
    static ref SESSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("trolley_sessions_total", "Finished sessions by status"),
        &["status"]
    )
    .unwrap();
    static ref STEPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("trolley_steps_total", "Executed loop steps by outcome"),
        &["outcome"]
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register coordinator metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, SESSIONS_TOTAL.clone());
    register(registry, STEPS_TOTAL.clone());
}

pub fn record_session_finished(status: SessionStatus) {
    let label = match status {
        SessionStatus::Pending => "pending",
        SessionStatus::InProgress => "in_progress",
        SessionStatus::Completed => "completed",
        SessionStatus::Error => "error",
        SessionStatus::TimedOut => "timed_out",
        SessionStatus::Cancelled => "cancelled",
    };
    SESSIONS_TOTAL.with_label_values(&[label]).inc();
}

pub fn record_step(success: bool) {
    let outcome = if success { "success" } else { "error" };
    STEPS_TOTAL.with_label_values(&[outcome]).inc();
}
