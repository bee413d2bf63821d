use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounter, IntGauge, Registry};
use tracing::error;

lazy_static! {
    static ref REGISTRY_ENTRIES: IntGauge = IntGauge::new(
        "trolley_registry_entries",
        "Elements registered in the current observation pass"
    )
    .unwrap();
    static ref REGISTRY_PASSES_TOTAL: IntCounter = IntCounter::new(
        "trolley_registry_passes_total",
        "Observation passes started"
    )
    .unwrap();
    static ref REGISTRY_STALE_LOOKUPS_TOTAL: IntCounter = IntCounter::new(
        "trolley_registry_stale_lookups_total",
        "Lookups that hit a token from an earlier pass"
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register element registry metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, REGISTRY_ENTRIES.clone());
    register(registry, REGISTRY_PASSES_TOTAL.clone());
    register(registry, REGISTRY_STALE_LOOKUPS_TOTAL.clone());
}

pub fn set_entry_count(count: usize) {
    REGISTRY_ENTRIES.set(count as i64);
}

pub fn record_pass_started() {
    REGISTRY_PASSES_TOTAL.inc();
}

pub fn record_stale_lookup() {
    REGISTRY_STALE_LOOKUPS_TOTAL.inc();
}
