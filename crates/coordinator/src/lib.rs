pub mod config;
pub mod coordinator;
pub mod decision;
pub mod metrics;
pub mod model;

pub use config::LoopConfig;
pub use coordinator::SessionCoordinator;
pub use decision::{Decision, DecisionPort, DecisionRequest, HttpDecisionClient, ScriptedDecisions};
pub use model::{Session, SessionStatus, Step, TaskEnvelope};
