//! Wiring layer over the automation kernel crates, plus an offline demo
//! store used by the CLI and the integration tests.

pub mod demo;

pub use trolley_coordinator::{
    Decision, DecisionPort, HttpDecisionClient, LoopConfig, ScriptedDecisions, SessionCoordinator,
    TaskEnvelope,
};
pub use trolley_message_router::{page_channel, PageAgent, PageChannel};
