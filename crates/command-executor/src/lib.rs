pub mod executor;
pub mod legacy;
pub mod model;
pub mod strategies;

pub use executor::CommandExecutor;
pub use model::{CommandKind, ExecOutcome, ExecutorTiming, OutcomeStatus};
