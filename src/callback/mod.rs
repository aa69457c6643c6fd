pub mod dispatcher;
pub mod orchestrator;
pub mod sweeper;

pub use dispatcher::{CallbackDispatcher, CallbackJob, DeliveryOutcome, VALID_STATUS_CODES};
pub use orchestrator::CallbackOrchestrator;
pub use sweeper::{RetrySweeper, SweepSummary};
