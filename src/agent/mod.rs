pub mod decision;
pub mod executor;
pub mod prompt;
pub mod session;

pub use decision::{extract_decision, Decision, DecisionSource};
pub use executor::{ExecutionReport, Executor, RetryPolicy};
pub use session::{Conversation, CycleReport, Session, SessionPhase, NO_DECISION_REPLY};
