/// Chat session orchestration - Gateway

mod orchestrator;
mod state;

pub use orchestrator::{ChatSession, SubmitOutcome};
pub use state::{SessionPhase, SessionSnapshot};
