use anyhow::Result;

use super::render::{initialize_with_progress, submit_and_render};
use crate::session::{ChatSession, SubmitOutcome};

/// Submit a single prompt and print the streamed reply.
///
/// Returns an error when the reply failed, so the process exits non-zero.
pub async fn run_prompt(session: &ChatSession, prompt: String) -> Result<()> {
    initialize_with_progress(session).await;

    session.set_input(prompt);
    match submit_and_render(session).await {
        SubmitOutcome::Completed => Ok(()),
        SubmitOutcome::Failed(message) => anyhow::bail!(message),
        SubmitOutcome::Skipped => {
            anyhow::bail!("Nothing was submitted (empty prompt or model not loaded)")
        }
    }
}
