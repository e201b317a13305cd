use colored::Colorize;
use std::io::Write;

use crate::models::MessageRole;
use crate::session::{ChatSession, SessionSnapshot, SubmitOutcome};

/// Load the active model's engine, echoing progress lines to stderr
pub async fn initialize_with_progress(session: &ChatSession) {
    let mut rx = session.subscribe();
    let init = session.initialize_engine();
    tokio::pin!(init);

    let mut last_progress = String::new();
    loop {
        tokio::select! {
            _ = &mut init => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    init.as_mut().await;
                    break;
                }
                let progress = rx.borrow_and_update().load_progress.clone();
                if !progress.is_empty() && progress != last_progress {
                    eprintln!("{}", progress.dimmed());
                    last_progress = progress;
                }
            }
        }
    }

    let snapshot = session.snapshot();
    if !snapshot.has_engine && snapshot.selected_model.is_local() {
        eprintln!(
            "{} {}",
            "[ERROR]".red(),
            "Local model is not loaded. Use /load to retry."
        );
    }
}

/// Submit the input buffer and print the reply as it streams
pub async fn submit_and_render(session: &ChatSession) -> SubmitOutcome {
    // The reply lands right after the user turn
    let reply_index = session.messages().len() + 1;
    let mut rx = session.subscribe();
    let submit = session.handle_submit();
    tokio::pin!(submit);

    let mut printed = 0;
    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            changed = rx.changed() => {
                if changed.is_err() {
                    break submit.as_mut().await;
                }
                let snapshot = rx.borrow_and_update().clone();
                print_new_text(&snapshot, reply_index, &mut printed);
            }
        }
    };

    let snapshot = session.snapshot();
    match &outcome {
        SubmitOutcome::Completed => print_new_text(&snapshot, reply_index, &mut printed),
        SubmitOutcome::Failed(message) => {
            if printed > 0 {
                println!();
            }
            eprintln!("{}", message.red());
            return outcome;
        }
        SubmitOutcome::Skipped => return outcome,
    }
    println!();
    outcome
}

/// Print whatever part of the reply has not been printed yet. Replies are
/// republished as running totals, so the new text is the unseen suffix.
fn print_new_text(snapshot: &SessionSnapshot, reply_index: usize, printed: &mut usize) {
    let Some(reply) = snapshot.messages.get(reply_index) else {
        return;
    };
    if reply.role != MessageRole::Assistant {
        return;
    }
    if let Some(new_text) = reply.content.get(*printed..) {
        if !new_text.is_empty() {
            print!("{}", new_text);
            let _ = std::io::stdout().flush();
            *printed = reply.content.len();
        }
    }
}
