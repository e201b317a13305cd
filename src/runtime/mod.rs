/// Runtime module - Gateway

mod interactive;
mod non_interactive;
mod render;
mod runner;

pub use interactive::run_repl;
pub use non_interactive::run_prompt;
pub use render::{initialize_with_progress, submit_and_render};
pub use runner::Runtime;
