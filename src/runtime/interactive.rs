use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::render::{initialize_with_progress, submit_and_render};
use crate::cli::print_models;
use crate::session::ChatSession;

/// One line of REPL input
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Prompt(&'a str),
    Models,
    Model(&'a str),
    Load,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_line(line: &str) -> ReplCommand<'_> {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplCommand::Prompt(line);
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "models" => ReplCommand::Models,
        "model" if !arg.is_empty() => ReplCommand::Model(arg),
        "load" => ReplCommand::Load,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(trimmed),
    }
}

fn print_help() {
    println!("  /models       list models");
    println!("  /model <id>   switch model");
    println!("  /load         retry loading the local model");
    println!("  /quit         leave");
}

fn prompt_marker(session: &ChatSession) {
    print!("{} ", format!("[{}] >", session.selected_model().id).cyan());
    let _ = std::io::stdout().flush();
}

/// Line-based chat loop over stdin
pub async fn run_repl(session: &ChatSession) -> Result<()> {
    println!(
        "Deep Search - chatting with {} (type /help for commands)",
        session.selected_model().name.green()
    );
    for message in session.messages() {
        println!("{}", message.content.dimmed());
    }
    initialize_with_progress(session).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt_marker(session);
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ReplCommand::Prompt(text) => {
                if !text.trim().is_empty() {
                    session.set_input(text);
                    submit_and_render(session).await;
                }
            }
            ReplCommand::Models => print_models(),
            ReplCommand::Model(id) => match session.select_model(id).await {
                Ok(()) => {
                    println!("Switched to {}", session.selected_model().name.green());
                    initialize_with_progress(session).await;
                }
                Err(e) => eprintln!("{}", e.to_string().red()),
            },
            ReplCommand::Load => initialize_with_progress(session).await,
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(command) => {
                eprintln!("Unknown command: {} (try /help)", command);
            }
        }
        prompt_marker(session);
    }

    Ok(())
}
