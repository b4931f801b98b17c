// src/cli/chat.rs — Terminal practice loop

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::conversation::{ConversationStep, Progress, SessionRegistry};
use crate::infra::config::Config;

use super::Services;

const TERMINAL_SESSION: &str = "terminal";

/// One line of learner input.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Quit,
    Reset,
    Progress,
    Help,
    Unknown(&'a str),
    Message(&'a str),
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/reset" => Input::Reset,
        "/progress" => Input::Progress,
        "/help" => Input::Help,
        cmd if cmd.starts_with('/') => Input::Unknown(cmd),
        text => Input::Message(text),
    }
}

fn print_step(step: &ConversationStep, progress: Progress) {
    eprintln!(
        "  [step {}/{} · {}] {}",
        progress.current,
        progress.total,
        step.step_id(),
        step.step_goal()
    );
    if !step.target_vocab().is_empty() {
        eprintln!("  vocab: {}", step.target_vocab().join(", "));
    }
}

/// Run the practice loop until the final step is answered, `/quit`, or EOF.
pub async fn run_chat(config: &Config, scenario: Option<&str>) -> anyhow::Result<()> {
    let services = Services::from_config(config)?;
    let registry = SessionRegistry::new(Arc::clone(&services.catalog))
        .with_history_window(config.sessions.history_window);

    let code = scenario.unwrap_or(&config.scenarios.default);
    let (handle, _) = registry.get_or_create(TERMINAL_SESSION, code);
    let mut session = handle.lock().await;

    {
        let def = session.sequencer.scenario()?;
        eprintln!("parlay v{} | {} ({})\n", env!("CARGO_PKG_VERSION"), def.title, def.language);
        println!("{}", def.welcome);
    }
    print_step(session.sequencer.current_step()?, session.sequencer.progress()?);

    while let Some(line) = read_input() {
        match parse_input(&line) {
            Input::Quit => break,
            Input::Empty => continue,
            Input::Help => {
                eprintln!("Slash commands:");
                eprintln!("  /reset     Start the scenario over");
                eprintln!("  /progress  Show the current step");
                eprintln!("  /quit      Exit");
            }
            Input::Unknown(cmd) => eprintln!("  Unknown command: {cmd} (try /help)"),
            Input::Progress => {
                print_step(session.sequencer.current_step()?, session.sequencer.progress()?);
            }
            Input::Reset => {
                session.sequencer.reset()?;
                println!("{}", session.sequencer.scenario()?.welcome);
                print_step(session.sequencer.current_step()?, session.sequencer.progress()?);
            }
            Input::Message(text) => {
                match session.sequencer.take_turn(&services.gateway, text).await {
                    Ok(outcome) => {
                        println!("{}", outcome.reply.text);
                        if outcome.is_complete {
                            eprintln!("\n  Scenario complete.");
                            break;
                        }
                        print_step(&outcome.current_step, outcome.progress);
                    }
                    Err(e) => eprintln!("[error] {e}"),
                }
            }
        }
    }

    Ok(())
}

fn read_input() -> Option<String> {
    print!("> ");
    io::stdout().flush().ok();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => None, // EOF
        Ok(_) => Some(line),
        Err(_) => None,
    }
}
