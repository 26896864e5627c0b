//! `threadline chat`: interactive chat with the assistant.
//!
//! Each line is one turn. `/attach <path>` stages a file for the next turn,
//! `/history` replays the transcript, `exit` quits. Ctrl+C cancels a run in
//! flight, or quits at the prompt.

use std::io::Write;
use std::path::{Path, PathBuf};
use threadline_agent::{Attachment, Session, TurnRequest};
use threadline_core::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::output;
use super::runtime::{AbortOnInterrupt, Runtime};

/// What one input line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Exit,
    History,
    Attach(PathBuf),
    Message(String),
    Empty,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "exit" | "quit" | "/exit" | "/quit" => Input::Exit,
        "/history" => Input::History,
        _ => match line.strip_prefix("/attach") {
            Some(path) if path.starts_with(char::is_whitespace) && !path.trim().is_empty() => {
                Input::Attach(PathBuf::from(path.trim()))
            }
            _ => Input::Message(line.to_string()),
        },
    }
}

pub async fn run(secrets: Option<&Path>) -> anyhow::Result<()> {
    let runtime = Runtime::build(secrets).await?;
    let mut session = runtime.session().await?;
    let _progress = runtime.spawn_progress();

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          Threadline — Interactive Chat         ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", runtime.config.model);
    println!(
        "  Weather:   {}",
        if runtime.config.weather_enabled() { "enabled" } else { "no API key (lookups will fail)" }
    );
    println!("  Downloads: {}", runtime.config.download_dir.display());
    println!();
    println!("  Type your message and press Enter.");
    println!("  /attach <path> to send a file with the next message, /history to replay.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut staged: Option<Attachment> = None;

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => break,
            Input::History => print_history(&session),
            Input::Attach(path) => match Attachment::from_path(&path).await {
                Ok(attachment) => {
                    println!("  [staged] {} ({} bytes)", attachment.file_name, attachment.data.len());
                    staged = Some(attachment);
                }
                Err(e) => eprintln!("  [Error] {e}"),
            },
            Input::Message(prompt) => {
                let mut request = TurnRequest::text(prompt);
                if let Some(attachment) = staged.take() {
                    request = request.with_attachment(attachment);
                }
                send_turn(&runtime, &mut session, request).await;
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

async fn send_turn(runtime: &Runtime, session: &mut Session, request: TurnRequest) {
    let mut abort = AbortOnInterrupt::arm();
    match runtime.engine.send(session, request, abort.receiver()).await {
        Ok(reply) => {
            output::print_turn(&reply);
            match output::save_outputs(&reply, &runtime.config.download_dir).await {
                Ok(saved) => output::print_saved(&saved),
                Err(e) => eprintln!("  [Error] Failed to save returned files: {e}"),
            }
            println!();
        }
        Err(Error::Aborted { .. }) => {
            eprintln!("  [Cancelled]");
            println!();
        }
        Err(e) => {
            eprintln!("  [Error] {e}");
            println!();
        }
    }
}

fn print_history(session: &Session) {
    if session.transcript().is_empty() {
        println!("  (no messages yet)");
        return;
    }
    for turn in session.transcript() {
        output::print_turn(turn);
        if !turn.images.is_empty() || !turn.files.is_empty() {
            println!("    ({} image(s), {} file(s))", turn.images.len(), turn.files.len());
        }
    }
    println!();
}
