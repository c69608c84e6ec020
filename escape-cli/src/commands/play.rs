//! Play a session from the terminal.
//!
//! Every input line is an answer, except for the slash commands listed by
//! `/help`.

use anyhow::{Context, Result};
use escape_client::{
    ClientConfig, ClientError, GameSession, HttpTransport, RequestGateway, SessionHandle,
    SessionOutcome, StartOutcome,
};
use escape_core::format_clock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::terminal::TerminalSink;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Submit the line as an answer
    Answer(String),
    /// `/hint`
    Hint,
    /// `/reveal`
    Reveal,
    /// `/skip`
    Skip,
    /// `/retry`
    Retry,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Unknown slash command
    Unknown(String),
}

/// A session to start before playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewGame {
    /// A themed session
    Theme {
        /// Theme key
        theme: String,
        /// Difficulty 1-5
        difficulty: u8,
    },
    /// A custom session generated from an image file
    Image(PathBuf),
}

/// Parse one input line.
pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Input::Answer(line.to_string());
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "/hint" | "/h" => Input::Hint,
        "/reveal" | "/r" => Input::Reveal,
        "/skip" | "/s" => Input::Skip,
        "/retry" => Input::Retry,
        "/help" | "/?" => Input::Help,
        "/quit" | "/q" | "/exit" => Input::Quit,
        _ => Input::Unknown(trimmed.to_string()),
    }
}

/// Run the play command.
pub async fn run(config: &ClientConfig, new_game: Option<NewGame>) -> Result<()> {
    let transport = HttpTransport::with_timeout(&config.server.base_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let gateway = Arc::new(RequestGateway::new(transport));

    let outcome = match new_game {
        Some(NewGame::Theme { theme, difficulty }) => {
            println!("Starting a new session ({}, difficulty {})...", theme, difficulty);
            Some(gateway.start_game(&theme, difficulty).await)
        }
        Some(NewGame::Image(path)) => {
            let image = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            let filename = upload_name(&path);
            println!("Generating a custom room from {}...", filename);
            Some(gateway.start_custom_game(image, &filename).await)
        }
        None => None,
    };
    if let Some(outcome) = outcome {
        match outcome.context("Failed to reach the game server")? {
            StartOutcome::Started { .. } => {}
            StartOutcome::Refused { message } => {
                anyhow::bail!("Server refused to start a session: {}", message)
            }
        }
    }

    let (handle, mut task) =
        GameSession::connect(gateway, config.session_config(), TerminalSink::new())
            .await
            .context("Failed to load the room")?;
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let outcome = loop {
        tokio::select! {
            outcome = &mut task => break outcome.context("Session task failed")?,
            line = lines.next_line() => {
                let line = line.context("Failed to read input")?;
                let keep_going = match line {
                    Some(line) => dispatch(&handle, parse_input(&line)),
                    None => {
                        // stdin closed
                        let _ = handle.shutdown();
                        false
                    }
                };
                if !keep_going {
                    break (&mut task).await.context("Session task failed")?;
                }
            }
        }
    };

    report(&outcome);
    Ok(())
}

/// Forward one input to the session. Returns false when the player quits.
fn dispatch(handle: &SessionHandle, input: Input) -> bool {
    let sent = match input {
        Input::Answer(answer) => handle.submit(answer),
        Input::Hint => handle.hint(),
        Input::Reveal => handle.reveal(),
        Input::Skip => handle.skip(),
        Input::Retry => handle.retry_generation(),
        Input::Help => {
            print_help();
            Ok(())
        }
        Input::Quit => {
            let _ = handle.shutdown();
            return false;
        }
        Input::Unknown(command) => {
            println!("  Unknown command {}. Type /help for the list.", command);
            Ok(())
        }
    };
    match sent {
        Ok(()) => true,
        Err(ClientError::Closed) => false,
        Err(e) => {
            tracing::warn!(error = %e, "input not delivered");
            true
        }
    }
}

/// File name sent with an upload.
fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn print_help() {
    println!("Type an answer and press enter. Commands:");
    println!("  /hint    get a hint (costs time)");
    println!("  /reveal  show the answer (no points for this puzzle)");
    println!("  /skip    skip this puzzle");
    println!("  /retry   keep waiting for the next puzzle");
    println!("  /quit    leave the room");
}

fn report(outcome: &SessionOutcome) {
    let state = &outcome.final_state;
    println!();
    println!("=== escape-room ===");
    println!("  Puzzle: {}/{}", state.puzzle_index, state.total_puzzles);
    println!("  Score:  {}", state.score);
    println!("  Hints:  {}", state.hints_used);
    println!("  Time:   {}", format_clock(state.remaining_seconds));
    match &outcome.destination {
        Some(target) => println!("  Results: {}", target),
        None => println!("  Left the room. Run 'escape-room play' to resume."),
    }
}
