//! Interactive terminal client for the Music League strategist.
//!
//! Wires the layers together: config and secrets from the config directory,
//! file-backed session/profile storage, the Claude chat provider, and both
//! playlist platforms. Free text goes through the conversation engine as a
//! turn; slash commands manage sessions.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use strategist_application::{
    ConversationEngine, LoggingTabOpener, PlaylistOrchestrator, TabOpener,
};
use strategist_core::preference::ProfileRepository;
use strategist_core::session::{MusicLeagueSession, SessionRepository};
use strategist_interaction::ClaudeChatProvider;
use strategist_interaction::chat::ChatProvider;
use strategist_interaction::platform::{
    PlaylistPlatform, SpotifyPlatform, YoutubeMusicPlatform,
};
use strategist_infrastructure::{
    ConfigStorage, DirSessionRepository, FileProfileRepository, StrategistPaths,
};

const HELP: &str = "\
Commands:
  /new [theme]     start a new session, optionally opening with the theme
  /sessions        list stored sessions
  /switch <id>     switch to another session
  /delete <id>     delete a session
  /profile         show the long-term taste profile
  /help            show this help
  /quit            exit

Anything else is sent to the strategist as your next message.";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    StrategistPaths::ensure_secret_file().context("failed to prepare the secret file")?;

    let config = ConfigStorage::new()?.load()?;

    let chat: Arc<dyn ChatProvider> = match ClaudeChatProvider::try_from_env() {
        Ok(provider) => Arc::new(provider),
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            eprintln!(
                "Add your API key to {} or set ANTHROPIC_API_KEY.",
                StrategistPaths::secret_file()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "secret.json".to_string())
            );
            std::process::exit(1);
        }
    };

    let session_repository: Arc<dyn SessionRepository> = match &config.data_dir {
        Some(dir) => Arc::new(DirSessionRepository::new(dir).await?),
        None => Arc::new(DirSessionRepository::default_location().await?),
    };
    let profile_repository: Arc<dyn ProfileRepository> = match &config.data_dir {
        Some(dir) => Arc::new(FileProfileRepository::new(dir.join("profile.json"))),
        None => Arc::new(FileProfileRepository::default_location()?),
    };

    let platforms = vec![
        Arc::new(SpotifyPlatform::from_env()) as Arc<dyn PlaylistPlatform>,
        Arc::new(YoutubeMusicPlatform::from_env()) as Arc<dyn PlaylistPlatform>,
    ];
    let orchestrator =
        PlaylistOrchestrator::new(platforms, Arc::new(LoggingTabOpener) as Arc<dyn TabOpener>);

    let engine = ConversationEngine::new(
        session_repository,
        profile_repository,
        chat,
        orchestrator,
        config,
    );

    match engine.restore_last_session().await? {
        Some(session) => {
            println!(
                "Resumed session {} ({})",
                short_id(&session.id).bold(),
                session.phase
            );
            if let Some(theme) = &session.theme {
                println!("Theme: {}", theme.raw_text);
            }
        }
        None => {
            let session = engine.create_session().await?;
            println!("Started session {}", short_id(&session.id).bold());
            println!("Tell me about this round's theme to get going.");
        }
    }
    println!("{}", "Type /help for commands.".dimmed());

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                if let Some(command) = line.strip_prefix('/') {
                    if !handle_command(&engine, command).await {
                        break;
                    }
                } else {
                    run_turn(&engine, line).await;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

/// Handles a slash command; returns false when the REPL should exit.
async fn handle_command(engine: &ConversationEngine, command: &str) -> bool {
    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let argument = (!rest.is_empty()).then_some(rest);

    match name {
        "new" => match engine.create_session().await {
            Ok(session) => {
                println!("Started session {}", short_id(&session.id).bold());
                match argument {
                    // the theme is just the session's first message
                    Some(theme) => run_turn(engine, theme).await,
                    None => println!("Tell me about this round's theme to get going."),
                }
            }
            Err(err) => print_error(&err.to_string()),
        },
        "sessions" => match engine.list_sessions().await {
            Ok(sessions) if sessions.is_empty() => println!("No stored sessions."),
            Ok(sessions) => {
                for session in sessions {
                    let theme = session
                        .theme
                        .as_ref()
                        .map(|t| t.raw_text.as_str())
                        .unwrap_or("(no theme yet)");
                    println!(
                        "{}  {}  {}",
                        short_id(&session.id).bold(),
                        format!("[{}]", session.phase).dimmed(),
                        theme
                    );
                }
            }
            Err(err) => print_error(&err.to_string()),
        },
        "switch" => match argument {
            Some(id) => match engine.switch_session(id).await {
                Ok(session) => print_session_summary(&session),
                Err(err) => print_error(&err.to_string()),
            },
            None => println!("Usage: /switch <session-id>"),
        },
        "delete" => match argument {
            Some(id) => match engine.delete_session(id).await {
                Ok(()) => println!("Deleted {}", id),
                Err(err) => print_error(&err.to_string()),
            },
            None => println!("Usage: /delete <session-id>"),
        },
        "profile" => match engine.profile().await {
            Ok(Some(profile)) => {
                println!(
                    "Taste profile ({} pieces of evidence):",
                    profile.evidence_count
                );
                if !profile.summary.is_empty() {
                    println!("  {}", profile.summary);
                }
                for preference in
                    strategist_core::preference::prioritized_long_term(&profile)
                {
                    println!("  - {} ({:.1})", preference.statement, preference.weight);
                }
            }
            Ok(None) => println!("No taste profile yet; finalize a pick to build one."),
            Err(err) => print_error(&err.to_string()),
        },
        "help" => println!("{HELP}"),
        "quit" | "exit" => return false,
        other => println!("Unknown command: /{other}. Try /help."),
    }

    true
}

async fn run_turn(engine: &ConversationEngine, text: &str) {
    println!("{}", "thinking...".dimmed());
    match engine.process_turn(text).await {
        Ok(outcome) => {
            if !outcome.assistant_text.is_empty() {
                println!("{}", outcome.assistant_text.cyan());
            }
            print_session_summary(&outcome.session);
        }
        Err(err) => print_error(&err.to_string()),
    }
}

fn print_session_summary(session: &MusicLeagueSession) {
    if let Some(pick) = &session.final_pick {
        println!("{} {}", "Final pick:".green().bold(), pick.label());
        return;
    }

    let songs = if session.finalists.is_empty() {
        &session.candidates
    } else {
        &session.finalists
    };
    if songs.is_empty() {
        return;
    }

    println!("{}", format!("[{}]", session.phase).dimmed());
    for (index, song) in songs.iter().enumerate() {
        println!("  {}. {} {}", index + 1, song.label().bold(), song.reason.dimmed());
        if let Some(question) = &song.question {
            println!("     {}", question.italic().dimmed());
        }
    }
}

fn print_error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
