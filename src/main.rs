use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use log::{error, info, warn, LevelFilter};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

mod ui;
mod utils;

use crate::ui::{ChatUI, CrosstermBackend, Terminal, UiAction};
use telechat::backend::MockBackend;
use telechat::chat::feeds::ViewUpdate;
use telechat::chat::{ChatClient, ViewState};
use telechat::profile;

/// Command line arguments for TeleChat
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "TeleChat: a terminal chat client with live contact and message feeds.",
    long_about = "TeleChat is a terminal chat client. Sign-in and persistence are \
    delegated to a managed backend; this build runs against the built-in demo \
    backend with canned contacts.\n\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// Demo identity slot to sign in with (1 or 2)
    #[arg(long, value_name = "SLOT", default_value_t = 1)]
    demo_user: u8,

    /// Log file path (the terminal itself is owned by the UI)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Override the directory used for the cached profile
    #[arg(long, value_name = "PATH")]
    config_dir: Option<PathBuf>,

    /// Ignore any cached profile and sign in fresh
    #[arg(long)]
    fresh: bool,
}

enum Exit {
    Quit,
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from("telechat.log"));
    utils::setup_logging(log_file_path.to_str(), LevelFilter::Debug)?;

    info!("TeleChat starting up");
    info!(
        "System information: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    if let Some(dir) = &args.config_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("Failed to create config directory {}: {}", dir.display(), e);
        }
        profile::set_profile_path_override(dir.join("profile.json"));
    }

    let backend = Arc::new(MockBackend::new(args.demo_user));
    let (mut client, mut update_rx) = ChatClient::new(backend);
    let mut view = ViewState::new();
    let mut chat_ui = ChatUI::new();

    // Resume the cached session if there is one, otherwise run the sign-in
    // flow before the terminal UI takes over the screen.
    let cached = if args.fresh {
        None
    } else {
        profile::load_profile().unwrap_or_else(|e| {
            warn!("Ignoring unreadable cached profile: {}", e);
            None
        })
    };

    match cached {
        Some(actor) => {
            client.resume(actor.clone()).await?;
            chat_ui.set_identity(actor);
        }
        None => match client.login().await {
            Ok(actor) => {
                if let Err(e) = profile::save_profile(&actor) {
                    warn!("Failed to cache profile: {}", e);
                }
                chat_ui.set_identity(actor);
            }
            Err(cause) => {
                // Keyed one-line message; rerunning the binary is the retry.
                error!("Sign-in failed: {}", cause);
                eprintln!("{}", cause);
                return Err(cause.into());
            }
        },
    }

    let mut terminal = ui::setup_terminal()?;
    let outcome = run_app(
        &mut terminal,
        &mut client,
        &mut chat_ui,
        &mut view,
        &mut update_rx,
    )
    .await;
    ui::restore_terminal(&mut terminal)?;

    match outcome? {
        Exit::Quit => {
            // Best-effort offline mark; losing the race on exit is tolerated.
            client.mark_offline_on_exit();
        }
        Exit::Logout => {
            client.logout().await;
            if let Err(e) = profile::clear_profile() {
                warn!("Failed to clear cached profile: {}", e);
            }
            println!("Signed out.");
        }
    }

    info!("TeleChat shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: &mut ChatClient,
    chat_ui: &mut ChatUI,
    view: &mut ViewState,
    update_rx: &mut mpsc::Receiver<ViewUpdate>,
) -> Result<Exit> {
    let mut tick = tokio::time::interval(Duration::from_millis(50));

    loop {
        terminal.draw(|f| chat_ui.draw(f, view))?;

        tokio::select! {
            maybe_update = update_rx.recv() => {
                if let Some(update) = maybe_update {
                    client.apply_update(view, update);
                }
            }
            _ = tick.tick() => {
                while event::poll(Duration::from_millis(0))? {
                    let Event::Key(key) = event::read()? else { continue };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match chat_ui.handle_key(key, view) {
                        UiAction::None => {}
                        UiAction::Quit => return Ok(Exit::Quit),
                        UiAction::Logout => return Ok(Exit::Logout),
                        UiAction::Refresh => {
                            chat_ui.set_error(None);
                            if let Err(e) = client.refresh().await {
                                warn!("Refresh failed: {:#}", e);
                            }
                        }
                        UiAction::SelectContact { id, name, photo_url } => {
                            match client.select_contact(&id, &name, photo_url).await {
                                Ok(conversation_id) => {
                                    chat_ui.set_error(None);
                                    info!("Now chatting in {}", conversation_id);
                                }
                                Err(e) => chat_ui.set_error(Some(format!("{:#}", e))),
                            }
                        }
                        UiAction::SendMessage(text) => {
                            match client.send_message(&text).await {
                                Ok(()) => {
                                    // Input only clears on success; a failed
                                    // send keeps the text for manual retry.
                                    chat_ui.clear_compose();
                                    chat_ui.set_error(None);
                                }
                                Err(e) => chat_ui.set_error(Some(format!("{:#}", e))),
                            }
                        }
                    }
                }
            }
        }
    }
}
