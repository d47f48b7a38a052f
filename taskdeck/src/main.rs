//! `TaskDeck`: personal task manager in the terminal.
//!
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskdeck/config.toml`).
//!
//! ```bash
//! # Tasks persisted under the platform data directory
//! cargo run --bin taskdeck
//!
//! # Throwaway session with nothing written to disk
//! cargo run --bin taskdeck -- --backend memory
//!
//! # Or via environment variables
//! TASKDECK_DATA_DIR=/tmp/taskdeck TASKDECK_LOG=debug cargo run
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::{mpsc, watch};
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::app::App;
use taskdeck::auth::Authenticator;
use taskdeck::backend::DocumentStore;
use taskdeck::backend::file::FileDocumentStore;
use taskdeck::backend::memory::{InMemoryDocumentStore, InMemoryIdentityProvider};
use taskdeck::command::{AppCommand, Services, spawn_commands};
use taskdeck::config::{BackendKind, CliArgs, ClientConfig};
use taskdeck::notice::{Notice, NoticeBoard, NoticeSender};
use taskdeck::session::SessionTracker;
use taskdeck::store::TaskStore;
use taskdeck::theme::{FilePreferenceStore, ThemeController, ThemeMode, system_prefers_dark};
use taskdeck::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(
        backend = ?config.backend,
        data_dir = %config.data_dir.display(),
        "taskdeck starting"
    );

    let result = match config.backend {
        BackendKind::File => match FileDocumentStore::open(config.documents_path()).await {
            Ok(documents) => run(documents, &config).await,
            Err(e) => {
                tracing::error!(error = %e, "could not open task storage");
                eprintln!("Error: could not open task storage: {e}");
                Err(io::Error::other(e))
            }
        },
        BackendKind::Memory => run(InMemoryDocumentStore::new(), &config).await,
    };

    tracing::info!("taskdeck exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the terminal).
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdeck.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Receivers the main loop drains on every tick.
struct Feeds {
    session: SessionTracker,
    revisions: watch::Receiver<u64>,
    theme: watch::Receiver<ThemeMode>,
    store_notices: mpsc::Receiver<Notice>,
    auth_notices: mpsc::Receiver<Notice>,
}

/// Wires the services over `documents`, then runs the TUI until quit.
async fn run<D: DocumentStore + 'static>(documents: D, config: &ClientConfig) -> io::Result<()> {
    let identity = match &config.google_account {
        Some(account) => InMemoryIdentityProvider::new().with_popup_identity(account.clone()),
        None => InMemoryIdentityProvider::new(),
    };
    let identity = Arc::new(identity);

    let (store, store_notices) = TaskStore::new(documents, config.store_options());
    let store = Arc::new(store);
    let follower = store.spawn_session_follower(SessionTracker::start(&identity));

    let theme = ThemeController::new(FilePreferenceStore::new(config.preference_path()));
    let mode = theme.initialize(system_prefers_dark());
    tracing::debug!(theme = %mode, "theme resolved");

    let (auth_sender, auth_notices) = NoticeSender::channel(config.notice_buffer);
    let mut feeds = Feeds {
        session: SessionTracker::start(&identity),
        revisions: store.subscribe(),
        theme: theme.subscribe(),
        store_notices,
        auth_notices,
    };

    let services = Arc::new(Services {
        auth: Authenticator::new(Arc::clone(&identity), auth_sender),
        store: Arc::clone(&store),
        theme,
    });
    let (cmd_tx, cmd_handle) = spawn_commands(services, config.notice_buffer);

    let mut app = App::new(NoticeBoard::new(
        config.notice_lifetime,
        config.notice_capacity,
    ))
    .with_date_format(config.date_format.clone());
    app.theme = mode;
    app.set_snapshot(store.snapshot());

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app.
    let result = run_app(&mut terminal, &mut app, &mut feeds, &store, &cmd_tx, config);

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Let queued writes finish before the process exits.
    let _ = cmd_tx.send(AppCommand::Shutdown).await;
    if let Err(e) = cmd_handle.await {
        tracing::warn!(error = %e, "command handler ended abnormally");
    }
    follower.abort();
    result
}

/// Main application loop.
fn run_app<D: DocumentStore>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    feeds: &mut Feeds,
    store: &TaskStore<D>,
    cmd_tx: &mpsc::Sender<AppCommand>,
    config: &ClientConfig,
) -> io::Result<()> {
    loop {
        // Step 1: Draw the UI frame.
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Step 2: Apply whatever the services published since the last tick.
        drain_feeds(app, feeds, store);

        // Step 3: Expire old notices.
        app.tick();

        // Step 4: Poll for terminal input events.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if let Some(command) = app.handle_key_event(key) {
                match cmd_tx.try_send(command) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        app.notices.push(Notice::error("Busy, try again in a moment"));
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        app.notices.push(Notice::error("Background worker stopped"));
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Applies pending session, task, theme and notice updates to the app.
fn drain_feeds<D: DocumentStore>(app: &mut App, feeds: &mut Feeds, store: &TaskStore<D>) {
    if let Some(change) = feeds.session.poll_change() {
        app.apply_session_change(change);
    }
    if feeds.revisions.has_changed().unwrap_or(false) {
        feeds.revisions.borrow_and_update();
        app.set_snapshot(store.snapshot());
    }
    if feeds.theme.has_changed().unwrap_or(false) {
        app.theme = *feeds.theme.borrow_and_update();
    }
    app.notices.drain(&mut feeds.store_notices);
    app.notices.drain(&mut feeds.auth_notices);
}
