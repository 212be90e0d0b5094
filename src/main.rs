use anyhow::Result;
use tracing::info;

mod api;
mod app;
mod config;
mod handler;
mod history;
mod tui;
mod ui;

use app::App;
use config::Config;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let server_url = std::env::var("CHAT_SERVER_URL")
        .ok()
        .or_else(|| config.server_url.clone())
        .unwrap_or_else(|| config::DEFAULT_SERVER_URL.to_string());

    info!(server_url = %server_url, "starting chat client");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(&server_url);
    app.start_health_check();

    let run_result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    run_result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            // Event channel closed; the terminal is gone
            None => break,
        }
    }

    Ok(())
}

/// Log to a file under the config directory; the terminal is owned by the
/// TUI. Logging that cannot be set up is skipped, never fatal.
fn init_logging() {
    let Some(log_dir) = dirs::config_dir().map(|dir| dir.join("chat-tui")) else {
        return;
    };
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("chat-tui.log"))
    else {
        return;
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
}
