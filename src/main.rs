use anyhow::Result;

mod agent;
mod app;
mod config;
mod environment;
mod handler;
mod llm;
mod tools;
mod tui;
mod ui;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tui::install_panic_hook();

    let mut terminal = tui::init()?;
    let mut app = App::new()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }

        finish_ready_lookup(app).await;
    }

    Ok(())
}

/// Join the lookup task once it has finished. Ticks arrive every 300ms, so
/// completion is picked up promptly without blocking the UI.
async fn finish_ready_lookup(app: &mut App) {
    let finished = app
        .lookup_task
        .as_ref()
        .map(|task| task.is_finished())
        .unwrap_or(false);

    if !finished {
        return;
    }

    if let Some(task) = app.lookup_task.take() {
        let outcome = match task.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!(e)),
        };
        app.finish_lookup(outcome);
    }
}

/// Log to a file under the config directory; stderr belongs to the TUI.
/// Controlled by RUST_LOG, silent by default.
fn init_logging() {
    let Ok(dir) = Config::app_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }

    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("jaunt.log"))
    else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
}
