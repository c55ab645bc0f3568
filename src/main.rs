use anyhow::Result;
use tracing::{info, warn};

use chatbox::config::Config;
use chatbox::tui::{self, EventHandler, Tui};
use chatbox::{handler, logging, ui, App};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = Config::load_or_default();

    logging::init(&config)?;
    if let Some(err) = config_error {
        warn!(%err, "could not load config, using defaults");
    }
    info!(endpoint = %config.endpoint, breaks = config.markdown.breaks, "starting chatbox");

    let mut app = App::new(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    app.set_reply_notifier(events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!(turns = app.conversation.len(), "session ended");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
