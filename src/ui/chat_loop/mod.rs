//! Full-screen follow-up chat about one scan.
//!
//! Terminal events are read on a background task and forwarded over a
//! channel; stream output arrives on another. The loop drains both, redraws
//! when something changed, and sleeps briefly when idle. Closing the panel
//! cancels any in-flight reply before the terminal is restored.

pub mod lifecycle;
pub mod view;

use std::{error::Error, time::Duration};

use ratatui::crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::app::ChatApp;
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::ui::theme::Theme;

use lifecycle::{restore_terminal, setup_terminal, ChatTerminal};
use view::{ChatView, ViewOutcome};

const IDLE_SLEEP: Duration = Duration::from_millis(16);

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_chat(app: ChatApp, theme: Theme) -> Result<(), Box<dyn Error>> {
    let mut terminal = setup_terminal()?;

    let (stream_service, mut stream_rx) = ChatStreamService::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let event_reader_handle = spawn_event_reader(event_tx);

    let mut view = ChatView::new(app, theme);
    info!(subject = %view.app().context().name, "chat panel opened");

    let result = event_loop(
        &mut terminal,
        &mut view,
        &stream_service,
        &mut stream_rx,
        &mut event_rx,
    )
    .await;

    view.close();
    event_reader_handle.abort();
    restore_terminal(&mut terminal)?;
    info!("chat panel closed");

    result
}

async fn event_loop(
    terminal: &mut ChatTerminal,
    view: &mut ChatView,
    stream_service: &ChatStreamService,
    stream_rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<(), Box<dyn Error>> {
    let mut request_redraw = true;

    loop {
        if request_redraw {
            terminal.draw(|frame| view.draw(frame))?;
            request_redraw = false;
        }

        let mut events_processed = false;
        while let Ok(ev) = event_rx.try_recv() {
            events_processed = true;
            match view.handle_event(ev) {
                ViewOutcome::Exit => return Ok(()),
                ViewOutcome::Send(params) => {
                    debug!(stream_id = params.stream_id, "spawning chat stream");
                    stream_service.spawn_stream(params);
                    request_redraw = true;
                }
                ViewOutcome::Redraw => request_redraw = true,
                ViewOutcome::Ignored => {}
            }
        }

        if view.drain_stream(stream_rx) {
            request_redraw = true;
        }

        if !events_processed && !request_redraw {
            tokio::time::sleep(IDLE_SLEEP).await;
        }
    }
}
