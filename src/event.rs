use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use tokio::sync::mpsc;

use crate::error::{AppError, Result};

/// Application events, merged into one stream for the dispatch loop.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A periodic tick for rendering.
    Tick,
    /// The terminal was resized; the next draw picks up the new size.
    Resize,
    /// Directories whose listing may have changed, from the watcher.
    FsChange(Vec<PathBuf>),
    /// Reading terminal input failed; no further key events will arrive.
    Error(String),
}

/// Async event handler that polls crossterm events and forwards them via a channel.
///
/// Only producers hold strong senders, so once the poll task and the watcher
/// are gone the channel closes and `next` reports it.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::WeakUnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (event_tx, rx) = mpsc::unbounded_channel();
        let tx = event_tx.downgrade();

        tokio::spawn(async move {
            loop {
                let polled = tokio::task::block_in_place(|| {
                    if event::poll(tick_rate)? {
                        event::read().map(Some)
                    } else {
                        Ok(None)
                    }
                });
                let next = match polled {
                    Ok(Some(CrosstermEvent::Key(key))) => Event::Key(key),
                    Ok(Some(CrosstermEvent::Resize(_, _))) => Event::Resize,
                    Ok(Some(_)) => continue,
                    Ok(None) => Event::Tick,
                    Err(e) => {
                        tracing::error!(error = %e, "terminal event read failed");
                        let _ = event_tx.send(Event::Error(e.to_string()));
                        break;
                    }
                };
                if event_tx.send(next).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// A sender for other producers (the filesystem watcher), or `None` if
    /// every producer has already gone away.
    pub fn sender(&self) -> Option<mpsc::UnboundedSender<Event>> {
        self.tx.upgrade()
    }

    /// Receive the next event (waits until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| AppError::Terminal("Event channel closed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_with(
        tx: &mpsc::UnboundedSender<Event>,
        rx: mpsc::UnboundedReceiver<Event>,
    ) -> EventHandler {
        EventHandler {
            rx,
            tx: tx.downgrade(),
        }
    }

    #[tokio::test]
    async fn read_failure_is_delivered_after_queued_events() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut events = handler_with(&tx, rx);
        tx.send(Event::Tick).unwrap();
        tx.send(Event::Error("tty gone".into())).unwrap();

        assert!(matches!(events.next().await, Ok(Event::Tick)));
        assert!(matches!(events.next().await, Ok(Event::Error(msg)) if msg == "tty gone"));
    }

    #[tokio::test]
    async fn closed_channel_is_an_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut events = handler_with(&tx, rx);
        let extra = events.sender().unwrap();
        tx.send(Event::Resize).unwrap();
        drop(tx);
        drop(extra);

        assert!(matches!(events.next().await, Ok(Event::Resize)));
        assert!(events.sender().is_none());
        assert!(matches!(events.next().await, Err(AppError::Terminal(_))));
    }
}
