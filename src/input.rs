//! Button input: logical events, the debounced channel and the keyboard source.
//!
//! Anything that can produce [`ButtonEvent`]s (GPIO edge callbacks, a test, the
//! terminal keyboard) holds an [`InputSender`]. The engine's input loop owns the
//! single [`InputReceiver`], which drops repeats of the same button that arrive
//! inside the debounce window.

use crate::keybindings::{KeyAction, KeyMap};
use crate::shutdown::{ShutdownSignal, ShutdownTrigger};
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A logical button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonEvent {
    NextArticle,
    PrevArticle,
    SwitchFeed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("input channel closed")]
    Closed,
    #[error("input channel full")]
    Full,
}

/// Per-button bounce filter.
///
/// A press is accepted unless the same button was accepted less than
/// `window` ago. A zero window accepts everything.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: HashMap<ButtonEvent, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: HashMap::new(),
        }
    }

    pub fn accept(&mut self, event: ButtonEvent, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }
        match self.last.get(&event) {
            Some(prev) if now.saturating_duration_since(*prev) < self.window => false,
            _ => {
                self.last.insert(event, now);
                true
            }
        }
    }
}

/// Creates the bounded button channel.
pub fn channel(capacity: usize, debounce: Duration) -> (InputSender, InputReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        InputSender { tx },
        InputReceiver {
            rx,
            debouncer: Debouncer::new(debounce),
        },
    )
}

#[derive(Debug, Clone)]
pub struct InputSender {
    tx: mpsc::Sender<ButtonEvent>,
}

impl InputSender {
    /// Queues a press, waiting for room if the channel is full.
    pub async fn press(&self, event: ButtonEvent) -> Result<(), InputError> {
        self.tx.send(event).await.map_err(|_| InputError::Closed)
    }

    /// Queues a press without waiting. For producers that must not block,
    /// such as interrupt callbacks.
    pub fn try_press(&self, event: ButtonEvent) -> Result<(), InputError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => InputError::Full,
            mpsc::error::TrySendError::Closed(_) => InputError::Closed,
        })
    }
}

#[derive(Debug)]
pub struct InputReceiver {
    rx: mpsc::Receiver<ButtonEvent>,
    debouncer: Debouncer,
}

impl InputReceiver {
    /// Next debounced press, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ButtonEvent> {
        loop {
            let event = self.rx.recv().await?;
            if self.debouncer.accept(event, Instant::now()) {
                return Some(event);
            }
            tracing::trace!(?event, "Dropped bounced button press");
        }
    }
}

/// Reads the terminal keyboard and turns mapped keys into button presses.
///
/// The quit key (and a broken terminal) requests shutdown. Returns when
/// shutdown is signalled or the input channel closes.
pub async fn run_keyboard(
    keymap: KeyMap,
    input: InputSender,
    trigger: ShutdownTrigger,
    shutdown: ShutdownSignal,
) {
    let mut events = EventStream::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match keymap.action_for_key(key.code, key.modifiers) {
                        Some(KeyAction::Quit) => {
                            trigger.trigger("quit key");
                            break;
                        }
                        Some(KeyAction::Button(button)) => {
                            if input.press(button).await.is_err() {
                                break;
                            }
                        }
                        None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Terminal input failed");
                    trigger.trigger("terminal input failed");
                    break;
                }
                None => break,
            }
        }
    }

    tracing::debug!("Keyboard source stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_debouncer_drops_repeats_inside_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();

        assert!(debouncer.accept(ButtonEvent::NextArticle, t0));
        assert!(!debouncer.accept(ButtonEvent::NextArticle, t0 + Duration::from_millis(299)));
        assert!(debouncer.accept(ButtonEvent::NextArticle, t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_debouncer_tracks_buttons_separately() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();

        assert!(debouncer.accept(ButtonEvent::NextArticle, t0));
        assert!(debouncer.accept(ButtonEvent::SwitchFeed, t0));
        assert!(debouncer.accept(ButtonEvent::PrevArticle, t0));
    }

    #[test]
    fn test_zero_window_accepts_everything() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(debouncer.accept(ButtonEvent::NextArticle, t0));
        assert!(debouncer.accept(ButtonEvent::NextArticle, t0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receiver_applies_debounce() {
        let (tx, mut rx) = channel(8, Duration::from_millis(300));

        tx.press(ButtonEvent::NextArticle).await.unwrap();
        tx.press(ButtonEvent::NextArticle).await.unwrap();
        tx.press(ButtonEvent::SwitchFeed).await.unwrap();

        assert_eq!(rx.recv().await, Some(ButtonEvent::NextArticle));
        assert_eq!(rx.recv().await, Some(ButtonEvent::SwitchFeed));

        tokio::time::advance(Duration::from_millis(301)).await;
        tx.press(ButtonEvent::NextArticle).await.unwrap();
        assert_eq!(rx.recv().await, Some(ButtonEvent::NextArticle));

        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_try_press_reports_full_and_closed() {
        let (tx, rx) = channel(1, Duration::ZERO);

        assert_eq!(tx.try_press(ButtonEvent::NextArticle), Ok(()));
        assert_eq!(tx.try_press(ButtonEvent::NextArticle), Err(InputError::Full));

        drop(rx);
        assert_eq!(tx.try_press(ButtonEvent::NextArticle), Err(InputError::Closed));
    }
}
