use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// What the event loop hands to the app on every step
#[derive(Clone, Debug)]
pub enum TimerEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout`; `Err(Timeout)` when nothing arrived.
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<TimerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // windows reports releases too
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(TimerEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(TimerEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Refresh cadence while the clock runs and while it is idle
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;

    fn idle_interval(&self) -> Duration {
        Duration::from_millis(250)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
    idle: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            idle: interval.max(Duration::from_millis(250)),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms.max(1)))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }

    fn idle_interval(&self) -> Duration {
        self.idle
    }
}

/// Feeds events from a channel; used by tests
pub struct TestEventSource {
    rx: Receiver<TimerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TimerEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the application one event or tick at a time
pub struct EventLoop<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> EventLoop<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Waits up to one interval for input, yielding `Tick` when none arrives.
    /// A running clock uses the short interval so the display keeps up.
    pub fn step(&self, ticking: bool) -> TimerEvent {
        let timeout = if ticking {
            self.ticker.interval()
        } else {
            self.ticker.idle_interval()
        };
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                TimerEvent::Tick
            }
        }
    }
}
