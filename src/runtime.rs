use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::feedback::FeedbackSink;
use crate::landmarks::SourceFrame;
use crate::pipeline::Pipeline;

/// Unified event type consumed by the pipeline runner
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    Frame(SourceFrame),
    /// The host's element tree changed; targets need recomputing.
    TreeChanged,
    Cancel,
    Stop,
    Resume,
    Tick,
}

/// Source of pipeline events (frames, host notifications, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<PipelineEvent, RecvTimeoutError>;
}

/// Production event source fed by a producer thread
pub struct ChannelEventSource {
    rx: Receiver<PipelineEvent>,
}

impl ChannelEventSource {
    /// Runs `producer` on its own thread. It sends until it returns or the
    /// source is dropped.
    pub fn spawn<P>(producer: P) -> Self
    where
        P: FnOnce(Sender<PipelineEvent>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || producer(tx));
        Self { rx }
    }

    /// Source paired with a sender the caller feeds directly.
    pub fn channel() -> (Sender<PipelineEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PipelineEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<PipelineEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<PipelineEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PipelineEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the pipeline one event/tick at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> PipelineEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                PipelineEvent::Tick
            }
        }
    }

    /// One loop iteration against the wall clock: due timers first, then the
    /// event. Returns the event that was handled.
    pub fn step_pipeline<F: FeedbackSink>(&self, pipeline: &mut Pipeline<F>) -> PipelineEvent {
        let event = self.step();
        let now = Instant::now();
        pipeline.advance(now);
        pipeline.handle(event.clone(), now);
        event
    }
}
