use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info};

pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_HISTORY_LEN: usize = 5;
pub const DEFAULT_INDICATOR_CLEAR: Duration = Duration::from_secs(2);

/// Identifies one armed timer. Stale handles never fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    deadline: Instant,
}

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingGesture {
    pub label: String,
    pub started_at: Instant,
    pub timer: TimerHandle,
}

/// User-facing notices produced by gate transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum GateNotice {
    Confirming { label: String, delay: Duration },
    Superseded {
        previous: String,
        label: String,
        delay: Duration,
    },
    Cancelled { label: String },
}

impl GateNotice {
    /// Text for the speech sink.
    pub fn message(&self) -> String {
        match self {
            Self::Confirming { label, delay } | Self::Superseded { label, delay, .. } => format!(
                "{} detected, confirming in {} seconds",
                spoken(label),
                format_secs(*delay)
            ),
            Self::Cancelled { label } => format!("{} cancelled", spoken(label)),
        }
    }
}

fn spoken(label: &str) -> String {
    label.replace('_', " ")
}

fn format_secs(delay: Duration) -> String {
    let secs = delay.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{secs:.0}")
    } else {
        format!("{secs:.1}")
    }
}

/// A committed gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureRecord {
    pub label: String,
    pub committed_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
struct Indicator {
    label: String,
    clear_at: Instant,
}

/// Debounces noisy detections into single commits. A different label
/// replaces the live timer; repeats of the pending label are ignored.
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    delay: Duration,
    history_len: usize,
    indicator_clear: Duration,
    pending: Option<PendingGesture>,
    next_timer_id: u64,
    history: VecDeque<GestureRecord>,
    indicator: Option<Indicator>,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_DELAY)
    }
}

impl ConfirmationGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            history_len: DEFAULT_HISTORY_LEN,
            indicator_clear: DEFAULT_INDICATOR_CLEAR,
            pending: None,
            next_timer_id: 0,
            history: VecDeque::with_capacity(DEFAULT_HISTORY_LEN),
            indicator: None,
        }
    }

    pub fn with_history_len(mut self, len: usize) -> Self {
        self.history_len = len.max(1);
        self
    }

    pub fn with_indicator_clear(mut self, after: Duration) -> Self {
        self.indicator_clear = after;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn pending(&self) -> Option<&PendingGesture> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the live timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.timer.deadline)
    }

    /// Label shown as "current gesture" until it auto-clears.
    pub fn current_indicator(&self) -> Option<&str> {
        self.indicator.as_ref().map(|i| i.label.as_str())
    }

    /// Most recent commits, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &GestureRecord> {
        self.history.iter()
    }

    fn arm(&mut self, label: String, now: Instant) -> TimerHandle {
        self.next_timer_id += 1;
        let timer = TimerHandle {
            id: self.next_timer_id,
            deadline: now + self.delay,
        };
        self.pending = Some(PendingGesture {
            label,
            started_at: now,
            timer,
        });
        timer
    }

    /// Feeds a classified label into the gate.
    pub fn detect(&mut self, label: &str, now: Instant) -> Option<GateNotice> {
        match self.pending.take() {
            Some(current) if current.label == label => {
                self.pending = Some(current);
                None
            }
            Some(previous) => {
                debug!(
                    previous = %previous.label,
                    label,
                    timer = previous.timer.id,
                    "superseding pending gesture"
                );
                self.arm(label.to_string(), now);
                Some(GateNotice::Superseded {
                    previous: previous.label,
                    label: label.to_string(),
                    delay: self.delay,
                })
            }
            None => {
                let timer = self.arm(label.to_string(), now);
                debug!(label, timer = timer.id, "gesture pending");
                Some(GateNotice::Confirming {
                    label: label.to_string(),
                    delay: self.delay,
                })
            }
        }
    }

    /// Commits the pending gesture if `handle` is the live timer. Returns the
    /// label to dispatch.
    pub fn fire(&mut self, handle: TimerHandle, now: Instant) -> Option<String> {
        match &self.pending {
            Some(p) if p.timer == handle => {}
            _ => {
                debug!(timer = handle.id, "ignoring stale timer");
                return None;
            }
        }
        let pending = self.pending.take()?;
        info!(label = %pending.label, "gesture confirmed");

        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(GestureRecord {
            label: pending.label.clone(),
            committed_at: now,
        });
        self.indicator = Some(Indicator {
            label: pending.label.clone(),
            clear_at: now + self.indicator_clear,
        });

        Some(pending.label)
    }

    /// Fires the live timer once its deadline has passed and clears an expired
    /// indicator.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        if self
            .indicator
            .as_ref()
            .is_some_and(|i| now >= i.clear_at)
        {
            self.indicator = None;
        }

        let timer = self.pending.as_ref().map(|p| p.timer)?;
        if now >= timer.deadline {
            self.fire(timer, now)
        } else {
            None
        }
    }

    /// Explicit cancel. No dispatch.
    pub fn cancel(&mut self) -> Option<GateNotice> {
        let pending = self.pending.take()?;
        debug!(label = %pending.label, timer = pending.timer.id, "gesture cancelled");
        Some(GateNotice::Cancelled {
            label: pending.label,
        })
    }

    /// Drops any pending gesture and indicator without notices.
    pub fn reset(&mut self) {
        self.pending = None;
        self.indicator = None;
    }
}
