use tracing::info;

/// Vibration patterns in milliseconds (on, off, on, ...).
pub mod patterns {
    pub const TICK: &[u64] = &[30];
    pub const CONFIRM: &[u64] = &[50];
    pub const ACTIVATE: &[u64] = &[50, 30, 50];
    pub const ERROR: &[u64] = &[100, 50, 100];
    pub const BOUNDARY: &[u64] = &[20, 20, 20];
}

pub trait FeedbackSink {
    fn speak(&mut self, text: &str);

    fn vibrate(&mut self, pattern: &[u64]);
}

/// Logs every cue. Used by the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn speak(&mut self, text: &str) {
        info!(target: "touchless::speech", "{text}");
    }

    fn vibrate(&mut self, pattern: &[u64]) {
        info!(target: "touchless::vibration", ?pattern);
    }
}

/// Platforms without speech or vibration.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl FeedbackSink for SilentFeedback {
    fn speak(&mut self, _text: &str) {}

    fn vibrate(&mut self, _pattern: &[u64]) {}
}

/// A recorded cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    Speech(String),
    Vibration(Vec<u64>),
}

/// Keeps every cue in order. Handy for assertions and replay transcripts.
#[derive(Debug, Default, Clone)]
pub struct RecordingFeedback {
    cues: Vec<Cue>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn spoken(&self) -> Vec<&str> {
        self.cues
            .iter()
            .filter_map(|c| match c {
                Cue::Speech(s) => Some(s.as_str()),
                Cue::Vibration(_) => None,
            })
            .collect()
    }

    pub fn last_spoken(&self) -> Option<&str> {
        self.spoken().last().copied()
    }

    pub fn take(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }
}

impl FeedbackSink for RecordingFeedback {
    fn speak(&mut self, text: &str) {
        self.cues.push(Cue::Speech(text.to_string()));
    }

    fn vibrate(&mut self, pattern: &[u64]) {
        self.cues.push(Cue::Vibration(pattern.to_vec()));
    }
}
