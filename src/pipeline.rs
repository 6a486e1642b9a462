use std::time::Instant;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actions::install_defaults;
use crate::classifier::{
    CentroidClassifier, CentroidModel, Classification, ClassifierStrategy, FingerStateClassifier,
    GestureClassifier, MotionPatternClassifier, Observation, TrainableClassifier, TrainingReport,
};
use crate::config::Config;
use crate::dispatch::{ActionContext, CommandDispatcher, DispatchOutcome};
use crate::features::{extract_frame, MotionWindow};
use crate::feedback::{patterns, FeedbackSink};
use crate::gate::{ConfirmationGate, GateNotice, TimerHandle};
use crate::landmarks::{Producer, SourceFrame};
use crate::navigator::{ElementTree, FocusNavigator};
use crate::runtime::PipelineEvent;
use crate::training::{TrainingError, TrainingSession, TrainingSet};

/// The platform refused or lost a capability the pipeline needs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("unsupported on this platform: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    Running,
    /// Halted by the host; [`Pipeline::resume`] leaves this state.
    Stopped,
    Inactive(String),
}

/// A deadline that has come due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Confirm(TimerHandle),
    Refresh,
}

/// Observable pipeline activity, drained with [`Pipeline::take_reports`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineReport {
    Detected(Classification),
    Notice(GateNotice),
    Dispatched {
        label: String,
        outcome: DispatchOutcome,
    },
    Sampled {
        label: String,
        count: usize,
    },
}

pub struct Pipeline<F: FeedbackSink> {
    producer: Producer,
    strategy: ClassifierStrategy,
    scroll_step: f64,
    window: MotionWindow,
    finger_state: FingerStateClassifier,
    motion: MotionPatternClassifier,
    centroid: CentroidClassifier,
    gate: ConfirmationGate,
    dispatcher: CommandDispatcher,
    navigator: FocusNavigator,
    feedback: F,
    session: TrainingSession,
    training_set: TrainingSet,
    status: PipelineStatus,
    reports: Vec<PipelineReport>,
}

impl<F: FeedbackSink> std::fmt::Debug for Pipeline<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("producer", &self.producer)
            .field("strategy", &self.strategy)
            .field("status", &self.status)
            .field("gate", &self.gate)
            .field("navigator", &self.navigator)
            .finish_non_exhaustive()
    }
}

impl<F: FeedbackSink> Pipeline<F> {
    /// Builds a pipeline with the default bindings installed.
    pub fn new(config: &Config, tree: Box<dyn ElementTree>, feedback: F) -> Self {
        let mut navigator =
            FocusNavigator::new(tree).with_refresh_interval(config.refresh_interval());
        navigator.sync_scroll_bounds(true);

        let mut dispatcher = CommandDispatcher::new();
        install_defaults(&mut dispatcher);

        Self {
            producer: config.producer,
            strategy: config.strategy,
            scroll_step: config.scroll_step,
            window: MotionWindow::new(config.motion_window_len(), config.min_motion_intensity),
            finger_state: FingerStateClassifier::new(config.handedness),
            motion: MotionPatternClassifier::new(config.motion_thresholds()),
            centroid: CentroidClassifier::new(config.producer)
                .with_min_samples(config.min_samples())
                .with_threshold(config.similarity_threshold),
            gate: ConfirmationGate::new(config.confirmation_delay())
                .with_history_len(config.history_len)
                .with_indicator_clear(config.indicator_clear()),
            dispatcher,
            navigator,
            feedback,
            session: TrainingSession::new(),
            training_set: TrainingSet::new(),
            status: PipelineStatus::Running,
            reports: Vec::new(),
        }
    }

    /// Installs a persisted model; refused when it belongs to another producer.
    pub fn load_model(&mut self, model: CentroidModel) -> bool {
        self.centroid.load_model(model)
    }

    // ── Accessors ──────────────────────────────────────────

    pub fn producer(&self) -> Producer {
        self.producer
    }

    pub fn strategy(&self) -> ClassifierStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: ClassifierStrategy) {
        self.strategy = strategy;
    }

    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == PipelineStatus::Running
    }

    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    pub fn navigator(&self) -> &FocusNavigator {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut FocusNavigator {
        &mut self.navigator
    }

    /// For page-specific bindings on top of the defaults.
    pub fn dispatcher_mut(&mut self) -> &mut CommandDispatcher {
        &mut self.dispatcher
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    pub fn model(&self) -> Option<&CentroidModel> {
        self.centroid.model()
    }

    pub fn training_set(&self) -> &TrainingSet {
        &self.training_set
    }

    pub fn training_session(&self) -> &TrainingSession {
        &self.session
    }

    pub fn take_reports(&mut self) -> Vec<PipelineReport> {
        std::mem::take(&mut self.reports)
    }

    // ── Event loop ─────────────────────────────────────────

    pub fn handle(&mut self, event: PipelineEvent, now: Instant) {
        match event {
            PipelineEvent::Frame(frame) => self.on_frame(&frame, now),
            PipelineEvent::TreeChanged => self.navigator.refresh(&mut self.feedback),
            PipelineEvent::Cancel => self.cancel(),
            PipelineEvent::Stop => self.stop(),
            PipelineEvent::Resume => {
                self.resume();
            }
            PipelineEvent::Tick => self.advance(now),
        }
    }

    /// Deadlines that have passed at `now`.
    pub fn due_timers(&self, now: Instant) -> Vec<TimerEvent> {
        let mut due = Vec::new();
        if let Some(pending) = self.gate.pending() {
            if now >= pending.timer.deadline() {
                due.push(TimerEvent::Confirm(pending.timer));
            }
        }
        if self.navigator.refresh_due(now) {
            due.push(TimerEvent::Refresh);
        }
        due
    }

    pub fn on_timer(&mut self, timer: TimerEvent, now: Instant) {
        match timer {
            TimerEvent::Confirm(handle) => {
                if let Some(label) = self.gate.fire(handle, now) {
                    self.dispatch(&label, now);
                }
            }
            TimerEvent::Refresh => {
                self.navigator.tick(now, &mut self.feedback);
            }
        }
    }

    /// Applies every due timer and expires the gesture indicator.
    pub fn advance(&mut self, now: Instant) {
        for timer in self.due_timers(now) {
            self.on_timer(timer, now);
        }
        if let Some(label) = self.gate.poll(now) {
            self.dispatch(&label, now);
        }
    }

    fn on_frame(&mut self, frame: &SourceFrame, now: Instant) {
        if !self.is_running() {
            debug!(status = ?self.status, "pipeline not running, dropping frame");
            return;
        }
        if frame.producer() != self.producer {
            debug!(
                expected = %self.producer,
                found = %frame.producer(),
                "frame from other producer"
            );
            return;
        }
        let Some(features) = extract_frame(frame, &mut self.window) else {
            return;
        };

        if let Some(label) = self.session.active_label().map(str::to_string) {
            self.session.record(features, Local::now());
            self.reports.push(PipelineReport::Sampled {
                label,
                count: self.session.pending_count(),
            });
            return;
        }

        let observation = match frame {
            SourceFrame::Landmarks(landmarks) => Observation::Hand {
                frame: landmarks,
                features: &features,
            },
            SourceFrame::Motion(_) => Observation::Motion {
                window: &self.window,
                features: &features,
            },
        };

        let classifier = self.active_classifier();
        let Some(classification) = classifier.classify(&observation) else {
            return;
        };
        debug!(
            classifier = classifier.name(),
            label = %classification.label,
            confidence = classification.confidence,
            "classified"
        );

        // a recognised motion pattern starts a fresh window
        if self.producer == Producer::Motion {
            self.window.clear();
        }

        let notice = self.gate.detect(&classification.label, now);
        self.reports.push(PipelineReport::Detected(classification));
        if let Some(notice) = notice {
            self.feedback.speak(&notice.message());
            self.feedback.vibrate(patterns::TICK);
            self.reports.push(PipelineReport::Notice(notice));
        }
    }

    fn active_classifier(&self) -> &dyn GestureClassifier {
        match (self.strategy, self.producer) {
            (ClassifierStrategy::Centroid, _) if self.centroid.is_trained() => &self.centroid,
            (_, Producer::Landmark) => &self.finger_state,
            (_, Producer::Motion) => &self.motion,
        }
    }

    fn dispatch(&mut self, label: &str, now: Instant) {
        let mut ctx = ActionContext {
            navigator: &mut self.navigator,
            feedback: &mut self.feedback,
            scroll_step: self.scroll_step,
            now,
        };
        let outcome = self.dispatcher.dispatch(label, &mut ctx);
        match &outcome {
            DispatchOutcome::Invoked => {
                info!(label, "gesture dispatched");
                self.feedback.vibrate(patterns::CONFIRM);
            }
            DispatchOutcome::Unbound => debug!(label, "gesture has no binding"),
            DispatchOutcome::Failed(err) => {
                self.feedback
                    .speak(&format!("{} failed: {err}", label.replace('_', " ")));
                self.feedback.vibrate(patterns::ERROR);
            }
        }
        self.reports.push(PipelineReport::Dispatched {
            label: label.to_string(),
            outcome,
        });
    }

    // ── Control ────────────────────────────────────────────

    /// Explicit user cancel of the pending gesture.
    pub fn cancel(&mut self) {
        if let Some(notice) = self.gate.cancel() {
            self.feedback.speak(&notice.message());
            self.reports.push(PipelineReport::Notice(notice));
        }
    }

    /// Cancels the confirmation timer, the refresh timer and the highlight,
    /// then drops frames until [`Pipeline::resume`].
    pub fn stop(&mut self) {
        self.halt();
        if self.status == PipelineStatus::Running {
            self.status = PipelineStatus::Stopped;
        }
        debug!("pipeline stopped");
    }

    /// Accepts frames again after [`Pipeline::stop`]. An inactive pipeline
    /// stays inactive.
    pub fn resume(&mut self) -> bool {
        if self.status != PipelineStatus::Stopped {
            return false;
        }
        self.status = PipelineStatus::Running;
        debug!("pipeline resumed");
        true
    }

    fn halt(&mut self) {
        self.gate.reset();
        self.navigator.stop();
        self.window.clear();
    }

    /// Stops everything and leaves the pipeline inactive. The error is handed
    /// back for the caller to surface.
    pub fn report_capability_error(&mut self, err: CapabilityError) -> CapabilityError {
        warn!(%err, "capability lost, pipeline inactive");
        self.halt();
        self.session.discard();
        self.status = PipelineStatus::Inactive(err.to_string());
        self.feedback.speak("Gesture control unavailable");
        self.feedback.vibrate(patterns::ERROR);
        err
    }

    // ── Training ───────────────────────────────────────────

    /// Starts collecting under `label`; frames are recorded instead of
    /// classified until collection stops. Returns samples flushed from a
    /// previous label.
    pub fn start_collecting(&mut self, label: &str) -> usize {
        self.gate.reset();
        self.window.clear();
        self.session.start_collecting(label, &mut self.training_set)
    }

    pub fn stop_collecting(&mut self) -> usize {
        self.session.stop_collecting(&mut self.training_set)
    }

    /// Adds externally stored samples to the training set.
    pub fn import_samples(&mut self, set: TrainingSet) {
        self.training_set.extend(set.all_samples().cloned());
    }

    pub fn clear_samples(&mut self) {
        self.session.discard();
        self.training_set.clear();
    }

    /// Trains the centroid classifier from every collected sample.
    pub fn train(&mut self) -> Result<TrainingReport, TrainingError> {
        self.stop_collecting();
        self.centroid.train(&self.training_set)
    }
}
