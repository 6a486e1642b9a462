use std::sync::mpsc;
use std::time::{Duration, Instant};

use touchless::classifier::labels;
use touchless::config::Config;
use touchless::dispatch::DispatchOutcome;
use touchless::element_tree::{MemoryElement, MemoryTree};
use touchless::feedback::RecordingFeedback;
use touchless::landmarks::SourceFrame;
use touchless::navigator::{ElementHandle, Rect, TargetKind};
use touchless::runtime::{FixedTicker, PipelineEvent, Runner, TestEventSource};
use touchless::synth::Synthesizer;
use touchless::{Pipeline, PipelineReport};

// Headless integration using the runtime + pipeline against an in-memory tree.
// Each runner step advances a virtual clock by STEP so results do not depend
// on wall-clock scheduling.
const STEP: Duration = Duration::from_millis(100);

fn dashboard() -> MemoryTree {
    MemoryTree::new(800.0, 600.0, 1200.0)
        .with_element(MemoryElement::new(
            1,
            "Lights",
            TargetKind::Button,
            Rect::new(20.0, 20.0, 120.0, 40.0),
        ))
        .with_element(MemoryElement::new(
            2,
            "Blinds",
            TargetKind::Button,
            Rect::new(20.0, 120.0, 120.0, 40.0),
        ))
        .with_element(MemoryElement::new(
            3,
            "Energy report",
            TargetKind::Link,
            Rect::new(20.0, 900.0, 120.0, 40.0),
        ))
}

fn frame(synth: &mut Synthesizer, label: &str) -> PipelineEvent {
    PipelineEvent::Frame(SourceFrame::Landmarks(
        synth.hand_pose(label).expect("static pose"),
    ))
}

fn dispatched(reports: &[PipelineReport]) -> Vec<String> {
    reports
        .iter()
        .filter_map(|r| match r {
            PipelineReport::Dispatched { label, outcome } => {
                assert_eq!(outcome, &DispatchOutcome::Invoked, "{label}");
                Some(label.clone())
            }
            _ => None,
        })
        .collect()
}

/// Drives `steps` runner iterations on the virtual clock, collecting reports.
fn drive(
    runner: &Runner<TestEventSource, FixedTicker>,
    pipeline: &mut Pipeline<RecordingFeedback>,
    t0: Instant,
    steps: u32,
) -> Vec<PipelineReport> {
    let mut reports = Vec::new();
    for i in 0..steps {
        let now = t0 + STEP * i;
        let event = runner.step();
        pipeline.advance(now);
        pipeline.handle(event, now);
        reports.extend(pipeline.take_reports());
    }
    reports
}

fn runner() -> (mpsc::Sender<PipelineEvent>, Runner<TestEventSource, FixedTicker>) {
    let (tx, rx) = mpsc::channel();
    let es = TestEventSource::new(rx);
    let ticker = FixedTicker::new(Duration::from_millis(1));
    (tx, Runner::new(es, ticker))
}

#[test]
fn headless_navigation_flow() {
    let tree = dashboard();
    let mut pipeline = Pipeline::new(
        &Config::default(),
        Box::new(tree.clone()),
        RecordingFeedback::new(),
    );
    let mut synth = Synthesizer::new(11);
    let (tx, runner) = runner();
    let t0 = Instant::now();

    // start navigation: one open hand, then ticks until the delay runs out
    tx.send(frame(&mut synth, labels::OPEN_HAND)).unwrap();
    let reports = drive(&runner, &mut pipeline, t0, 20);
    assert_eq!(dispatched(&reports), vec!["open_hand"]);
    assert!(pipeline.navigator().is_active());
    assert_eq!(pipeline.navigator().current_index(), Some(0));
    // the off-screen report is not a target
    assert_eq!(
        pipeline.feedback().last_spoken(),
        Some("Lights, button, 1 of 2")
    );

    // point twice in a row confirms once and moves one target
    let t1 = t0 + STEP * 20;
    tx.send(frame(&mut synth, labels::POINT)).unwrap();
    tx.send(frame(&mut synth, labels::POINT)).unwrap();
    let reports = drive(&runner, &mut pipeline, t1, 20);
    assert_eq!(dispatched(&reports), vec!["point"]);
    assert_eq!(pipeline.navigator().current_index(), Some(1));

    // activate the selection
    let t2 = t1 + STEP * 20;
    tx.send(frame(&mut synth, labels::THUMBS_UP)).unwrap();
    let reports = drive(&runner, &mut pipeline, t2, 20);
    assert_eq!(dispatched(&reports), vec!["thumbs_up"]);
    assert_eq!(tree.triggered(), vec![ElementHandle(2)]);
}

#[test]
fn headless_newer_gesture_supersedes_pending() {
    let mut pipeline = Pipeline::new(
        &Config::default(),
        Box::new(dashboard()),
        RecordingFeedback::new(),
    );
    let mut synth = Synthesizer::new(12);
    let (tx, runner) = runner();
    let t0 = Instant::now();

    tx.send(frame(&mut synth, labels::PEACE)).unwrap();
    let mut reports = drive(&runner, &mut pipeline, t0, 10);
    assert!(dispatched(&reports).is_empty());

    // one second into the delay a different gesture replaces it
    tx.send(frame(&mut synth, labels::OPEN_HAND)).unwrap();
    reports.extend(drive(&runner, &mut pipeline, t0 + STEP * 10, 14));
    assert!(dispatched(&reports).is_empty(), "old deadline must not fire");

    reports.extend(drive(&runner, &mut pipeline, t0 + STEP * 24, 5));
    assert_eq!(dispatched(&reports), vec!["open_hand"]);
    assert!(pipeline.navigator().is_active());
}

#[test]
fn headless_stop_cancels_pending_gesture() {
    let mut pipeline = Pipeline::new(
        &Config::default(),
        Box::new(dashboard()),
        RecordingFeedback::new(),
    );
    let mut synth = Synthesizer::new(13);
    let (tx, runner) = runner();
    let t0 = Instant::now();

    tx.send(frame(&mut synth, labels::OPEN_HAND)).unwrap();
    tx.send(PipelineEvent::Stop).unwrap();
    let reports = drive(&runner, &mut pipeline, t0, 30);
    assert!(dispatched(&reports).is_empty());
    assert!(!pipeline.gate().is_pending());
    assert!(!pipeline.navigator().is_active());

    // still stopped: later gestures are dropped until resumed
    tx.send(frame(&mut synth, labels::OPEN_HAND)).unwrap();
    let reports = drive(&runner, &mut pipeline, t0 + STEP * 30, 30);
    assert!(reports.is_empty());
    assert_eq!(pipeline.gate().current_indicator(), None);

    tx.send(PipelineEvent::Resume).unwrap();
    tx.send(frame(&mut synth, labels::OPEN_HAND)).unwrap();
    let reports = drive(&runner, &mut pipeline, t0 + STEP * 60, 20);
    assert_eq!(dispatched(&reports), vec!["open_hand"]);
}

#[test]
fn headless_cancel_is_announced() {
    let mut pipeline = Pipeline::new(
        &Config::default(),
        Box::new(dashboard()),
        RecordingFeedback::new(),
    );
    let mut synth = Synthesizer::new(14);
    let (tx, runner) = runner();

    tx.send(frame(&mut synth, labels::FIST)).unwrap();
    tx.send(PipelineEvent::Cancel).unwrap();
    let reports = drive(&runner, &mut pipeline, Instant::now(), 30);
    assert!(dispatched(&reports).is_empty());
    assert_eq!(pipeline.feedback().last_spoken(), Some("fist cancelled"));
}

#[test]
fn headless_wall_clock_loop_dispatches() {
    let config = Config {
        confirmation_delay_ms: 20,
        ..Config::default()
    };
    let mut pipeline = Pipeline::new(&config, Box::new(dashboard()), RecordingFeedback::new());
    let mut synth = Synthesizer::new(15);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(frame(&mut synth, labels::OPEN_HAND)).unwrap();
    // bounded: up to ~1s of ticks
    for _ in 0..200u32 {
        runner.step_pipeline(&mut pipeline);
        if pipeline.navigator().is_active() {
            break;
        }
    }
    assert!(pipeline.navigator().is_active(), "open hand should confirm");
    assert_eq!(dispatched(&pipeline.take_reports()), vec!["open_hand"]);
}
