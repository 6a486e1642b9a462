use std::{
    error::Error,
    fs::File,
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use touchless::{
    app_dirs::AppDirs,
    classifier::{CentroidClassifier, ClassifierStrategy, TrainableClassifier},
    config::{Config, ConfigStore, FileConfigStore},
    dispatch::DispatchOutcome,
    element_tree::{Layout, MemoryElement, MemoryTree},
    feedback::{LogFeedback, SilentFeedback},
    landmarks::Producer,
    model_store::{FileModelStore, ModelStore},
    navigator::{Rect, TargetKind, Viewport},
    recording::{read_frames, write_frames, RecordedFrame},
    runtime::PipelineEvent,
    sample_db::{export_csv, import_csv, SampleDb},
    synth::{Synthesizer, MAX_JITTER},
    Pipeline, PipelineReport,
};

/// touchless gesture control for dashboards, headless
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Turns hand-landmark or motion recordings into confirmed gestures and drives focus navigation over a dashboard layout. Also collects training samples and trains the nearest-centroid classifier."
)]
pub struct Cli {
    /// directory for config, model and sample database (default: platform dirs)
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    /// frame producer to accept
    #[clap(long, value_enum, global = true)]
    producer: Option<Producer>,

    /// classifier strategy
    #[clap(long, value_enum, global = true)]
    strategy: Option<ClassifierStrategy>,

    /// confirmation delay in milliseconds
    #[clap(long, global = true)]
    delay_ms: Option<u64>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// drive the pipeline over a JSON Lines recording
    Replay {
        #[clap(long)]
        frames: PathBuf,
        /// element layout (JSON); a small demo dashboard when omitted
        #[clap(long)]
        layout: Option<PathBuf>,
        /// centroid model (JSON); the saved model when omitted
        #[clap(long)]
        model: Option<PathBuf>,
    },
    /// write a synthetic recording to stdout
    Synth {
        #[clap(long)]
        gesture: String,
        #[clap(long, default_value_t = 60)]
        count: usize,
        #[clap(long, default_value_t = 0.01)]
        jitter: f32,
        #[clap(long, default_value_t = 0)]
        seed: u64,
    },
    /// store every frame of a recording as a training sample
    Collect {
        #[clap(long)]
        frames: PathBuf,
        #[clap(long)]
        label: String,
    },
    /// train the centroid model from stored samples
    Train,
    /// write stored samples to CSV
    ExportSamples {
        #[clap(long)]
        out: PathBuf,
    },
    /// load samples from CSV into the database
    ImportSamples {
        #[clap(long)]
        input: PathBuf,
    },
    /// print the resolved configuration and paths
    Config {
        /// write the resolved configuration back to the config file
        #[clap(long)]
        save: bool,
    },
}

impl Cli {
    fn app_dirs(&self) -> AppDirs {
        match &self.data_dir {
            Some(dir) => AppDirs::with_data_dir(dir),
            None => AppDirs::new(),
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match self.app_dirs().config_path() {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    /// Stored config with command-line overrides applied
    fn resolve_config(&self) -> Config {
        let mut config = self.config_store().load();
        if let Some(producer) = self.producer {
            config.producer = producer;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.confirmation_delay_ms = delay_ms;
        }
        config
    }

    fn model_store(&self) -> FileModelStore {
        match self.app_dirs().model_path() {
            Some(path) => FileModelStore::with_path(path),
            None => FileModelStore::new(),
        }
    }

    fn sample_db(&self) -> Result<SampleDb, Box<dyn Error>> {
        let path = self
            .app_dirs()
            .db_path()
            .ok_or("could not resolve the sample database path")?;
        Ok(SampleDb::open(path)?)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "touchless=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config();

    match &cli.command {
        Command::Replay {
            frames,
            layout,
            model,
        } => replay(&cli, &config, frames, layout.as_deref(), model.as_deref()),
        Command::Synth {
            gesture,
            count,
            jitter,
            seed,
        } => synth(&config, gesture, *count, *jitter, *seed),
        Command::Collect { frames, label } => collect(&cli, &config, frames, label),
        Command::Train => train(&cli, &config),
        Command::ExportSamples { out } => {
            let set = cli.sample_db()?.load_training_set(config.producer)?;
            let written = export_csv(&set, BufWriter::new(File::create(out)?))?;
            println!("exported {written} {} samples to {}", config.producer, out.display());
            Ok(())
        }
        Command::ImportSamples { input } => {
            let set = import_csv(BufReader::new(File::open(input)?))?;
            let inserted = cli
                .sample_db()?
                .insert_samples(config.producer, set.all_samples())?;
            println!("imported {inserted} {} samples", config.producer);
            Ok(())
        }
        Command::Config { save } => {
            let dirs = cli.app_dirs();
            println!("{}", serde_json::to_string_pretty(&config)?);
            let show = |p: Option<PathBuf>| p.map_or("-".to_string(), |p| p.display().to_string());
            println!("config:  {}", show(dirs.config_path()));
            println!("model:   {}", show(dirs.model_path()));
            println!("samples: {}", show(dirs.db_path()));
            if *save {
                cli.config_store().save(&config)?;
            }
            Ok(())
        }
    }
}

fn demo_layout() -> Layout {
    let tile = |id, label: &str, kind, x, y| {
        MemoryElement::new(id, label, kind, Rect::new(x, y, 180.0, 60.0))
    };
    Layout {
        viewport: Viewport {
            scroll_top: 0.0,
            width: 800.0,
            height: 600.0,
            content_height: 1400.0,
        },
        elements: vec![
            tile(1, "Search devices", TargetKind::Input, 20.0, 20.0),
            tile(2, "Living room lights", TargetKind::Button, 20.0, 120.0),
            tile(3, "Kitchen lights", TargetKind::Button, 220.0, 124.0),
            tile(4, "Blinds", TargetKind::Button, 420.0, 118.0),
            tile(5, "Thermostat", TargetKind::Link, 20.0, 240.0),
            tile(6, "Front door camera", TargetKind::Button, 220.0, 240.0),
            tile(7, "Energy report", TargetKind::Link, 20.0, 900.0),
        ],
    }
}

fn read_recording(path: &Path) -> Result<Vec<RecordedFrame>, Box<dyn Error>> {
    Ok(read_frames(BufReader::new(File::open(path)?))?)
}

fn replay(
    cli: &Cli,
    config: &Config,
    frames: &Path,
    layout: Option<&Path>,
    model: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let layout = match layout {
        Some(path) => Layout::load(path)?,
        None => demo_layout(),
    };
    let tree = MemoryTree::from_layout(layout);
    let mut pipeline = Pipeline::new(config, Box::new(tree), LogFeedback);

    let saved = match model {
        Some(path) => FileModelStore::with_path(path).load()?,
        None => cli.model_store().load()?,
    };
    if let Some(saved) = saved {
        if !pipeline.load_model(saved) {
            info!("saved model does not match the {} producer", config.producer);
        }
    }

    let recording = read_recording(frames)?;
    info!(
        frames = recording.len(),
        producer = %config.producer,
        strategy = %config.strategy,
        "replaying"
    );

    // virtual clock: frame offsets from one fixed origin
    let origin = Instant::now();
    let mut last_ms = 0;
    for recorded in recording {
        let at = origin + Duration::from_millis(recorded.t_ms);
        pipeline.advance(at);
        pipeline.handle(PipelineEvent::Frame(recorded.frame), at);
        print_reports(recorded.t_ms, pipeline.take_reports());
        last_ms = recorded.t_ms;
    }

    // let a trailing pending gesture run out its delay
    let end_ms = last_ms + config.confirmation_delay_ms;
    pipeline.advance(origin + Duration::from_millis(end_ms));
    print_reports(end_ms, pipeline.take_reports());

    let nav = pipeline.navigator();
    match nav.selected() {
        Some(target) if nav.is_active() => println!(
            "navigation on: {} ({} of {})",
            target.label,
            target.ordinal + 1,
            nav.targets().len()
        ),
        _ if nav.is_active() => println!("navigation on: nothing selected"),
        _ => println!("navigation off"),
    }
    Ok(())
}

fn print_reports(t_ms: u64, reports: Vec<PipelineReport>) {
    for report in reports {
        match report {
            PipelineReport::Detected(c) => {
                println!("{t_ms:>7} ms  detected {} ({:.2})", c.label, c.confidence)
            }
            PipelineReport::Notice(notice) => println!("{t_ms:>7} ms  {}", notice.message()),
            PipelineReport::Dispatched { label, outcome } => match outcome {
                DispatchOutcome::Invoked => println!("{t_ms:>7} ms  dispatched {label}"),
                DispatchOutcome::Unbound => println!("{t_ms:>7} ms  {label} has no binding"),
                DispatchOutcome::Failed(err) => println!("{t_ms:>7} ms  {label} failed: {err}"),
            },
            PipelineReport::Sampled { .. } => {}
        }
    }
}

fn synth(
    config: &Config,
    gesture: &str,
    count: usize,
    jitter: f32,
    seed: u64,
) -> Result<(), Box<dyn Error>> {
    if !(0.0..=MAX_JITTER).contains(&jitter) {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::InvalidValue,
            format!("--jitter must be within 0..={MAX_JITTER}"),
        )
        .exit();
    }
    let Some(frames) = Synthesizer::new(seed)
        .with_jitter(jitter)
        .recording(config.producer, gesture, count)
    else {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::InvalidValue,
            format!("no synthetic {} frames for gesture '{gesture}'", config.producer),
        )
        .exit();
    };
    write_frames(BufWriter::new(io::stdout().lock()), &frames)?;
    Ok(())
}

fn collect(cli: &Cli, config: &Config, frames: &Path, label: &str) -> Result<(), Box<dyn Error>> {
    let mut pipeline = Pipeline::new(
        config,
        Box::new(MemoryTree::new(800.0, 600.0, 600.0)),
        SilentFeedback,
    );
    pipeline.start_collecting(label);
    let origin = Instant::now();
    for recorded in read_recording(frames)? {
        let at = origin + Duration::from_millis(recorded.t_ms);
        pipeline.handle(PipelineEvent::Frame(recorded.frame), at);
    }
    pipeline.stop_collecting();

    let samples = pipeline.training_set().samples_for(label);
    let stored = cli.sample_db()?.insert_samples(config.producer, samples)?;
    println!("collected {stored} {} samples for '{label}'", config.producer);
    Ok(())
}

fn train(cli: &Cli, config: &Config) -> Result<(), Box<dyn Error>> {
    let set = cli.sample_db()?.load_training_set(config.producer)?;
    let mut classifier = CentroidClassifier::new(config.producer)
        .with_min_samples(config.min_samples())
        .with_threshold(config.similarity_threshold);
    let report = classifier.train(&set)?;

    let store = cli.model_store();
    if let Some(model) = classifier.model() {
        store.save(model)?;
    }
    println!(
        "trained {} labels ({}) from {} samples, saved to {}",
        report.labels.len(),
        report.labels.join(", "),
        report.samples_used,
        store.path().display()
    );
    Ok(())
}
