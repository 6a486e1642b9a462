// Library surface for the binary, headless integration tests and embedding.
pub mod actions;
pub mod app_dirs;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod element_tree;
pub mod features;
pub mod feedback;
pub mod gate;
pub mod landmarks;
pub mod model_store;
pub mod navigator;
pub mod pipeline;
pub mod recording;
pub mod runtime;
pub mod sample_db;
pub mod synth;
pub mod training;
pub mod util;

pub use model_store::StoreError;
pub use pipeline::{CapabilityError, Pipeline, PipelineReport, PipelineStatus, TimerEvent};
