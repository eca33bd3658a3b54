//! Memeforge turns a natural-language prompt into a captioned meme image.
//!
//! The pipeline drives an external generative-model CLI (`ollama`-style) as a
//! subprocess, extracts the produced artifact and a caption payload from its
//! unstructured output, and composites auto-sized, outlined caption text onto
//! the produced PNG.
//!
//! # Pipeline overview
//!
//! 1. **Run**: `ModelRunner` spawns the image model in a per-invocation
//!    staging directory and relocates the artifact into the managed output
//!    directory.
//! 2. **Parse**: the artifact path and the caption JSON are pattern-matched
//!    out of free-form process stdout ([`model::parse`]).
//! 3. **Fit**: per caption, a bounded bisection finds the largest font size
//!    whose measured width fits 90% of the image width ([`text::fit`]).
//! 4. **Composite**: `Compositor` decodes the artifact, stamps each caption
//!    as a black outline plus white fill, and atomically re-encodes it.
//!
//! Everything above the pipeline (SQLite record store, axum HTTP views) lives
//! in [`store`] and [`web`] and stays thin: all algorithmic content is in the
//! pipeline modules.
#![forbid(unsafe_code)]

mod foundation;

/// Process driving and output parsing for the external model binary.
pub mod model;
/// The end-to-end generation pipeline.
pub mod pipeline;
/// SQLite-backed generation records and settings.
pub mod store;
/// Font resolution, measurement, and size fitting.
pub mod text;
/// HTTP routes and HTML views.
pub mod web;

/// Image decode, caption overlay, and re-encode.
pub mod overlay;

pub use foundation::error::{MemeError, MemeResult};
pub use model::parse::{CaptionPair, extract_artifact_name, extract_caption_pair};
pub use model::runner::{ModelRunner, RunnerConfig, sanitize_filename};
pub use overlay::compositor::Compositor;
pub use pipeline::{GenerationOutput, MemePipeline};
pub use store::db::{
    DEFAULT_SYSTEM_PROMPT, Generation, GenerationStatus, GenerationStore, SYSTEM_PROMPT_KEY,
};
pub use text::fit::{FitBounds, TextMeasurer, fit_size};
pub use text::font::{FontFace, FontResolver, FontSource, TextEngine};
