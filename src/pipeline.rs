use std::path::PathBuf;

use crate::{
    foundation::error::MemeResult,
    model::parse::CaptionPair,
    model::runner::ModelRunner,
    overlay::compositor::Compositor,
};

/// Everything one successful generation produced.
#[derive(Clone, Debug)]
pub struct GenerationOutput {
    /// Bare artifact filename under the managed output directory.
    pub filename: String,
    /// Captions composited onto the artifact. May be empty on both sides when
    /// the text model explicitly chose to omit them.
    pub captions: CaptionPair,
}

/// Ties runner and compositor into one strictly sequential generation
/// pipeline: image generation completes before caption generation starts,
/// which completes before the overlay touches the artifact.
pub struct MemePipeline {
    runner: ModelRunner,
    compositor: Compositor,
    output_dir: PathBuf,
}

impl MemePipeline {
    /// Pipeline relocating artifacts into (and compositing under)
    /// `output_dir`, which must match the runner's managed directory.
    pub fn new(runner: ModelRunner, compositor: Compositor, output_dir: PathBuf) -> Self {
        Self {
            runner,
            compositor,
            output_dir,
        }
    }

    /// Run one full generation for `prompt`.
    ///
    /// Caption-generation failure is terminal for the whole generation: blank
    /// captions only ever appear when the model explicitly returned them, so
    /// a failure here is never collapsed into an empty overlay.
    #[tracing::instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> MemeResult<GenerationOutput> {
        let filename = self.runner.generate_image(prompt, system_prompt)?;
        let captions = self.runner.generate_captions(prompt)?;

        let image_path = self.output_dir.join(&filename);
        self.compositor.overlay(&image_path, &captions)?;

        tracing::info!(filename = %filename, "generation complete");
        Ok(GenerationOutput { filename, captions })
    }
}
