use std::{
    path::{Path, PathBuf},
    process::Command,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context as _;

use crate::{
    foundation::error::{MemeError, MemeResult},
    model::parse::{self, CaptionPair},
};

/// Configuration for driving the external generative-model binary.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Executable invoked as `<binary> run <model> <prompt>`.
    pub binary: PathBuf,
    /// Model identifier used for image generation.
    pub image_model: String,
    /// Model identifier used for caption generation.
    pub text_model: String,
    /// Managed directory finished artifacts are relocated into.
    pub output_dir: PathBuf,
    /// Root under which per-invocation staging directories are created.
    pub staging_root: PathBuf,
}

/// Spawns the external model binary and turns its unstructured output into
/// artifacts and captions.
///
/// Each image invocation runs in its own staging directory under
/// `staging_root`, so concurrent requests can never collide on the working
/// directory the external tool writes into.
#[derive(Debug)]
pub struct ModelRunner {
    cfg: RunnerConfig,
    invocation_seq: AtomicU64,
}

impl ModelRunner {
    /// Build a runner from `cfg`. No filesystem work happens until the first
    /// invocation.
    pub fn new(cfg: RunnerConfig) -> Self {
        Self {
            cfg,
            invocation_seq: AtomicU64::new(0),
        }
    }

    /// Generate an image for `prompt` and relocate the produced artifact into
    /// the managed output directory.
    ///
    /// When `system_prompt` is present the full prompt is composed as
    /// `preamble + "\n\n" + prompt`. Returns the bare artifact filename;
    /// callers join it with the managed directory themselves.
    #[tracing::instrument(skip_all)]
    pub fn generate_image(&self, prompt: &str, system_prompt: Option<&str>) -> MemeResult<String> {
        let full_prompt = match system_prompt {
            Some(preamble) if !preamble.is_empty() => format!("{preamble}\n\n{prompt}"),
            _ => prompt.to_string(),
        };

        let staging = self.create_staging_dir()?;
        let result = self.generate_image_in(&full_prompt, &staging);
        // The artifact has already been moved out on success; anything left
        // behind is model litter.
        let _ = std::fs::remove_dir_all(&staging);
        result
    }

    fn generate_image_in(&self, full_prompt: &str, staging: &Path) -> MemeResult<String> {
        let stdout = self.run_model(&self.cfg.image_model, full_prompt, Some(staging))?;

        let extracted = parse::extract_artifact_name(&stdout)?;
        // The model is trusted to name a file, never a location.
        let filename = sanitize_filename(&extracted)?;

        let produced = staging.join(&filename);
        if !produced.exists() {
            return Err(MemeError::artifact_missing(format!(
                "generated image not found at {}",
                produced.display()
            )));
        }

        let dest = self.cfg.output_dir.join(&filename);
        std::fs::rename(&produced, &dest).map_err(|e| {
            MemeError::relocation(format!(
                "failed to move {} to {}: {e}",
                produced.display(),
                dest.display()
            ))
        })?;

        tracing::debug!(filename = %filename, "artifact relocated");
        Ok(filename)
    }

    /// Ask the text model for a caption pair for `prompt`.
    ///
    /// Process failure, empty output, and unparsable output are all hard
    /// errors. An explicit `{"topText":"","bottomText":""}` response is a
    /// success with empty captions, which is a different outcome.
    #[tracing::instrument(skip_all)]
    pub fn generate_captions(&self, prompt: &str) -> MemeResult<CaptionPair> {
        let instruction = caption_instruction(prompt);
        let stdout = self.run_model(&self.cfg.text_model, &instruction, None)?;
        parse::extract_caption_pair(&stdout)
    }

    // Run one model invocation to completion, capturing stdout and stderr
    // separately. Stderr is kept for diagnostics only and never parsed for
    // success.
    fn run_model(&self, model: &str, prompt: &str, work_dir: Option<&Path>) -> MemeResult<String> {
        let mut cmd = Command::new(&self.cfg.binary);
        cmd.args(["run", model, prompt]);
        if let Some(dir) = work_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| {
            MemeError::process(format!(
                "failed to run {}: {e}",
                self.cfg.binary.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MemeError::process(format!(
                "{} exited with {}: {}",
                self.cfg.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(MemeError::EmptyOutput);
        }
        Ok(stdout)
    }

    fn create_staging_dir(&self) -> MemeResult<PathBuf> {
        let seq = self.invocation_seq.fetch_add(1, Ordering::Relaxed);
        let dir = self
            .cfg
            .staging_root
            .join(format!("job-{}-{seq}", std::process::id()));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create staging directory '{}'", dir.display()))?;
        Ok(dir)
    }
}

/// Reduce a model-reported path to its base name so a join can never escape
/// the staging or managed output directories.
pub fn sanitize_filename(name: &str) -> MemeResult<String> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
        .ok_or_else(|| MemeError::parse(format!("artifact name '{name}' has no usable file name")))
}

fn caption_instruction(prompt: &str) -> String {
    format!(
        "Generate meme text for: {prompt}\n\nRespond ONLY with valid JSON in this exact format: \
         {{\"topText\":\"text here\",\"bottomText\":\"text here\"}}. Keep text SHORT and FUNNY."
    )
}

#[cfg(test)]
#[path = "../../tests/unit/model/runner.rs"]
mod tests;
