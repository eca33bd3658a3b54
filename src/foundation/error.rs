/// Convenience result type used across memeforge.
pub type MemeResult<T> = Result<T, MemeError>;

/// Top-level error taxonomy used by the generation pipeline.
#[derive(thiserror::Error, Debug)]
pub enum MemeError {
    /// The external model process failed to spawn or exited non-zero.
    /// Carries the captured diagnostic text (stderr) when available.
    #[error("model process failed: {0}")]
    Process(String),

    /// The external model produced no stdout after trimming whitespace.
    #[error("model produced no output")]
    EmptyOutput,

    /// The expected pattern or JSON payload could not be extracted from
    /// the model's output.
    #[error("unparsable model output: {0}")]
    Parse(String),

    /// The named artifact was absent from the invocation working directory.
    #[error("generated artifact missing: {0}")]
    ArtifactMissing(String),

    /// Moving the artifact into the managed output directory failed.
    #[error("artifact relocation failed: {0}")]
    Relocation(String),

    /// Image bytes could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// The composited image could not be encoded or written back.
    #[error("image encode failed: {0}")]
    Encode(String),

    /// A font face could not be registered. Only fatal when the embedded
    /// fallback face itself is unusable.
    #[error("font load failed: {0}")]
    FontLoad(String),

    /// Persistent store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MemeError {
    /// Build a [`MemeError::Process`] value.
    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    /// Build a [`MemeError::Parse`] value.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Build a [`MemeError::ArtifactMissing`] value.
    pub fn artifact_missing(msg: impl Into<String>) -> Self {
        Self::ArtifactMissing(msg.into())
    }

    /// Build a [`MemeError::Relocation`] value.
    pub fn relocation(msg: impl Into<String>) -> Self {
        Self::Relocation(msg.into())
    }

    /// Build a [`MemeError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`MemeError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`MemeError::FontLoad`] value.
    pub fn font_load(msg: impl Into<String>) -> Self {
        Self::FontLoad(msg.into())
    }

    /// Build a [`MemeError::Storage`] value.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<rusqlite::Error> for MemeError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
