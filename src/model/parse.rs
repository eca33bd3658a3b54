use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::foundation::error::{MemeError, MemeResult};

/// Top/bottom caption text produced by the text model.
///
/// Empty strings are a legal success meaning "no caption here" and are kept
/// distinct from a parse failure: callers must never render blank captions as
/// a stand-in for an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptionPair {
    /// Caption drawn at 10% of image height. May be empty.
    pub top: String,
    /// Caption drawn at 90% of image height. May be empty.
    pub bottom: String,
}

impl CaptionPair {
    /// True when neither caption carries any text.
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.bottom.is_empty()
    }
}

// The image model prints a human-oriented progress log; the only line we
// trust is the literal save marker followed by a .png path.
static ARTIFACT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Image saved to:\s+(.+\.png)").expect("static regex"));

const TOP_KEYS: [&str; 4] = ["topText", "top_text", "TopText", "top"];
const BOTTOM_KEYS: [&str; 4] = ["bottomText", "bottom_text", "BottomText", "bottom"];

/// Extract the artifact path from free-form model stdout.
///
/// Scans for the first occurrence of `Image saved to:` followed by a path
/// ending in `.png` and returns the trimmed path segment. There is no
/// fallback heuristic: a false-positive extraction risks relocating or
/// serving the wrong file.
pub fn extract_artifact_name(stdout: &str) -> MemeResult<String> {
    let caps = ARTIFACT_MARKER
        .captures(stdout)
        .ok_or_else(|| MemeError::parse("could not find 'Image saved to:' pattern in output"))?;
    Ok(caps[1].trim().to_string())
}

/// Extract a caption pair from free-form model stdout.
///
/// The model may wrap its JSON object in commentary, so the substring between
/// the first `{` and the last `}` is isolated before parsing. A missing or
/// malformed JSON object is a hard failure; a missing caption key under all
/// aliases degrades to an empty caption.
pub fn extract_caption_pair(stdout: &str) -> MemeResult<CaptionPair> {
    let (Some(start), Some(end)) = (stdout.find('{'), stdout.rfind('}')) else {
        return Err(MemeError::parse("no JSON object found in output"));
    };
    if end <= start {
        return Err(MemeError::parse("no JSON object found in output"));
    }

    let value: Value = serde_json::from_str(&stdout[start..=end])
        .map_err(|e| MemeError::parse(format!("invalid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(MemeError::parse("model output is not a JSON object"));
    };

    Ok(CaptionPair {
        top: string_field(&map, &TOP_KEYS),
        bottom: string_field(&map, &BOTTOM_KEYS),
    })
}

// Probe candidate key names in priority order and take the first text-typed
// value. Absent or non-text values under every alias resolve to "".
fn string_field(map: &serde_json::Map<String, Value>, keys: &[&str]) -> String {
    for key in keys {
        if let Some(Value::String(s)) = map.get(*key) {
            return s.clone();
        }
    }
    String::new()
}

#[cfg(test)]
#[path = "../../tests/unit/model/parse.rs"]
mod tests;
