use std::{path::PathBuf, sync::Arc};

use crate::{
    foundation::error::{MemeError, MemeResult},
    text::fit::TextMeasurer,
};

// Shipped with the binary so caption rendering keeps working when the
// configured asset is missing or broken.
static FALLBACK_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Where the bytes of a resolved face came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontSource {
    /// Loaded from the configured on-disk asset.
    Asset,
    /// Statically embedded default face.
    Embedded,
}

/// A font face resolved at a specific size, registered and ready for layout.
#[derive(Clone, Debug)]
pub struct FontFace {
    /// Raw TTF/OTF bytes backing the face.
    pub bytes: Arc<Vec<u8>>,
    /// Size in points. Recomputed per caption because lengths differ.
    pub size: f32,
    /// Origin of `bytes`.
    pub source: FontSource,
    /// Family name the face registered under.
    pub family: String,
}

impl FontFace {
    /// Same face at a different size.
    pub fn at_size(&self, size: f32) -> FontFace {
        FontFace {
            bytes: Arc::clone(&self.bytes),
            size,
            source: self.source,
            family: self.family.clone(),
        }
    }
}

/// Obtains font faces, preferring a configured on-disk asset and falling back
/// to the embedded default face on any failure (missing, unreadable, or
/// unparsable asset).
///
/// The resolver is pure with respect to size: repeated calls yield the same
/// bytes, so the fit engine's measurements are stable across iterations.
#[derive(Clone, Debug)]
pub struct FontResolver {
    asset_path: Option<PathBuf>,
}

impl FontResolver {
    /// Resolver preferring `asset_path` when given.
    pub fn new(asset_path: Option<PathBuf>) -> Self {
        Self { asset_path }
    }

    /// Resolve and register a face at `size` points.
    ///
    /// Fails only if the embedded fallback itself cannot be registered, which
    /// is a packaging invariant violation rather than a runtime condition.
    pub fn resolve(&self, size: f32, engine: &mut TextEngine) -> MemeResult<FontFace> {
        if let Some(path) = &self.asset_path {
            if let Ok(bytes) = std::fs::read(path) {
                let bytes = Arc::new(bytes);
                if let Ok(family) = engine.register(&bytes) {
                    return Ok(FontFace {
                        bytes,
                        size,
                        source: FontSource::Asset,
                        family,
                    });
                }
                tracing::debug!(path = %path.display(), "font asset unusable, using embedded face");
            }
        }

        let bytes = Arc::new(FALLBACK_TTF.to_vec());
        let family = engine.register(&bytes)?;
        Ok(FontFace {
            bytes,
            size,
            source: FontSource::Embedded,
            family,
        })
    }
}

/// RGBA8 brush color carried through Parley text layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Stateful helper for registering faces and building Parley layouts.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    /// Fresh Parley contexts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register raw face bytes and return the primary family name.
    pub fn register(&mut self, bytes: &Arc<Vec<u8>>) -> MemeResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.as_ref().clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| MemeError::font_load("no font families registered from face bytes"))?;
        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| MemeError::font_load("registered font family has no name"))?
            .to_string();
        Ok(family)
    }

    /// Shape and lay out a single-line run of `text` in `family` at `size`.
    pub fn layout(
        &mut self,
        text: &str,
        family: &str,
        size: f32,
        brush: TextBrushRgba8,
    ) -> MemeResult<parley::Layout<TextBrushRgba8>> {
        if !size.is_finite() || size <= 0.0 {
            return Err(MemeError::font_load("text size must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family.to_string())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Intrinsic (width, height) of a built layout: max line advance by summed
/// line heights.
pub fn layout_size(layout: &parley::Layout<TextBrushRgba8>) -> (f32, f32) {
    let mut w = 0.0f32;
    let mut h = 0.0f32;
    for line in layout.lines() {
        let m = line.metrics();
        w = w.max(m.advance);
        h += m.ascent + m.descent + m.leading;
    }
    (w, h)
}

/// Parley-backed measurer bound to one resolved face, used by the fit search.
pub struct FaceMeasurer<'a> {
    engine: &'a mut TextEngine,
    family: String,
}

impl<'a> FaceMeasurer<'a> {
    /// Measurer for `face`, which must already be registered with `engine`.
    pub fn new(engine: &'a mut TextEngine, face: &FontFace) -> Self {
        Self {
            engine,
            family: face.family.clone(),
        }
    }
}

impl TextMeasurer for FaceMeasurer<'_> {
    fn measure_width(&mut self, text: &str, size: f32) -> MemeResult<f32> {
        let layout = self
            .engine
            .layout(text, &self.family, size, TextBrushRgba8::default())?;
        Ok(layout_size(&layout).0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/font.rs"]
mod tests;
