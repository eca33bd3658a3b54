use std::{path::Path, sync::Arc};

use crate::{
    foundation::error::{MemeError, MemeResult},
    model::parse::CaptionPair,
    text::fit::{self, FitBounds},
    text::font::{FaceMeasurer, FontFace, FontResolver, TextBrushRgba8, TextEngine, layout_size},
};

// Square stamp neighborhood radius producing the uniform black stroke.
const OUTLINE_RADIUS: i32 = 3;
// Captions target 90% of the image width, leaving a 5% margin each side.
const TARGET_WIDTH_RATIO: f32 = 0.9;

fn outline_color() -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255)
}

fn fill_color() -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255)
}

/// Decodes an image, overlays up to two outlined captions, and re-encodes it
/// in place.
pub struct Compositor {
    resolver: FontResolver,
    bounds: FitBounds,
}

impl Compositor {
    /// Compositor drawing with faces from `resolver`, fit-bounded by `bounds`.
    pub fn new(resolver: FontResolver, bounds: FitBounds) -> Self {
        Self { resolver, bounds }
    }

    /// Overlay `captions` onto the PNG at `image_path`, overwriting it.
    ///
    /// A pair of empty captions is an immediate success that leaves the file
    /// bytes untouched. Decode and encode failures are hard errors; the
    /// original file stays intact unless the full re-encode succeeded (the
    /// write goes through a sibling temp file and an atomic rename).
    #[tracing::instrument(skip(self, captions))]
    pub fn overlay(&self, image_path: &Path, captions: &CaptionPair) -> MemeResult<()> {
        if captions.is_empty() {
            return Ok(());
        }

        let bytes = std::fs::read(image_path).map_err(|e| {
            MemeError::decode(format!("failed to read {}: {e}", image_path.display()))
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| {
            MemeError::decode(format!("failed to decode {}: {e}", image_path.display()))
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let width_u16: u16 = width
            .try_into()
            .map_err(|_| MemeError::decode("image width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| MemeError::decode("image height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        // Seed the canvas with the decoded image.
        let mut base = rgba.into_raw();
        premultiply_rgba8_in_place(&mut base);
        let pixmap = premul_bytes_to_pixmap(&base, width, height)?;
        let base_paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(base_paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));

        let mut engine = TextEngine::new();
        let w = width as f32;
        let h = height as f32;
        if !captions.top.is_empty() {
            self.draw_caption(&mut ctx, &mut engine, &captions.top, w, h, 0.1)?;
        }
        if !captions.bottom.is_empty() {
            self.draw_caption(&mut ctx, &mut engine, &captions.bottom, w, h, 0.9)?;
        }

        let mut out = vello_cpu::Pixmap::new(width_u16, height_u16);
        ctx.flush();
        ctx.render_to_pixmap(&mut out);

        let mut composited = out.data_as_u8_slice().to_vec();
        unpremultiply_rgba8_in_place(&mut composited);
        let out_img = image::RgbaImage::from_raw(width, height, composited)
            .ok_or_else(|| MemeError::encode("composited buffer size mismatch"))?;

        write_png_atomic(image_path, out_img)
    }

    // Fit, lay out, and stamp one caption, center-anchored on both axes at
    // (width/2, height * anchor_ratio). Fitting is recomputed here because
    // each caption's optimal size differs with its length.
    fn draw_caption(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        engine: &mut TextEngine,
        caption: &str,
        width: f32,
        height: f32,
        anchor_ratio: f32,
    ) -> MemeResult<()> {
        let text = caption.to_uppercase();

        let upper = (height / 10.0).clamp(self.bounds.min, self.bounds.max);
        let face = self.resolver.resolve(upper, engine)?;

        let size = {
            let mut measurer = FaceMeasurer::new(engine, &face);
            fit::fit_size(
                &text,
                width * TARGET_WIDTH_RATIO,
                height,
                self.bounds,
                &mut measurer,
            )
        };
        let face = face.at_size(size);
        tracing::debug!(size, source = ?face.source, "caption face fitted");

        let white = TextBrushRgba8 {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        };
        let layout = engine.layout(&text, &face.family, face.size, white)?;
        let (text_w, text_h) = layout_size(&layout);
        let anchor_x = f64::from((width - text_w) * 0.5);
        let anchor_y = f64::from(height * anchor_ratio - text_h * 0.5);

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(face.bytes.as_ref().clone()),
            0,
        );

        // Black outline: stamp the glyph run at every integer offset in a
        // radius-3 square around the anchor, excluding the zero offset. The
        // fixed offset set produces a uniform stroke rather than a halo.
        for dy in -OUTLINE_RADIUS..=OUTLINE_RADIUS {
            for dx in -OUTLINE_RADIUS..=OUTLINE_RADIUS {
                if dx == 0 && dy == 0 {
                    continue;
                }
                stamp_glyphs(
                    ctx,
                    &font,
                    &layout,
                    anchor_x + f64::from(dx),
                    anchor_y + f64::from(dy),
                    outline_color(),
                );
            }
        }
        // White fill last, at the exact anchor, so sampling a covered pixel
        // at the anchor yields the fill color.
        stamp_glyphs(ctx, &font, &layout, anchor_x, anchor_y, fill_color());

        Ok(())
    }
}

fn stamp_glyphs(
    ctx: &mut vello_cpu::RenderContext,
    font: &vello_cpu::peniko::FontData,
    layout: &parley::Layout<TextBrushRgba8>,
    x: f64,
    y: f64,
    color: vello_cpu::peniko::Color,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
    ctx.set_paint(color);
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> MemeResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| MemeError::decode("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| MemeError::decode("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(MemeError::decode("decoded image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

// Full encode into memory first; the destination path is only touched by the
// final rename, so a failed encode never leaves a partial file there.
fn write_png_atomic(path: &Path, img: image::RgbaImage) -> MemeResult<()> {
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut encoded),
            image::ImageFormat::Png,
        )
        .map_err(|e| MemeError::encode(format!("png encode failed: {e}")))?;

    let tmp = path.with_extension("png.tmp");
    std::fs::write(&tmp, &encoded)
        .map_err(|e| MemeError::encode(format!("failed to write {}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        MemeError::encode(format!("failed to replace {}: {e}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/compositor.rs"]
mod tests;
