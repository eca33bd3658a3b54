use crate::foundation::error::MemeResult;

/// Clamp applied to the height-derived upper bound of the fit search.
#[derive(Clone, Copy, Debug)]
pub struct FitBounds {
    /// Smallest allowed upper bound, in points.
    pub min: f32,
    /// Largest allowed upper bound, in points.
    pub max: f32,
}

impl Default for FitBounds {
    fn default() -> Self {
        Self {
            min: 20.0,
            max: 120.0,
        }
    }
}

// Lower bound the bisection may narrow down to.
const SEARCH_FLOOR: f32 = 12.0;
// Floor applied to the final result regardless of bisection outcome.
const LEGIBLE_FLOOR: f32 = 16.0;
const MAX_ITERATIONS: usize = 10;

/// Width-measurement capability consumed by the fit search.
///
/// Implementations must be stable: measuring the same text at the same size
/// twice yields the same width, otherwise the bisection cannot converge.
pub trait TextMeasurer {
    /// Rendered width of `text` at `size` points, in pixels.
    fn measure_width(&mut self, text: &str, size: f32) -> MemeResult<f32>;
}

/// Largest font size within bounds whose measured width of `text` does not
/// exceed `target_width`.
///
/// The upper bound derives from `image_height / 10` clamped to `bounds`; the
/// search bisects for at most ten iterations and exits early once the
/// interval narrows below one point. Fitting is best-effort: a measurement
/// failure mid-search returns the last candidate instead of propagating, so
/// font trouble can degrade the overlay but never block it. The result is
/// floored at 16 points for legibility.
///
/// `text` must already be uppercased by the caller so that fitting and
/// rendering use identical glyph metrics.
pub fn fit_size(
    text: &str,
    target_width: f32,
    image_height: f32,
    bounds: FitBounds,
    measurer: &mut dyn TextMeasurer,
) -> f32 {
    let mut max_size = (image_height / 10.0).clamp(bounds.min, bounds.max);
    let mut min_size = SEARCH_FLOOR;
    let mut size = max_size;

    for _ in 0..MAX_ITERATIONS {
        let Ok(width) = measurer.measure_width(text, size) else {
            break;
        };

        if width <= target_width {
            // Fits; try larger unless already at the ceiling.
            if size >= max_size {
                break;
            }
            min_size = size;
            size = (size + max_size) / 2.0;
        } else {
            max_size = size;
            size = (min_size + size) / 2.0;
        }

        if max_size - min_size < 1.0 {
            break;
        }
    }

    size.max(LEGIBLE_FLOOR)
}

#[cfg(test)]
#[path = "../../tests/unit/text/fit.rs"]
mod tests;
