use super::*;

// Width grows linearly with both text length and size, which is a good enough
// model of a real face for exercising the search.
struct LinearMeasurer {
    px_per_char_point: f32,
}

impl TextMeasurer for LinearMeasurer {
    fn measure_width(&mut self, text: &str, size: f32) -> MemeResult<f32> {
        Ok(text.chars().count() as f32 * size * self.px_per_char_point)
    }
}

struct FailingMeasurer;

impl TextMeasurer for FailingMeasurer {
    fn measure_width(&mut self, _text: &str, _size: f32) -> MemeResult<f32> {
        Err(crate::foundation::error::MemeError::font_load("no face"))
    }
}

#[test]
fn short_text_hits_the_height_derived_ceiling() {
    let mut m = LinearMeasurer {
        px_per_char_point: 0.001,
    };
    let size = fit_size("HI", 900.0, 1000.0, FitBounds::default(), &mut m);
    assert_eq!(size, 100.0);
}

#[test]
fn ceiling_is_clamped_to_bounds() {
    let mut m = LinearMeasurer {
        px_per_char_point: 0.001,
    };
    // height / 10 = 10 is below the lower clamp.
    let small = fit_size("HI", 900.0, 100.0, FitBounds::default(), &mut m);
    assert_eq!(small, 20.0);

    // height / 10 = 300 is above the upper clamp.
    let large = fit_size("HI", 90000.0, 3000.0, FitBounds::default(), &mut m);
    assert_eq!(large, 120.0);
}

#[test]
fn oversized_text_is_floored_for_legibility() {
    let mut m = LinearMeasurer {
        px_per_char_point: 1000.0,
    };
    let size = fit_size(
        "THIS NEVER FITS ANYWHERE",
        900.0,
        1000.0,
        FitBounds::default(),
        &mut m,
    );
    assert_eq!(size, 16.0);
}

#[test]
fn converges_near_the_exact_fitting_size() {
    let mut m = LinearMeasurer {
        px_per_char_point: 1.0,
    };
    // 30 chars at size s measure 30s px, so 900 px fits exactly at s = 30.
    let text = "X".repeat(30);
    let size = fit_size(&text, 900.0, 1000.0, FitBounds::default(), &mut m);
    assert!((29.0..=31.25).contains(&size), "size = {size}");
    assert!(size * 30.0 <= 940.0);
}

#[test]
fn longer_text_never_gets_a_larger_size() {
    let mut m = LinearMeasurer {
        px_per_char_point: 1.0,
    };
    let mut last = f32::INFINITY;
    for len in [2usize, 8, 16, 32, 64, 128] {
        let text = "X".repeat(len);
        let size = fit_size(&text, 900.0, 1000.0, FitBounds::default(), &mut m);
        assert!(size <= last + 0.001, "len {len}: {size} > {last}");
        last = size;
    }
}

#[test]
fn measurement_failure_degrades_to_the_current_candidate() {
    let size = fit_size("X", 900.0, 1000.0, FitBounds::default(), &mut FailingMeasurer);
    assert_eq!(size, 100.0);
}

#[test]
fn result_is_always_within_legible_range() {
    for len in 1..60 {
        let mut m = LinearMeasurer {
            px_per_char_point: 0.7,
        };
        let text = "X".repeat(len);
        let size = fit_size(&text, 576.0, 480.0, FitBounds::default(), &mut m);
        assert!((16.0..=48.0).contains(&size), "len {len}: size = {size}");
    }
}
