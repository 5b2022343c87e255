//! Visual styles.
//!
//! A style decides what a frame looks like. Everything else, the loop,
//! sizing and colour resolution, is provided by [`crate::Visualiser`]
//! through the [`Frame`] it hands to [`Style::draw`].

mod bar_graph;
mod block_graph;
mod curve;
mod oscilloscope;

pub use bar_graph::BarGraph;
pub use block_graph::BlockGraph;
pub use curve::FrequencyCurve;
pub use oscilloscope::Oscilloscope;

use crate::math::{height_proportion, CANVAS_PADDING_TOP_RATIO};
use crate::visualiser::Frame;
use crate::FftSize;

pub const DEFAULT_COLUMN_COUNT: usize = 32;
pub const DEFAULT_LINE_WIDTH: f64 = 3.0;

/// Transform size the frequency styles ask for.
pub const GRAPH_FFT_SIZE: FftSize = FftSize::S16384;

pub trait Style {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Transform size used when the configuration does not set one.
    fn preferred_fft_size(&self) -> FftSize {
        GRAPH_FFT_SIZE
    }

    /// Paints one frame and returns whether anything reached the surface.
    /// Returns `false` without drawing if the surface has no context or
    /// there is no analyser to pull from.
    fn draw(&mut self, frame: &mut Frame<'_>) -> bool;
}

/// Pixel height for a band average on a surface `height` pixels tall.
pub fn bar_height(value: f32, height: f64) -> f64 {
    f64::from(height_proportion(value)) * height * f64::from(CANVAS_PADDING_TOP_RATIO)
}

fn default_column_count() -> usize {
    DEFAULT_COLUMN_COUNT
}

fn default_line_width() -> f64 {
    DEFAULT_LINE_WIDTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn full_scale_reaches_padding_line() {
        assert_relative_eq!(bar_height(255.0, 200.0), 198.0, epsilon = 1e-4);
        assert_relative_eq!(bar_height(0.0, 200.0), 0.0);
    }
}
