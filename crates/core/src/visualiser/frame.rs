use tracing::warn;

use super::callbacks::{CallbackRegistry, VisualiserEvent};
use super::{Hooks, PaintState};
use crate::audio::{AnalyserSource, SharedAnalyser};
use crate::bands::frequency_averages;
use crate::config::FillColor;
use crate::render::{ComputedStyle, DrawContext, Fill, LinearGradient, Surface, SurfaceSize};
use crate::FftSize;

pub const DEFAULT_BACKGROUND_COLOR: &str = "white";
pub const DEFAULT_FOREGROUND_COLOR: &str = "black";

/// Resolves a fill specification for the rectangle spanned by
/// `coordinates` (`[x0, y0, x1, y1]`).
///
/// Solid colours come back unchanged. Lists of two or more colours become a
/// gradient from the first point to the second with evenly spaced stops.
pub fn resolve_fill(spec: &FillColor, coordinates: [f64; 4]) -> Option<Fill> {
    match spec {
        FillColor::Solid(color) => Some(Fill::Color(color.clone())),
        FillColor::List(colors) => match colors.as_slice() {
            [] => None,
            [only] => Some(Fill::Color(only.clone())),
            _ => Some(Fill::Gradient(LinearGradient::evenly_spaced(coordinates, colors))),
        },
    }
}

/// Top-to-bottom span through the horizontal middle of the surface.
pub fn vertical_span(size: SurfaceSize) -> [f64; 4] {
    let mid = size.width_f() / 2.0;
    [mid, 0.0, mid, size.height_f()]
}

/// Everything a style needs to paint one frame.
///
/// Lives only for the duration of [`crate::Style::draw`]. Data pulled from
/// the analyser is kept so it can be handed to the frame's callbacks.
pub struct Frame<'a> {
    surface: &'a mut dyn Surface,
    analyser: Option<&'a SharedAnalyser>,
    paint: &'a mut PaintState,
    hooks: &'a mut Hooks,
    callbacks: &'a mut CallbackRegistry,
    fft_size: FftSize,
    max_frequency: f32,
    sample_rate: f32,
    data: Option<Vec<u8>>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(
        surface: &'a mut dyn Surface,
        analyser: Option<&'a SharedAnalyser>,
        paint: &'a mut PaintState,
        hooks: &'a mut Hooks,
        callbacks: &'a mut CallbackRegistry,
        fft_size: FftSize,
        max_frequency: f32,
    ) -> Self {
        Self {
            surface,
            analyser,
            paint,
            hooks,
            callbacks,
            fft_size,
            max_frequency,
            sample_rate: 0.0,
            data: None,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.surface.size()
    }

    pub fn has_context(&mut self) -> bool {
        self.surface.context().is_some()
    }

    pub fn context(&mut self) -> Option<&mut dyn DrawContext> {
        self.surface.context()
    }

    /// The surface's computed style, queried at most once per frame.
    pub fn computed_style(&mut self) -> Option<&ComputedStyle> {
        if self.paint.style_cache.is_none() {
            self.paint.style_cache = Some(self.surface.computed_style());
        }
        self.paint.style_cache.as_ref().and_then(Option::as_ref)
    }

    /// Pulls a byte frequency snapshot, one value per bin.
    pub fn frequency_data(&mut self) -> Option<&[u8]> {
        self.pull(|analyser, data| {
            data.resize(analyser.frequency_bin_count(), 0);
            analyser.byte_frequency_data(data);
        })
    }

    /// Pulls a byte waveform snapshot, one value per sample in the window.
    pub fn time_domain_data(&mut self) -> Option<&[u8]> {
        self.pull(|analyser, data| {
            data.resize(analyser.fft_size().window_size(), 128);
            analyser.byte_time_domain_data(data);
        })
    }

    /// Pulls a frequency snapshot and averages it into `bands` perceptual
    /// bands, lowest first.
    pub fn frequency_averages(&mut self, bands: usize) -> Option<Vec<f32>> {
        self.frequency_data()?;
        let data = self.data.as_deref()?;
        Some(frequency_averages(data, self.sample_rate, bands, self.max_frequency))
    }

    fn pull(
        &mut self,
        read: impl FnOnce(&mut dyn AnalyserSource, &mut Vec<u8>),
    ) -> Option<&[u8]> {
        let analyser = self.analyser?;
        let Ok(mut analyser) = analyser.try_borrow_mut() else {
            warn!("analyser is borrowed elsewhere, skipping snapshot");
            return None;
        };

        if analyser.fft_size() != self.fft_size {
            analyser.set_fft_size(self.fft_size);
        }
        self.sample_rate = analyser.sample_rate();

        let mut data = self.data.take().unwrap_or_default();
        data.clear();
        read(&mut *analyser, &mut data);
        self.data = Some(data);
        self.data.as_deref()
    }

    /// Fill for `spec` spanning the surface top to bottom.
    pub fn fill_for(&self, spec: &FillColor) -> Option<Fill> {
        resolve_fill(spec, vertical_span(self.size()))
    }

    /// Effective background: configured, else computed, else white.
    pub fn background_color(&mut self) -> FillColor {
        if let Some(color) = self.paint.background_color.clone() {
            return color;
        }
        self.computed_style()
            .and_then(|style| style.background_color.clone())
            .filter(|color| !color.trim().is_empty())
            .map(FillColor::Solid)
            .unwrap_or_else(|| FillColor::solid(DEFAULT_BACKGROUND_COLOR))
    }

    /// Effective foreground: configured, else computed, else black.
    pub fn foreground_color(&mut self) -> FillColor {
        if let Some(color) = self.paint.color.clone() {
            return color;
        }
        self.computed_style()
            .and_then(|style| style.color.clone())
            .filter(|color| !color.trim().is_empty())
            .map(FillColor::Solid)
            .unwrap_or_else(|| FillColor::solid(DEFAULT_FOREGROUND_COLOR))
    }

    /// [`Frame::foreground_color`] resolved for the whole surface.
    pub fn foreground_fill(&mut self) -> Fill {
        let spec = self.foreground_color();
        self.fill_for(&spec)
            .unwrap_or_else(|| Fill::color(DEFAULT_FOREGROUND_COLOR))
    }

    /// Clears the surface, runs the before-draw hook, paints the background,
    /// runs the background hook and finally the foreground set-up callbacks.
    ///
    /// Styles call this once they have pulled their data and before painting
    /// any foreground content.
    pub fn prepare(&mut self) {
        let size = self.size();
        let background = self.background_color();
        let fill = self
            .fill_for(&background)
            .unwrap_or_else(|| Fill::color(DEFAULT_BACKGROUND_COLOR));

        let Frame {
            surface,
            hooks,
            callbacks,
            data,
            ..
        } = self;
        let Some(context) = surface.context() else {
            return;
        };

        let (width, height) = (size.width_f(), size.height_f());
        context.clear_rect(0.0, 0.0, width, height);

        if let Some(hook) = hooks.before_draw.as_mut() {
            hook(&mut *context, size, data.as_deref());
        }

        context.set_fill_style(fill);
        context.fill_rect(0.0, 0.0, width, height);

        if let Some(hook) = hooks.modify_background.as_mut() {
            hook(&mut *context, size);
        }

        callbacks.fire(VisualiserEvent::SetUpForeground, context, None);
    }

    pub(crate) fn into_data(self) -> Option<Vec<u8>> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_fill_is_returned_verbatim() {
        let fill = resolve_fill(&FillColor::solid("rgb(1, 2, 3)"), [0.0, 0.0, 0.0, 10.0]);
        assert_eq!(fill, Some(Fill::color("rgb(1, 2, 3)")));
    }

    #[test]
    fn list_fill_becomes_gradient_with_one_stop_per_colour() {
        let spec = FillColor::list(["red", "orange", "yellow", "green", "blue"]);
        let Some(Fill::Gradient(gradient)) = resolve_fill(&spec, [50.0, 0.0, 50.0, 200.0]) else {
            panic!("expected a gradient");
        };
        let span = (gradient.x0, gradient.y0, gradient.x1, gradient.y1);
        assert_eq!(span, (50.0, 0.0, 50.0, 200.0));
        assert_eq!(gradient.stops.len(), 5);
        for (index, stop) in gradient.stops.iter().enumerate() {
            assert!((stop.offset - index as f64 / 4.0).abs() < 1e-12);
        }
        assert_eq!(gradient.stops[0].color, "red");
        assert_eq!(gradient.stops[4].color, "blue");
    }

    #[test]
    fn single_entry_list_is_solid() {
        let fill = resolve_fill(&FillColor::list(["teal"]), [0.0; 4]);
        assert_eq!(fill, Some(Fill::color("teal")));
        assert_eq!(resolve_fill(&FillColor::List(Vec::new()), [0.0; 4]), None);
    }
}
