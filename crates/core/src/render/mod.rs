//! Drawing surface abstraction.
//!
//! The visualiser never talks to a concrete canvas. It paints through
//! [`DrawContext`] and sizes through [`Surface`], which lets the same styles
//! run on a browser canvas binding, the software [`PixelSurface`] or the
//! [`RecordingSurface`] used in tests.

mod color;
mod raster;
mod recording;

pub use color::{parse_color, Rgba};
pub use raster::PixelSurface;
pub use recording::{DrawCommand, RecordingSurface};

/// Pixel dimensions of a surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width_f(&self) -> f64 {
        f64::from(self.width)
    }

    pub fn height_f(&self) -> f64 {
        f64::from(self.height)
    }
}

/// Content box of the element a surface is laid out in, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerBox {
    pub width: f64,
    pub height: f64,
}

/// Colours inherited from the host's style system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    pub color: Option<String>,
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub color: String,
}

/// Linear gradient between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub stops: Vec<ColorStop>,
}

impl LinearGradient {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            stops: Vec::new(),
        }
    }

    pub fn add_color_stop(&mut self, offset: f64, color: impl Into<String>) {
        self.stops.push(ColorStop {
            offset: offset.clamp(0.0, 1.0),
            color: color.into(),
        });
    }

    /// Spreads `colors` evenly from the first point to the second, pinning the
    /// first colour to offset 0 and the last to offset 1.
    pub fn evenly_spaced(coordinates: [f64; 4], colors: &[String]) -> Self {
        let [x0, y0, x1, y1] = coordinates;
        let mut gradient = Self::new(x0, y0, x1, y1);
        let last = colors.len().saturating_sub(1);
        for (index, color) in colors.iter().enumerate() {
            let offset = if last == 0 {
                0.0
            } else {
                index as f64 / last as f64
            };
            gradient.add_color_stop(offset, color.clone());
        }
        gradient
    }
}

/// Paint used for fills and strokes.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Color(String),
    Gradient(LinearGradient),
}

impl Fill {
    pub fn color(color: impl Into<String>) -> Self {
        Self::Color(color.into())
    }
}

/// The subset of a 2D canvas context the styles draw with.
pub trait DrawContext {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn set_fill_style(&mut self, fill: Fill);

    fn set_stroke_style(&mut self, stroke: Fill);

    fn set_line_width(&mut self, width: f64);

    fn begin_path(&mut self);

    fn move_to(&mut self, x: f64, y: f64);

    fn line_to(&mut self, x: f64, y: f64);

    fn close_path(&mut self);

    fn stroke(&mut self);

    fn fill(&mut self);
}

/// A drawable element with pixel dimensions.
pub trait Surface {
    fn size(&self) -> SurfaceSize;

    /// Changes the pixel dimensions. Implementations may clear their
    /// contents.
    fn set_size(&mut self, size: SurfaceSize);

    /// The content box of the parent element, `None` when the surface is not
    /// attached to one.
    fn container_box(&self) -> Option<ContainerBox>;

    /// Ambient colours for the surface. Potentially slow; the visualiser
    /// queries it at most once per frame.
    fn computed_style(&self) -> Option<ComputedStyle>;

    /// The 2D drawing context, `None` when the host cannot provide one.
    fn context(&mut self) -> Option<&mut dyn DrawContext>;
}
