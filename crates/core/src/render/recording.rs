use super::{ComputedStyle, ContainerBox, DrawContext, Fill, Surface, SurfaceSize};

/// One call made against a [`RecordingSurface`]'s context.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    ClearRect { x: f64, y: f64, width: f64, height: f64 },
    FillRect { x: f64, y: f64, width: f64, height: f64 },
    SetFillStyle(Fill),
    SetStrokeStyle(Fill),
    SetLineWidth(f64),
    BeginPath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    ClosePath,
    Stroke,
    Fill,
}

/// Surface that keeps a display list instead of pixels.
///
/// Useful for headless hosts and for asserting on exactly what a style drew.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    size: SurfaceSize,
    container: Option<ContainerBox>,
    style: Option<ComputedStyle>,
    has_context: bool,
    commands: Vec<DrawCommand>,
    style_queries: std::cell::Cell<usize>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: SurfaceSize::new(width, height),
            has_context: true,
            ..Default::default()
        }
    }

    /// Places the surface inside a parent element with the given content box.
    pub fn with_container(mut self, width: f64, height: f64) -> Self {
        self.container = Some(ContainerBox { width, height });
        self
    }

    pub fn with_computed_style(mut self, style: ComputedStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Simulates a host that refuses to hand out a 2D context.
    pub fn without_context(mut self) -> Self {
        self.has_context = false;
        self
    }

    pub fn set_container(&mut self, container: Option<ContainerBox>) {
        self.container = container;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// How many times [`Surface::computed_style`] has been called.
    pub fn style_queries(&self) -> usize {
        self.style_queries.get()
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    fn container_box(&self) -> Option<ContainerBox> {
        self.container
    }

    fn computed_style(&self) -> Option<ComputedStyle> {
        self.style_queries.set(self.style_queries.get() + 1);
        self.style.clone()
    }

    fn context(&mut self) -> Option<&mut dyn DrawContext> {
        if self.has_context {
            Some(self)
        } else {
            None
        }
    }
}

impl DrawContext for RecordingSurface {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::ClearRect { x, y, width, height });
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::FillRect { x, y, width, height });
    }

    fn set_fill_style(&mut self, fill: Fill) {
        self.push(DrawCommand::SetFillStyle(fill));
    }

    fn set_stroke_style(&mut self, stroke: Fill) {
        self.push(DrawCommand::SetStrokeStyle(stroke));
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(DrawCommand::SetLineWidth(width));
    }

    fn begin_path(&mut self) {
        self.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::LineTo { x, y });
    }

    fn close_path(&mut self) {
        self.push(DrawCommand::ClosePath);
    }

    fn stroke(&mut self) {
        self.push(DrawCommand::Stroke);
    }

    fn fill(&mut self) {
        self.push(DrawCommand::Fill);
    }
}
