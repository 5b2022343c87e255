use tracing::warn;

use super::color::{parse_color, Rgba};
use super::{ComputedStyle, ContainerBox, DrawContext, Fill, Surface, SurfaceSize};

const CLEAR: u32 = 0x0000_0000;
const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// Fill resolved to concrete colours so per-pixel evaluation stays cheap.
#[derive(Debug, Clone)]
enum Paint {
    Solid(Rgba),
    Gradient {
        origin: (f64, f64),
        direction: (f64, f64),
        length_sq: f64,
        stops: Vec<(f64, Rgba)>,
    },
}

impl Paint {
    fn resolve(fill: &Fill) -> Self {
        match fill {
            Fill::Color(color) => Paint::Solid(parse_or_black(color)),
            Fill::Gradient(gradient) => {
                let direction = (gradient.x1 - gradient.x0, gradient.y1 - gradient.y0);
                let mut stops: Vec<(f64, Rgba)> = gradient
                    .stops
                    .iter()
                    .map(|stop| (stop.offset, parse_or_black(&stop.color)))
                    .collect();
                stops.sort_by(|a, b| a.0.total_cmp(&b.0));
                Paint::Gradient {
                    origin: (gradient.x0, gradient.y0),
                    direction,
                    length_sq: direction.0 * direction.0 + direction.1 * direction.1,
                    stops,
                }
            }
        }
    }

    fn at(&self, x: f64, y: f64) -> Rgba {
        match self {
            Paint::Solid(color) => *color,
            Paint::Gradient {
                origin,
                direction,
                length_sq,
                stops,
            } => {
                let (first, last) = match (stops.first(), stops.last()) {
                    (Some(first), Some(last)) => (first, last),
                    _ => return Rgba::TRANSPARENT,
                };
                if *length_sq <= f64::EPSILON {
                    return last.1;
                }
                let t = ((x - origin.0) * direction.0 + (y - origin.1) * direction.1) / length_sq;
                if t <= first.0 {
                    return first.1;
                }
                if t >= last.0 {
                    return last.1;
                }
                for pair in stops.windows(2) {
                    let (lo, hi) = (pair[0], pair[1]);
                    if t <= hi.0 {
                        let span = hi.0 - lo.0;
                        let local = if span > 0.0 { (t - lo.0) / span } else { 1.0 };
                        return lo.1.lerp(hi.1, local);
                    }
                }
                last.1
            }
        }
    }
}

fn parse_or_black(color: &str) -> Rgba {
    parse_color(color).unwrap_or_else(|err| {
        warn!(%err, "falling back to black");
        Rgba::opaque(0, 0, 0)
    })
}

#[derive(Debug, Clone, Default)]
struct SubPath {
    points: Vec<(f64, f64)>,
    closed: bool,
}

/// Software canvas over a packed `0x00RRGGBB` buffer.
pub struct PixelSurface {
    width: usize,
    height: usize,
    buffer: Vec<u32>,
    container: Option<ContainerBox>,
    style: Option<ComputedStyle>,
    fill: Paint,
    stroke: Paint,
    line_width: f64,
    path: Vec<SubPath>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            buffer: vec![CLEAR; width * height],
            container: None,
            style: None,
            fill: Paint::Solid(Rgba::opaque(0, 0, 0)),
            stroke: Paint::Solid(Rgba::opaque(0, 0, 0)),
            line_width: 1.0,
            path: Vec::new(),
        }
    }

    pub fn with_container(mut self, width: f64, height: f64) -> Self {
        self.container = Some(ContainerBox { width, height });
        self
    }

    pub fn with_computed_style(mut self, style: ComputedStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let (x, y) = (x as usize, y as usize);
        (x < self.width && y < self.height).then(|| Rgba::from_u32(self.buffer[y * self.width + x]))
    }

    /// Downsamples the buffer to `columns` x `rows` characters by brightness.
    pub fn to_ascii(&self, columns: usize, rows: usize) -> String {
        if self.width == 0 || self.height == 0 || columns == 0 || rows == 0 {
            return String::new();
        }

        let mut out = String::with_capacity((columns + 1) * rows);
        for row in 0..rows {
            let y0 = row * self.height / rows;
            let y1 = ((row + 1) * self.height / rows).max(y0 + 1).min(self.height);
            for column in 0..columns {
                let x0 = column * self.width / columns;
                let x1 = ((column + 1) * self.width / columns).max(x0 + 1).min(self.width);
                let mut total = 0.0;
                let mut count = 0usize;
                for y in y0..y1 {
                    for x in x0..x1 {
                        total += Rgba::from_u32(self.buffer[y * self.width + x]).luminance();
                        count += 1;
                    }
                }
                let level = if count == 0 { 0.0 } else { total / count as f64 };
                let index = (level * (ASCII_RAMP.len() - 1) as f64).round() as usize;
                out.push(ASCII_RAMP[index.min(ASCII_RAMP.len() - 1)] as char);
            }
            out.push('\n');
        }
        out
    }

    fn blend(&mut self, x: isize, y: isize, color: Rgba) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let index = y as usize * self.width + x as usize;
        let dst = Rgba::from_u32(self.buffer[index]);
        self.buffer[index] = color.over(dst).to_u32();
    }

    /// Clipped pixel bounds of a rectangle, empty ranges when outside.
    fn pixel_bounds(&self, x: f64, y: f64, w: f64, h: f64) -> (usize, usize, usize, usize) {
        let (x0, x1) = if w < 0.0 { (x + w, x) } else { (x, x + w) };
        let (y0, y1) = if h < 0.0 { (y + h, y) } else { (y, y + h) };
        let clamp_x = |v: f64| v.round().clamp(0.0, self.width as f64) as usize;
        let clamp_y = |v: f64| v.round().clamp(0.0, self.height as f64) as usize;
        (clamp_x(x0), clamp_y(y0), clamp_x(x1), clamp_y(y1))
    }

    fn stamp(&mut self, x: isize, y: isize, paint: &Paint) {
        let radius = ((self.line_width - 1.0) / 2.0).max(0.0).round() as isize;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (px, py) = (x + dx, y + dy);
                let color = paint.at(px as f64 + 0.5, py as f64 + 0.5);
                self.blend(px, py, color);
            }
        }
    }

    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), paint: &Paint) {
        let (mut x, mut y) = (from.0.round() as isize, from.1.round() as isize);
        let (x2, y2) = (to.0.round() as isize, to.1.round() as isize);
        let dx = (x2 - x).abs();
        let dy = (y2 - y).abs();
        let sx = if x < x2 { 1 } else { -1 };
        let sy = if y < y2 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            self.stamp(x, y, paint);
            if x == x2 && y == y2 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn current_subpath(&mut self) -> &mut SubPath {
        if self.path.last().map_or(true, |sub| sub.closed) {
            self.path.push(SubPath::default());
        }
        let last = self.path.len() - 1;
        &mut self.path[last]
    }
}

impl Default for PixelSurface {
    /// The 300x150 size a fresh canvas element starts with.
    fn default() -> Self {
        Self::new(300, 150)
    }
}

impl Surface for PixelSurface {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width as u32, self.height as u32)
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.width = size.width as usize;
        self.height = size.height as usize;
        self.buffer.clear();
        self.buffer.resize(self.width * self.height, CLEAR);
    }

    fn container_box(&self) -> Option<ContainerBox> {
        self.container
    }

    fn computed_style(&self) -> Option<ComputedStyle> {
        self.style.clone()
    }

    fn context(&mut self) -> Option<&mut dyn DrawContext> {
        Some(self)
    }
}

impl DrawContext for PixelSurface {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let (x0, y0, x1, y1) = self.pixel_bounds(x, y, width, height);
        for row in y0..y1 {
            self.buffer[row * self.width + x0..row * self.width + x1].fill(CLEAR);
        }
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let (x0, y0, x1, y1) = self.pixel_bounds(x, y, width, height);
        let paint = self.fill.clone();
        for row in y0..y1 {
            for column in x0..x1 {
                let color = paint.at(column as f64 + 0.5, row as f64 + 0.5);
                self.blend(column as isize, row as isize, color);
            }
        }
    }

    fn set_fill_style(&mut self, fill: Fill) {
        self.fill = Paint::resolve(&fill);
    }

    fn set_stroke_style(&mut self, stroke: Fill) {
        self.stroke = Paint::resolve(&stroke);
    }

    fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.line_width = width;
        }
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.push(SubPath {
            points: vec![(x, y)],
            closed: false,
        });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.current_subpath().points.push((x, y));
    }

    fn close_path(&mut self) {
        if let Some(sub) = self.path.last_mut() {
            if let Some(&first) = sub.points.first() {
                sub.points.push(first);
            }
            sub.closed = true;
        }
    }

    fn stroke(&mut self) {
        let paint = self.stroke.clone();
        let segments: Vec<((f64, f64), (f64, f64))> = self
            .path
            .iter()
            .flat_map(|sub| sub.points.windows(2).map(|pair| (pair[0], pair[1])))
            .collect();
        for (from, to) in segments {
            self.draw_line(from, to, &paint);
        }
    }

    /// Even-odd scanline fill; open subpaths are closed implicitly.
    fn fill(&mut self) {
        let paint = self.fill.clone();
        let mut edges = Vec::new();
        for sub in &self.path {
            let n = sub.points.len();
            if n < 3 {
                continue;
            }
            for i in 0..n {
                edges.push((sub.points[i], sub.points[(i + 1) % n]));
            }
        }

        let mut crossings = Vec::new();
        for row in 0..self.height {
            let scan_y = row as f64 + 0.5;
            crossings.clear();
            for &((x0, y0), (x1, y1)) in &edges {
                if (y0 <= scan_y && y1 > scan_y) || (y1 <= scan_y && y0 > scan_y) {
                    crossings.push(x0 + (scan_y - y0) / (y1 - y0) * (x1 - x0));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for span in crossings.chunks_exact(2) {
                let start = span[0].round().clamp(0.0, self.width as f64) as usize;
                let end = span[1].round().clamp(0.0, self.width as f64) as usize;
                for column in start..end {
                    let color = paint.at(column as f64 + 0.5, scan_y);
                    self.blend(column as isize, row as isize, color);
                }
            }
        }
    }
}
