//! Drawing surface abstraction.
//!
//! Chart routines draw through the [`Surface`] trait with coordinates in
//! logical units (origin top-left, y down). [`DisplayList`] is a recording
//! surface: hosts replay its [`DrawOp`]s onto their real backend (the
//! terminal dashboard converts them to canvas shapes).

use crate::scale::ChartArea;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const GRID: Color = Color::rgb(0xe0, 0xe0, 0xe0);
    pub const AXIS: Color = Color::rgb(0x33, 0x33, 0x33);
    pub const LABEL: Color = Color::rgb(0x66, 0x66, 0x66);
    pub const LINE: Color = Color::rgb(0x21, 0x96, 0xf3);
    pub const SCATTER: Color = Color::rgb(0xff, 0x57, 0x22);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 2D drawing target.
pub trait Surface {
    /// Logical size in drawing units.
    fn size(&self) -> (u32, u32);

    /// Rescale to a new logical size and device scale factor.
    fn resize(&mut self, width: u32, height: u32, scale: f64);

    /// `false` when the backing target is gone (detached, lost context).
    /// Render loops skip the frame and retry later.
    fn is_available(&self) -> bool {
        true
    }

    fn clear(&mut self, color: Color);
    fn line(&mut self, from: Point, to: Point, color: Color);
    fn fill_rect(&mut self, origin: Point, width: f64, height: f64, color: Color);
    /// Filled circle.
    fn arc(&mut self, center: Point, radius: f64, color: Color);
    fn text(&mut self, at: Point, text: &str, color: Color);

    /// Connected line through `points`. Fewer than two points draws nothing.
    fn polyline(&mut self, points: &[Point], color: Color) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], color);
        }
    }
}

/// One recorded drawing command.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    Line {
        from: Point,
        to: Point,
        color: Color,
    },
    Rect {
        origin: Point,
        width: f64,
        height: f64,
        color: Color,
    },
    Arc {
        center: Point,
        radius: f64,
        color: Color,
    },
    Text {
        at: Point,
        text: String,
        color: Color,
    },
}

/// Recording surface.
///
/// `clear` discards everything recorded so far, so after a frame the list
/// holds exactly that frame's commands.
#[derive(Debug, Clone)]
pub struct DisplayList {
    ops: Vec<DrawOp>,
    width: u32,
    height: u32,
    scale: f64,
    available: bool,
}

impl DisplayList {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            ops: Vec::new(),
            width,
            height,
            scale: 1.0,
            available: true,
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Simulate losing or regaining the backing target.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32, scale: f64) {
        self.width = width;
        self.height = height;
        self.scale = if scale > 0.0 { scale } else { 1.0 };
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn clear(&mut self, color: Color) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear(color));
    }

    fn line(&mut self, from: Point, to: Point, color: Color) {
        self.ops.push(DrawOp::Line { from, to, color });
    }

    fn fill_rect(&mut self, origin: Point, width: f64, height: f64, color: Color) {
        self.ops.push(DrawOp::Rect {
            origin,
            width,
            height,
            color,
        });
    }

    fn arc(&mut self, center: Point, radius: f64, color: Color) {
        self.ops.push(DrawOp::Arc {
            center,
            radius,
            color,
        });
    }

    fn text(&mut self, at: Point, text: &str, color: Color) {
        self.ops.push(DrawOp::Text {
            at,
            text: text.to_owned(),
            color,
        });
    }
}

// ---------------------------------------------------------------------------
// Chart furniture
// ---------------------------------------------------------------------------

/// Ten vertical and five horizontal grid lines across the plot area.
pub fn draw_grid<S: Surface + ?Sized>(surface: &mut S, area: &ChartArea, color: Color) {
    for i in 0..=10 {
        let x = area.left() + area.plot_width() / 10.0 * i as f64;
        surface.line(Point::new(x, area.top()), Point::new(x, area.bottom()), color);
    }
    for i in 0..=5 {
        let y = area.top() + area.plot_height() / 5.0 * i as f64;
        surface.line(Point::new(area.left(), y), Point::new(area.right(), y), color);
    }
}

/// Left and bottom axis lines.
pub fn draw_axes<S: Surface + ?Sized>(surface: &mut S, area: &ChartArea, color: Color) {
    let origin = Point::new(area.left(), area.bottom());
    surface.line(Point::new(area.left(), area.top()), origin, color);
    surface.line(origin, Point::new(area.right(), area.bottom()), color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_starts_a_new_frame() {
        let mut dl = DisplayList::new(100, 50);
        dl.line(Point::new(0.0, 0.0), Point::new(1.0, 1.0), Color::LINE);
        dl.clear(Color::WHITE);
        dl.text(Point::new(2.0, 3.0), "hi", Color::LABEL);
        assert_eq!(
            dl.ops(),
            &[
                DrawOp::Clear(Color::WHITE),
                DrawOp::Text {
                    at: Point::new(2.0, 3.0),
                    text: "hi".into(),
                    color: Color::LABEL,
                },
            ]
        );
    }

    #[test]
    fn polyline_draws_segments() {
        let mut dl = DisplayList::new(10, 10);
        dl.polyline(&[Point::new(0.0, 0.0)], Color::LINE);
        assert!(dl.ops().is_empty());
        dl.polyline(
            &[Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 1.0)],
            Color::LINE,
        );
        assert_eq!(dl.ops().len(), 2);
    }

    #[test]
    fn resize_updates_size_and_scale() {
        let mut dl = DisplayList::new(10, 10);
        dl.resize(640, 480, 2.0);
        assert_eq!(dl.size(), (640, 480));
        assert_eq!(dl.scale(), 2.0);
        dl.resize(1, 1, 0.0);
        assert_eq!(dl.scale(), 1.0);
    }

    #[test]
    fn grid_and_axes_line_counts() {
        let mut dl = DisplayList::new(800, 400);
        let area = ChartArea::new(800.0, 400.0);
        draw_grid(&mut dl, &area, Color::GRID);
        assert_eq!(dl.ops().len(), 11 + 6);
        draw_axes(&mut dl, &area, Color::AXIS);
        assert_eq!(dl.ops().len(), 19);
        assert_eq!(
            dl.ops()[18],
            DrawOp::Line {
                from: Point::new(50.0, 360.0),
                to: Point::new(780.0, 360.0),
                color: Color::AXIS,
            }
        );
    }
}
