//! Data-space to surface-space scaling.

use crate::sample::Sample;
use crate::surface::Point;

/// Linear map of `value` from `[data_min, data_max]` onto
/// `[pixel_min, pixel_max]`.
///
/// `pixel_max < pixel_min` is allowed and flips the axis (used for y, which
/// grows downward on a surface). A degenerate data range maps everything to
/// the middle of the pixel range.
pub fn scale_value(value: f64, data_min: f64, data_max: f64, pixel_min: f64, pixel_max: f64) -> f64 {
    let span = data_max - data_min;
    if span == 0.0 || !span.is_finite() {
        return (pixel_min + pixel_max) / 2.0;
    }
    pixel_min + (value - data_min) / span * (pixel_max - pixel_min)
}

/// Keep points whose x lies in `[viewport_x, viewport_x + viewport_width]`.
pub fn cull_points(points: &[Point], viewport_x: f64, viewport_width: f64) -> Vec<Point> {
    let right = viewport_x + viewport_width;
    points
        .iter()
        .copied()
        .filter(|p| p.x >= viewport_x && p.x <= right)
        .collect()
}

/// Space reserved around the plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 40.0,
            left: 50.0,
        }
    }
}

/// Surface dimensions plus margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartArea {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
}

impl ChartArea {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margin: Margin::default(),
        }
    }

    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    pub fn plot_width(&self) -> f64 {
        (self.width - self.margin.left - self.margin.right).max(0.0)
    }

    pub fn plot_height(&self) -> f64 {
        (self.height - self.margin.top - self.margin.bottom).max(0.0)
    }

    pub fn left(&self) -> f64 {
        self.margin.left
    }

    pub fn right(&self) -> f64 {
        self.margin.left + self.plot_width()
    }

    pub fn top(&self) -> f64 {
        self.margin.top
    }

    pub fn bottom(&self) -> f64 {
        self.margin.top + self.plot_height()
    }
}

/// Project a series into the plot area: time on x (left to right), value on
/// y (larger values higher up).
pub fn project_series(samples: &[Sample], area: &ChartArea) -> Vec<Point> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };

    let (mut t_min, mut t_max) = (first.timestamp, first.timestamp);
    let (mut v_min, mut v_max) = (first.value, first.value);
    for s in samples {
        t_min = t_min.min(s.timestamp);
        t_max = t_max.max(s.timestamp);
        v_min = v_min.min(s.value);
        v_max = v_max.max(s.value);
    }

    samples
        .iter()
        .map(|s| Point {
            x: scale_value(
                s.timestamp as f64,
                t_min as f64,
                t_max as f64,
                area.left(),
                area.right(),
            ),
            y: scale_value(s.value, v_min, v_max, area.bottom(), area.top()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Category;

    #[test]
    fn scale_maps_endpoints() {
        assert_eq!(scale_value(0.0, 0.0, 10.0, 50.0, 150.0), 50.0);
        assert_eq!(scale_value(10.0, 0.0, 10.0, 50.0, 150.0), 150.0);
        assert_eq!(scale_value(5.0, 0.0, 10.0, 50.0, 150.0), 100.0);
    }

    #[test]
    fn scale_flips_with_reversed_pixels() {
        assert_eq!(scale_value(10.0, 0.0, 10.0, 300.0, 20.0), 20.0);
    }

    #[test]
    fn degenerate_range_maps_to_middle() {
        assert_eq!(scale_value(3.0, 3.0, 3.0, 0.0, 100.0), 50.0);
    }

    #[test]
    fn cull_is_inclusive() {
        let pts = [
            Point::new(-1.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.5, 0.0),
        ];
        let kept: Vec<f64> = cull_points(&pts, 0.0, 10.0).iter().map(|p| p.x).collect();
        assert_eq!(kept, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn projection_fills_plot_area() {
        let area = ChartArea::new(800.0, 400.0);
        let data = vec![
            Sample::new(0, 1.0, Category::A),
            Sample::new(50, 3.0, Category::A),
            Sample::new(100, 2.0, Category::A),
        ];
        let pts = project_series(&data, &area);
        assert_eq!(pts[0], Point::new(50.0, 360.0));
        assert_eq!(pts[1], Point::new(415.0, 20.0));
        assert_eq!(pts[2], Point::new(780.0, 190.0));
    }

    #[test]
    fn projection_of_empty_series() {
        assert!(project_series(&[], &ChartArea::new(10.0, 10.0)).is_empty());
    }

    #[test]
    fn tiny_area_clamps_plot_size() {
        let area = ChartArea::new(30.0, 30.0);
        assert_eq!(area.plot_width(), 0.0);
        assert_eq!(area.plot_height(), 0.0);
    }
}
