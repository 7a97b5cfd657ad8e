//! Live line chart, drawn through the core [`Surface`] API.
//!
//! The chart is recorded into a [`DisplayList`] in braille-dot units (two
//! dots per terminal column, four per row) and replayed onto a ratatui
//! canvas by `ui`.

use std::sync::Arc;
use std::time::Instant;

use streamviz_core::{
    ChartArea, Color, DisplayList, FilterConfig, Margin, PerformanceMonitor, Point, RenderLoop,
    Sample, StreamService, Surface, cull_points, downsample, draw_axes, draw_grid,
    filter_snapshot, project_series,
};
use tokio::sync::watch;

pub const DOTS_PER_COL: u32 = 2;
pub const DOTS_PER_ROW: u32 = 4;

// Dark-terminal variants of the grid and axis colors.
const GRID: Color = Color::rgb(0x3a, 0x3a, 0x3a);
const AXIS: Color = Color::rgb(0x9e, 0x9e, 0x9e);

const MARGIN: Margin = Margin {
    top: 4.0,
    right: 2.0,
    bottom: 4.0,
    left: 2.0,
};

/// Render loop that snapshots `service`, applies the current `filter` and
/// draws the line chart, with `monitor` observing frame timing.
pub fn chart_loop(
    service: Arc<StreamService>,
    monitor: Arc<PerformanceMonitor>,
    filter: watch::Receiver<FilterConfig>,
) -> RenderLoop<DisplayList, Arc<[Sample]>> {
    let m = Arc::clone(&monitor);
    let mut render = RenderLoop::new(
        Some(DisplayList::new(0, 0)),
        move || filter_snapshot(service.snapshot(), &filter.borrow()),
        move |surface: &mut DisplayList, width, height, data: &Arc<[Sample]>| {
            draw_line_chart(surface, width, height, data, &m);
        },
    );
    render.add_observer(monitor);
    render
}

/// Grid, axes, the downsampled series and a marker on the newest point.
///
/// Time spent reducing and projecting the data is reported to `monitor`.
pub fn draw_line_chart<S: Surface + ?Sized>(
    surface: &mut S,
    width: u32,
    height: u32,
    data: &[Sample],
    monitor: &PerformanceMonitor,
) {
    surface.clear(Color::BLACK);
    let area = ChartArea::new(width as f64, height as f64).with_margin(MARGIN);
    draw_grid(surface, &area, GRID);
    draw_axes(surface, &area, AXIS);

    let started = Instant::now();
    let max_points = (area.plot_width() as usize).max(1);
    let series = downsample(data, max_points);
    let points = cull_points(
        &project_series(&series, &area),
        area.left(),
        area.plot_width(),
    );
    monitor.record_data_processing_time(started.elapsed());

    surface.polyline(&points, Color::LINE);
    if let Some(last) = points.last() {
        surface.arc(*last, 1.5, Color::SCATTER);
    }

    let (lo, hi) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s.value), hi.max(s.value))
        });
    if lo.is_finite() && hi.is_finite() {
        surface.text(
            Point::new(area.left() + 1.0, area.top()),
            &format!("{hi:.2}"),
            Color::LABEL,
        );
        surface.text(
            Point::new(area.left() + 1.0, area.bottom()),
            &format!("{lo:.2}"),
            Color::LABEL,
        );
    }
}
