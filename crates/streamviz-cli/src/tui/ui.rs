//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────────────┐
//! │  📈 streamviz   ● streaming   50000/50000   v812     │
//! ├────────────────────────────┬─────────────────────────┤
//! │  ⠀⠀⠀⠀⣀⡠⠤⠒⠉⠑⠢⣀⠀⠀⠀⢀⡠⠔⠊        │  Buckets (1min · avg)   │
//! │  ⠀⡠⠊⠁⠀⠀⠀⠀⠀⠀⠀⠈⠑⠒⠉             ├─────────────────────────┤
//! │  ⠊                         │  Samples (virtualized)  │
//! ├────────────────────────────┴─────────────────────────┤
//! │  fps 60   mem 14 MB   render 0.31 ms   data 0.12 ms  │
//! ├──────────────────────────────────────────────────────┤
//! │  space stream  r reset  c cat  t range  q quit       │
//! └──────────────────────────────────────────────────────┘

use super::app::{App, BULK_COUNT, format_clock};
use ratatui::{prelude::*, widgets::*};
use streamviz_core::{DrawOp, FilterConfig};

/// Rectangles of every panel, shared by the renderer and by `App` for sizing.
#[derive(Debug, Clone, Copy)]
pub struct Areas {
    pub title: Rect,
    pub chart: Rect,
    pub aggregates: Rect,
    pub samples: Rect,
    pub perf: Rect,
    pub keys: Rect,
}

pub fn layout(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // main
            Constraint::Length(3), // performance
            Constraint::Length(1), // keys
        ])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(cols[1]);

    Areas {
        title: rows[0],
        chart: cols[0],
        aggregates: right[0],
        samples: right[1],
        perf: rows[2],
        keys: rows[3],
    }
}

/// Content area of a bordered panel.
pub fn inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

pub fn draw(f: &mut Frame, app: &App) {
    let areas = layout(f.area());

    draw_title(f, areas.title, app);
    draw_chart(f, areas.chart, app);
    draw_aggregates(f, areas.aggregates, app);
    draw_samples(f, areas.samples, app);
    draw_perf(f, areas.perf, app);
    draw_keys(f, areas.keys);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let status = app.service().status();
    let (marker, state, color) = if status.is_streaming {
        ("●", "streaming", Color::Green)
    } else {
        ("○", "stopped", Color::DarkGray)
    };
    let last = status
        .last_value
        .map_or_else(|| "—".to_string(), |v| format!("{v:.2}"));

    let mut spans = vec![
        Span::styled(" 📈 streamviz ", Style::default().bold().fg(Color::Cyan)),
        Span::styled(format!("  {marker} {state}"), Style::default().fg(color)),
        Span::raw(format!(
            "   {}/{}   last {last}",
            status.length, status.capacity
        )),
        Span::styled(
            format!("   v{} ", status.version),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(err) = app.export_error() {
        spans.push(Span::styled(
            format!(" export failed: {err} "),
            Style::default().fg(Color::Red),
        ));
    } else if let Some(path) = app.last_export() {
        spans.push(Span::styled(
            format!(" saved {} ", path.display()),
            Style::default().fg(Color::Yellow),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(spans));

    f.render_widget(block, area);
}

/// Short description of the active filter, e.g. `[cat B · 5min]`.
pub fn filter_label(filter: &FilterConfig) -> String {
    let categories = if filter.categories.is_empty() {
        "all".to_string()
    } else {
        filter
            .categories
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(",")
    };
    let mut label = format!("[cat {categories} · {}", filter.time_range);
    if let Some((lo, hi)) = filter.value_range {
        label.push_str(&format!(" · {lo:.2}..{hi:.2}"));
    }
    label.push(']');
    label
}

fn rgb(c: streamviz_core::Color) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// Replay the chart's recorded frame. Surface y grows downward, canvas y
/// grows upward.
fn draw_chart(f: &mut Frame, area: Rect, app: &App) {
    let (w, h) = app.chart_size();
    let (w, h) = (w as f64, h as f64);
    let ops = app.chart_ops();

    let canvas = canvas::Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(
                    " Live window  {} samples  {} ",
                    app.view().len(),
                    filter_label(&app.filter())
                )),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds([0.0, w])
        .y_bounds([0.0, h])
        .paint(move |ctx| {
            for op in ops {
                match op {
                    DrawOp::Clear(_) => {}
                    DrawOp::Line { from, to, color } => ctx.draw(&canvas::Line {
                        x1: from.x,
                        y1: h - from.y,
                        x2: to.x,
                        y2: h - to.y,
                        color: rgb(*color),
                    }),
                    DrawOp::Rect {
                        origin,
                        width,
                        height,
                        color,
                    } => ctx.draw(&canvas::Rectangle {
                        x: origin.x,
                        y: h - origin.y - height,
                        width: *width,
                        height: *height,
                        color: rgb(*color),
                    }),
                    DrawOp::Arc {
                        center,
                        radius,
                        color,
                    } => ctx.draw(&canvas::Circle {
                        x: center.x,
                        y: h - center.y,
                        radius: *radius,
                        color: rgb(*color),
                    }),
                    DrawOp::Text { at, text, color } => ctx.print(
                        at.x,
                        h - at.y,
                        Span::styled(text.clone(), Style::default().fg(rgb(*color))),
                    ),
                }
            }
        });

    f.render_widget(canvas, area);
}

fn draw_aggregates(f: &mut Frame, area: Rect, app: &App) {
    let buckets = app.buckets();
    let shown = inner(area).height.saturating_sub(1) as usize;

    // Newest bucket first.
    let rows: Vec<Row> = buckets
        .iter()
        .rev()
        .take(shown)
        .map(|b| {
            Row::new(vec![
                format_clock(b.bucket_start),
                format!("{:.4}", b.value),
                b.category.to_string(),
                b.source_count.to_string(),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12), // bucket start
            Constraint::Length(12), // value
            Constraint::Length(3),  // category
            Constraint::Length(7),  // samples
        ],
    )
    .header(
        Row::new(vec!["bucket", "value", "cat", "n"])
            .style(Style::default().bold().fg(Color::Cyan)),
    )
    .block(Block::default().borders(Borders::ALL).title(format!(
        " Buckets ({} · {})  {} total ",
        app.period(),
        app.reducer(),
        buckets.len()
    )));

    f.render_widget(table, area);
}

fn draw_samples(f: &mut Frame, area: Rect, app: &App) {
    let snapshot = app.view();
    let range = app.table_range();
    let visible = app.visible_rows();

    let rows: Vec<Row> = visible
        .iter()
        .filter_map(|r| snapshot.get(r.index).map(|s| (r.index, s)))
        .map(|(i, s)| {
            let meta = s.metadata.unwrap_or_default();
            let signal = meta.signal.map_or_else(|| "—".into(), |s| s.to_string());
            let volume = meta.volume.map_or_else(|| "—".into(), |v| v.to_string());
            let style = match meta.signal {
                Some(streamviz_core::Signal::Buy) => Style::default().fg(Color::Green),
                Some(streamviz_core::Signal::Sell) => Style::default().fg(Color::Red),
                None => Style::default(),
            };
            Row::new(vec![
                i.to_string(),
                format_clock(s.timestamp),
                format!("{:.4}", s.value),
                s.category.to_string(),
                signal,
                volume,
            ])
            .style(style)
        })
        .collect();

    let (first, last) = match (visible.first(), visible.last()) {
        (Some(a), Some(b)) => (a.index, b.index),
        _ => (0, 0),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),  // index
            Constraint::Length(12), // time
            Constraint::Length(10), // value
            Constraint::Length(3),  // category
            Constraint::Length(4),  // signal
            Constraint::Length(4),  // volume
        ],
    )
    .header(
        Row::new(vec!["#", "time", "value", "cat", "sig", "vol"])
            .style(Style::default().bold().fg(Color::Cyan)),
    )
    .block(Block::default().borders(Borders::ALL).title(format!(
        " Samples {first}–{last} of {}  ({} rows formatted) ",
        snapshot.len(),
        range.len()
    )));

    f.render_widget(table, area);
}

fn draw_perf(f: &mut Frame, area: Rect, app: &App) {
    let perf = app.monitor().sample();
    let fps_color = match perf.fps {
        50.. => Color::Green,
        25..50 => Color::Yellow,
        _ => Color::Red,
    };

    let line = Line::from(vec![
        Span::raw(" fps "),
        Span::styled(perf.fps.to_string(), Style::default().bold().fg(fps_color)),
        Span::raw(format!(
            "   mem {} MB   render {:.2} ms   data {:.2} ms",
            perf.memory_usage_mb, perf.render_time_ms, perf.data_processing_time_ms
        )),
        Span::styled(
            format!(
                "   frames {} drawn / {} skipped",
                app.frames_drawn(),
                app.frames_skipped()
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let p = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Performance "),
    );
    f.render_widget(p, area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(format!(
        " space: stream   r: reset   b: +{BULK_COUNT}   a: period   m: reducer   c: category   t: range   ↑↓ PgUp/PgDn: scroll   g/G: first/last   s: export   q: quit"
    ))
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_fills_terminal() {
        let areas = layout(Rect::new(0, 0, 120, 40));
        assert_eq!(areas.title.height, 3);
        assert_eq!(areas.perf.height, 3);
        assert_eq!(areas.keys.height, 1);
        assert_eq!(areas.chart.height, 33);
        assert_eq!(
            areas.aggregates.height + areas.samples.height,
            areas.chart.height
        );
        assert_eq!(areas.chart.width + areas.samples.width, 120);
    }

    #[test]
    fn filter_label_describes_criteria() {
        assert_eq!(filter_label(&FilterConfig::default()), "[cat all · all]");
        let narrowed = FilterConfig {
            categories: vec![streamviz_core::Category::B, streamviz_core::Category::D],
            value_range: Some((90.0, 110.5)),
            time_range: streamviz_core::TimeRange::FiveMinutes,
        };
        assert_eq!(filter_label(&narrowed), "[cat B,D · 5min · 90.00..110.50]");
    }

    #[test]
    fn inner_strips_border() {
        let r = inner(Rect::new(0, 0, 10, 5));
        assert_eq!(r, Rect::new(1, 1, 8, 3));
    }
}
