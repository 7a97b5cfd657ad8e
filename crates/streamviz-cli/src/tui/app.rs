//! Dashboard state and event loop.
//!
//! Three clocks run independently: the stream's producer timer, the memory
//! sampler, and the frame cadence driven from [`App::run_loop`]. Each frame
//! ticks the chart's [`RenderLoop`] and redraws the terminal from whatever the
//! service holds at that moment.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use streamviz_core::{
    AggregatedSample, AggregationPeriod, Category, DisplayList, DrawOp, FilterConfig,
    FixedRateSignal, PerformanceMonitor, Reducer, RenderLoop, Sample, StreamService, Surface,
    VirtualRange, VirtualRow, Virtualizer, aggregate, filter_snapshot,
};
use tokio::sync::watch;

use super::chart::{self, DOTS_PER_COL, DOTS_PER_ROW};

/// Samples appended by the `b` key.
pub const BULK_COUNT: usize = 5_000;

/// Format epoch milliseconds as a UTC wall-clock time, `HH:MM:SS.mmm`.
pub fn format_clock(ms: i64) -> String {
    let millis = ms.rem_euclid(1000);
    let secs = ms.div_euclid(1000);
    let (h, m, s) = (
        secs.div_euclid(3600).rem_euclid(24),
        secs.div_euclid(60).rem_euclid(60),
        secs.rem_euclid(60),
    );
    format!("{h:02}:{m:02}:{s:02}.{millis:03}")
}

/// Category selection after `current`: all, then each label alone, then all
/// again.
fn next_categories(current: &[Category]) -> Vec<Category> {
    match current {
        [] => vec![Category::ALL[0]],
        [only] => Category::ALL
            .iter()
            .skip_while(|c| *c != only)
            .nth(1)
            .map(|c| vec![*c])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

pub struct App {
    service: Arc<StreamService>,
    monitor: Arc<PerformanceMonitor>,
    chart: RenderLoop<DisplayList, Arc<[Sample]>>,
    frame_interval: Duration,
    table: Virtualizer,
    period: AggregationPeriod,
    reducer: Reducer,
    /// Shared with the chart's snapshot provider.
    filter: watch::Sender<FilterConfig>,
    running: bool,
    export_dir: PathBuf,
    last_export: Option<PathBuf>,
    export_error: Option<String>,
}

impl App {
    pub fn new(service: Arc<StreamService>, fps: f64) -> Self {
        let config = service.config();
        let (period, reducer, overscan) =
            (config.aggregation_period, config.reducer, config.overscan);
        let monitor = Arc::new(PerformanceMonitor::new());
        let (filter, filter_rx) = watch::channel(FilterConfig::default());
        let chart = chart::chart_loop(Arc::clone(&service), Arc::clone(&monitor), filter_rx);

        Self {
            service,
            monitor,
            chart,
            frame_interval: FixedRateSignal::from_hz(fps).interval(),
            table: Virtualizer::new(1, 0, overscan),
            period,
            reducer,
            filter,
            running: true,
            export_dir: PathBuf::from("."),
            last_export: None,
            export_error: None,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        self.monitor.start_memory_sampling();
        let result = self.run_loop(&mut terminal);
        self.monitor.stop_memory_sampling();
        self.chart.cancel();
        self.service.stop();

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        if let Some(path) = &self.last_export {
            println!("Last snapshot: {}", path.display());
        }

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let mut next_frame = Instant::now();

        while self.running {
            let now = Instant::now();
            if now >= next_frame {
                let size = terminal.size()?;
                self.fit(Rect::new(0, 0, size.width, size.height));
                self.chart.tick(now);
                terminal.draw(|f| super::ui::draw(f, self))?;

                next_frame += self.frame_interval;
                if next_frame <= now {
                    next_frame = now + self.frame_interval;
                }
            }

            let timeout = next_frame.saturating_duration_since(Instant::now());
            if event::poll(timeout)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }
        }

        Ok(())
    }

    /// Size the chart surface and the sample table to the terminal.
    fn fit(&mut self, area: Rect) {
        let areas = super::ui::layout(area);

        let plot = super::ui::inner(areas.chart);
        let (w, h) = (
            u32::from(plot.width) * DOTS_PER_COL,
            u32::from(plot.height) * DOTS_PER_ROW,
        );
        if self.chart.surface().map(|s| s.size()) != Some((w, h)) {
            self.chart.resize(w, h, 1.0);
        }

        // One header line above the rows.
        let rows = super::ui::inner(areas.samples).height.saturating_sub(1);
        self.table.set_container_height(u32::from(rows));
        self.table.set_item_count(self.view().len());
    }

    fn handle_key(&mut self, key: KeyCode) {
        self.table.set_item_count(self.view().len());
        let page = i64::from(self.table.container_height().max(1));

        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char(' ') => {
                self.service.toggle();
            }
            KeyCode::Char('r') => {
                self.service.reset(None);
                self.table.handle_scroll(0);
                self.monitor.reset();
            }
            KeyCode::Char('b') => self.service.add_bulk(BULK_COUNT),
            KeyCode::Char('a') => self.period = self.period.next(),
            KeyCode::Char('m') => self.reducer = self.reducer.next(),
            KeyCode::Char('c') => {
                self.update_filter(|f| f.categories = next_categories(&f.categories));
            }
            KeyCode::Char('t') => self.update_filter(|f| f.time_range = f.time_range.next()),
            KeyCode::Up | KeyCode::Char('k') => self.table.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.table.scroll_by(1),
            KeyCode::PageUp => self.table.scroll_by(-page),
            KeyCode::PageDown => self.table.scroll_by(page),
            KeyCode::Home | KeyCode::Char('g') => self.table.scroll_to_index(0),
            KeyCode::End | KeyCode::Char('G') => {
                let bottom = self.table.max_scroll_offset();
                self.table.handle_scroll(bottom);
            }
            KeyCode::Char('s') => self.export_snapshot(),
            _ => {}
        }
    }

    /// Change the active filter and return the table to its first row.
    fn update_filter(&mut self, change: impl FnOnce(&mut FilterConfig)) {
        self.filter.send_modify(change);
        self.table.set_item_count(self.view().len());
        self.table.handle_scroll(0);
    }

    fn export_snapshot(&mut self) {
        let id = uuid::Uuid::new_v4();
        let path = self
            .export_dir
            .join(format!("streamviz-snapshot-{id}.json"));

        match self.write_snapshot(&path, id) {
            Ok(()) => {
                log::info!("snapshot exported to {}", path.display());
                self.last_export = Some(path);
                self.export_error = None;
            }
            Err(e) => {
                log::warn!("snapshot export failed: {e}");
                self.export_error = Some(e.to_string());
            }
        }
    }

    fn write_snapshot(&self, path: &Path, id: uuid::Uuid) -> io::Result<()> {
        let json = serde_json::json!({
            "id": id.to_string(),
            "exportedAt": streamviz_core::unix_ms_now(),
            "status": self.service.status(),
            "performance": self.monitor.sample(),
            "period": self.period.as_str(),
            "reducer": self.reducer.as_str(),
            "filter": self.filter(),
            "buckets": self.buckets(),
        });
        let contents = serde_json::to_string_pretty(&json).map_err(io::Error::other)?;
        std::fs::write(path, contents)
    }

    // --- Accessors for the renderer ---

    pub fn service(&self) -> &StreamService {
        &self.service
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn period(&self) -> AggregationPeriod {
        self.period
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    pub fn filter(&self) -> FilterConfig {
        self.filter.borrow().clone()
    }

    /// The window as the dashboard shows it: the latest snapshot with the
    /// active filter applied.
    pub fn view(&self) -> Arc<[Sample]> {
        filter_snapshot(self.service.snapshot(), &self.filter.borrow())
    }

    /// Commands recorded by the last chart frame.
    pub fn chart_ops(&self) -> &[DrawOp] {
        self.chart.surface().map(|s| s.ops()).unwrap_or(&[])
    }

    /// Chart surface size in braille dots.
    pub fn chart_size(&self) -> (u32, u32) {
        self.chart.surface().map_or((0, 0), |s| s.size())
    }

    pub fn frames_drawn(&self) -> u64 {
        self.chart.frames_drawn()
    }

    pub fn frames_skipped(&self) -> u64 {
        self.chart.frames_skipped()
    }

    /// Buckets of the filtered window for the selected period and reducer.
    pub fn buckets(&self) -> Vec<AggregatedSample> {
        aggregate(
            &self.view(),
            self.period.as_millis(),
            self.reducer,
        )
    }

    /// Rows to format this frame, overscan included.
    pub fn table_range(&self) -> VirtualRange {
        self.table.compute()
    }

    /// The rows that fit in the table, starting at the scroll position.
    pub fn visible_rows(&self) -> Vec<VirtualRow> {
        let first = self.table.scroll_offset() as usize;
        let range = self.table_range();
        range
            .rows()
            .filter(|r| r.index >= first)
            .take(self.table.container_height() as usize)
            .collect()
    }

    pub fn last_export(&self) -> Option<&Path> {
        self.last_export.as_deref()
    }

    pub fn export_error(&self) -> Option<&str> {
        self.export_error.as_deref()
    }
}
