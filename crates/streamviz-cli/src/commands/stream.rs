use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use streamviz_core::{StreamService, StreamStatus, aggregate};

use super::StreamArgs;

/// How often the status line is printed.
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

pub fn run(
    config_path: Option<&Path>,
    args: &StreamArgs,
    duration_secs: Option<f64>,
    bulk: Option<usize>,
) {
    let config = super::config_or_exit(config_path, args);
    let generator = match super::make_generator(&config, args.seed) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let period = config.aggregation_period;
    let reducer = config.reducer;
    let service = match StreamService::with_generator(config, generator) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: cannot install Ctrl+C handler: {e}");
    }

    let max_duration = duration_secs
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(Duration::from_secs_f64);

    let cfg = service.config();
    println!("Streaming");
    println!("  Capacity:  {}", cfg.max_data_points);
    println!("  Initial:   {}", cfg.initial_count);
    println!("  Interval:  {}ms", cfg.update_interval_ms);
    match max_duration {
        Some(d) => println!("  Duration:  {:.1}s", d.as_secs_f64()),
        None => println!("  Duration:  until Ctrl+C"),
    }
    println!();

    if let Some(n) = bulk {
        service.add_bulk(n);
        println!("Added {n} samples at once");
    }

    service.start();
    let start = Instant::now();
    let mut next_status = start + STATUS_INTERVAL;

    while running.load(Ordering::SeqCst) {
        if let Some(max) = max_duration
            && start.elapsed() >= max
        {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));

        if Instant::now() >= next_status {
            let snapshot = service.snapshot();
            let buckets = aggregate(&snapshot, period.as_millis(), reducer).len();
            println!(
                "{}  {buckets} {period} buckets ({reducer})",
                status_line(start.elapsed(), &service.status())
            );
            next_status += STATUS_INTERVAL;
        }
    }

    service.stop();
    println!();
    println!("{}", status_line(start.elapsed(), &service.status()));
}

fn status_line(elapsed: Duration, status: &StreamStatus) -> String {
    let last = status
        .last_value
        .map_or_else(|| "—".to_string(), |v| format!("{v:.4}"));
    format!(
        "[{:>6.1}s] {} {}/{}  last={last}  v{}",
        elapsed.as_secs_f64(),
        if status.is_streaming { "●" } else { "○" },
        status.length,
        status.capacity,
        status.version
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_formats_fields() {
        let status = StreamStatus {
            is_streaming: true,
            length: 10,
            capacity: 50,
            last_value: Some(101.23456),
            version: 7,
        };
        let line = status_line(Duration::from_millis(2_500), &status);
        assert_eq!(line, "[   2.5s] ● 10/50  last=101.2346  v7");
    }

    #[test]
    fn status_line_without_data() {
        let line = status_line(Duration::ZERO, &StreamStatus::default());
        assert!(line.contains("0/0"));
        assert!(line.contains("last=—"));
    }
}
