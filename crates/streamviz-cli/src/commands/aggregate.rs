use std::path::Path;

use streamviz_core::{AggregatedSample, AggregationPeriod, Reducer, aggregate};

use super::StreamArgs;

pub fn run(
    config_path: Option<&Path>,
    count: usize,
    period: Option<&str>,
    reducer: Option<&str>,
    seed: Option<u64>,
    json: bool,
) {
    let config = super::config_or_exit(config_path, &StreamArgs::default());

    let period = match period.map(str::parse::<AggregationPeriod>) {
        Some(Ok(p)) => p,
        Some(Err(e)) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        None => config.aggregation_period,
    };
    let reducer = match reducer.map(str::parse::<Reducer>) {
        Some(Ok(r)) => r,
        Some(Err(e)) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        None => config.reducer,
    };

    let mut generator = match super::make_generator(&config, seed) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let data = generator.generate_initial(count, None);
    let buckets = aggregate(&data, period.as_millis(), reducer);

    if json {
        match serde_json::to_string_pretty(&buckets) {
            Ok(j) => println!("{j}"),
            Err(e) => {
                eprintln!("Error serializing buckets: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("{count} samples → {} buckets ({period}, {reducer})", buckets.len());
    println!();
    print!("{}", format_table(&buckets));
}

fn format_table(buckets: &[AggregatedSample]) -> String {
    let mut out = format!(
        "{:>15}  {:>12}  {:>3}  {:>7}\n",
        "bucket_start", "value", "cat", "samples"
    );
    out.push_str(&format!("{}\n", "─".repeat(43)));
    for b in buckets {
        out.push_str(&format!(
            "{:>15}  {:>12.4}  {:>3}  {:>7}\n",
            b.bucket_start, b.value, b.category, b.source_count
        ));
    }
    out
}
