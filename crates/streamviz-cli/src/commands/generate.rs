use std::path::Path;

use streamviz_core::{ExtendRequest, FetchRequest, extend_dataset, fetch_dataset};

use super::StreamArgs;

pub struct GenerateCommandConfig<'a> {
    pub config_path: Option<&'a Path>,
    pub count: i64,
    pub start_time: Option<i64>,
    pub last_value: Option<f64>,
    pub seed: Option<u64>,
    pub output_path: Option<&'a str>,
}

pub fn run(cfg: GenerateCommandConfig<'_>) {
    let config = super::config_or_exit(cfg.config_path, &StreamArgs::default());
    let mut generator = match super::make_generator(&config, cfg.seed) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cfg.last_value {
        Some(last_value) => extend_dataset(
            &mut generator,
            &ExtendRequest {
                count: Some(cfg.count),
                last_value: Some(last_value),
            },
        ),
        None => fetch_dataset(
            &mut generator,
            &FetchRequest {
                count: Some(cfg.count),
                start_time: cfg.start_time,
            },
        ),
    };

    let dataset = match result {
        Ok(ds) => ds,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&dataset) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error serializing dataset: {e}");
            std::process::exit(1);
        }
    };

    match cfg.output_path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, json) {
                eprintln!("Error writing {path}: {e}");
                std::process::exit(1);
            }
            eprintln!("Wrote {} samples to {path}", dataset.count);
        }
        None => println!("{json}"),
    }
}
