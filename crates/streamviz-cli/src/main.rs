//! CLI for streamviz: live time-series in bounded memory.

mod commands;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::StreamArgs;

#[derive(Parser)]
#[command(name = "streamviz")]
#[command(about = "streamviz: live time-series at interactive frame rates, in bounded memory")]
#[command(version = streamviz_core::VERSION)]
struct Cli {
    /// JSON stream config file (every key optional)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live dashboard: chart, aggregation table, virtualized sample table, FPS.
    Monitor {
        #[command(flatten)]
        stream: StreamArgs,

        /// Chart refresh rate in Hz
        #[arg(long, default_value = "60")]
        fps: f64,

        /// Write log output here instead of discarding it
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Stream headlessly, printing a status line once per second.
    Stream {
        #[command(flatten)]
        stream: StreamArgs,

        /// Stop after this many seconds (default: until Ctrl+C)
        #[arg(long)]
        duration: Option<f64>,

        /// Append this many samples at once before streaming starts
        #[arg(long)]
        bulk: Option<usize>,
    },

    /// Print a generated dataset as JSON.
    Generate {
        /// Number of samples (0-1000000)
        #[arg(long, default_value = "10000", allow_negative_numbers = true)]
        count: i64,

        /// Epoch ms the dataset ends at (default: now)
        #[arg(long)]
        start_time: Option<i64>,

        /// Continue a walk from this value instead (extend semantics)
        #[arg(long)]
        last_value: Option<f64>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Write JSON to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Generate a dataset and print its time buckets.
    Aggregate {
        /// Number of samples to generate
        #[arg(long, default_value = "10000")]
        count: usize,

        /// Bucket width (default: from config)
        #[arg(long, value_parser = ["1min", "5min", "1hour"])]
        period: Option<String>,

        /// Bucket reducer (default: from config)
        #[arg(long, value_parser = ["avg", "sum", "min", "max"])]
        reducer: Option<String>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Print buckets as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP dataset and live-stream server.
    Server {
        #[command(flatten)]
        stream: StreamArgs,

        /// Port to listen on
        #[arg(long, default_value = "8042")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Monitor {
            stream,
            fps,
            log_file,
        } => {
            commands::init_logging(true, log_file.as_deref());
            commands::monitor::run(config_path, &stream, fps)
        }
        Commands::Stream {
            stream,
            duration,
            bulk,
        } => {
            commands::init_logging(false, None);
            commands::stream::run(config_path, &stream, duration, bulk)
        }
        Commands::Generate {
            count,
            start_time,
            last_value,
            seed,
            output,
        } => {
            commands::init_logging(false, None);
            commands::generate::run(commands::generate::GenerateCommandConfig {
                config_path,
                count,
                start_time,
                last_value,
                seed,
                output_path: output.as_deref(),
            })
        }
        Commands::Aggregate {
            count,
            period,
            reducer,
            seed,
            json,
        } => {
            commands::init_logging(false, None);
            commands::aggregate::run(
                config_path,
                count,
                period.as_deref(),
                reducer.as_deref(),
                seed,
                json,
            )
        }
        Commands::Server { stream, port, host } => {
            commands::init_logging(false, None);
            commands::server::run(config_path, &stream, &host, port)
        }
    }
}
