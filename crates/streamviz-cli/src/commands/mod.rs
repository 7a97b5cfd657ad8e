pub mod aggregate;
pub mod generate;
pub mod monitor;
pub mod server;
pub mod stream;

use std::fs::File;
use std::path::Path;

use clap::Args;
use streamviz_core::{ConfigError, GenerationError, StreamConfig, StreamGenerator};

/// Stream settings that override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct StreamArgs {
    /// Samples generated at startup and on reset
    #[arg(long)]
    pub initial: Option<usize>,

    /// Sliding window capacity
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Producer tick period in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Start streaming immediately
    #[arg(long)]
    pub auto_start: bool,

    /// Seed the generator for a reproducible stream
    #[arg(long)]
    pub seed: Option<u64>,
}

impl StreamArgs {
    fn apply(&self, config: &mut StreamConfig) {
        if let Some(n) = self.initial {
            config.initial_count = n;
        }
        if let Some(n) = self.capacity {
            config.max_data_points = n;
        }
        if let Some(ms) = self.interval_ms {
            config.update_interval_ms = ms;
        }
        if self.auto_start {
            config.auto_start = true;
        }
    }
}

/// Config file (or defaults), then flag overrides, then validation.
pub fn load_config(path: Option<&Path>, args: &StreamArgs) -> Result<StreamConfig, ConfigError> {
    let mut config = match path {
        Some(p) => StreamConfig::load(p)?,
        None => StreamConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load the config or exit with an error message.
pub fn config_or_exit(path: Option<&Path>, args: &StreamArgs) -> StreamConfig {
    match load_config(path, args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

pub fn make_generator(
    config: &StreamConfig,
    seed: Option<u64>,
) -> Result<StreamGenerator, GenerationError> {
    match seed {
        Some(seed) => StreamGenerator::with_seed(&config.generator, seed),
        None => StreamGenerator::new(&config.generator),
    }
}

/// Set up `env_logger` (default filter `warn`, `RUST_LOG` overrides).
///
/// The dashboard owns the terminal, so with `tui` set logs go to `log_file`
/// or nowhere.
pub fn init_logging(tui: bool, log_file: Option<&Path>) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);

    if tui {
        match log_file.map(File::create) {
            Some(Ok(file)) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Some(Err(e)) => {
                eprintln!("Warning: cannot open log file: {e}; logging disabled");
                builder.filter_level(log::LevelFilter::Off);
            }
            None => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }

    // A second init (tests) is harmless.
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_data_points": 2000, "initial_count": 50, "update_interval_ms": 250}}"#
        )
        .unwrap();

        let args = StreamArgs {
            capacity: Some(999),
            ..Default::default()
        };
        let config = load_config(Some(file.path()), &args).unwrap();
        assert_eq!(config.max_data_points, 999);
        assert_eq!(config.initial_count, 50);
        assert_eq!(config.update_interval_ms, 250);
        assert!(!config.auto_start);
    }

    #[test]
    fn overrides_are_validated() {
        let args = StreamArgs {
            interval_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            load_config(None, &args),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn seeded_generators_agree() {
        let config = StreamConfig::default();
        let mut a = make_generator(&config, Some(5)).unwrap();
        let mut b = make_generator(&config, Some(5)).unwrap();
        assert_eq!(
            a.generate_initial(10, Some(0)),
            b.generate_initial(10, Some(0))
        );
    }
}
