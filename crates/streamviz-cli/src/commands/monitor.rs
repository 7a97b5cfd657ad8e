use std::path::Path;
use std::sync::Arc;

use streamviz_core::StreamService;

use super::StreamArgs;

pub fn run(config_path: Option<&Path>, args: &StreamArgs, fps: f64) {
    let config = super::config_or_exit(config_path, args);
    let generator = match super::make_generator(&config, args.seed) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let service = match StreamService::with_generator(config, generator) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut app = crate::tui::app::App::new(service, fps);
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
