use std::path::Path;
use std::sync::Arc;

use streamviz_core::StreamService;

use super::StreamArgs;

pub fn run(config_path: Option<&Path>, args: &StreamArgs, host: &str, port: u16) {
    let config = super::config_or_exit(config_path, args);
    let (stream_gen, dataset_gen) = match (
        super::make_generator(&config, args.seed),
        super::make_generator(&config, args.seed.map(|s| s.wrapping_add(1))),
    ) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let service = match StreamService::with_generator(config, stream_gen) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let base = format!("http://{host}:{port}");
    let status = service.status();

    println!("📈 streamviz server v{}", streamviz_core::VERSION);
    println!("   {base}");
    println!(
        "   live window: {}/{} samples, {}",
        status.length,
        status.capacity,
        if status.is_streaming {
            "streaming"
        } else {
            "stopped (POST /api/stream/toggle to start)"
        }
    );
    println!();
    println!("   Endpoints:");
    println!("     GET  /                       API index (try: curl {base})");
    println!("     GET  /api/data               Initial dataset (count, startTime)");
    println!("     POST /api/data               Continuation batch ({{count, lastValue}})");
    println!("     GET  /api/stream             Live window, filtered and downsampled");
    println!("                                  (maxPoints, categories, minValue, maxValue, range)");
    println!("     GET  /api/stream/aggregate   Live window buckets (period, reducer)");
    println!("     POST /api/stream/toggle      Start/stop streaming");
    println!("     GET  /health                 Health check");
    println!();
    println!("   Examples:");
    println!("     curl '{base}/api/data?count=5'");
    println!("     curl -X POST -H 'Content-Type: application/json' -d '{{\"lastValue\":100}}' {base}/api/data");
    println!("     curl '{base}/api/stream/aggregate?period=5min&reducer=max'");
    println!("     curl '{base}/api/stream?categories=A,B&range=5min'");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting async runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(streamviz_server::run_server(
        Arc::clone(&service),
        dataset_gen,
        host,
        port,
    )) {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
