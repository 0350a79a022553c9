use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{error, info, LevelFilter};

use target_detector::core::ConfigDocument;
use target_detector::fs_transport::{DirectorySource, DirectoryTransport};
use target_detector::{default_registry, Node};

/// Detect a calibration target in every inbound frame and publish the raw and
/// annotated images.
#[derive(Parser, Debug)]
#[command(name = "target-detector", version, long_about = None)]
struct Args {
    /// Configuration document (.json or .toml) with a `target_finder` section.
    #[arg(long)]
    config: PathBuf,

    /// Directory polled for input image files.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Root directory for published topics.
    #[arg(long, default_value = "out")]
    output: PathBuf,

    /// Frame id stamped on frames read from `--input`.
    #[arg(long, default_value = "camera")]
    frame_id: String,

    /// Overrides `node.poll_interval_ms` from the config.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Read the input directory once, drain it, and exit.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// off, error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Emit JSON log lines (requires the `tracing` feature).
    #[arg(long, default_value_t = false)]
    json_log: bool,
}

fn init_logging(args: &Args) {
    #[cfg(feature = "tracing")]
    {
        let filter = args.log_level.to_string().to_lowercase();
        target_detector::core::init_tracing(&filter, args.json_log);
    }

    #[cfg(not(feature = "tracing"))]
    {
        if let Err(e) = target_detector::core::init_with_level(args.log_level) {
            eprintln!("logger already installed: {e}");
        }
        if args.json_log {
            log::warn!("--json-log needs the `tracing` feature; using plain logs");
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let doc = ConfigDocument::load(&args.config)?;
    let mut options = doc.node_options()?;
    if let Some(ms) = args.poll_interval_ms {
        options.poll_interval_ms = ms;
    }

    let source = args
        .input
        .as_ref()
        .map(|dir| DirectorySource::open(dir, args.frame_id.clone()))
        .transpose()
        .map_err(|e| format!("cannot read input directory: {e}"))?;

    let transport = DirectoryTransport::new(&args.output);
    let node = Node::start_with_options(&doc, options, &default_registry(), transport)?;
    info!("publishing under {}", args.output.display());

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })?;
    }

    let (tx, rx) = crossbeam_channel::bounded(node.options().queue_size.max(1));
    let poll = Duration::from_millis(node.options().poll_interval_ms.max(1));
    let once = args.once;

    let stats = thread::scope(|s| {
        let producer = match source {
            Some(source) => {
                let shutdown = &shutdown;
                Some(s.spawn(move || source.run(tx, shutdown, poll, once)))
            }
            None if once => {
                drop(tx);
                None
            }
            // Keep the channel open until Ctrl+C.
            None => {
                let shutdown = &shutdown;
                Some(s.spawn(move || {
                    while !shutdown.load(Ordering::Relaxed) {
                        thread::sleep(poll);
                    }
                    drop(tx);
                    Ok::<u64, std::io::Error>(0)
                }))
            }
        };

        let stats = node.spin(&rx, &shutdown);
        // Unblock a producer waiting on a full channel.
        drop(rx);
        shutdown.store(true, Ordering::SeqCst);

        if let Some(handle) = producer {
            match handle.join() {
                Ok(Ok(sent)) => info!("input reader sent {sent} frame(s)"),
                Ok(Err(e)) => error!("input reader failed: {e}"),
                Err(_) => error!("input reader panicked"),
            }
        }
        stats
    });

    info!(
        "done: received={} published={} dropped={} publish_failures={}",
        stats.received, stats.published, stats.dropped, stats.publish_failures
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if log::log_enabled!(log::Level::Error) {
                error!("{e}");
            } else {
                eprintln!("error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
