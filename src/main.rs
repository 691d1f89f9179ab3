use anyhow::Result;
use clap::Parser;
use fitmotion::{
    Collaborators, ConsoleHaptics, ConsoleNavigator, ConsoleNotifier, FitmotionConfig,
    GestureEngine, MotionPlatform, ReplayPlatform, UnsupportedPlatform,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "fitmotion")]
#[command(about = "Motion-gesture detection engine with shake, tilt and step detection")]
#[command(version)]
#[command(long_about = "Detects shake, tilt and step gestures from device motion and turns \
them into haptic pulses, notices and navigation. Without motion hardware the keyboard stands \
in for the sensors; a recorded sample stream can be replayed with --replay.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "fitmotion.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write a daily log file into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the engine")]
    validate_config: bool,

    /// Replay a JSON-lines sample recording instead of live sensors
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Replay speed factor
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Use the keyboard simulator even when a replay is given
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Fitmotion configuration with all defaults");
        println!();
        println!("{}", FitmotionConfig::default().to_toml()?);
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting fitmotion v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match FitmotionConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let platform: Arc<dyn MotionPlatform> = match (&args.replay, args.simulate) {
        (Some(path), false) => Arc::new(ReplayPlatform::from_file(path)?.with_speed(args.speed)),
        (Some(_), true) => {
            warn!("--simulate given, ignoring the replay recording");
            Arc::new(UnsupportedPlatform)
        }
        (None, _) => Arc::new(UnsupportedPlatform),
    };

    let collaborators = Collaborators::new(
        Arc::new(ConsoleHaptics),
        Arc::new(ConsoleNotifier),
        Arc::new(ConsoleNavigator::default()),
    );

    let mut engine = GestureEngine::builder()
        .config(config)
        .platform(platform)
        .collaborators(collaborators)
        .force_desktop(args.simulate)
        .build()
        .map_err(|e| {
            error!("Failed to create gesture engine: {}", e);
            e
        })?;

    engine.initialize().await.map_err(|e| {
        error!("Failed to initialize engine: {}", e);
        e
    })?;

    let source = engine.start().await.map_err(|e| {
        error!("Failed to start engine: {}", e);
        e
    })?;
    info!("Input source: {:?}", source);

    let exit_code = engine.run().await.map_err(|e| {
        error!("Engine error during execution: {}", e);
        e
    })?;

    info!("Fitmotion exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fitmotion={}", log_level)));

    // Raw mode needs explicit carriage returns, so terminal output goes to stderr
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fitmotion.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}
