use anyhow::Result;
use clap::{Parser, ValueEnum};
use scantrigger::{
    spawn_signal_handlers, ScannerConfig, ScannerContext, SensorFeed, TcpCameraLink,
};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

type BoxedLayer<S> = Box<dyn tracing_subscriber::Layer<S> + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "scantrigger")]
#[command(about = "Distance-triggered barcode capture for a networked code-reading camera")]
#[command(version)]
#[command(long_about = "Reads distance samples from standard input, one per line, and drives a \
code-reading camera over TCP: the aimer guides positioning and a capture fires once an object \
sits close and still. Decoded label fields are stored per capture and forwarded on success.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "scantrigger.toml", help = "Path to TOML configuration file")]
    config: String,

    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Build the scanner context without connecting or reading samples
    #[arg(long, help = "Perform dry run - build the scanner but don't start it")]
    dry_run: bool,

    #[arg(long, value_enum, default_value_t, help = "Log output format")]
    log_format: LogFormat,

    /// Also write logs to daily rotated files in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// Console layer; `detailed` adds thread ids and source locations
    fn layer<S>(self, detailed: bool) -> BoxedLayer<S>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        match self {
            LogFormat::Json => fmt::layer()
                .json()
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_thread_ids(detailed)
                .with_file(detailed)
                .with_line_number(detailed)
                .boxed(),
        }
    }

    /// Rotated file output keeps json as json and drops colour otherwise
    fn file_layer<S>(self, dir: &str) -> (BoxedLayer<S>, WorkerGuard)
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        let appender = tracing_appender::rolling::daily(dir, "scantrigger.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = match self {
            LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
            LogFormat::Pretty | LogFormat::Compact => {
                fmt::layer().with_ansi(false).with_writer(writer).boxed()
            }
        };
        (layer, guard)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting scantrigger v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match ScannerConfig::load_from_file(&args.config) {
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

    let link = TcpCameraLink::new(config.camera.address(), config.camera.connect_timeout());
    if config.image.enabled {
        warn!("No image source available in this build, captures are stored without images");
    }

    let mut context = ScannerContext::builder()
        .with_config(config)
        .with_link(link)
        .build()
        .map_err(|e| {
            error!("Failed to build scanner: {}", e);
            e
        })?;

    if args.dry_run {
        info!("Dry run mode - scanner built but not started");
        println!("✓ Dry run completed successfully");
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    spawn_signal_handlers(shutdown.clone());

    let (samples_tx, samples_rx) = mpsc::channel(256);
    let feed = SensorFeed::new(BufReader::new(tokio::io::stdin()));
    tokio::spawn(async move {
        if let Err(e) = feed.run(samples_tx).await {
            error!("Sensor input failed: {}", e);
        }
    });

    let reason = context.run(samples_rx, shutdown).await.map_err(|e| {
        error!("Scanner error during execution: {}", e);
        e
    })?;

    let stats = context.session_stats();
    info!(
        "Scanner stopped ({}): {} captures, {} watchdog retries, {:?}",
        reason,
        stats.captures_triggered,
        stats.watchdog_retries,
        context.summary()
    );
    Ok(())
}

/// `--debug` wins over `--verbose`, which wins over `--quiet`
fn log_level(args: &Args) -> &'static str {
    match (args.debug, args.verbose, args.quiet) {
        (true, _, _) => "debug",
        (false, true, _) => "info",
        (false, false, true) => "error",
        _ => "warn",
    }
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scantrigger={}", log_level(args))));

    let (file_layer, guard) = match args.log_dir.as_deref() {
        Some(dir) => {
            let (layer, guard) = args.log_format.file_layer(dir);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(args.log_format.layer(args.debug))
        .with(file_layer)
        .with(env_filter)
        .try_init()?;

    Ok(guard)
}

fn print_default_config() -> Result<()> {
    println!("# scantrigger configuration file");
    println!("# Every key is optional; environment variables override it as");
    println!("# SCANTRIGGER_<SECTION>__<KEY>, e.g. SCANTRIGGER_CAMERA__HOST");
    println!();
    print!("{}", toml::to_string_pretty(&ScannerConfig::default())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let argv = std::iter::once("scantrigger").chain(extra.iter().copied());
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_log_format_defaults_to_pretty() {
        assert_eq!(parse(&[]).log_format, LogFormat::Pretty);
        assert_eq!(parse(&["--log-format", "json"]).log_format, LogFormat::Json);
        assert_eq!(parse(&["--log-format", "compact"]).log_format, LogFormat::Compact);
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let result = Args::try_parse_from(["scantrigger", "--log-format", "xml"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_precedence() {
        assert_eq!(log_level(&parse(&[])), "warn");
        assert_eq!(log_level(&parse(&["--quiet"])), "error");
        assert_eq!(log_level(&parse(&["--verbose", "--quiet"])), "info");
        assert_eq!(log_level(&parse(&["--debug", "--verbose"])), "debug");
    }

    #[test]
    fn test_log_dir_and_config_path() {
        let args = parse(&["-c", "/etc/scantrigger.toml", "--log-dir", "/var/log/scantrigger"]);

        assert_eq!(args.config, "/etc/scantrigger.toml");
        assert_eq!(args.log_dir.as_deref(), Some("/var/log/scantrigger"));
    }
}
