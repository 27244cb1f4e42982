use clap::Parser;
use log::{LevelFilter, error};
use std::panic::{self, PanicHookInfo};
use vantage_hr_listener::app::{self, Options, RunError};
use vantage_hr_listener::scanner;

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;
const EXIT_FORMAT_VIOLATION: i32 = 3;

/// Timestamped log lines on stderr. `RUST_LOG` overrides the level picked by `-v`.
fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

/// Open the Bluetooth adapter and run the scan loop, printing to stdout.
///
/// # Errors
/// Returns `RunError` if Bluetooth initialization fails, the watch sends data
/// in an unknown format, or stdout cannot be written.
async fn run(options: Options) -> Result<(), RunError> {
    let mut source = scanner::open(options.backend).await?;
    let mut out = std::io::stdout().lock();
    app::run_with_io(options, source.as_mut(), &mut out).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd, Telegraf execd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();
    init_logging(options.verbose);

    match run(options).await {
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(RunError::Decode(why)) => {
            error!("{why}");
            std::process::exit(EXIT_FORMAT_VIOLATION);
        }
        Err(why) => {
            error!("{why}");
            std::process::exit(EXIT_ERROR);
        }
    }
}
