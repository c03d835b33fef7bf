//! Gym front desk binary.
//!
//! # Usage
//!
//! ```bash
//! # First run: choose the access PIN
//! gymgate set-pin 2468
//!
//! # Staff session with a short idle timeout
//! gymgate run --idle-timeout-secs 60
//!
//! # Last recorded session
//! gymgate status
//! ```

use std::{io::Write, path::PathBuf};

use clap::{Parser, Subcommand};
use gymgate_app::{App, Runtime};
use gymgate_core::Gate;
use gymgate_cli::{Overrides, RedbStore, SystemEnv, TerminalDriver, setup};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Gym front desk with PIN lock and idle auto-lock
#[derive(Parser, Debug)]
#[command(name = "gymgate")]
#[command(about = "Gym front desk with PIN lock and idle auto-lock")]
#[command(version)]
struct Args {
    /// Settings database
    #[arg(long, default_value = "gymgate.redb")]
    db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start an interactive front desk session
    Run {
        /// Inactivity period before the countdown, in seconds
        #[arg(long)]
        idle_timeout_secs: Option<u64>,

        /// Countdown length in 1 second ticks
        #[arg(long)]
        countdown_ticks: Option<u32>,

        /// Act like a device without camera or scanner
        #[arg(long)]
        no_capture: bool,
    },

    /// Set the access PIN, or change it with --current
    SetPin {
        /// New PIN, 4 to 8 digits
        pin: String,

        /// Current PIN, required once a PIN is set
        #[arg(long)]
        current: Option<String>,
    },

    /// Print the stored settings and last session record
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Frames own stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let store = RedbStore::open(&args.db)?;
    tracing::debug!(db = %args.db.display(), "settings database open");

    match args.command {
        Command::Run { idle_timeout_secs, countdown_ticks, no_capture } => {
            let settings = setup::load_settings(&store)?;
            let overrides = Overrides { idle_timeout_secs, countdown_ticks };
            let config = setup::effective_config(&settings, overrides)?;
            tracing::info!(
                idle_timeout_secs = config.idle_timeout.as_secs(),
                countdown_ticks = config.countdown_ticks,
                "front desk starting"
            );
            let gate = Gate::new(config, setup::verifier(&settings)?)?;

            let driver = TerminalDriver::stdio().with_capture_flows(!no_capture);
            let mut runtime = Runtime::new(driver, App::new(gate), store);
            runtime.run().await?;

            tracing::info!("front desk stopped");
        },
        Command::SetPin { pin, current } => {
            setup::set_pin(&store, &SystemEnv::new(), &pin, current.as_deref())?;
            writeln!(std::io::stdout().lock(), "PIN saved")?;
        },
        Command::Status => {
            let text = setup::status(&store)?;
            writeln!(std::io::stdout().lock(), "{text}")?;
        },
    }

    Ok(())
}
