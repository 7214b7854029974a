mod workload;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tickline_drivers::{ThreadDriver, TokioDriver};
use tickline_scheduler::{SchedulerConfig, TickDriver};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;
use workload::Workload;

#[derive(Parser)]
#[command(name = "tickline")]
#[command(about = "Tickline scheduler CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DriverKind {
    /// One OS thread per owner
    Thread,
    /// Tokio timers
    Tokio,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a demonstration workload and print the final snapshots as JSON
    Run {
        /// Number of independent owners
        #[arg(long, default_value_t = 2)]
        owners: u64,
        /// Tasks queued per owner
        #[arg(long, default_value_t = 5)]
        tasks: u64,
        /// Tick source
        #[arg(long, value_enum, default_value = "thread")]
        driver: DriverKind,
        /// Tick period in milliseconds (defaults to TICKLINE_PERIOD_MS or 50)
        #[arg(long)]
        period_ms: Option<u64>,
        /// Simulated work per task in milliseconds
        #[arg(long, default_value_t = 5)]
        work_ms: u64,
        /// Make every n-th task of each owner fail
        #[arg(long)]
        fail_every: Option<u64>,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Print the scheduler configuration resolved from the environment
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            owners,
            tasks,
            driver,
            period_ms,
            work_ms,
            fail_every,
            timeout_secs,
        } => {
            let mut config = SchedulerConfig::from_env();
            if let Some(ms) = period_ms {
                config = config.with_period(Duration::from_millis(ms));
            }

            let driver: Box<dyn TickDriver> = match driver {
                DriverKind::Thread => Box::new(ThreadDriver::new()),
                DriverKind::Tokio => Box::new(TokioDriver::new(Handle::current())),
            };

            let workload = Workload {
                owners,
                tasks,
                work: Duration::from_millis(work_ms),
                fail_every,
                timeout: Duration::from_secs(timeout_secs),
            };
            let snapshots = workload::run(&workload, driver.as_ref(), &config).await?;
            println!("{}", serde_json::to_string_pretty(&snapshots)?);
        }
        Commands::Config => {
            let config = SchedulerConfig::from_env();
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
