use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ecu_app::EcuConfig;
use ecu_sim::{SimOptions, SnapshotFormatter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the ECU accessory firmware on simulated hardware")]
struct Opts {
    /// Simulated time to run
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    duration_ms: u64,

    /// Interval between motor-data snapshots (0 = none)
    #[arg(long, default_value_t = 100, value_name = "MS")]
    report_ms: u64,

    /// Board configuration as JSON; missing fields keep their defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit JSON lines instead of coloured text
    #[arg(long)]
    json: bool,

    /// Disconnect the display from the bus at this time
    #[arg(long, value_name = "MS")]
    fail_display_at: Option<u64>,

    /// No tachometer pulses at all
    #[arg(long)]
    stall_tach: bool,

    #[arg(long, default_value_t = 14.7, value_name = "PSI")]
    pressure_psi: f64,

    #[arg(long, default_value_t = 3000.0)]
    rpm: f64,

    #[arg(long, default_value_t = 25.0, value_name = "C")]
    celsius: f64,

    /// Log framework and driver activity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    fn options(&self) -> SimOptions {
        SimOptions {
            duration_ms: self.duration_ms,
            report_ms: self.report_ms,
            pressure_psi: self.pressure_psi,
            engine_rpm: self.rpm,
            celsius: self.celsius,
            stall_tach: self.stall_tach,
            fail_display_at: self.fail_display_at,
            ..SimOptions::default()
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EcuConfig> {
    let Some(path) = path else {
        return Ok(EcuConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: EcuConfig = serde_json::from_str(&text)
        .map_err(ecu_sim::SimError::from)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    env_logger::Builder::new()
        .filter_level(opts.log_level())
        .format_timestamp_millis()
        .init();

    let config = load_config(opts.config.as_ref())?;
    let formatter = SnapshotFormatter::new(opts.json);

    let summary = ecu_sim::run(&config, &opts.options(), |snapshot| {
        println!("{}", formatter.snapshot_line(snapshot));
    })?;

    for line in formatter.fault_lines(&summary.faults) {
        println!("{line}");
    }
    println!("{}", formatter.summary_line(&summary));
    Ok(())
}
