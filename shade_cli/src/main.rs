use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use shade_core::runner;
use shade_core::{AutomationCfg, CoverBuilder, DriveCfg, TiltCfg};
use shade_traits::StateSink;

/// Time-based position control for a motorized window covering
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "shade.toml")]
    config: PathBuf,

    /// Drive to a position (0 = closed, 100 = open)
    #[arg(short, long, conflicts_with_all = ["open", "close"])]
    position: Option<u8>,

    /// Fully open the cover
    #[arg(long, conflicts_with = "close")]
    open: bool,

    /// Fully close the cover
    #[arg(long)]
    close: bool,

    /// Drive the tilt axis to a position afterwards
    #[arg(long)]
    tilt: Option<u8>,

    /// BCM pin of the up relay (hardware builds)
    #[arg(long)]
    up_pin: Option<u8>,

    /// BCM pin of the down relay (hardware builds)
    #[arg(long)]
    down_pin: Option<u8>,
}

/// Publishes every snapshot as a structured log line.
struct LogSink;

impl StateSink for LogSink {
    fn publish(&mut self, position: u8, tilt: Option<u8>, opening: bool, closing: bool) {
        tracing::info!(position, tilt, opening, closing, "cover state");
    }
}

fn drive_cfg(d: &shade_config::Drive) -> DriveCfg {
    DriveCfg {
        travel_time_up: Duration::from_secs_f64(d.travel_time_up_s),
        travel_time_down: Duration::from_secs_f64(d.travel_time_down_s),
        startup_delay: Duration::from_secs_f64(d.startup_delay_s),
        send_stop_at_end: d.send_stop_at_end,
        dead_time: Duration::from_millis(d.dead_time_ms),
        poll_interval: Duration::from_millis(d.poll_interval_ms),
    }
}

fn tilt_cfg(t: &shade_config::Tilt) -> TiltCfg {
    TiltCfg {
        tilt_time_up: Duration::from_secs_f64(t.tilt_time_up_s),
        tilt_time_down: Duration::from_secs_f64(t.tilt_time_down_s),
    }
}

fn automation_cfg(a: &shade_config::Automation) -> Result<AutomationCfg> {
    Ok(AutomationCfg {
        open_at_minute: a.open_at_minute()?,
        close_at_minute: a.close_at_minute()?,
        sun_control: a.sun_control,
        sunrise_delay_min: a.sunrise_delay_min,
        sunset_delay_min: a.sunset_delay_min,
        night_lights: a.night_lights,
        day_tilting: a.day_tilting,
        wind_limit: a.wind_limit,
        gust_limit: a.gust_limit,
        weather_code_limit: a.weather_code_limit,
    })
}

fn init_tracing(logging: &shade_config::Logging) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(spec) => tracing_subscriber::EnvFilter::try_new(spec),
        Err(_) => {
            tracing_subscriber::EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
        }
    }
    .wrap_err("invalid log filter")?;

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open log file {path}"))?;
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let raw = fs::read_to_string(&args.config)
        .wrap_err_with(|| format!("failed to read config {}", args.config.display()))?;
    let config = shade_config::load_toml(&raw)
        .wrap_err_with(|| format!("failed to parse config {}", args.config.display()))?;
    config.validate().wrap_err("invalid config")?;

    init_tracing(&config.logging)?;

    #[cfg(not(feature = "hardware"))]
    if args.up_pin.is_some() || args.down_pin.is_some() {
        tracing::warn!("pin overrides ignored without the hardware feature");
    }

    let mut builder = CoverBuilder::new()
        .with_sink(LogSink)
        .with_drive(drive_cfg(&config.drive))
        .with_automation(automation_cfg(&config.automation)?);
    if let Some(tilt) = &config.tilt {
        builder = builder.with_tilt(tilt_cfg(tilt));
    }

    #[cfg(feature = "hardware")]
    let builder = builder
        .with_up_actuator(shade_hardware::GpioRelay::new(args.up_pin.unwrap_or(23))?)
        .with_down_actuator(shade_hardware::GpioRelay::new(args.down_pin.unwrap_or(24))?);
    #[cfg(not(feature = "hardware"))]
    let builder = builder
        .with_up_actuator(shade_hardware::SimulatedActuator::new("up"))
        .with_down_actuator(shade_hardware::SimulatedActuator::new("down"));

    let mut cover = builder.build()?;

    if let Some(restore) = config.restore {
        cover.set_known_position(restore.position);
        if let Some(tilt) = restore.tilt {
            cover.set_known_tilt_position(tilt);
        }
    }
    tracing::info!(
        up = %config.actuators.up,
        down = %config.actuators.down,
        "cover ready"
    );

    let target = if args.open {
        Some(100)
    } else if args.close {
        Some(0)
    } else {
        args.position
    };

    let mut acted = false;
    if let Some(target) = target {
        let position = runner::run_to_position(&mut cover, target)?;
        println!("position: {position}");
        acted = true;
    }
    if let Some(tilt) = args.tilt {
        if !cover.has_tilt_support() {
            eyre::bail!("--tilt given but no [tilt] section configured");
        }
        cover.set_tilt_position(tilt)?;
        runner::run_to_arrival(&mut cover, None)?;
        if let Some(tilt) = cover.tilt_position() {
            println!("tilt: {tilt}");
        }
        acted = true;
    }
    if !acted {
        println!("Please specify --position <0..=100>, --open, --close, or --tilt <0..=100>.");
    }
    Ok(())
}
