//! `cmg-stab`: command-line front end for the CMG boat stabilization core.
//!
//! Two modes, selected on the command line:
//!
//! - `simulate` — run the closed-loop simulation engine at a fixed rate and
//!   write one wire-shape JSON frame per line to stdout (the same format
//!   the hardware frame generators emit).
//! - `poll` — ingest frames from a relay's latest-frame HTTP resource and
//!   print the accepted stream, logging out-of-order frames as they are
//!   rejected.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use std::{env, fs, process, thread};

use dynamics::{CmgSimulation, SimulationConfig};
use log::{info, warn, LevelFilter};
use serde::Deserialize;
use simcore::TelemetryFrame;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use telemetry::{HttpSourceConfig, HttpTelemetrySource, LocalTimeline, TelemetrySource};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AppConfig {
    /// Relay API base address (`poll` mode).
    api_url: String,
    /// Milliseconds between polls (`poll` mode).
    polling_interval_ms: u64,
    /// Rewrite frame time with locally measured elapsed time, for sources
    /// whose own timestamps are static or non-monotonic.
    use_local_time: bool,
    /// Retained frame window in the ingestion buffer.
    buffer_capacity: usize,
    /// How long either mode runs, seconds.
    duration_s: f64,
    /// Stepping/output rate for `simulate` mode, Hz.
    sample_rate_hz: f64,
    /// Pin the simulation's RPM-noise RNG for reproducible output.
    seed: Option<u64>,
    /// Simulation tuning overrides, merged over defaults.
    simulation: SimulationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_url: "http://localhost:3001/api".to_string(),
            polling_interval_ms: 100,
            use_local_time: false,
            buffer_capacity: telemetry::DEFAULT_FRAME_CAPACITY,
            duration_s: 30.0,
            sample_rate_hz: 10.0,
            seed: None,
            simulation: SimulationConfig::default(),
        }
    }
}

fn load_config(path: Option<&str>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match path {
        None => Ok(AppConfig::default()),
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
    }
}

fn run_simulate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut sim = match config.seed {
        Some(seed) => CmgSimulation::with_seed(config.simulation, seed),
        None => CmgSimulation::new(config.simulation),
    };

    let dt = 1.0 / config.sample_rate_hz;
    let steps = (config.duration_s * config.sample_rate_hz).ceil() as u64;
    info!("simulating {steps} steps at {} Hz", config.sample_rate_hz);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let budget = Duration::from_secs_f64(dt);
    for _ in 0..steps {
        let started = Instant::now();
        sim.step(dt)?;
        serde_json::to_writer(&mut out, &sim.telemetry_frame())?;
        out.write_all(b"\n")?;
        out.flush()?;
        // Pace output to the sample rate
        if let Some(remaining) = budget.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
    Ok(())
}

fn run_poll(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = HttpTelemetrySource::new(HttpSourceConfig {
        api_url: config.api_url.clone(),
        polling_interval: Duration::from_millis(config.polling_interval_ms),
        buffer_capacity: config.buffer_capacity,
        ..Default::default()
    });

    let timeline = config.use_local_time.then(|| Mutex::new(LocalTimeline::new()));
    let timeline = Arc::new(timeline);
    source.subscribe_accepted(Arc::new({
        let timeline = Arc::clone(&timeline);
        move |frame: &TelemetryFrame| {
            let frame = match timeline.as_ref() {
                Some(timeline) => {
                    let mut timeline = timeline.lock().unwrap_or_else(|e| e.into_inner());
                    timeline.rebase(*frame)
                }
                None => *frame,
            };
            match serde_json::to_string(&frame) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!("frame serialization failed: {err}"),
            }
        }
    }));
    source.subscribe_ignored(Arc::new(|frame: &TelemetryFrame| {
        warn!("rejected out-of-order frame t={}", frame.t);
    }));

    source.connect();
    thread::sleep(Duration::from_secs_f64(config.duration_s));
    source.disconnect();
    info!("retained {} frames", source.buffer_len());
    Ok(())
}

fn usage() -> ! {
    eprintln!("usage: cmg-stab <simulate|poll> [config.json]");
    process::exit(2);
}

fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .expect("logger init");

    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(String::as_str).unwrap_or_else(|| usage());
    let config = match load_config(args.get(2).map(String::as_str)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config: {err}");
            process::exit(1);
        }
    };

    let result = match mode {
        "simulate" => run_simulate(&config),
        "poll" => run_poll(&config),
        _ => usage(),
    };
    if let Err(err) = result {
        eprintln!("{mode} failed: {err}");
        process::exit(1);
    }
}
