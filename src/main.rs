use anyhow::{Context, Result};
use eno_power_manager::{config, simulation, telemetry, trace};
use config::Config;
use serde_json::json;
use simulation::PowerManagerEnv;
use std::sync::Arc;
use telemetry::init_tracing;
use trace::{CsvRadiationSource, EnergyTrace};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let run = &cfg.run;

    let source = CsvRadiationSource::new(cfg.csv.clone());
    let trace = EnergyTrace::load(&source, &run.location, run.year, &cfg.trace)
        .with_context(|| format!("loading trace for {}/{}", run.location, run.year))?;
    run.check_against(trace.num_days())?;
    let trace = Arc::new(trace);
    info!(location = %run.location, year = run.year, days = trace.num_days(), "trace loaded");

    let mut env = PowerManagerEnv::new(Arc::clone(&trace), cfg.environment.clone())?;
    env.reset(run.start_day, run.initial_battery_mwh);
    while !env.step(run.action).year_ended {}

    let report = json!({
        "trace": trace.summary(),
        "action": run.action,
        "stats": env.stats(),
        "mean_daily_reward": env.stats().mean_daily_reward(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
