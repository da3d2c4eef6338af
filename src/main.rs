#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod config;
mod core;
mod finance;
mod loader;
mod prelude;
mod quantity;
mod tables;

use clap::{Parser, crate_version};
use serde_json::json;

use crate::{
    cli::{Args, Command, DispatchArgs, InputArgs, SimulateArgs},
    config::Config,
    core::{
        Series, Simulation,
        dispatch::{HOURS_PER_BLOCK, HourlyStep},
    },
    finance::Plant,
    prelude::*,
    quantity::{energy::MegawattHours, price::MegawattHourPrice},
    tables::{build_appraisals_table, build_cash_flows_table, build_steps_table, build_years_table},
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().with_writer(std::io::stderr).init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Simulate(args) => simulate(&args),
        Command::Dispatch(args) => dispatch(&args),
    }
}

struct Inputs {
    config: Config,
    prices: Series<MegawattHourPrice>,
    solar: Series<MegawattHours>,
}

impl InputArgs {
    fn load(&self) -> Result<Inputs> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        Ok(Inputs {
            config,
            prices: loader::read_prices(&self.prices)?,
            solar: loader::read_generation(&self.solar)?,
        })
    }
}

fn simulate(args: &SimulateArgs) -> Result {
    let Inputs { config, prices, solar } = args.input.load()?;
    let outcome = Simulation::builder()
        .base_prices(&prices)
        .base_solar_profile(&solar)
        .tracker(config.tracker()?)
        .solar_degradation_rate(config.solar.degradation_rate)
        .dispatcher(config.dispatcher())
        .simulate()
        .context("simulation failed")?;

    let plant = Plant {
        solar_capacity: config.solar.capacity,
        battery_capacity: config.battery.capacity(),
    };
    let appraisals = config.finance.appraise(plant, &outcome.summaries);

    if args.json {
        let output = json!({ "years": outcome.summaries, "scenarios": appraisals });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", build_years_table(&outcome.summaries, config.solar.capacity));
        println!("{}", build_appraisals_table(&appraisals));
        if args.cash_flows {
            println!("{}", build_cash_flows_table(&appraisals));
        }
    }
    Ok(())
}

fn dispatch(args: &DispatchArgs) -> Result {
    let Inputs { config, prices, solar } = args.input.load()?;
    let nameplate = config.tracker()?.nameplate();
    let year = config
        .dispatcher()
        .dispatch_year(&prices, &solar, nameplate)
        .context("dispatch failed")?;
    info!(
        solar_revenue = %year.solar_revenue,
        battery_revenue = %year.battery_revenue,
        full_cycles = year.full_cycles(),
        n_active_days = year.n_active_days,
        "dispatched the first year",
    );

    let steps = day_steps(&year.steps, args.day)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(steps)?);
    } else {
        println!("{}", build_steps_table(steps));
    }
    Ok(())
}

/// Steps of the zero-based `day`-th 24-hour block, the last one may be shorter.
fn day_steps(steps: &[HourlyStep], day: usize) -> Result<&[HourlyStep]> {
    let Some(steps) = day
        .checked_mul(HOURS_PER_BLOCK)
        .filter(|start| *start < steps.len())
        .and_then(|start| steps.get(start..(start + HOURS_PER_BLOCK).min(steps.len())))
    else {
        bail!("day #{day} is out of range");
    };
    Ok(steps)
}
