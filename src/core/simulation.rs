use bon::Builder;
use serde::Serialize;

use crate::{
    core::{
        Error,
        degradation::DegradationTracker,
        dispatch::{Dispatcher, HourlyStep},
        generation,
        series::{Point, check_aligned},
    },
    prelude::*,
    quantity::{
        cost::Dollars,
        energy::MegawattHours,
        power::Megawatts,
        price::MegawattHourPrice,
        time::Hours,
    },
};

/// Multi-year project simulation.
///
/// Prices repeat every year unchanged, the escalation is applied later on the cash flows.
#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct Simulation<'a> {
    base_solar_profile: &'a [Point<MegawattHours>],
    base_prices: &'a [Point<MegawattHourPrice>],
    tracker: DegradationTracker,
    solar_degradation_rate: f64,
    dispatcher: Dispatcher,

    /// Keep the hourly traces of every year.
    #[builder(default)]
    retain_traces: bool,
}

impl<S: simulation_builder::IsComplete> SimulationBuilder<'_, S> {
    pub fn simulate(self) -> Result<Outcome, Error> {
        self.build().simulate()
    }
}

#[must_use]
pub struct Outcome {
    pub summaries: Vec<YearSummary>,

    /// Hourly dispatch traces, empty unless requested.
    pub traces: Vec<Vec<HourlyStep>>,
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: u32,
    pub solar_revenue: Dollars,
    pub battery_revenue: Dollars,
    pub solar_generation: MegawattHours,
    pub throughput: MegawattHours,
    pub full_cycles: f64,
    pub end_capacity: MegawattHours,
    pub end_efficiency: f64,

    #[serde(rename = "replacement")]
    pub is_replaced: bool,

    pub n_active_days: usize,

    /// Mean end-of-hour state of charge.
    pub average_state_of_charge: MegawattHours,

    /// Battery revenue per day with any discharge.
    pub average_active_day_revenue: Dollars,

    /// Number of simulated hours, 8760 or 8784.
    pub n_hours: usize,
}

impl YearSummary {
    pub fn total_revenue(&self) -> Dollars {
        self.solar_revenue + self.battery_revenue
    }

    /// Average price received for the exported and self-supplied solar energy.
    pub fn capture_price(&self) -> Option<MegawattHourPrice> {
        self.solar_generation.is_positive().then(|| self.solar_revenue / self.solar_generation)
    }

    /// Solar generation relative to running at the rated power around the clock.
    #[expect(clippy::cast_precision_loss)]
    pub fn capacity_factor(&self, solar_capacity: Megawatts) -> Option<f64> {
        let nameplate_output = solar_capacity * Hours::from(self.n_hours as f64);
        nameplate_output.is_positive().then(|| self.solar_generation.0 / nameplate_output.0)
    }
}

impl Simulation<'_> {
    #[instrument(skip_all, fields(horizon = self.tracker.horizon()))]
    fn simulate(self) -> Result<Outcome, Error> {
        check_aligned(self.base_prices, self.base_solar_profile)?;
        generation::check_degradation_rate(self.solar_degradation_rate)?;
        let dispatcher = self.dispatcher.check()?;

        let horizon = self.tracker.horizon();
        let mut summaries = Vec::new();
        let mut traces = Vec::new();
        let mut state = self.tracker.nameplate();

        for year in 1..=horizon {
            let advanced = self.tracker.advance(state, year)?;
            let generation = generation::adjust(
                self.base_solar_profile,
                year - 1,
                self.solar_degradation_rate,
            )?;
            let dispatch = dispatcher.dispatch_year(self.base_prices, &generation, advanced.state)?;
            let summary = YearSummary {
                year,
                solar_revenue: dispatch.solar_revenue,
                battery_revenue: dispatch.battery_revenue,
                solar_generation: dispatch.solar_generation,
                throughput: dispatch.throughput,
                full_cycles: dispatch.full_cycles(),
                end_capacity: dispatch.final_state.capacity,
                end_efficiency: dispatch.final_state.efficiency,
                is_replaced: advanced.is_replaced,
                n_active_days: dispatch.n_active_days,
                average_state_of_charge: dispatch.average_state_of_charge(),
                average_active_day_revenue: dispatch.average_active_day_revenue(),
                n_hours: dispatch.steps.len(),
            };
            info!(
                year,
                solar_revenue = %summary.solar_revenue,
                battery_revenue = %summary.battery_revenue,
                capacity = %summary.end_capacity,
                "simulated",
            );
            state = dispatch.final_state;
            summaries.push(summary);
            if self.retain_traces {
                traces.push(dispatch.steps);
            }
        }

        Ok(Outcome { summaries, traces })
    }
}
