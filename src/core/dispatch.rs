mod plan;
mod step;

use bon::Builder;
use itertools::izip;

pub use self::{
    plan::{DayPlan, Role},
    step::{DispatchDecision, HourlyStep},
};
use crate::{
    core::{
        Error,
        battery::BatteryState,
        series::{Point, check_aligned},
    },
    prelude::*,
    quantity::{cost::Dollars, energy::MegawattHours, price::MegawattHourPrice},
};

/// Dispatch blocks are cut by position, so DST-shifted days simply straddle the labels.
pub const HOURS_PER_BLOCK: usize = 24;

/// Greedy per-day arbitrage dispatch with perfect foresight within the day.
#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct Dispatcher {
    /// Charge from the own solar generation before buying from the grid.
    #[builder(default = true)]
    self_supply: bool,

    /// Maximum equivalent full cycles per year.
    annual_cycle_limit: Option<f64>,
}

/// One year of dispatch.
#[must_use]
pub struct YearDispatch {
    pub steps: Vec<HourlyStep>,
    pub final_state: BatteryState,
    pub solar_revenue: Dollars,
    pub battery_revenue: Dollars,
    pub solar_generation: MegawattHours,

    /// Energy stored plus energy released.
    pub throughput: MegawattHours,

    /// Number of day blocks with any discharge.
    pub n_active_days: usize,
}

impl YearDispatch {
    /// Equivalent full cycles, based on the capacity the year was dispatched with.
    pub fn full_cycles(&self) -> f64 {
        self.throughput.0 / (2.0 * self.final_state.capacity.0)
    }

    /// Mean state of charge at the end of each hour.
    #[expect(clippy::cast_precision_loss)]
    pub fn average_state_of_charge(&self) -> MegawattHours {
        if self.steps.is_empty() {
            return MegawattHours::ZERO;
        }
        self.steps.iter().map(|step| step.state_of_charge_after).sum::<MegawattHours>()
            / self.steps.len() as f64
    }

    /// Battery revenue per day with any discharge, zero for an idle year.
    #[expect(clippy::cast_precision_loss)]
    pub fn average_active_day_revenue(&self) -> Dollars {
        if self.n_active_days == 0 {
            Dollars::ZERO
        } else {
            self.battery_revenue / self.n_active_days as f64
        }
    }
}

impl Dispatcher {
    pub fn check(self) -> Result<Self, Error> {
        if let Some(limit) = self.annual_cycle_limit {
            Error::ensure_within(
                "annual_cycle_limit",
                limit,
                0.0,
                f64::MAX,
                "a non-negative number of cycles",
            )?;
        }
        Ok(self)
    }

    /// Dispatch the battery over the year of hourly prices and solar generation.
    #[instrument(skip_all, fields(capacity = %initial_state.capacity, efficiency = initial_state.efficiency))]
    pub fn dispatch_year(
        self,
        prices: &[Point<MegawattHourPrice>],
        generation: &[Point<MegawattHours>],
        initial_state: BatteryState,
    ) -> Result<YearDispatch, Error> {
        check_aligned(prices, generation)?;
        let mut state = initial_state.validate()?;
        self.check()?;

        let n_block_hours = Self::n_block_hours(state);
        let mut remaining_throughput = self
            .annual_cycle_limit
            .map_or(MegawattHours::from(f64::INFINITY), |limit| state.capacity * (2.0 * limit));

        let mut steps = Vec::with_capacity(prices.len());
        let mut n_active_days = 0;

        for (price_block, generation_block) in
            prices.chunks(HOURS_PER_BLOCK).zip(generation.chunks(HOURS_PER_BLOCK))
        {
            let block_prices = price_block.iter().map(|(_, price)| *price).collect::<Vec<_>>();
            let plan = DayPlan::select(&block_prices, n_block_hours);
            let mut is_active = false;

            for (role, (timestamp, price), (_, generation)) in
                izip!(plan.0, price_block, generation_block)
            {
                let step = self.step(
                    &mut state,
                    role,
                    (*timestamp, *price),
                    *generation,
                    remaining_throughput,
                );
                state.check_invariants(steps.len())?;
                remaining_throughput -= step.decision.throughput();
                is_active |= matches!(step.decision, DispatchDecision::Discharge(_));
                steps.push(step);
            }

            if is_active {
                n_active_days += 1;
            }
        }

        let dispatch = YearDispatch {
            solar_revenue: steps.iter().map(|step| step.solar_revenue).sum(),
            battery_revenue: steps.iter().map(|step| step.battery_revenue).sum(),
            solar_generation: steps.iter().map(|step| step.generation).sum(),
            throughput: steps.iter().map(|step| step.decision.throughput()).sum(),
            final_state: state,
            n_active_days,
            steps,
        };
        debug!(
            solar_revenue = %dispatch.solar_revenue,
            battery_revenue = %dispatch.battery_revenue,
            throughput = %dispatch.throughput,
            n_active_days,
            "dispatched",
        );
        Ok(dispatch)
    }

    /// Number of hours needed to fill the battery at its rated power.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn n_block_hours(state: BatteryState) -> usize {
        // Tolerate the rounding of a faded capacity, like `3.999999…` hours:
        (state.duration().0 - 1e-9).ceil().max(0.0) as usize
    }

    /// Simulate the single hour.
    fn step(
        self,
        state: &mut BatteryState,
        role: Role,
        (timestamp, price): Point<MegawattHourPrice>,
        generation: MegawattHours,
        remaining_throughput: MegawattHours,
    ) -> HourlyStep {
        let mut step = HourlyStep {
            timestamp,
            price,
            generation,
            decision: DispatchDecision::Idle,
            self_supply: MegawattHours::ZERO,
            battery_grid_energy: MegawattHours::ZERO,
            state_of_charge_after: state.state_of_charge,
            solar_revenue: generation * price,
            battery_revenue: Dollars::ZERO,
        };

        match role {
            Role::Charge => {
                let stored = state.charge(remaining_throughput);
                if stored.is_positive() {
                    let input = state.input_for(stored);
                    step.self_supply =
                        if self.self_supply { generation.min(input) } else { MegawattHours::ZERO };
                    step.battery_grid_energy = input - step.self_supply;
                    step.battery_revenue = -(step.battery_grid_energy * price);
                    step.solar_revenue = (generation - step.self_supply) * price;
                    step.decision = DispatchDecision::Charge(stored);
                }
            }
            Role::Discharge => {
                let released = state.discharge(remaining_throughput);
                if released.is_positive() {
                    let delivered = state.output_of(released);
                    step.battery_grid_energy = -delivered;
                    step.battery_revenue = delivered * price;
                    step.decision = DispatchDecision::Discharge(released);
                }
            }
            Role::Idle => {}
        }

        step.state_of_charge_after = state.state_of_charge;
        step
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, Timelike};

    use super::*;
    use crate::{
        core::series::{
            HOURS_PER_LEAP_YEAR,
            HOURS_PER_YEAR,
            Series,
            tests::{hourly, start_of},
        },
        quantity::power::Megawatts,
    };

    fn battery(efficiency: f64) -> BatteryState {
        BatteryState::builder()
            .capacity(MegawattHours::from(4.0))
            .power_rating(Megawatts::from(1.0))
            .efficiency(efficiency)
            .build()
    }

    /// Low prices in hours 2–5, high prices in hours 18–21.
    fn scenario_day() -> Vec<f64> {
        (0..24)
            .map(|hour| match hour {
                2..=5 => 10.0,
                18..=21 => 100.0,
                _ => 40.0,
            })
            .collect()
    }

    fn price_year(day: &[f64], n_hours: usize) -> Series<MegawattHourPrice> {
        hourly(2023, day.iter().copied().cycle().take(n_hours).map(MegawattHourPrice::from))
    }

    fn no_generation(n_hours: usize) -> Series<MegawattHours> {
        hourly(2023, vec![MegawattHours::ZERO; n_hours])
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder().build()
    }

    #[test]
    fn test_scenario_day() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let dispatch = dispatcher()
            .dispatch_year(&prices, &no_generation(HOURS_PER_YEAR), battery(0.9))
            .unwrap();

        let first_day = &dispatch.steps[..24];
        for step in &first_day[2..=5] {
            assert_eq!(step.decision, DispatchDecision::Charge(MegawattHours::from(1.0)));
        }
        for step in &first_day[18..=21] {
            assert_eq!(step.decision, DispatchDecision::Discharge(MegawattHours::from(1.0)));
        }
        assert_eq!(first_day[5].state_of_charge_after, MegawattHours::from(4.0));
        assert_eq!(first_day[21].state_of_charge_after, MegawattHours::ZERO);

        let day_revenue: Dollars = first_day.iter().map(|step| step.battery_revenue).sum();
        let leg = 0.9_f64.sqrt();
        assert_abs_diff_eq!(day_revenue.0, 4.0 * (100.0 * leg - 10.0 / leg), epsilon = 1e-9);
        assert_abs_diff_eq!(day_revenue.0, 337.31, epsilon = 0.01);

        assert_abs_diff_eq!(dispatch.battery_revenue.0, 365.0 * day_revenue.0, epsilon = 1e-6);
        assert_eq!(dispatch.n_active_days, 365);
        assert_abs_diff_eq!(dispatch.full_cycles(), 365.0, epsilon = 1e-9);
        assert_eq!(dispatch.final_state.state_of_charge, MegawattHours::ZERO);
    }

    #[test]
    fn test_state_of_charge_bounds() {
        // Irregular prices to exercise partial charges:
        let day: Vec<f64> = (0..24).map(|hour| f64::from((hour * 37) % 11) - 3.0).collect();
        let prices = hourly(
            2024,
            day.iter().copied().cycle().take(HOURS_PER_LEAP_YEAR).map(MegawattHourPrice::from),
        );
        let generation = hourly(
            2024,
            (0..HOURS_PER_LEAP_YEAR).map(|hour| MegawattHours::from((hour % 24) as f64 / 24.0 * 1.3)),
        );
        let dispatch = dispatcher()
            .dispatch_year(&prices, &generation, battery(0.85))
            .unwrap();
        assert_eq!(dispatch.steps.len(), HOURS_PER_LEAP_YEAR);
        for step in &dispatch.steps {
            assert!(step.state_of_charge_after.is_non_negative());
            assert!(step.state_of_charge_after <= MegawattHours::from(4.0));
            assert!(step.decision.throughput() <= MegawattHours::from(1.0));
        }
    }

    #[test]
    fn test_deterministic() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let generation = no_generation(HOURS_PER_YEAR);
        let lhs = dispatcher().dispatch_year(&prices, &generation, battery(0.9)).unwrap();
        let rhs = dispatcher().dispatch_year(&prices, &generation, battery(0.9)).unwrap();
        assert_eq!(lhs.steps, rhs.steps);
        assert_eq!(lhs.battery_revenue.0.to_bits(), rhs.battery_revenue.0.to_bits());
        assert_eq!(lhs.solar_revenue.0.to_bits(), rhs.solar_revenue.0.to_bits());
    }

    #[test]
    fn test_efficiency_monotonicity() {
        let day: Vec<f64> = (0..24).map(|hour| f64::from((hour * 7) % 24) * 3.5).collect();
        let prices = price_year(&day, HOURS_PER_YEAR);
        let generation = no_generation(HOURS_PER_YEAR);
        let revenues = [0.6, 0.75, 0.85, 0.9, 1.0].map(|efficiency| {
            dispatcher().dispatch_year(&prices, &generation, battery(efficiency)).unwrap().battery_revenue
        });
        for pair in revenues.windows(2) {
            assert!(pair[0] <= pair[1], "{:?} > {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_flat_prices() {
        let prices = price_year(&[50.0; 24], HOURS_PER_YEAR);
        let dispatch = dispatcher()
            .dispatch_year(&prices, &no_generation(HOURS_PER_YEAR), battery(0.9))
            .unwrap();
        let first_day = &dispatch.steps[..24];
        assert!(first_day[..4].iter().all(|step| matches!(step.decision, DispatchDecision::Charge(_))));
        assert!(
            first_day[4..8].iter().all(|step| matches!(step.decision, DispatchDecision::Discharge(_)))
        );
        // Only the efficiency loss is left:
        let day_revenue: Dollars = first_day.iter().map(|step| step.battery_revenue).sum();
        let leg = 0.9_f64.sqrt();
        assert_abs_diff_eq!(day_revenue.0, 4.0 * 50.0 * (leg - 1.0 / leg), epsilon = 1e-9);
        assert!(day_revenue < Dollars::ZERO);
        assert!(day_revenue.0 > -25.0);
    }

    #[test]
    fn test_ideal_flat_prices_are_neutral() {
        let prices = price_year(&[50.0; 24], HOURS_PER_YEAR);
        let dispatch = dispatcher()
            .dispatch_year(&prices, &no_generation(HOURS_PER_YEAR), battery(1.0))
            .unwrap();
        assert_abs_diff_eq!(dispatch.battery_revenue.0, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_prices() {
        let mut day = scenario_day();
        day[2] = -5.0;
        let prices = price_year(&day, HOURS_PER_YEAR);
        let dispatch = dispatcher()
            .dispatch_year(&prices, &no_generation(HOURS_PER_YEAR), battery(0.9))
            .unwrap();
        let step = dispatch.steps[2];
        assert_eq!(step.decision, DispatchDecision::Charge(MegawattHours::from(1.0)));
        // We get paid for the grid energy:
        assert!(step.battery_revenue > Dollars::ZERO);
    }

    #[test]
    fn test_self_supply() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let generation = hourly(2023, vec![MegawattHours::from(0.7); HOURS_PER_YEAR]);
        let dispatch = dispatcher().dispatch_year(&prices, &generation, battery(0.81)).unwrap();

        // Charging 1 MWh needs 1 / 0.9 MWh at the terminals, the solar covers 0.7 MWh of it:
        let step = dispatch.steps[2];
        assert_abs_diff_eq!(step.self_supply.0, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(step.battery_grid_energy.0, 1.0 / 0.9 - 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(step.solar_revenue.0, 0.0, epsilon = 1e-12);

        // Idle hours export everything:
        assert_abs_diff_eq!(dispatch.steps[0].solar_revenue.0, 0.7 * 40.0, epsilon = 1e-12);
    }

    #[test]
    fn test_self_supply_surplus_is_exported() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let generation = hourly(2023, vec![MegawattHours::from(1.5); HOURS_PER_YEAR]);
        let dispatch = dispatcher().dispatch_year(&prices, &generation, battery(0.81)).unwrap();
        let step = dispatch.steps[2];
        assert_eq!(step.battery_grid_energy, MegawattHours::ZERO);
        assert_abs_diff_eq!(step.solar_revenue.0, (1.5 - 1.0 / 0.9) * 10.0, epsilon = 1e-12);
        assert_eq!(step.battery_revenue, Dollars::ZERO);
    }

    #[test]
    fn test_without_self_supply() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let generation = hourly(2023, vec![MegawattHours::from(0.7); HOURS_PER_YEAR]);
        let dispatch = Dispatcher::builder()
            .self_supply(false)
            .build()
            .dispatch_year(&prices, &generation, battery(0.81))
            .unwrap();
        let step = dispatch.steps[2];
        assert_eq!(step.self_supply, MegawattHours::ZERO);
        assert_abs_diff_eq!(step.solar_revenue.0, 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_state_of_charge_carries_over_days() {
        // Expensive hours first, cheap hours last: nothing to release on the first day.
        let day: Vec<f64> = (0..24)
            .map(|hour| match hour {
                0..4 => 100.0,
                20.. => 1.0,
                _ => 50.0,
            })
            .collect();
        let prices = price_year(&day, HOURS_PER_YEAR);
        let dispatch = dispatcher()
            .dispatch_year(&prices, &no_generation(HOURS_PER_YEAR), battery(0.9))
            .unwrap();
        assert_eq!(dispatch.steps[0].decision, DispatchDecision::Idle);
        assert_eq!(dispatch.steps[23].state_of_charge_after, MegawattHours::from(4.0));
        assert_eq!(dispatch.steps[24].decision, DispatchDecision::Discharge(MegawattHours::from(1.0)));
    }

    #[test]
    fn test_cycle_limit() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let dispatch = Dispatcher::builder()
            .annual_cycle_limit(100.5)
            .build()
            .dispatch_year(&prices, &no_generation(HOURS_PER_YEAR), battery(0.9))
            .unwrap();
        assert_abs_diff_eq!(dispatch.full_cycles(), 100.5, epsilon = 1e-9);
        // The last half cycle charges but has nothing left to release:
        assert_eq!(dispatch.n_active_days, 100);
        assert_eq!(dispatch.final_state.state_of_charge, MegawattHours::from(4.0));
    }

    #[test]
    fn test_misaligned_series() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let generation = hourly(2022, vec![MegawattHours::ZERO; HOURS_PER_YEAR]);
        assert!(matches!(
            dispatcher().dispatch_year(&prices, &generation, battery(0.9)),
            Err(Error::MisalignedSeries { index: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_length() {
        let prices = price_year(&scenario_day(), 48);
        assert_eq!(
            dispatcher().dispatch_year(&prices, &no_generation(48), battery(0.9)).err(),
            Some(Error::InvalidProfileLength(48))
        );
    }

    #[test]
    fn test_n_block_hours_with_faded_capacity() {
        let mut state = battery(0.9);
        state.capacity = MegawattHours::from(4.0 * 0.98);
        assert_eq!(Dispatcher::n_block_hours(state), 4);
        state.capacity = MegawattHours::from(4.0);
        assert_eq!(Dispatcher::n_block_hours(state), 4);
    }

    #[test]
    fn test_year_averages() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let dispatch = dispatcher()
            .dispatch_year(&prices, &no_generation(HOURS_PER_YEAR), battery(0.9))
            .unwrap();
        // Every day: 1, 2, 3 MWh while charging, full for 13 hours, then 3, 2, 1 MWh:
        assert_abs_diff_eq!(dispatch.average_state_of_charge().0, 64.0 / 24.0, epsilon = 1e-9);
        let leg = 0.9_f64.sqrt();
        assert_abs_diff_eq!(
            dispatch.average_active_day_revenue().0,
            4.0 * (100.0 * leg - 10.0 / leg),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_idle_year_averages() {
        let prices = price_year(&scenario_day(), HOURS_PER_YEAR);
        let dispatch = Dispatcher::builder()
            .annual_cycle_limit(0.0)
            .build()
            .dispatch_year(&prices, &no_generation(HOURS_PER_YEAR), battery(0.9))
            .unwrap();
        assert_eq!(dispatch.n_active_days, 0);
        assert_eq!(dispatch.average_active_day_revenue(), Dollars::ZERO);
        assert_eq!(dispatch.average_state_of_charge(), MegawattHours::ZERO);
    }

    /// Blocks follow the position in the series, not the wall-clock hour of the timestamps.
    #[test]
    fn test_blocks_ignore_wall_clock() {
        // Local midnight at −05:00:
        let start = start_of(2023) + TimeDelta::hours(5);
        let prices: Series<MegawattHourPrice> = scenario_day()
            .into_iter()
            .cycle()
            .take(HOURS_PER_YEAR)
            .zip(0..)
            .map(|(price, hour)| (start + TimeDelta::hours(hour), MegawattHourPrice::from(price)))
            .collect();
        let generation: Series<MegawattHours> =
            prices.iter().map(|(timestamp, _)| (*timestamp, MegawattHours::ZERO)).collect();
        let dispatch = dispatcher().dispatch_year(&prices, &generation, battery(0.9)).unwrap();

        let first_block = &dispatch.steps[..HOURS_PER_BLOCK];
        assert_eq!(first_block[0].timestamp.hour(), 5);
        for (index, step) in first_block.iter().enumerate() {
            let expected = match index {
                2..=5 => DispatchDecision::Charge(MegawattHours::from(1.0)),
                18..=21 => DispatchDecision::Discharge(MegawattHours::from(1.0)),
                _ => DispatchDecision::Idle,
            };
            assert_eq!(step.decision, expected, "block index {index}");
        }
        // The UTC midnight inside the block is not a boundary:
        assert_eq!(first_block[19].timestamp.hour(), 0);
        assert_eq!(first_block[19].decision, DispatchDecision::Discharge(MegawattHours::from(1.0)));
        assert_eq!(dispatch.n_active_days, 365);
    }
}
