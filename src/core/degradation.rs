use crate::{
    core::{Error, battery::BatteryState},
    prelude::*,
};

pub const MAX_CAPACITY_FADE: f64 = 0.1;
pub const MAX_EFFICIENCY_FADE: f64 = 0.05;

/// Year-over-year battery aging with a single full replacement.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct DegradationTracker {
    nameplate: BatteryState,
    capacity_fade: f64,
    efficiency_fade: f64,
    replacement_year: u32,
    horizon: u32,
}

/// Battery state at the start of a project year.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Advanced {
    pub state: BatteryState,

    /// The battery got replaced at the start of the year.
    pub is_replaced: bool,
}

#[bon::bon]
impl DegradationTracker {
    #[builder]
    pub fn try_new(
        nameplate: BatteryState,
        capacity_fade: f64,
        #[builder(default)] efficiency_fade: f64,
        replacement_year: u32,
        horizon: u32,
    ) -> Result<Self, Error> {
        Error::ensure_within(
            "capacity_fade",
            capacity_fade,
            0.0,
            MAX_CAPACITY_FADE,
            "a fraction within 0..=0.1",
        )?;
        Error::ensure_within(
            "efficiency_fade",
            efficiency_fade,
            0.0,
            MAX_EFFICIENCY_FADE,
            "a fraction within 0..=0.05",
        )?;
        if horizon == 0 {
            return Err(Error::InvalidParameter {
                name: "horizon",
                value: 0.0,
                expected: "at least one year",
            });
        }
        if !(1..=horizon).contains(&replacement_year) {
            return Err(Error::InvalidParameter {
                name: "replacement_year",
                value: f64::from(replacement_year),
                expected: "a project year within the horizon",
            });
        }
        Ok(Self {
            nameplate: nameplate.emptied().validate()?,
            capacity_fade,
            efficiency_fade,
            replacement_year,
            horizon,
        })
    }
}

impl DegradationTracker {
    pub const fn nameplate(&self) -> BatteryState {
        self.nameplate
    }

    pub const fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Age the previous year's end state into the start of the specified year.
    ///
    /// The storage is always emptied at the year boundary.
    pub fn advance(&self, previous: BatteryState, year: u32) -> Result<Advanced, Error> {
        if !(1..=self.horizon).contains(&year) {
            return Err(Error::InvalidParameter {
                name: "year",
                value: f64::from(year),
                expected: "a project year within the horizon",
            });
        }
        if year == self.replacement_year {
            info!(year, capacity = %self.nameplate.capacity, "battery replaced");
            return Ok(Advanced { state: self.nameplate, is_replaced: true });
        }
        if year == 1 {
            return Ok(Advanced { state: self.nameplate, is_replaced: false });
        }
        let state = BatteryState {
            capacity: previous.capacity * (1.0 - self.capacity_fade),
            efficiency: previous.efficiency * (1.0 - self.efficiency_fade),
            ..previous
        }
        .emptied();
        trace!(year, capacity = %state.capacity, efficiency = state.efficiency, "aged");
        Ok(Advanced { state, is_replaced: false })
    }
}
