use std::{fmt::Debug, fs, path::Path};

use serde::Deserialize;

use crate::{
    core::{self, BatteryState, DegradationTracker, Dispatcher, generation},
    finance::FinanceParameters,
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts, time::Hours},
};

/// Project configuration, every section falls back to the defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub battery: BatteryConfig,

    #[serde(default)]
    pub solar: SolarConfig,

    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub finance: FinanceParameters,
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    #[serde(rename = "power_mw")]
    pub power_rating: Megawatts,

    #[serde(rename = "duration_hours")]
    pub duration: f64,

    pub round_trip_efficiency: f64,

    /// Annual capacity fade.
    pub capacity_fade: f64,

    /// Annual round-trip efficiency fade.
    pub efficiency_fade: f64,

    pub replacement_year: u32,

    /// Charge from the own solar generation before buying from the grid.
    pub self_supply: bool,

    /// Maximum equivalent full cycles per year.
    pub annual_cycle_limit: Option<f64>,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            power_rating: Megawatts::from(1.0),
            duration: 4.0,
            round_trip_efficiency: 0.85,
            capacity_fade: 0.02,
            efficiency_fade: 0.0,
            replacement_year: 15,
            self_supply: true,
            annual_cycle_limit: None,
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    #[serde(rename = "capacity_mw")]
    pub capacity: Megawatts,

    /// Annual PV output degradation.
    pub degradation_rate: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self { capacity: Megawatts::from(1.0), degradation_rate: 0.005 }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(rename = "horizon_years")]
    pub horizon: u32,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { horizon: 30 }
    }
}

impl Config {
    #[instrument(skip_all, fields(path = ?path))]
    pub fn load<P: AsRef<Path> + Debug>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path).with_context(|| format!("failed to read {path:?}"))?;
        let this = Self::from_toml(&text).with_context(|| format!("invalid config {path:?}"))?;
        info!(
            capacity = %this.battery.capacity(),
            power_rating = %this.battery.power_rating,
            horizon = this.project.horizon,
            "loaded",
        );
        Ok(this)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let this: Self = toml::from_str(text)?;
        this.validate()?;
        Ok(this)
    }

    /// Reject every out-of-range parameter before running anything.
    pub fn validate(&self) -> Result<(), core::Error> {
        core::Error::ensure_within(
            "duration_hours",
            self.battery.duration,
            f64::MIN_POSITIVE,
            f64::MAX,
            "a positive number of hours",
        )?;
        self.tracker()?;
        self.dispatcher().check()?;
        generation::check_degradation_rate(self.solar.degradation_rate)?;
        if !self.solar.capacity.is_non_negative() {
            return Err(core::Error::InvalidParameter {
                name: "solar.capacity_mw",
                value: self.solar.capacity.0,
                expected: "a non-negative power",
            });
        }
        self.finance.validate()?;
        Ok(())
    }

    pub fn tracker(&self) -> Result<DegradationTracker, core::Error> {
        DegradationTracker::try_new()
            .nameplate(self.battery.nameplate())
            .capacity_fade(self.battery.capacity_fade)
            .efficiency_fade(self.battery.efficiency_fade)
            .replacement_year(self.battery.replacement_year)
            .horizon(self.project.horizon)
            .call()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::builder()
            .self_supply(self.battery.self_supply)
            .maybe_annual_cycle_limit(self.battery.annual_cycle_limit)
            .build()
    }
}

impl BatteryConfig {
    pub fn capacity(&self) -> MegawattHours {
        self.power_rating * Hours::from(self.duration)
    }

    pub fn nameplate(&self) -> BatteryState {
        BatteryState::builder()
            .capacity(self.capacity())
            .power_rating(self.power_rating)
            .efficiency(self.round_trip_efficiency)
            .build()
    }
}
