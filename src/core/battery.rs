use serde::Serialize;

use crate::{
    core::Error,
    quantity::{energy::MegawattHours, power::Megawatts, time::Hours},
};

/// Battery storage state.
///
/// Losses are split evenly between the legs: both charging and discharging lose `1 − √η`,
/// so that a full round trip loses exactly `1 − η`.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, bon::Builder)]
pub struct BatteryState {
    /// Usable energy capacity.
    pub capacity: MegawattHours,

    /// Maximum charging and discharging rate.
    pub power_rating: Megawatts,

    /// Round-trip efficiency within `(0, 1]`.
    pub efficiency: f64,

    /// Energy currently stored.
    #[builder(default)]
    pub state_of_charge: MegawattHours,
}

impl BatteryState {
    /// Validate the static parameters.
    pub fn validate(self) -> Result<Self, Error> {
        if !self.capacity.is_positive() {
            return Err(Error::InvalidParameter {
                name: "capacity",
                value: self.capacity.0,
                expected: "a positive energy",
            });
        }
        if !self.power_rating.is_positive() {
            return Err(Error::InvalidParameter {
                name: "power_rating",
                value: self.power_rating.0,
                expected: "a positive power",
            });
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "efficiency",
                value: self.efficiency,
                expected: "a fraction within (0, 1]",
            });
        }
        self.check_invariants(0)?;
        Ok(self)
    }

    /// Number of hours to fill the empty battery at the rated power.
    pub fn duration(self) -> Hours {
        self.capacity / self.power_rating
    }

    /// Free room left for charging.
    pub fn headroom(self) -> MegawattHours {
        self.capacity - self.state_of_charge
    }

    /// One-leg efficiency.
    pub fn leg_efficiency(self) -> f64 {
        self.efficiency.sqrt()
    }

    /// Same battery with the empty storage.
    pub fn emptied(mut self) -> Self {
        self.state_of_charge = MegawattHours::ZERO;
        self
    }

    /// Store up to `limit` of energy during the hour.
    ///
    /// # Returns
    ///
    /// The stored amount, clipped by the power rating and headroom.
    pub fn charge(&mut self, limit: MegawattHours) -> MegawattHours {
        let headroom = self.headroom();
        let amount = (self.power_rating * Hours::ONE)
            .min(headroom)
            .min(limit)
            .max(MegawattHours::ZERO);
        // Snap to the bound to avoid rounding overshoots:
        self.state_of_charge =
            if amount == headroom { self.capacity } else { self.state_of_charge + amount };
        amount
    }

    /// Release up to `limit` of stored energy during the hour.
    ///
    /// # Returns
    ///
    /// The released amount, clipped by the power rating and stored energy.
    pub fn discharge(&mut self, limit: MegawattHours) -> MegawattHours {
        let stored = self.state_of_charge;
        let amount = (self.power_rating * Hours::ONE)
            .min(stored)
            .min(limit)
            .max(MegawattHours::ZERO);
        self.state_of_charge =
            if amount == stored { MegawattHours::ZERO } else { self.state_of_charge - amount };
        amount
    }

    /// Energy needed at the terminals to store the amount.
    pub fn input_for(self, stored: MegawattHours) -> MegawattHours {
        stored / self.leg_efficiency()
    }

    /// Energy delivered at the terminals when the amount is released.
    pub fn output_of(self, released: MegawattHours) -> MegawattHours {
        released * self.leg_efficiency()
    }

    pub fn check_invariants(self, hour: usize) -> Result<(), Error> {
        if self.state_of_charge.is_non_negative() && self.state_of_charge <= self.capacity {
            Ok(())
        } else {
            Err(Error::StateInvariantViolation {
                hour,
                state_of_charge: self.state_of_charge.0,
                capacity: self.capacity.0,
            })
        }
    }
}
