use std::{
    fmt::{Debug, Display, Formatter},
    ops::Div,
};

use crate::quantity::{Quantity, energy::MegawattHours, price::MegawattHourPrice};

/// US dollars.
pub type Dollars = Quantity<0, 0, 1>;

impl Dollars {
    /// Round to whole cents.
    pub fn round_to_cents(self) -> Self {
        Self((self.0 * 100.0).round() / 100.0)
    }
}

impl Display for Dollars {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0.0 {
            write!(f, "-${:.2}", -self.0)
        } else {
            write!(f, "${:.2}", self.0)
        }
    }
}

impl Debug for Dollars {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}$", self.0)
    }
}

impl Div<MegawattHours> for Dollars {
    type Output = MegawattHourPrice;

    fn div(self, rhs: MegawattHours) -> Self::Output {
        Quantity(self.0 / rhs.0)
    }
}
