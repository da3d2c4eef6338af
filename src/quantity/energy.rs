use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use crate::quantity::{
    Quantity,
    cost::Dollars,
    power::Megawatts,
    price::MegawattHourPrice,
    time::Hours,
};

pub type MegawattHours = Quantity<1, 1, 0>;

impl Display for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} MWh", self.0)
    }
}

impl Debug for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}MWh", self.0)
    }
}

impl Mul<MegawattHourPrice> for MegawattHours {
    type Output = Dollars;

    fn mul(self, rhs: MegawattHourPrice) -> Self::Output {
        Quantity(self.0 * rhs.0)
    }
}

impl Div<Megawatts> for MegawattHours {
    type Output = Hours;

    fn div(self, rhs: Megawatts) -> Self::Output {
        Quantity(self.0 / rhs.0)
    }
}
