use serde::{Deserialize, Serialize};

use crate::{PsbError, Result};

/// Number of paralleled power units the device reports as one.
pub const DEFAULT_DEVICE_COUNT: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    /// Voltage (V)
    U,
    /// Current (A)
    I,
    /// Power (W)
    P,
    /// Resistance ratio
    R,
}

impl Quantity {
    /// Physical units per raw count for a single device.
    pub fn scale(self) -> f64 {
        match self {
            Quantity::U => 0.019073777,
            Quantity::I => 0.001525902,
            Quantity::P => 0.572213321,
            Quantity::R => 0.012397955,
        }
    }

    /// Rated maximum of the device. Informational, never enforced.
    pub fn nominal(self) -> f64 {
        match self {
            Quantity::U => 1000.0,
            Quantity::I => 80.0,
            Quantity::P => 30_000.0,
            Quantity::R => 1.0,
        }
    }

    /// Current and power are shared across paralleled devices, so the raw
    /// count carries one device's share.
    pub fn is_per_device(self) -> bool {
        matches!(self, Quantity::I | Quantity::P)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = match self {
            Quantity::U => "u",
            Quantity::I => "i",
            Quantity::P => "p",
            Quantity::R => "r",
        };
        f.write_str(key)
    }
}

/// Converts between physical values and raw 16 bit counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaleTable {
    device_count: u32,
}

impl Default for ScaleTable {
    fn default() -> Self {
        Self {
            device_count: DEFAULT_DEVICE_COUNT,
        }
    }
}

impl ScaleTable {
    pub fn new(device_count: u32) -> Result<Self> {
        if device_count == 0 {
            return Err(PsbError::InvalidDeviceCount(device_count));
        }
        Ok(Self { device_count })
    }

    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    /// Truncates towards zero like the device firmware does, then rejects
    /// anything that does not fit a u16 instead of wrapping.
    ///
    /// Divides by the scale first and the device count second; folding both
    /// into one divisor rounds differently at count boundaries.
    pub fn to_raw(&self, quantity: Quantity, value: f64) -> Result<u16> {
        let mut raw = value / quantity.scale();
        if quantity.is_per_device() {
            raw /= self.device_count as f64;
        }
        let raw = raw.trunc();
        if !raw.is_finite() || raw < 0.0 || raw > u16::MAX as f64 {
            return Err(PsbError::RawOutOfRange { quantity, value });
        }
        Ok(raw as u16)
    }

    pub fn to_physical(&self, quantity: Quantity, raw: u16) -> f64 {
        let value = raw as f64 * quantity.scale();
        if quantity.is_per_device() {
            value * self.device_count as f64
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_devices_is_rejected() {
        assert!(matches!(
            ScaleTable::new(0),
            Err(PsbError::InvalidDeviceCount(0))
        ));
    }

    #[test]
    fn current_is_split_across_devices() {
        let table = ScaleTable::default();
        // 3 A over 3 devices is 1 A each
        let raw = table.to_raw(Quantity::I, 3.0).unwrap();
        assert_eq!(raw, (1.0 / 0.001525902f64).trunc() as u16);
        assert_eq!(raw, 655);
    }

    #[test]
    fn voltage_ignores_device_count() {
        let one = ScaleTable::new(1).unwrap();
        let five = ScaleTable::new(5).unwrap();
        assert_eq!(
            one.to_raw(Quantity::U, 48.0).unwrap(),
            five.to_raw(Quantity::U, 48.0).unwrap()
        );
        assert_eq!(
            one.to_physical(Quantity::R, 100),
            five.to_physical(Quantity::R, 100)
        );
    }

    #[test]
    fn truncates_fractional_counts() {
        let table = ScaleTable::default();
        // 0.999 counts
        assert_eq!(table.to_raw(Quantity::U, 0.019).unwrap(), 0);
        // slightly negative still truncates to zero
        assert_eq!(table.to_raw(Quantity::U, -0.01).unwrap(), 0);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let table = ScaleTable::default();
        assert!(matches!(
            table.to_raw(Quantity::U, 2000.0),
            Err(PsbError::RawOutOfRange {
                quantity: Quantity::U,
                ..
            })
        ));
        assert!(table.to_raw(Quantity::I, -1.0).is_err());
        assert!(table.to_raw(Quantity::P, f64::NAN).is_err());
        assert!(table.to_raw(Quantity::R, f64::INFINITY).is_err());
    }

    #[test]
    fn nominal_ratings_fit_the_wire() {
        let table = ScaleTable::default();
        for quantity in [Quantity::U, Quantity::I, Quantity::P, Quantity::R] {
            assert!(table.to_raw(quantity, quantity.nominal()).is_ok());
        }
    }

    #[test]
    fn divides_by_scale_then_device_count() {
        let table = ScaleTable::default();
        // one combined divisor truncates this to 10
        assert_eq!(table.to_raw(Quantity::I, 0.050354765999999995).unwrap(), 11);
        assert_eq!(table.to_raw(Quantity::P, 5.1499198889999995).unwrap(), 3);

        for raw in (0..=u16::MAX).step_by(7) {
            for quantity in [Quantity::I, Quantity::P] {
                let value = raw as f64 * quantity.scale() * 3.0;
                let expected = (value / quantity.scale() / 3.0).trunc() as u16;
                assert_eq!(table.to_raw(quantity, value).unwrap(), expected);
            }
        }
    }

    #[test]
    fn to_physical_scales_per_device_quantities() {
        let table = ScaleTable::default();
        let i = table.to_physical(Quantity::I, 1000);
        assert!((i - 4.577706).abs() < 1e-6);
        let p = table.to_physical(Quantity::P, 1000);
        assert!((p - 1716.639963).abs() < 1e-6);
    }
}
