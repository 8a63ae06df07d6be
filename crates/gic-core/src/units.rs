//! Unit newtypes for GIC quantities.
//!
//! GIC studies juggle coil resistances in ohms, branch conductances in
//! siemens, nominal voltages in kV, transformer bases in MVA, and line
//! geometry in kilometers and compass degrees. Keeping them apart at the type
//! level stops a resistance from being stamped where a conductance belongs.
//!
//! All types are `#[repr(transparent)]` over `f64`.
//!
//! ```
//! use gic_core::units::{Degrees, Ohms};
//!
//! let r = Ohms(0.25);
//! assert_eq!(r.to_siemens().value(), 4.0);
//!
//! let bearing = Degrees(90.0);
//! assert!((bearing.to_radians() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }
    };
}

/// Resistance in ohms (per phase unless stated otherwise)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Ohms(pub f64);

impl_unit_ops!(Ohms, "ohm");

impl Ohms {
    /// Reciprocal conductance. Zero resistance maps to infinite conductance.
    #[inline]
    pub fn to_siemens(self) -> Siemens {
        Siemens(1.0 / self.0)
    }
}

/// Conductance in siemens
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Siemens(pub f64);

impl_unit_ops!(Siemens, "S");

/// Voltage in kilovolts (kV)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_unit_ops!(Kilovolts, "kV");

/// Apparent power in megavolt-amperes (MVA)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MegavoltAmperes(pub f64);

impl_unit_ops!(MegavoltAmperes, "MVA");

impl MegavoltAmperes {
    /// Per-phase peak DC current base in amperes: `S·1e3·√(2/3) / V_high`.
    #[inline]
    pub fn dc_current_base(self, high_kv: Kilovolts) -> f64 {
        self.0 * 1e3 * (2.0_f64 / 3.0).sqrt() / high_kv.0
    }
}

/// Geographic length in kilometers
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilometers(pub f64);

impl_unit_ops!(Kilometers, "km");

/// Compass angle in degrees, 0 = north, clockwise positive
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Degrees(pub f64);

impl_unit_ops!(Degrees, "deg");

impl Degrees {
    #[inline]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conductance_is_reciprocal() {
        assert_eq!(Ohms(2.0).to_siemens(), Siemens(0.5));
        assert!(Ohms(0.0).to_siemens().value().is_infinite());
    }

    #[test]
    fn dc_current_base_matches_formula() {
        let base = MegavoltAmperes(100.0).dc_current_base(Kilovolts(345.0));
        let expected = 100.0 * 1e3 * (2.0_f64 / 3.0).sqrt() / 345.0;
        assert!((base - expected).abs() < 1e-12);
    }

    #[test]
    fn display_carries_unit() {
        assert_eq!(format!("{}", Kilometers(12.5)), "12.5000 km");
    }
}
