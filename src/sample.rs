// src/sample.rs
//
// Numeric representation shared by samples and parameter values.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A sample / parameter number type.
///
/// The engine is written once against this trait and instantiated for
/// `f32` and `f64`.
pub trait Sample:
    Copy
    + Default
    + Debug
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + AddAssign
{
    const ZERO: Self;

    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;
}

impl Sample for f32 {
    const ZERO: Self = 0.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    const ZERO: Self = 0.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}
