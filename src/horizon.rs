//! The scheduling horizon: a contiguous range of one-hour periods, numbered from 1.
use crate::units::Hours;
use anyhow::{Result, ensure};
use std::ops::RangeInclusive;

/// The length of a single period
pub const PERIOD_LENGTH: Hours = Hours(1.0);

/// A contiguous, 1-based range of periods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Horizon(RangeInclusive<u32>);

impl Horizon {
    /// Create a horizon covering periods `1..=num_periods`
    pub fn new(num_periods: u32) -> Result<Self> {
        ensure!(num_periods > 0, "The horizon must contain at least one period");

        Ok(Self(1..=num_periods))
    }

    /// The first period
    pub fn first(&self) -> u32 {
        *self.0.start()
    }

    /// The last period
    pub fn last(&self) -> u32 {
        *self.0.end()
    }

    /// The number of periods
    pub fn len(&self) -> u32 {
        self.last() - self.first() + 1
    }

    /// Whether the horizon is empty (never true for a constructed horizon)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the period lies within the horizon
    pub fn contains(&self, period: u32) -> bool {
        self.0.contains(&period)
    }

    /// Iterate over the periods in order
    pub fn iter(&self) -> RangeInclusive<u32> {
        self.0.clone()
    }

    /// The period `offset` periods before `period`, if it lies within the horizon
    pub fn offset_back(&self, period: u32, offset: u32) -> Option<u32> {
        period
            .checked_sub(offset)
            .filter(|&source| self.contains(source))
    }
}
