//! Per-race, per-car simulation state

use serde::{Deserialize, Serialize};

use crate::catalog::Car;

use super::SPEED_PER_SEGMENT;

/// Where a car is on the track and how fast it is going.
///
/// `speed` never leaves `[0, car.top_speed]`. Once `final_position` is
/// nonzero the car is done and nothing else about it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarPosition {
    #[serde(flatten)]
    pub car: Car,
    pub speed: u32,
    pub segment: usize,
    /// Finish rank, 0 while still racing
    pub final_position: u32,
}

impl CarPosition {
    pub fn new(car: Car) -> Self {
        Self {
            car,
            speed: 0,
            segment: 0,
            final_position: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.final_position > 0
    }

    /// Add speed, capped at the car's top speed
    pub(crate) fn speed_up(&mut self, amount: u32) {
        self.speed = self.speed.saturating_add(amount).min(self.car.top_speed);
    }

    /// Remove speed, floored at zero
    pub(crate) fn slow_down(&mut self, amount: u32) {
        self.speed = self.speed.saturating_sub(amount).min(self.car.top_speed);
    }

    /// Move forward by the current speed. Returns true when the car reached
    /// `finish_line`; its segment is then pinned to the line.
    pub(crate) fn advance(&mut self, finish_line: usize) -> bool {
        self.segment += (self.speed / SPEED_PER_SEGMENT) as usize;
        if self.segment >= finish_line {
            self.segment = finish_line;
            true
        } else {
            false
        }
    }

    pub(crate) fn finish(&mut self, rank: u32) {
        debug_assert!(rank > 0);
        self.final_position = rank;
    }
}
