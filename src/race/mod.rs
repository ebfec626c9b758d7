//! Race simulation: per-car state, the tick loop and the race registry

pub mod engine;
pub mod handle;
pub mod position;
pub mod registry;

pub use engine::{RaceCommand, RaceEngine};
pub use handle::{Race, RaceSummary, RaceView};
pub use position::CarPosition;
pub use registry::RaceService;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{CarId, TrackId};
use crate::util::time::DEFAULT_TICK_PERIOD;

pub type RaceId = u32;

/// Speed lost per tick by the player car when no accelerate command arrived
pub const DECELERATION: u32 = 5;

/// Speed units that make up one segment of travel per tick
pub const SPEED_PER_SEGMENT: u32 = 30;

/// Race lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RaceStatus {
    /// Created, tick loop not running yet
    Unstarted,
    /// Tick loop running
    InProgress,
    /// Every car crossed the line
    Finished,
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RaceStatus::Unstarted => "unstarted",
            RaceStatus::InProgress => "in-progress",
            RaceStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Externally visible state of a race. Positions keep roster order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResults {
    pub status: RaceStatus,
    pub positions: Vec<CarPosition>,
}

/// Settings shared by every race a registry creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceSettings {
    tick_period: Duration,
}

impl RaceSettings {
    pub fn new(tick_period: Duration) -> Result<Self, RaceError> {
        if tick_period.is_zero() {
            return Err(RaceError::InvalidTickPeriod);
        }
        Ok(Self { tick_period })
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }
}

/// Broad classes of race errors, used by the transport to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
}

/// Race and registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaceError {
    #[error("race {0} not found")]
    RaceNotFound(RaceId),

    #[error("car {0} not found")]
    CarNotFound(CarId),

    #[error("track {track_id} out of range (1..={available})")]
    TrackOutOfRange { track_id: TrackId, available: usize },

    #[error("race {race_id} has already started (status: {status})")]
    AlreadyStarted { race_id: RaceId, status: RaceStatus },

    #[error("tick period must be greater than zero")]
    InvalidTickPeriod,
}

impl RaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RaceError::RaceNotFound(_) | RaceError::CarNotFound(_) => ErrorKind::NotFound,
            RaceError::AlreadyStarted { .. } => ErrorKind::InvalidState,
            RaceError::TrackOutOfRange { .. } | RaceError::InvalidTickPeriod => {
                ErrorKind::Validation
            }
        }
    }
}
