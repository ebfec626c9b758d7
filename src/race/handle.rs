//! Shared handle to a single race

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::catalog::{Car, CarId, Track, TrackId};

use super::{
    CarPosition, RaceCommand, RaceEngine, RaceError, RaceId, RaceResults, RaceSettings,
    RaceStatus,
};

/// Race metadata for listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSummary {
    pub id: RaceId,
    pub track_id: TrackId,
    pub track_name: String,
    pub player_id: CarId,
    pub status: RaceStatus,
    pub car_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Full race as returned when it is created: the track with its segments,
/// the roster and the current results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceView {
    pub id: RaceId,
    pub track: Track,
    pub player_id: CarId,
    pub cars: Vec<Car>,
    pub results: RaceResults,
    pub created_at: DateTime<Utc>,
}

/// A race and the channel into its tick loop.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and is safe to
/// call from any task while the loop runs.
#[derive(Debug)]
pub struct Race {
    id: RaceId,
    track: Arc<Track>,
    player_id: CarId,
    cars: Arc<Vec<Car>>,
    created_at: DateTime<Utc>,
    tick_period: Duration,
    results: Arc<RwLock<RaceResults>>,
    /// Set by `start`; sends fail quietly once the loop has exited
    commands: Mutex<Option<mpsc::UnboundedSender<RaceCommand>>>,
}

impl Race {
    pub fn new(
        id: RaceId,
        track: Arc<Track>,
        player_id: CarId,
        cars: Arc<Vec<Car>>,
        settings: RaceSettings,
    ) -> Self {
        let results = RaceResults {
            status: RaceStatus::Unstarted,
            positions: cars.iter().cloned().map(CarPosition::new).collect(),
        };

        Self {
            id,
            track,
            player_id,
            cars,
            created_at: Utc::now(),
            tick_period: settings.tick_period(),
            results: Arc::new(RwLock::new(results)),
            commands: Mutex::new(None),
        }
    }

    pub fn id(&self) -> RaceId {
        self.id
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn player_id(&self) -> CarId {
        self.player_id
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn status(&self) -> RaceStatus {
        self.results.read().status
    }

    /// Point-in-time copy of the race results
    pub fn results(&self) -> RaceResults {
        self.results.read().clone()
    }

    pub fn summary(&self) -> RaceSummary {
        RaceSummary {
            id: self.id,
            track_id: self.track.id,
            track_name: self.track.name.clone(),
            player_id: self.player_id,
            status: self.status(),
            car_count: self.cars.len(),
            created_at: self.created_at,
        }
    }

    pub fn view(&self) -> RaceView {
        RaceView {
            id: self.id,
            track: self.track.as_ref().clone(),
            player_id: self.player_id,
            cars: self.cars.to_vec(),
            results: self.results(),
            created_at: self.created_at,
        }
    }

    /// Move the race to in-progress and spawn its tick loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), RaceError> {
        let mut results = self.results.write();
        if results.status != RaceStatus::Unstarted {
            return Err(RaceError::AlreadyStarted {
                race_id: self.id,
                status: results.status,
            });
        }
        results.status = RaceStatus::InProgress;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *self.commands.lock() = Some(command_tx);

        let engine = RaceEngine::new(self.id, self.track.clone(), self.player_id);
        tokio::spawn(engine.run(self.results.clone(), command_rx, self.tick_period));

        info!(race_id = self.id, player_id = self.player_id, "Race start requested");
        Ok(())
    }

    /// Queue one accelerate press for the player car.
    ///
    /// Never blocks. Ignored before `start` and after the race finished.
    pub fn accelerate(&self) {
        match self.commands.lock().as_ref() {
            Some(tx) => {
                if tx.send(RaceCommand::Accelerate).is_err() {
                    debug!(race_id = self.id, "Race over, accelerate ignored");
                }
            }
            None => debug!(race_id = self.id, "Race not started, accelerate ignored"),
        }
    }
}
