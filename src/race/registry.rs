//! Race registry - creates races and routes commands to them

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::catalog::{Car, CarId, Catalog, Track, TrackId};

use super::{Race, RaceError, RaceId, RaceResults, RaceSettings, RaceStatus, RaceSummary};

/// Owns the catalog and every race created since startup.
///
/// Races are append-only and addressed by 1-based id.
pub struct RaceService {
    cars: Arc<Vec<Car>>,
    tracks: Vec<Arc<Track>>,
    races: RwLock<Vec<Arc<Race>>>,
    settings: RaceSettings,
}

impl RaceService {
    pub fn new(catalog: Catalog, settings: RaceSettings) -> Self {
        Self {
            cars: Arc::new(catalog.cars),
            tracks: catalog.tracks.into_iter().map(Arc::new).collect(),
            races: RwLock::new(Vec::new()),
            settings,
        }
    }

    pub fn list_cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn list_tracks(&self) -> Vec<&Track> {
        self.tracks.iter().map(|t| t.as_ref()).collect()
    }

    pub fn list_races(&self) -> Vec<RaceSummary> {
        self.races.read().iter().map(|r| r.summary()).collect()
    }

    pub fn race_count(&self) -> usize {
        self.races.read().len()
    }

    /// Races whose tick loop is currently running
    pub fn active_races(&self) -> usize {
        self.races
            .read()
            .iter()
            .filter(|r| r.status() == RaceStatus::InProgress)
            .count()
    }

    /// Create an unstarted race on `track_id` with the full roster, the car
    /// `player_id` being player controlled.
    pub fn create_race(
        &self,
        player_id: CarId,
        track_id: TrackId,
    ) -> Result<Arc<Race>, RaceError> {
        let track = self.track(track_id)?;

        if !self.cars.iter().any(|c| c.id == player_id) {
            return Err(RaceError::CarNotFound(player_id));
        }

        let mut races = self.races.write();
        let id = races.len() as RaceId + 1;
        let race = Arc::new(Race::new(
            id,
            track,
            player_id,
            self.cars.clone(),
            self.settings,
        ));
        races.push(race.clone());

        info!(race_id = id, track_id, player_id, "Race created");
        Ok(race)
    }

    pub fn get_race(&self, race_id: RaceId) -> Result<Arc<Race>, RaceError> {
        if race_id == 0 {
            return Err(RaceError::RaceNotFound(race_id));
        }

        self.races
            .read()
            .get(race_id as usize - 1)
            .cloned()
            .ok_or(RaceError::RaceNotFound(race_id))
    }

    pub fn start_race(&self, race_id: RaceId) -> Result<(), RaceError> {
        self.get_race(race_id)?.start()
    }

    /// Forward one accelerate press. Succeeds for unstarted and finished
    /// races, where the press is dropped.
    pub fn accelerate(&self, race_id: RaceId) -> Result<(), RaceError> {
        self.get_race(race_id)?.accelerate();
        Ok(())
    }

    pub fn get_results(&self, race_id: RaceId) -> Result<RaceResults, RaceError> {
        Ok(self.get_race(race_id)?.results())
    }

    fn track(&self, track_id: TrackId) -> Result<Arc<Track>, RaceError> {
        let out_of_range = || RaceError::TrackOutOfRange {
            track_id,
            available: self.tracks.len(),
        };

        let index = (track_id as usize).checked_sub(1).ok_or_else(out_of_range)?;
        self.tracks.get(index).cloned().ok_or_else(out_of_range)
    }
}
