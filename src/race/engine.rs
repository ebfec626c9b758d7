//! Race engine and authoritative tick loop

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Notify};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::catalog::{CarId, Track};

use super::{CarPosition, RaceId, RaceResults, RaceStatus, DECELERATION};

/// Commands a running race accepts from the outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceCommand {
    /// Player pressed accelerate once
    Accelerate,
}

/// State owned by the race task. The task is the only writer of the race's
/// positions and status while it runs.
#[derive(Debug)]
pub struct RaceEngine {
    race_id: RaceId,
    track: Arc<Track>,
    player_id: CarId,
    /// Accelerate commands received since the last tick
    pending_clicks: u32,
    /// Last finish rank handed out
    finish_order: u32,
    tick: u64,
}

impl RaceEngine {
    pub fn new(race_id: RaceId, track: Arc<Track>, player_id: CarId) -> Self {
        Self {
            race_id,
            track,
            player_id,
            pending_clicks: 0,
            finish_order: 0,
            tick: 0,
        }
    }

    pub fn pending_clicks(&self) -> u32 {
        self.pending_clicks
    }

    pub fn handle_command(&mut self, command: RaceCommand) {
        match command {
            RaceCommand::Accelerate => {
                self.pending_clicks = self.pending_clicks.saturating_add(1);
            }
        }
    }

    /// Advance every unfinished car by one tick.
    ///
    /// Cars are visited in roster order, so cars crossing the line on the
    /// same tick are ranked by roster position. Returns true once every car
    /// has a final position.
    pub fn refresh(&mut self, positions: &mut [CarPosition]) -> bool {
        self.tick += 1;
        let finish_line = self.track.len();
        let mut race_finished = true;

        for pos in positions.iter_mut() {
            if pos.is_finished() {
                continue;
            }

            if pos.car.id == self.player_id {
                if self.pending_clicks > 0 {
                    let boost = pos.car.acceleration.saturating_add(self.pending_clicks);
                    pos.speed_up(boost);
                    self.pending_clicks = 0;
                } else {
                    pos.slow_down(DECELERATION);
                }
            } else {
                pos.speed_up(pos.car.acceleration);
            }

            if pos.advance(finish_line) {
                self.finish_order += 1;
                pos.finish(self.finish_order);
                info!(
                    race_id = self.race_id,
                    car_id = pos.car.id,
                    final_position = self.finish_order,
                    tick = self.tick,
                    "Car finished"
                );
            } else {
                race_finished = false;
            }
        }

        debug!(race_id = self.race_id, tick = self.tick, "Race refreshed");

        race_finished
    }

    /// One tick against the shared results. The status flips to finished in
    /// the same pass that ranks the last car, so no reader sees every car
    /// ranked while the race is still in progress.
    pub fn apply_tick(&mut self, results: &mut RaceResults) -> bool {
        let complete = self.refresh(&mut results.positions);
        if complete {
            results.status = RaceStatus::Finished;
        }
        complete
    }

    /// Run the tick loop until every car has finished.
    ///
    /// Waits on the tick timer, incoming commands and the shutdown signal
    /// raised by the completing tick. The first tick fires one full period
    /// after the loop starts. Readers never observe a half-applied tick: each
    /// tick runs inside one write guard.
    pub async fn run(
        mut self,
        results: Arc<RwLock<RaceResults>>,
        mut commands: mpsc::UnboundedReceiver<RaceCommand>,
        tick_period: Duration,
    ) {
        info!(race_id = self.race_id, track_id = self.track.id, "Race started");

        let shutdown = Notify::new();
        let mut ticker = interval_at(Instant::now() + tick_period, tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.notified() => break,
                _ = ticker.tick() => {
                    let complete = self.apply_tick(&mut results.write());
                    if complete {
                        shutdown.notify_one();
                    }
                }
                Some(command) = commands.recv() => {
                    self.handle_command(command);
                }
            }
        }

        info!(race_id = self.race_id, ticks = self.tick, "Race finished");
    }
}
