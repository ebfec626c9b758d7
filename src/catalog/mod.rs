//! Car and track catalog loaded from the JSON data file

pub mod generator;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use generator::{generate_segments, MAX_SEGMENTS, MIN_SEGMENTS};

/// Absolute fastest a car can go
pub const MAX_TOP_SPEED: u32 = 200;

/// Speed units a car gains per tick, at most
pub const MAX_ACCELERATION: u32 = 10;

/// Best handling a car can have. Handling is kept for data compatibility and
/// is not read by the simulation.
pub const MAX_HANDLING: f64 = 1.0;

/// Exclusive upper bound of a single segment's turn angle, in degrees
pub const MAX_TURN_DEGREE: u32 = 90;

pub type CarId = u32;
pub type TrackId = u32;

/// A race car as stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub driver_name: String,
    pub top_speed: u32,
    pub acceleration: u32,
    #[serde(default)]
    pub handling: f64,
}

/// A track is an ordered list of turn angles, one per segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    #[serde(default)]
    pub segments: Vec<u32>,
}

impl Track {
    /// Number of segments; reaching this index finishes a car
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Everything the data file holds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub cars: Vec<Car>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Catalog {
    /// Decode and validate a catalog from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_reader(reader)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Decode and validate a catalog from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Write the catalog as JSON
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), CatalogError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Check every entry against the catalog limits
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for car in &self.cars {
            if !seen.insert(car.id) {
                return Err(CatalogError::DuplicateCar(car.id));
            }
            if car.top_speed > MAX_TOP_SPEED {
                return Err(CatalogError::InvalidCar {
                    id: car.id,
                    reason: format!("top_speed {} exceeds {}", car.top_speed, MAX_TOP_SPEED),
                });
            }
            if car.acceleration > MAX_ACCELERATION {
                return Err(CatalogError::InvalidCar {
                    id: car.id,
                    reason: format!(
                        "acceleration {} exceeds {}",
                        car.acceleration, MAX_ACCELERATION
                    ),
                });
            }
            if !(0.0..=MAX_HANDLING).contains(&car.handling) {
                return Err(CatalogError::InvalidCar {
                    id: car.id,
                    reason: format!("handling {} outside 0..={}", car.handling, MAX_HANDLING),
                });
            }
        }

        for track in &self.tracks {
            if let Some(angle) = track.segments.iter().find(|a| **a >= MAX_TURN_DEGREE) {
                return Err(CatalogError::InvalidTrack {
                    id: track.id,
                    reason: format!("segment angle {} must be below {}", angle, MAX_TURN_DEGREE),
                });
            }
        }

        Ok(())
    }

    /// Generate segments for every track that has none.
    /// Returns how many tracks were filled.
    pub fn fill_missing_segments<R: Rng>(&mut self, rng: &mut R) -> usize {
        let mut filled = 0;
        for track in self.tracks.iter_mut().filter(|t| t.is_empty()) {
            let count = rng.gen_range(MIN_SEGMENTS..MAX_SEGMENTS);
            track.segments = generate_segments(count, rng);
            info!(track_id = track.id, segments = count, "Generated track segments");
            filled += 1;
        }
        filled
    }
}

/// Load the data file, generate missing track segments and persist them.
///
/// Runs once at startup before any race exists; any error here should stop
/// the process.
pub fn prepare_data_file<R: Rng>(
    path: impl AsRef<Path>,
    rng: &mut R,
) -> Result<Catalog, CatalogError> {
    let path = path.as_ref();
    let mut catalog = Catalog::from_json_file(path)?;

    if catalog.fill_missing_segments(rng) > 0 {
        let mut writer = BufWriter::new(File::create(path)?);
        catalog.to_writer(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), "Persisted generated track segments");
    }

    info!(
        cars = catalog.cars.len(),
        tracks = catalog.tracks.len(),
        "Catalog loaded"
    );

    Ok(catalog)
}

/// Catalog loading errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed data file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate car id {0}")]
    DuplicateCar(CarId),

    #[error("Invalid car {id}: {reason}")]
    InvalidCar { id: CarId, reason: String },

    #[error("Invalid track {id}: {reason}")]
    InvalidTrack { id: TrackId, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const SAMPLE: &str = r#"{
        "cars": [
            {"id": 1, "driver_name": "Ayrton", "top_speed": 190, "acceleration": 8, "handling": 0.7},
            {"id": 2, "driver_name": "Alain", "top_speed": 185, "acceleration": 9, "handling": 0.6}
        ],
        "tracks": [
            {"id": 1, "name": "Monaco", "segments": [10, 45, 89]},
            {"id": 2, "name": "Spa"}
        ]
    }"#;

    #[test]
    fn decodes_cars_and_tracks() {
        let catalog = Catalog::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(catalog.cars.len(), 2);
        assert_eq!(catalog.cars[1].driver_name, "Alain");
        assert_eq!(catalog.tracks[0].segments, vec![10, 45, 89]);
        assert!(catalog.tracks[1].is_empty());
    }

    #[test]
    fn rejects_out_of_range_cars() {
        let json = r#"{"cars": [{"id": 1, "driver_name": "x", "top_speed": 201, "acceleration": 1}]}"#;
        let err = Catalog::from_reader(json.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCar { id: 1, .. }));

        let json = r#"{"cars": [{"id": 1, "driver_name": "x", "top_speed": 100, "acceleration": 11}]}"#;
        assert!(Catalog::from_reader(json.as_bytes()).is_err());

        let json = r#"{"cars": [{"id": 1, "driver_name": "x", "top_speed": 100, "acceleration": 1, "handling": 1.5}]}"#;
        assert!(Catalog::from_reader(json.as_bytes()).is_err());
    }

    #[test]
    fn rejects_duplicate_car_ids() {
        let json = r#"{"cars": [
            {"id": 3, "driver_name": "a", "top_speed": 100, "acceleration": 1},
            {"id": 3, "driver_name": "b", "top_speed": 100, "acceleration": 1}
        ]}"#;
        let err = Catalog::from_reader(json.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCar(3)));
    }

    #[test]
    fn rejects_steep_segments() {
        let json = r#"{"tracks": [{"id": 4, "name": "Cliff", "segments": [0, 90]}]}"#;
        let err = Catalog::from_reader(json.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidTrack { id: 4, .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = Catalog::from_reader("{not json".as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
    }

    #[test]
    fn fills_only_empty_tracks() {
        let mut catalog = Catalog::from_reader(SAMPLE.as_bytes()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        assert_eq!(catalog.fill_missing_segments(&mut rng), 1);
        assert_eq!(catalog.tracks[0].segments, vec![10, 45, 89]);

        let generated = &catalog.tracks[1];
        assert!((MIN_SEGMENTS..MAX_SEGMENTS).contains(&generated.len()));
        assert!(generated.segments.iter().all(|a| *a < MAX_TURN_DEGREE));

        assert_eq!(catalog.fill_missing_segments(&mut rng), 0);
    }

    #[test]
    fn prepare_persists_generated_segments() {
        let path = std::env::temp_dir().join(format!(
            "race_server_catalog_{}_{}.json",
            std::process::id(),
            line!()
        ));
        std::fs::write(&path, SAMPLE).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let catalog = prepare_data_file(&path, &mut rng).unwrap();
        let reloaded = Catalog::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(!catalog.tracks[1].is_empty());
        assert_eq!(reloaded.tracks, catalog.tracks);
        assert_eq!(reloaded.cars, catalog.cars);
    }

    #[test]
    fn prepare_surfaces_missing_file() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = prepare_data_file("/nonexistent/race_server/data.json", &mut rng).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
