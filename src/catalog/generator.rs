//! Procedural track segment generation

use rand::Rng;

use super::MAX_TURN_DEGREE;

/// Smallest generated track, in segments
pub const MIN_SEGMENTS: usize = 120;
/// Exclusive upper bound on generated track length
pub const MAX_SEGMENTS: usize = 220;

/// Produce `count` random turn angles in `[0, MAX_TURN_DEGREE)`
pub fn generate_segments<R: Rng>(count: usize, rng: &mut R) -> Vec<u32> {
    (0..count)
        .map(|_| rng.gen_range(0..MAX_TURN_DEGREE))
        .collect()
}
