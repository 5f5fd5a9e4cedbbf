use std::collections::hash_map::DefaultHasher;
use std::f32::consts::TAU;
use std::hash::{Hash, Hasher};

/// Per-node phase offset in `[0, TAU)`, stable for a given id within a run.
pub fn stable_phase(id: &str) -> f32 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let unit = (hash >> 40) as f32 / (1u32 << 24) as f32;
    (unit * TAU).rem_euclid(TAU)
}

/// Clamps a user density into `0..=100`. NaN counts as zero.
pub fn clamp_density(density: f32) -> f32 {
    if density.is_nan() {
        0.0
    } else {
        density.clamp(0.0, 100.0)
    }
}
