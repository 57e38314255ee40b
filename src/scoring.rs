//! Combo-aware scoring.
//!
//! Each cascade iteration pays `cleared * points_per_tile * combo`, where
//! `combo` is the 1-based iteration number within the cascade.

/// Points for one cascade iteration.
pub fn iteration_points(cleared: usize, combo: u32, points_per_tile: u32) -> u64 {
    (cleared as u64)
        .saturating_mul(u64::from(points_per_tile))
        .saturating_mul(u64::from(combo))
}
