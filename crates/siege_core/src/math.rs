//! Integer and fixed-point helpers shared by the search and combat code.
//!
//! Damage math stays in integers so results are exact and identical on every
//! platform. Health ratios handed to AI callers use
//! fixed-point instead of floats for the same reason.

use fixed::types::I32F32;

use crate::grid::Cell;

/// Fixed-point number type used for ratios.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Manhattan distance between two cells.
#[inline]
#[must_use]
pub fn manhattan_distance(a: Cell, b: Cell) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// Scale `amount` by `hitpoints / max_hitpoints`, rounding half up.
///
/// A unit at full health deals its full amount, a unit at half health half of
/// it. Negative amounts scale to zero.
#[must_use]
pub fn scale_by_health(amount: i32, hitpoints: u32, max_hitpoints: u32) -> i32 {
    if amount <= 0 || max_hitpoints == 0 {
        return 0;
    }

    let numerator = 2 * i64::from(amount) * i64::from(hitpoints.min(max_hitpoints));
    let denominator = 2 * i64::from(max_hitpoints);

    ((numerator + i64::from(max_hitpoints)) / denominator) as i32
}

/// Fraction of health remaining as a fixed-point number in `[0, 1]`.
#[must_use]
pub fn health_fraction(hitpoints: u32, max_hitpoints: u32) -> Fixed {
    if max_hitpoints == 0 {
        return Fixed::ZERO;
    }
    Fixed::from_num(hitpoints.min(max_hitpoints)) / Fixed::from_num(max_hitpoints)
}
