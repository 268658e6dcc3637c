//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Convert an angle in degrees into radians.
pub fn deg_to_rad<T>(value: T) -> T
where
    T: Float
{
    value * T::from(std::f64::consts::PI).unwrap() / T::from(180).unwrap()
}

/// Convert an angle in radians into degrees.
pub fn rad_to_deg<T>(value: T) -> T
where
    T: Float
{
    value * T::from(180).unwrap() / T::from(std::f64::consts::PI).unwrap()
}

/// Clamp a value between `min` and `max`.
///
/// Returns `true` alongside the value if it had to be limited.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> (T, bool)
where
    T: Float
{
    if *value > *max {
        (*max, true)
    }
    else if *value < *min {
        (*min, true)
    }
    else {
        (*value, false)
    }
}
