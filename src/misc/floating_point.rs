use nalgebra::RealField;
use num_traits::ToPrimitive;

/// Trait for floating point types (f32, f64)
/// Mainly used to identify the scalar field of knots, control points and timestamps
pub trait FloatingPoint: RealField + ToPrimitive + Copy {
    /// Rotation angle (radians) below which the SO(3) exp/log maps switch to their Taylor expansions
    fn small_angle_threshold() -> Self;
}

impl FloatingPoint for f32 {
    fn small_angle_threshold() -> Self {
        1e-3
    }
}

impl FloatingPoint for f64 {
    fn small_angle_threshold() -> Self {
        1e-4
    }
}
