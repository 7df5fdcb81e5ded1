use std::fmt::Debug;

use nalgebra::{UnitQuaternion, Vector3};

use crate::misc::{align_hemisphere, so3_exp, so3_log, FloatingPoint};

/// The space the control points of a spline live in
///
/// A cumulative B-spline only needs to know how to take the increment between two
/// consecutive control points (a tangent vector), and how to apply a scaled increment
/// onto a running value. Vector spaces sum, rotation manifolds compose.
pub trait SplineSpace<T: FloatingPoint> {
    type Point: Clone + Debug + PartialEq;

    /// Name of the space used in diagnostics
    const NAME: &'static str;

    /// Neutral control point used to seed knots before any sample is known
    fn identity() -> Self::Point;

    /// Increment from `from` to `to`, expressed in the tangent space
    fn difference(from: &Self::Point, to: &Self::Point) -> Vector3<T>;

    /// Apply the tangent increment `delta` onto `point`
    fn increment(point: &Self::Point, delta: &Vector3<T>) -> Self::Point;

    /// Project an accumulated value back onto the space
    fn normalize(point: Self::Point) -> Self::Point {
        point
    }

    /// Guess the next control point from the last two when no sample covers it
    fn extrapolate(previous: &Self::Point, last: &Self::Point) -> Self::Point;

    /// Prepare a sampled value to become the control point following `last`
    fn align(_last: &Self::Point, sample: &Self::Point) -> Self::Point {
        sample.clone()
    }
}

/// Control points in R3 combined by ordinary linear combination
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorSpace;

impl<T: FloatingPoint> SplineSpace<T> for VectorSpace {
    type Point = Vector3<T>;

    const NAME: &'static str = "vector space";

    fn identity() -> Self::Point {
        Vector3::zeros()
    }

    fn difference(from: &Self::Point, to: &Self::Point) -> Vector3<T> {
        to - from
    }

    fn increment(point: &Self::Point, delta: &Vector3<T>) -> Self::Point {
        point + delta
    }

    fn extrapolate(previous: &Self::Point, last: &Self::Point) -> Self::Point {
        last * nalgebra::convert::<f64, T>(2.0) - previous
    }
}

/// Unit quaternion control points combined by composition on the rotation manifold
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuaternionSpace;

impl<T: FloatingPoint> SplineSpace<T> for QuaternionSpace {
    type Point = UnitQuaternion<T>;

    const NAME: &'static str = "unit quaternion";

    fn identity() -> Self::Point {
        UnitQuaternion::identity()
    }

    /// Rotation vector of the shortest arc from `from` to `to`
    fn difference(from: &Self::Point, to: &Self::Point) -> Vector3<T> {
        so3_log(&(from.inverse() * to))
    }

    fn increment(point: &Self::Point, delta: &Vector3<T>) -> Self::Point {
        point * so3_exp(delta)
    }

    fn normalize(point: Self::Point) -> Self::Point {
        UnitQuaternion::new_normalize(point.into_inner())
    }

    fn extrapolate(_previous: &Self::Point, last: &Self::Point) -> Self::Point {
        *last
    }

    fn align(last: &Self::Point, sample: &Self::Point) -> Self::Point {
        align_hemisphere(last, sample)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    use super::*;

    #[test]
    fn vector_space_is_linear() {
        let a = Vector3::new(1., 2., 3.);
        let b = Vector3::new(2., 0., 5.);
        let d = <VectorSpace as SplineSpace<f64>>::difference(&a, &b);
        assert_eq!(d, Vector3::new(1., -2., 2.));
        assert_eq!(<VectorSpace as SplineSpace<f64>>::increment(&a, &d), b);
        assert_eq!(
            <VectorSpace as SplineSpace<f64>>::extrapolate(&a, &b),
            Vector3::new(3., -2., 7.)
        );
    }

    #[test]
    fn quaternion_space_composes() {
        let a = UnitQuaternion::from_euler_angles(0.1, -0.3, 0.7);
        let b = UnitQuaternion::from_euler_angles(0.4, 0.2, -0.1);
        let d = <QuaternionSpace as SplineSpace<f64>>::difference(&a, &b);
        let back = <QuaternionSpace as SplineSpace<f64>>::increment(&a, &d);
        assert_relative_eq!(back.angle_to(&b), 0., epsilon = 1e-12);
        assert_eq!(<QuaternionSpace as SplineSpace<f64>>::extrapolate(&a, &b), b);
    }

    #[test]
    fn quaternion_difference_ignores_the_double_cover() {
        let a = UnitQuaternion::from_euler_angles(0.1, -0.3, 0.7);
        let b = UnitQuaternion::from_euler_angles(0.15, -0.25, 0.8);
        let negated = UnitQuaternion::new_unchecked(-b.into_inner());
        let d = <QuaternionSpace as SplineSpace<f64>>::difference(&a, &b);
        let d_neg = <QuaternionSpace as SplineSpace<f64>>::difference(&a, &negated);
        assert_relative_eq!(d, d_neg, epsilon = 1e-12);
        assert!(d.norm() < 0.2);
    }

    #[test]
    fn quaternion_align_picks_the_near_hemisphere() {
        let last = UnitQuaternion::from_euler_angles(0.1, 0.0, 0.0);
        let sample = UnitQuaternion::from_euler_angles(0.2, 0.0, 0.0);
        let negated = UnitQuaternion::new_unchecked(-sample.into_inner());
        let aligned = <QuaternionSpace as SplineSpace<f64>>::align(&last, &negated);
        assert_relative_eq!(aligned.coords, sample.coords, epsilon = 1e-15);
    }
}
