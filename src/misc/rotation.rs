use nalgebra::{convert, Quaternion, UnitQuaternion, Vector3};

use super::FloatingPoint;

/// Pick the representative of `q` with a non-negative real part.
/// `q` and `-q` encode the same rotation; the positive one is the shortest arc from identity.
pub fn shortest_arc<T: FloatingPoint>(q: &UnitQuaternion<T>) -> UnitQuaternion<T> {
    if q.w < T::zero() {
        UnitQuaternion::new_unchecked(-q.into_inner())
    } else {
        *q
    }
}

/// Flip the sign of `q` if needed so that it lies in the same hemisphere as `reference`
pub fn align_hemisphere<T: FloatingPoint>(
    reference: &UnitQuaternion<T>,
    q: &UnitQuaternion<T>,
) -> UnitQuaternion<T> {
    if reference.coords.dot(&q.coords) < T::zero() {
        UnitQuaternion::new_unchecked(-q.into_inner())
    } else {
        *q
    }
}

/// Exponential map from a rotation vector (axis * angle) to a unit quaternion
///
/// # Example
/// ```
/// use pose_spline::prelude::*;
/// use nalgebra::Vector3;
/// use approx::assert_relative_eq;
///
/// let q = so3_exp(&Vector3::new(0., 0., std::f64::consts::FRAC_PI_2));
/// assert_relative_eq!(q.angle(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
/// ```
pub fn so3_exp<T: FloatingPoint>(omega: &Vector3<T>) -> UnitQuaternion<T> {
    let theta_sq = omega.norm_squared();
    let theta = theta_sq.sqrt();

    let (real, imag_factor) = if theta < T::small_angle_threshold() {
        let theta_po4 = theta_sq * theta_sq;
        let (c2, c4): (T, T) = (convert(8.0), convert(384.0));
        let (s2, s4): (T, T) = (convert(48.0), convert(3840.0));
        (
            T::one() - theta_sq / c2 + theta_po4 / c4,
            convert::<f64, T>(0.5) - theta_sq / s2 + theta_po4 / s4,
        )
    } else {
        let half_theta = theta * convert::<f64, T>(0.5);
        (half_theta.cos(), half_theta.sin() / theta)
    };

    UnitQuaternion::new_normalize(Quaternion::from_parts(real, omega * imag_factor))
}

/// Logarithm map from a unit quaternion to a rotation vector (axis * angle)
/// The shortest arc representative is used, so the returned angle is within [0, pi].
pub fn so3_log<T: FloatingPoint>(q: &UnitQuaternion<T>) -> Vector3<T> {
    let q = shortest_arc(q);
    let imag = q.imag();
    let w = q.w;
    let n_sq = imag.norm_squared();
    let n = n_sq.sqrt();

    let factor = if n < T::small_angle_threshold() {
        // 2 atan(n / w) / n expanded around n = 0
        let (two, three): (T, T) = (convert(2.0), convert(3.0));
        two / w - two * n_sq / (three * w * w * w)
    } else {
        convert::<f64, T>(2.0) * n.atan2(w) / n
    };

    imag * factor
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    use super::*;

    #[test]
    fn exp_matches_axis_angle() {
        let omega = Vector3::new(0.3, -0.2, 0.9);
        let q = so3_exp(&omega);
        let expected = UnitQuaternion::from_scaled_axis(omega);
        assert_relative_eq!(q.coords, expected.coords, epsilon = 1e-12);
    }

    #[test]
    fn log_inverts_exp() {
        let omega = Vector3::new(-1.1, 0.4, 0.25);
        let back = so3_log(&so3_exp(&omega));
        assert_relative_eq!(back, omega, epsilon = 1e-12);
    }

    #[test]
    fn small_angles_are_stable() {
        let omega = Vector3::new(1e-9, -2e-9, 5e-10);
        let q = so3_exp(&omega);
        assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(so3_log(&q), omega, epsilon = 1e-18);

        let zero = so3_log(&UnitQuaternion::<f64>::identity());
        assert_eq!(zero, Vector3::zeros());
    }

    #[test]
    fn log_takes_the_short_way_around() {
        let q = UnitQuaternion::from_scaled_axis(Vector3::new(0., 0., 0.5));
        let flipped = UnitQuaternion::new_unchecked(-q.into_inner());
        assert_relative_eq!(so3_log(&flipped), Vector3::new(0., 0., 0.5), epsilon = 1e-12);
    }

    #[test]
    fn align_hemisphere_keeps_rotation() {
        let reference = UnitQuaternion::from_scaled_axis(Vector3::new(0.1, 0., 0.));
        let q = UnitQuaternion::from_scaled_axis(Vector3::new(0.2, 0., 0.));
        let flipped = UnitQuaternion::new_unchecked(-q.into_inner());
        let aligned = align_hemisphere(&reference, &flipped);
        assert!(reference.coords.dot(&aligned.coords) > 0.);
        assert_relative_eq!(aligned.coords, q.coords, epsilon = 1e-15);
    }
}
