use nalgebra::{UnitQuaternion, Vector3};

use crate::misc::{so3_exp, FloatingPoint};

use super::{QuaternionSpace, QuaternionSpline, SplineSpace};

impl<T: FloatingPoint> QuaternionSpline<T> {
    /// Evaluate the body frame angular velocity (rad/s) at `t`
    ///
    /// # Example
    /// ```
    /// use pose_spline::prelude::*;
    /// use nalgebra::{UnitQuaternion, Vector3};
    /// use approx::assert_relative_eq;
    ///
    /// let rate = Vector3::new(0., 0., 0.8);
    /// let mut spline = QuaternionSpline::<f64>::with_interval(4, 0.1).unwrap();
    /// for i in 0..=20 {
    ///     let t = i as f64 * 0.1;
    ///     spline.add_sample(t, UnitQuaternion::from_scaled_axis(rate * t)).unwrap();
    /// }
    /// let omega = spline.angular_velocity(1.23).unwrap();
    /// assert_relative_eq!(omega, rate, epsilon = 1e-9);
    /// ```
    pub fn angular_velocity(&self, t: T) -> anyhow::Result<Vector3<T>> {
        self.angular_kinematics(t).map(|(velocity, _)| velocity)
    }

    /// Evaluate the body frame angular acceleration (rad/s^2) at `t`
    pub fn angular_acceleration(&self, t: T) -> anyhow::Result<Vector3<T>> {
        self.angular_kinematics(t)
            .map(|(_, acceleration)| acceleration)
    }

    /// Evaluate the orientation together with its body frame angular velocity
    pub fn evaluate_with_angular_velocity(
        &self,
        t: T,
    ) -> anyhow::Result<(UnitQuaternion<T>, Vector3<T>)> {
        let orientation = self.evaluate(t)?;
        let velocity = self.angular_velocity(t)?;
        Ok((orientation, velocity))
    }

    /// Angular velocity and acceleration accumulated along the cumulative product
    ///
    /// Each factor `exp(w_j d_j)` rotates the rate accumulated so far into its own frame
    /// before the factor's own contribution is added.
    fn angular_kinematics(&self, t: T) -> anyhow::Result<(Vector3<T>, Vector3<T>)> {
        let (span, u) = self.locate(t)?;
        let interval = self.knot_interval()?;
        let basis = self.basis();
        let weights = basis.weights(u);
        let velocity_weights = basis.derivative_weights(u, 1, interval);
        let acceleration_weights = basis.derivative_weights(u, 2, interval);
        let points = self.span_control_points(span);

        let mut velocity = Vector3::zeros();
        let mut acceleration = Vector3::zeros();
        for j in 1..self.order() {
            let delta = <QuaternionSpace as SplineSpace<T>>::difference(&points[j - 1], &points[j]);
            let rotation = so3_exp(&(delta * weights[j]));

            velocity = rotation.inverse_transform_vector(&velocity);
            let current = delta * velocity_weights[j];
            velocity += current;

            acceleration = rotation.inverse_transform_vector(&acceleration)
                + delta * acceleration_weights[j]
                + velocity.cross(&current);
        }

        Ok((velocity, acceleration))
    }
}
