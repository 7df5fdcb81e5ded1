use nalgebra::{DMatrix, Vector3};

use crate::misc::FloatingPoint;

use super::VectorSpaceSpline;

impl<T: FloatingPoint> VectorSpaceSpline<T> {
    /// Evaluate the `n`-th time derivative of the spline at `t`
    /// Derivatives of an order equal or greater than the spline order are zero.
    ///
    /// # Example
    /// ```
    /// use pose_spline::prelude::*;
    /// use nalgebra::Vector3;
    /// use approx::assert_relative_eq;
    ///
    /// let mut spline = VectorSpaceSpline::<f64>::with_interval(4, 0.1).unwrap();
    /// for i in 0..=20 {
    ///     let t = i as f64 * 0.1;
    ///     spline.add_sample(t, Vector3::new(2. * t, 0., -t)).unwrap();
    /// }
    /// let velocity = spline.derivative(1.05, 1).unwrap();
    /// assert_relative_eq!(velocity, Vector3::new(2., 0., -1.), epsilon = 1e-9);
    /// ```
    pub fn derivative(&self, t: T, n: usize) -> anyhow::Result<Vector3<T>> {
        if n == 0 {
            return self.evaluate(t);
        }

        let (span, u) = self.locate(t)?;
        let weights = self
            .basis()
            .derivative_weights(u, n, self.knot_interval()?);
        let points = self.span_control_points(span);
        Ok((1..self.order()).fold(Vector3::zeros(), |acc, j| {
            acc + (points[j] - points[j - 1]) * weights[j]
        }))
    }

    /// Evaluate the value and the derivatives up to the `n`-th at `t`
    /// The first element is the value, the k-th element is the k-th derivative.
    pub fn evaluate_with_derivatives(&self, t: T, n: usize) -> anyhow::Result<Vec<Vector3<T>>> {
        (0..=n).map(|k| self.derivative(t, k)).collect()
    }

    /// Refine every control point by linear least squares against the recorded samples
    ///
    /// Minimizes `sum_i |p(t_i) - v_i|^2 + damping * sum_j |c_j - c_j'|^2` where `c_j'` are the
    /// current control points, so control points no sample constrains keep their value.
    /// # Failures
    /// - if the damping is not positive
    /// - if the spline is not initialized
    pub fn fit_control_points(&mut self, damping: T) -> anyhow::Result<()> {
        anyhow::ensure!(
            damping.is_finite() && damping > T::zero(),
            "The damping must be positive, got {}",
            damping
        );
        anyhow::ensure!(self.is_initialized(), "The spline knots are not initialized");

        let n = self.control_point_num();
        let order = self.order();
        let mut normal = DMatrix::<T>::zeros(n, n);
        let mut rhs = DMatrix::<T>::zeros(n, 3);

        for sample in self.samples() {
            let (span, u) = self.locate(sample.time())?;
            let weights = self.basis().basis_weights(u);
            let offset = span + 1 - order;
            for a in 0..order {
                for b in 0..order {
                    normal[(offset + a, offset + b)] += weights[a] * weights[b];
                }
                for c in 0..3 {
                    rhs[(offset + a, c)] += weights[a] * sample.value()[c];
                }
            }
        }

        for (i, point) in self.control_points_iter().enumerate() {
            normal[(i, i)] += damping;
            for c in 0..3 {
                rhs[(i, c)] += damping * point[c];
            }
        }

        let cholesky = normal.cholesky().ok_or(anyhow::anyhow!(
            "The normal equations of the fit are not positive definite"
        ))?;
        let solution = cholesky.solve(&rhs);

        self.control_points_iter_mut()
            .enumerate()
            .for_each(|(i, point)| {
                *point = Vector3::new(solution[(i, 0)], solution[(i, 1)], solution[(i, 2)]);
            });
        log::debug!(
            "fitted {} control points to {} samples",
            n,
            self.sample_num()
        );

        Ok(())
    }
}
