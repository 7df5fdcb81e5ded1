use nalgebra::{convert, DMatrix, DVector};

use crate::misc::{binomial, factorial, falling_factorial, FloatingPoint};

/// Cumulative basis of a uniform B-spline of a given order
///
/// Row `j` of the matrix holds the coefficients, in ascending powers of the local
/// parameter `u`, of the cumulative basis function `B~_j(u) = sum_{s >= j} B_s(u)`.
/// `B~_0` is identically one.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: nalgebra::Scalar + serde::Serialize",
        deserialize = "T: nalgebra::Scalar + serde::Deserialize<'de>"
    ))
)]
pub struct CumulativeBasis<T> {
    order: usize,
    matrix: DMatrix<T>,
}

impl<T: FloatingPoint> CumulativeBasis<T> {
    /// Create the cumulative basis of the given order (degree + 1)
    /// # Failures
    /// - if the order is less than 2
    pub fn new(order: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(order >= 2, "Spline order must be at least 2, got {}", order);

        let blending = blending_matrix(order);
        let matrix = DMatrix::from_fn(order, order, |j, n| {
            convert((j..order).map(|s| blending[(s, n)]).sum::<f64>())
        });

        Ok(Self { order, matrix })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn degree(&self) -> usize {
        self.order - 1
    }

    pub fn matrix(&self) -> &DMatrix<T> {
        &self.matrix
    }

    /// Evaluate the cumulative basis weights at the local parameter `u` in [0, 1]
    ///
    /// # Example
    /// ```
    /// use pose_spline::prelude::CumulativeBasis;
    /// use approx::assert_relative_eq;
    ///
    /// let basis = CumulativeBasis::<f64>::new(4).unwrap();
    /// let w = basis.weights(0.);
    /// assert_relative_eq!(w[0], 1.);
    /// assert_relative_eq!(w[1], 5. / 6.);
    /// assert_relative_eq!(w[2], 1. / 6.);
    /// assert_relative_eq!(w[3], 0.);
    /// ```
    pub fn weights(&self, u: T) -> DVector<T> {
        let powers = DVector::from_fn(self.order, |p, _| u.powi(p as i32));
        &self.matrix * powers
    }

    /// Evaluate the `n`-th time derivative of the cumulative basis weights
    /// `interval` is the knot spacing; each derivative is scaled by `1 / interval`.
    pub fn derivative_weights(&self, u: T, n: usize, interval: T) -> DVector<T> {
        if n == 0 {
            return self.weights(u);
        }

        let powers = DVector::from_fn(self.order, |p, _| {
            if p < n {
                T::zero()
            } else {
                convert::<f64, T>(falling_factorial(p, n)) * u.powi((p - n) as i32)
            }
        });
        (&self.matrix * powers) / interval.powi(n as i32)
    }

    /// Evaluate the ordinary (non cumulative) basis weights at `u`
    /// Weight `m` applies to the `m`-th control point of the span; the weights sum to one.
    pub fn basis_weights(&self, u: T) -> DVector<T> {
        let cumulative = self.weights(u);
        DVector::from_fn(self.order, |m, _| {
            if m + 1 < self.order {
                cumulative[m] - cumulative[m + 1]
            } else {
                cumulative[m]
            }
        })
    }
}

/// Uniform B-spline blending matrix
/// Entry `(s, n)` is the coefficient of `u^n` in the basis function of the `s`-th control point of a span.
fn blending_matrix(order: usize) -> DMatrix<f64> {
    let k = order;
    let scale = factorial(k - 1);
    DMatrix::from_fn(k, k, |s, n| {
        let sum: f64 = (s..k)
            .map(|l| {
                let sign = if (l - s) % 2 == 0 { 1. } else { -1. };
                sign * binomial(k, l - s) * ((k - 1 - l) as f64).powi((k - 1 - n) as i32)
            })
            .sum();
        binomial(k - 1, n) / scale * sum
    })
}
