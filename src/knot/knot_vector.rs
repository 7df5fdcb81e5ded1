use std::fmt;
use std::ops::Index;

use itertools::Itertools;
use nalgebra::convert;
use simba::scalar::SupersetOf;

use crate::misc::FloatingPoint;

/// Uniformly spaced, append-only knot vector
///
/// Knot `i` sits at `anchor + (i - lead) * interval`, where `lead` is the number of knots
/// preceding the anchor. Knots are computed from the anchor rather than accumulated,
/// so the spacing stays exact up to a single rounding.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnotVector<T> {
    anchor: T,
    interval: T,
    lead: usize,
    knots: Vec<T>,
}

impl<T: FloatingPoint> KnotVector<T> {
    /// Create the initial knot vector of a spline with the given order.
    /// `anchor` becomes the first evaluable knot and is preceded by `order - 1` knots.
    ///
    /// # Example
    /// ```
    /// use pose_spline::prelude::KnotVector;
    /// use approx::assert_relative_eq;
    ///
    /// let knots = KnotVector::anchored(0.0, 0.1, 4);
    /// assert_eq!(knots.len(), 4);
    /// assert_relative_eq!(knots.first(), -0.3, epsilon = 1e-12);
    /// assert_eq!(knots.last(), 0.0);
    /// ```
    pub fn anchored(anchor: T, interval: T, order: usize) -> Self {
        let lead = order.saturating_sub(1);
        let mut knots = Self {
            anchor,
            interval,
            lead,
            knots: Vec::with_capacity(order),
        };
        for i in 0..order {
            let knot = knots.knot_at(i);
            knots.knots.push(knot);
        }
        knots
    }

    /// Time of the knot at `index`, whether or not it has been generated yet
    pub fn knot_at(&self, index: usize) -> T {
        let steps = if index >= self.lead {
            T::from_usize(index - self.lead).unwrap()
        } else {
            -T::from_usize(self.lead - index).unwrap()
        };
        self.anchor + self.interval * steps
    }

    /// Append the next knot and return its time
    pub fn push_next(&mut self) -> T {
        let knot = self.knot_at(self.knots.len());
        self.knots.push(knot);
        knot
    }

    pub fn reserve(&mut self, additional: usize) {
        self.knots.reserve(additional);
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.knots.clone()
    }

    pub fn first(&self) -> T {
        self.knots[0]
    }

    pub fn last(&self) -> T {
        self.knots[self.knots.len() - 1]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.knots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.knots.iter()
    }

    pub fn interval(&self) -> T {
        self.interval
    }

    /// The first evaluable knot
    pub fn anchor(&self) -> T {
        self.anchor
    }

    /// Number of knots preceding the anchor
    pub fn lead(&self) -> usize {
        self.lead
    }

    /// Get the evaluable domain, from the anchor to the last knot
    pub fn domain(&self) -> (T, T) {
        (self.knots[self.lead], self.last())
    }

    /// Slack applied to both ends of the domain to absorb rounding of knot times
    pub fn tolerance(&self) -> T {
        self.interval * convert::<f64, T>(1e-9)
    }

    /// Check if `t` lies inside the evaluable domain
    pub fn contains(&self, t: T) -> bool {
        let (start, end) = self.domain();
        let tol = self.tolerance();
        t >= start - tol && t <= end + tol
    }

    /// Number of knots that must be appended so that `t` becomes part of the domain
    pub fn steps_to_cover(&self, t: T) -> usize {
        let ahead = (t - self.last()) / self.interval - convert::<f64, T>(1e-9);
        if ahead <= T::zero() {
            0
        } else {
            ahead.ceil().to_usize().unwrap_or(0)
        }
    }

    /// Find the knot span index by direct index arithmetic on the uniform spacing
    /// The returned index `j` satisfies `knot[j - 1] <= t <= knot[j]` inside the domain
    /// and is clamped to `[lead, len - 1]` at its ends.
    ///
    /// # Example
    /// ```
    /// use pose_spline::prelude::KnotVector;
    ///
    /// let mut knots = KnotVector::anchored(0.0, 0.1, 4);
    /// knots.push_next();
    /// knots.push_next();
    /// assert_eq!(knots.find_span_index(0.0), 3);
    /// assert_eq!(knots.find_span_index(0.15), 5);
    /// assert_eq!(knots.find_span_index(0.2), 5);
    /// ```
    pub fn find_span_index(&self, t: T) -> usize {
        let offset = (t - self.first()) / self.interval - convert::<f64, T>(1e-9);
        let index = offset.ceil().to_usize().unwrap_or(0);
        index.clamp(self.lead.max(1), self.len() - 1)
    }

    /// Local parameter of `t` inside the span ending at knot `span`, clamped to [0, 1]
    pub fn local_parameter(&self, span: usize, t: T) -> T {
        ((t - self.knots[span - 1]) / self.interval).clamp(T::zero(), T::one())
    }

    /// Cast the knot vector to another floating point type
    /// # Example
    /// ```
    /// use pose_spline::prelude::*;
    /// let knots: KnotVector<f64> = KnotVector::anchored(1.0, 0.5, 3);
    /// let knots2 = knots.cast::<f32>();
    /// assert_eq!(knots2.last(), 1.0f32);
    /// ```
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> KnotVector<F> {
        KnotVector {
            anchor: convert(self.anchor),
            interval: convert(self.interval),
            lead: self.lead,
            knots: self.knots.iter().map(|v| convert(*v)).collect(),
        }
    }
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.knots[index]
    }
}

impl<T: fmt::Display> fmt::Display for KnotVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "knots ({}, interval {}): [{}]",
            self.knots.len(),
            self.interval,
            self.knots.iter().join(", ")
        )
    }
}
