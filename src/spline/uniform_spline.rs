use std::collections::BTreeMap;
use std::io::Write;
use std::marker::PhantomData;
use std::ops::Bound::{Excluded, Included};

use nalgebra::DVector;

use crate::basis::CumulativeBasis;
use crate::knot::KnotVector;
use crate::misc::FloatingPoint;

use super::sample::sample_key;
use super::{QuaternionSpace, Sample, SplineSpace, VectorSpace};

/// Uniform cumulative B-spline over time, fitted incrementally from samples
///
/// The spline owns a uniformly spaced knot vector and one control point per knot.
/// With an order `k`, the first `k - 1` knots precede the evaluable range, which spans
/// from knot `k - 1` to the last knot. The evaluation at a time inside the span ending
/// at knot `j` combines control points `j - k + 1 ..= j` with the cumulative basis.
///
/// By generics, it can be used for R3 vectors or unit quaternions with f32 or f64 scalar types
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "SplineData<T, S>",
        bound(
            serialize = "T: serde::Serialize, S::Point: serde::Serialize",
            deserialize = "T: serde::Deserialize<'de>, S::Point: serde::Deserialize<'de>"
        )
    )
)]
pub struct UniformSpline<T: FloatingPoint, S: SplineSpace<T>> {
    order: usize,
    time_interval: Option<T>,
    /// `None` until the spline is anchored
    knots: Option<KnotVector<T>>,
    control_points: Vec<S::Point>,
    /// samples keyed by their timestamp in nanoseconds
    samples: BTreeMap<i64, Sample<T, S::Point>>,
    basis: CumulativeBasis<T>,
    space: PhantomData<S>,
}

/// Unchecked serialized form of a spline, validated when converted back
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>, S::Point: serde::Deserialize<'de>"))]
struct SplineData<T: FloatingPoint, S: SplineSpace<T>> {
    order: usize,
    time_interval: Option<T>,
    knots: Option<KnotVector<T>>,
    control_points: Vec<S::Point>,
    samples: BTreeMap<i64, Sample<T, S::Point>>,
    #[serde(skip)]
    _space: PhantomData<S>,
}

#[cfg(feature = "serde")]
impl<T: FloatingPoint, S: SplineSpace<T>> TryFrom<SplineData<T, S>> for UniformSpline<T, S> {
    type Error = anyhow::Error;

    fn try_from(data: SplineData<T, S>) -> Result<Self, Self::Error> {
        let mut spline = Self::new(data.order)?;
        if let Some(time_interval) = data.time_interval {
            spline.set_time_interval(time_interval)?;
        }

        match data.knots {
            Some(knots) => {
                anyhow::ensure!(
                    spline.time_interval == Some(knots.interval()),
                    "The knot interval {} does not match the time interval",
                    knots.interval()
                );
                anyhow::ensure!(
                    knots.lead() + 1 == data.order && knots.len() >= data.order,
                    "{} knots with {} leading cannot belong to a spline of order {}",
                    knots.len(),
                    knots.lead(),
                    data.order
                );
                anyhow::ensure!(
                    knots.len() == data.control_points.len(),
                    "{} knots do not match {} control points",
                    knots.len(),
                    data.control_points.len()
                );
                spline.knots = Some(knots);
            }
            None => {
                anyhow::ensure!(
                    data.control_points.is_empty() && data.samples.is_empty(),
                    "An uninitialized spline cannot hold control points or samples"
                );
            }
        }
        spline.control_points = data.control_points;

        // keys are derived from the sample times rather than trusted
        for sample in data.samples.into_values() {
            spline.samples.insert(sample_key(sample.time())?, sample);
        }
        Ok(spline)
    }
}

/// Spline of R3 vectors
pub type VectorSpaceSpline<T> = UniformSpline<T, VectorSpace>;

/// Spline of unit quaternions
pub type QuaternionSpline<T> = UniformSpline<T, QuaternionSpace>;

impl<T: FloatingPoint, S: SplineSpace<T>> UniformSpline<T, S> {
    /// Create an empty spline of the given order (degree + 1)
    /// The time interval must be set before the first sample.
    /// # Failures
    /// - if the order is less than 2
    pub fn new(order: usize) -> anyhow::Result<Self> {
        Ok(Self {
            order,
            time_interval: None,
            knots: None,
            control_points: vec![],
            samples: BTreeMap::new(),
            basis: CumulativeBasis::new(order)?,
            space: PhantomData,
        })
    }

    /// Create an empty spline with its knot spacing configured
    ///
    /// # Example
    /// ```
    /// use pose_spline::prelude::*;
    /// use nalgebra::Vector3;
    ///
    /// let mut spline = VectorSpaceSpline::<f64>::with_interval(4, 0.1).unwrap();
    /// spline.add_sample(0.0, Vector3::new(0., 0., 0.)).unwrap();
    /// spline.add_sample(0.25, Vector3::new(1., 0., 0.)).unwrap();
    /// assert_eq!(spline.control_point_num(), 7);
    /// assert!(spline.is_ts_evaluable(0.25));
    /// ```
    pub fn with_interval(order: usize, time_interval: T) -> anyhow::Result<Self> {
        let mut spline = Self::new(order)?;
        spline.set_time_interval(time_interval)?;
        Ok(spline)
    }

    /// Configure the uniform knot spacing (seconds)
    /// # Failures
    /// - if the interval is not positive and finite
    /// - if the knots are already initialized
    pub fn set_time_interval(&mut self, time_interval: T) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.is_initialized(),
            "The time interval cannot be changed once the knots are initialized"
        );
        anyhow::ensure!(
            time_interval.is_finite() && time_interval > T::zero(),
            "The time interval must be positive, got {}",
            time_interval
        );
        self.time_interval = Some(time_interval);
        Ok(())
    }

    pub fn time_interval(&self) -> Option<T> {
        self.time_interval
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn degree(&self) -> usize {
        self.order - 1
    }

    pub fn is_initialized(&self) -> bool {
        self.knots.is_some()
    }

    pub fn knots(&self) -> Option<&KnotVector<T>> {
        self.knots.as_ref()
    }

    pub fn basis(&self) -> &CumulativeBasis<T> {
        &self.basis
    }

    /// Get the evaluable time range, from the anchor to the last knot
    pub fn evaluable_range(&self) -> Option<(T, T)> {
        self.knots.as_ref().map(|knots| knots.domain())
    }

    /// Anchor the knot vector so that `t` is the first evaluable time
    /// The `order` initial control points are seeded with the identity of the space.
    ///
    /// # Example
    /// ```
    /// use pose_spline::prelude::*;
    /// use approx::assert_relative_eq;
    ///
    /// let mut spline = QuaternionSpline::<f64>::with_interval(4, 0.1).unwrap();
    /// spline.initial_spline_knot(0.0).unwrap();
    /// assert_eq!(spline.control_point_num(), 4);
    /// assert!(spline.is_ts_evaluable(0.0));
    /// let knots = spline.knots().unwrap();
    /// assert_relative_eq!(knots.first(), -0.3, epsilon = 1e-12);
    /// ```
    pub fn initial_spline_knot(&mut self, t: T) -> anyhow::Result<()> {
        self.anchor(t, S::identity())
    }

    fn anchor(&mut self, t: T, seed: S::Point) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.is_initialized(),
            "The spline knots are already initialized"
        );
        let time_interval = self.time_interval.ok_or_else(|| {
            anyhow::anyhow!("The time interval must be set before initializing the knots")
        })?;
        anyhow::ensure!(t.is_finite(), "Invalid anchor time {}", t);

        let knots = KnotVector::anchored(t, time_interval, self.order);
        log::debug!(
            "anchored {} spline of order {} at {} with {} knots",
            S::NAME,
            self.order,
            t,
            knots.len()
        );
        self.control_points = vec![seed; self.order];
        self.knots = Some(knots);
        Ok(())
    }

    /// Check if there are enough knots on both sides of `t` to evaluate the spline there
    pub fn is_ts_evaluable(&self, t: T) -> bool {
        self.knots.as_ref().is_some_and(|knots| knots.contains(t))
    }

    /// Record a sample and grow the spline until its timestamp becomes evaluable
    ///
    /// The first sample of an uninitialized spline anchors the knots and seeds every initial control point.
    /// Samples arriving late but inside the evaluable range are recorded without growing the spline.
    /// A rejected sample leaves the spline untouched.
    /// # Failures
    /// - if the time interval is not set
    /// - if `t` precedes the first evaluable time
    /// - if `t` or the knots needed to cover it are out of the representable range
    pub fn add_sample(&mut self, t: T, value: S::Point) -> anyhow::Result<()> {
        let Some(knots) = self.knots.as_ref() else {
            let key = sample_key(t)?;
            self.anchor(t, value.clone())?;
            self.samples.insert(key, Sample::new(t, value));
            return Ok(());
        };

        let (start, _) = knots.domain();
        if t < start - knots.tolerance() {
            log::warn!(
                "rejected sample at {} preceding the knot origin {}",
                t,
                start
            );
            anyhow::bail!("Sample at {} precedes the knot origin {}", t, start);
        }

        let key = sample_key(t)?;
        ensure_coverable(knots, t)?;
        self.samples.insert(key, Sample::new(t, value));

        let before = self.control_points.len();
        while !self.is_ts_evaluable(t) {
            self.initial_new_control_point()?;
        }
        if self.control_points.len() > before {
            log::debug!(
                "extended {} spline by {} control points to cover {}",
                S::NAME,
                self.control_points.len() - before,
                t
            );
        }

        Ok(())
    }

    /// Bulk load samples, anchoring the knots at the first one
    /// The whole batch is validated before anything is recorded.
    /// # Failures
    /// - if the batch is empty
    /// - if the spline is already initialized
    /// - if a sample precedes the first one
    pub fn initial_spline(&mut self, samples: &[(T, S::Point)]) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.is_initialized(),
            "The spline knots are already initialized"
        );
        let ((first, _), rest) = samples
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("Cannot initialize a spline from no samples"))?;
        let time_interval = self.time_interval.ok_or_else(|| {
            anyhow::anyhow!("The time interval must be set before initializing the knots")
        })?;

        let tolerance = time_interval * nalgebra::convert::<f64, T>(1e-9);
        let mut last = *first;
        for (t, _) in samples {
            sample_key(*t)?;
            anyhow::ensure!(
                *t >= *first - tolerance,
                "Sample at {} precedes the first sample at {}",
                t,
                first
            );
            last = last.max(*t);
        }
        ensure_coverable(&KnotVector::anchored(*first, time_interval, self.order), last)?;

        self.add_sample(samples[0].0, samples[0].1.clone())?;
        if let Some(knots) = self.knots.as_mut() {
            let additional = knots.steps_to_cover(last);
            knots.reserve(additional);
            self.control_points.reserve(additional);
        }

        rest.iter()
            .try_for_each(|(t, value)| self.add_sample(*t, value.clone()))
    }

    /// Append one knot and one control point at the tail
    ///
    /// The latest sample inside the newly opened span seeds the control point;
    /// without such a sample, the space extrapolates from the last two control points.
    fn initial_new_control_point(&mut self) -> anyhow::Result<()> {
        let knots = self
            .knots
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("The spline knots are not initialized"))?;
        let previous = knots.last();
        let knot = knots.knot_at(knots.len());
        let span = (Excluded(sample_key(previous)?), Included(sample_key(knot)?));
        knots.push_next();

        let seed = self
            .samples
            .range(span)
            .next_back()
            .map(|(_, sample)| sample.value().clone());

        let n = self.control_points.len();
        let last = &self.control_points[n - 1];
        let point = match seed {
            Some(value) => {
                log::trace!("seeded control point {} at knot {} from a sample", n, knot);
                S::align(last, &value)
            }
            None => {
                log::trace!("extrapolated control point {} at knot {}", n, knot);
                S::extrapolate(&self.control_points[n - 2], last)
            }
        };
        self.control_points.push(point);
        Ok(())
    }

    pub fn control_point_num(&self) -> usize {
        self.control_points.len()
    }

    /// Get the control point at `index`
    /// # Failures
    /// - if the index is out of bounds
    pub fn control_point(&self, index: usize) -> anyhow::Result<&S::Point> {
        self.control_points.get(index).ok_or_else(|| {
            anyhow::anyhow!(
                "Control point index {} is out of bounds for {} control points",
                index,
                self.control_points.len()
            )
        })
    }

    pub fn control_points(&self) -> &[S::Point] {
        &self.control_points
    }

    pub fn control_points_iter(&self) -> impl Iterator<Item = &S::Point> {
        self.control_points.iter()
    }

    pub(crate) fn control_points_iter_mut(&mut self) -> impl Iterator<Item = &mut S::Point> {
        self.control_points.iter_mut()
    }

    pub fn sample_num(&self) -> usize {
        self.samples.len()
    }

    /// Iterate over the recorded samples in timestamp order
    pub fn samples(&self) -> impl Iterator<Item = &Sample<T, S::Point>> {
        self.samples.values()
    }

    /// Evaluate the spline at `t`
    /// # Failures
    /// - if `t` is outside the evaluable range
    pub fn evaluate(&self, t: T) -> anyhow::Result<S::Point> {
        let (span, u) = self.locate(t)?;
        let weights = self.basis.weights(u);
        Ok(self.combine(span, &weights))
    }

    /// Combine the control points of the span ending at knot `span` with cumulative weights
    fn combine(&self, span: usize, weights: &DVector<T>) -> S::Point {
        let points = self.span_control_points(span);
        let value = (1..self.order).fold(points[0].clone(), |acc, j| {
            let delta = S::difference(&points[j - 1], &points[j]) * weights[j];
            S::increment(&acc, &delta)
        });
        S::normalize(value)
    }

    /// Control points contributing to the span ending at knot `span`
    pub(crate) fn span_control_points(&self, span: usize) -> &[S::Point] {
        &self.control_points[span + 1 - self.order..=span]
    }

    /// Find the knot span containing `t` and the local parameter inside it
    pub(crate) fn locate(&self, t: T) -> anyhow::Result<(usize, T)> {
        let knots = self
            .knots
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("The spline knots are not initialized"))?;
        let (start, end) = knots.domain();
        anyhow::ensure!(
            knots.contains(t),
            "Time {} is outside the evaluable range [{}, {}]",
            t,
            start,
            end
        );
        let span = knots.find_span_index(t);
        Ok((span, knots.local_parameter(span, t)))
    }

    /// Knot spacing of an initialized spline
    pub(crate) fn knot_interval(&self) -> anyhow::Result<T> {
        self.knots
            .as_ref()
            .map(|knots| knots.interval())
            .ok_or_else(|| anyhow::anyhow!("The spline knots are not initialized"))
    }

    /// Write a human readable dump of the knot vector
    pub fn write_knots<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match &self.knots {
            Some(knots) => writeln!(writer, "{}", knots),
            None => writeln!(writer, "knots (0): []"),
        }
    }
}

/// Check that every knot appended to cover `t` can key the sample map
fn ensure_coverable<T: FloatingPoint>(knots: &KnotVector<T>, t: T) -> anyhow::Result<()> {
    let steps = knots.steps_to_cover(t);
    if steps > 0 {
        let furthest = knots.knot_at(knots.len() - 1 + steps);
        sample_key(furthest).map_err(|e| {
            anyhow::anyhow!("Cannot extend the knots to cover {}: {}", t, e)
        })?;
    }
    Ok(())
}
