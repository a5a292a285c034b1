//! Accuracy and timing comparison of an approximate solver against direct summation.

use std::{
    io::Write,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::{
    accuracy::relative_l2_error,
    error::Error,
    render::{finalize_or_warn, render_or_warn},
    Algorithm, ApproximateSolver, Bodies, DirectSummation, Float, ForceSolver, Renderer, Result,
    StageTimings, TimingLog, Vec3,
};

/// Outcome of one benchmark iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationRecord {
    pub num_bodies: usize,
    pub approximate_time: Duration,
    pub direct_time: Duration,
    pub l2_error: Float,
    pub degenerate_bodies: usize,
    pub stages: StageTimings,
}

/// Body counts growing geometrically by a factor of 10^(1/8) per iteration,
/// starting at 10^4, truncated at `capacity`.
#[must_use]
pub fn geometric_schedule(iterations: usize, capacity: usize) -> Vec<usize> {
    (0..iterations)
        .map(|k| {
            let n = (10 as Float).powf((k as Float + 32.) / 8.);
            // keep exact powers of ten from truncating to 9999...
            (n * (1. + 4. * Float::EPSILON)) as usize
        })
        .take_while(|&n| n <= capacity)
        .collect()
}

/// Runs both solvers on a prefix of a preallocated set of bodies.
///
/// All buffers are sized once for the largest body count; each iteration only
/// touches the first `n` entries.
pub struct Benchmark<A: ApproximateSolver> {
    bodies: Bodies,
    approximate: A,
    algorithm: Algorithm,
    direct: DirectSummation,
    approximate_accelerations: Vec<Vec3>,
    reference_accelerations: Vec<Vec3>,
    renderer: Option<Box<dyn Renderer>>,
    timing_log: Option<TimingLog<Box<dyn Write>>>,
}

impl<A: ApproximateSolver> Benchmark<A> {
    pub fn new(bodies: Bodies, approximate: A, algorithm: Algorithm) -> Self {
        let capacity = bodies.len();
        Self {
            bodies,
            approximate,
            algorithm,
            direct: DirectSummation::new(),
            approximate_accelerations: vec![Vec3::zeros(); capacity],
            reference_accelerations: vec![Vec3::zeros(); capacity],
            renderer: None,
            timing_log: None,
        }
    }

    #[must_use]
    pub fn direct(mut self, direct: DirectSummation) -> Self {
        self.direct = direct;
        self
    }

    /// Render the bodies before and after the approximate solve of every iteration.
    #[must_use]
    pub fn renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Append one line per iteration to `log`. Write failures are logged, not fatal.
    #[must_use]
    pub fn timing_log(mut self, log: TimingLog<Box<dyn Write>>) -> Self {
        self.timing_log = Some(log);
        self
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    /// Accelerations of the first `n` bodies from the last iteration,
    /// approximate and reference.
    pub fn accelerations(&self, n: usize) -> Result<(&[Vec3], &[Vec3])> {
        Error::check_capacity(n, self.capacity())?;
        Ok((
            &self.approximate_accelerations[..n],
            &self.reference_accelerations[..n],
        ))
    }

    pub fn run_iteration(&mut self, n: usize) -> Result<IterationRecord> {
        let bodies = self.bodies.view(n)?;
        info!(n, "starting iteration");

        if let Some(renderer) = self.renderer.as_deref_mut() {
            render_or_warn(renderer, &bodies.to_vec4s(), 0);
        }

        let tic = Instant::now();
        let stages = self.approximate.approximate_accelerations(
            bodies,
            self.algorithm,
            &mut self.approximate_accelerations,
        )?;
        let approximate_time = tic.elapsed();

        if let Some(renderer) = self.renderer.as_deref_mut() {
            render_or_warn(renderer, &bodies.to_vec4s(), 1);
            finalize_or_warn(renderer);
        }

        let tic = Instant::now();
        self.direct
            .calculate_accelerations(bodies, &mut self.reference_accelerations)?;
        let direct_time = tic.elapsed();

        let report = relative_l2_error(
            &self.approximate_accelerations[..n],
            &self.reference_accelerations[..n],
        );
        if report.degenerate_bodies > 0 {
            warn!(
                n,
                degenerate = report.degenerate_bodies,
                "reference acceleration vanished, using absolute error for those bodies"
            );
        }

        let record = IterationRecord {
            num_bodies: n,
            approximate_time,
            direct_time,
            l2_error: report.l2,
            degenerate_bodies: report.degenerate_bodies,
            stages,
        };
        info!(
            n,
            algorithm = %self.algorithm,
            approximate = ?approximate_time,
            direct = ?direct_time,
            error = report.l2,
            "iteration done"
        );

        if let Some(log) = &mut self.timing_log {
            if let Err(err) = log.append(&record) {
                warn!(%err, "failed to append to timing log");
            }
        }

        Ok(record)
    }

    /// Run one iteration per body count. The first failing iteration aborts the run.
    pub fn run(&mut self, counts: &[usize]) -> Result<Vec<IterationRecord>> {
        counts.iter().map(|&n| self.run_iteration(n)).collect()
    }
}
