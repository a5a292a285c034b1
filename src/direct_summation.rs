use std::thread;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{error::Error, gravity, BodySlice, Float, ForceSolver, Result, Vec3};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Execution {
    #[default]
    SingleThreaded,
    Multithreaded {
        num_threads: usize,
    },
    #[cfg(feature = "rayon")]
    Rayon,
}

/// Brute-force O(N²) reference solver.
///
/// Every execution mode sums the contributions to body `i` in ascending `j`,
/// so all modes produce bit-identical accelerations.
#[derive(Copy, Clone, Debug)]
pub struct DirectSummation {
    execution: Execution,
    softening: Float,
}

impl Default for DirectSummation {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectSummation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            execution: Execution::SingleThreaded,
            softening: gravity::SOFTENING,
        }
    }

    /// Split the target bodies into `num_threads` contiguous ranges,
    /// each handled by its own scoped thread.
    #[must_use]
    pub fn multithreaded(mut self, num_threads: usize) -> Self {
        self.execution = Execution::Multithreaded {
            num_threads: num_threads.max(1),
        };
        self
    }

    /// Use Rayon to iterate over the target bodies in parallel.
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn rayon(mut self) -> Self {
        self.execution = Execution::Rayon;
        self
    }

    #[must_use]
    pub fn with_softening(mut self, softening: Float) -> Self {
        self.softening = softening;
        self
    }

    #[must_use]
    pub fn execution(&self) -> Execution {
        self.execution
    }

    #[must_use]
    pub fn softening(&self) -> Float {
        self.softening
    }

    fn acceleration_on(&self, bodies: BodySlice<'_>, i: usize) -> Vec3 {
        let p1 = bodies.positions[i];
        let mut acc = Vec3::zeros();
        for (j, (&m2, &p2)) in bodies.masses.iter().zip(bodies.positions).enumerate() {
            if i == j {
                continue;
            }
            acc += gravity::acceleration(p1, m2, p2, self.softening);
        }
        acc
    }
}

impl ForceSolver for DirectSummation {
    fn calculate_accelerations(
        &self,
        bodies: BodySlice<'_>,
        accelerations: &mut [Vec3],
    ) -> Result<()> {
        let n = bodies.len();
        Error::check_capacity(n, accelerations.len())?;
        let accelerations = &mut accelerations[..n];

        match self.execution {
            Execution::SingleThreaded => {
                for (i, a) in accelerations.iter_mut().enumerate() {
                    *a = self.acceleration_on(bodies, i);
                }
            }
            Execution::Multithreaded { num_threads } => {
                let chunk_size = n.div_ceil(num_threads).max(1);

                thread::scope(|s| {
                    for (c, chunk) in accelerations.chunks_mut(chunk_size).enumerate() {
                        s.spawn(move || {
                            let offset = c * chunk_size;
                            for (k, a) in chunk.iter_mut().enumerate() {
                                *a = self.acceleration_on(bodies, offset + k);
                            }
                        });
                    }
                });
            }
            #[cfg(feature = "rayon")]
            Execution::Rayon => {
                accelerations
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, a)| *a = self.acceleration_on(bodies, i));
            }
        }

        Ok(())
    }
}
