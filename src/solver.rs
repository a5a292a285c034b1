use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BodySlice, Result, Vec3};

/// Which approximation an [`ApproximateSolver`] should use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Algorithm {
    /// Tree code with monopole nodes.
    Tree,
    /// Tree code with monopole and quadrupole moments.
    #[default]
    Multipole,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Tree => write!(f, "tree"),
            Algorithm::Multipole => write!(f, "multipole"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("body {index} has a non-finite position")]
    NonFinitePosition { index: usize },

    #[error("output buffer holds {len} accelerations, need {required}")]
    OutputTooShort { len: usize, required: usize },
}

/// Wall-clock breakdown of one approximate solve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub build: Duration,
    pub evaluate: Duration,
}

/// An exact force evaluation.
pub trait ForceSolver {
    /// Overwrite `accelerations[..bodies.len()]` with the acceleration of every body.
    fn calculate_accelerations(&self, bodies: BodySlice<'_>, accelerations: &mut [Vec3])
        -> Result<()>;
}

/// A force evaluation that trades accuracy for speed.
///
/// The result is written into the caller-owned `accelerations` buffer; nothing
/// is shared between calls.
pub trait ApproximateSolver {
    fn approximate_accelerations(
        &self,
        bodies: BodySlice<'_>,
        algorithm: Algorithm,
        accelerations: &mut [Vec3],
    ) -> Result<StageTimings, SolverError>;
}
