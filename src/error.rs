use thiserror::Error;

use crate::{creator::Configuration, solver::SolverError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("requested {requested} bodies but only {capacity} are allocated")]
    InvalidCapacity { requested: usize, capacity: usize },

    #[error("configuration `{configuration}` needs at least {required} bodies, got {requested}")]
    TooFewBodies {
        configuration: Configuration,
        required: usize,
        requested: usize,
    },

    #[error(
        "body buffers are not index-aligned: {masses} masses, {positions} positions, {velocities} velocities"
    )]
    MisalignedBuffers {
        masses: usize,
        positions: usize,
        velocities: usize,
    },

    #[error("approximate solver failed: {0}")]
    Solver(#[from] SolverError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn check_capacity(requested: usize, capacity: usize) -> Result<()> {
        if requested > capacity {
            return Err(Self::InvalidCapacity {
                requested,
                capacity,
            });
        }
        Ok(())
    }
}
