//! Direct-summation N-body engine with an accuracy harness for approximate solvers.
//!
//! Bodies live in a [`Bodies`] arena of index-aligned buffers. The
//! [`creator`] module fills it with one of the [`Configuration`]s,
//! [`DirectSummation`] computes the reference accelerations, and
//! [`Benchmark`] compares an [`ApproximateSolver`] such as [`BarnesHut`]
//! against it.

pub mod accuracy;
pub mod barnes_hut;
pub mod bodies;
pub mod config;
pub mod creator;
pub mod direct_summation;
pub mod error;
pub mod gravity;
pub mod harness;
pub mod integrator;
pub mod render;
pub mod simulation;
pub mod solver;
pub mod timing;
pub mod vector;

pub use accuracy::{relative_l2_error, ErrorReport};
pub use barnes_hut::BarnesHut;
pub use bodies::{BodyId, Bodies, BodySlice, BodySliceMut};
pub use config::{RunConfig, Strategy};
pub use creator::{generate, generate_with, BodyCreator, Configuration};
pub use direct_summation::{DirectSummation, Execution};
pub use error::{Error, Result};
pub use harness::{geometric_schedule, Benchmark, IterationRecord};
pub use render::{CsvRecorder, NullRenderer, RenderError, Renderer};
pub use simulation::{ForceStrategy, Simulation};
pub use solver::{Algorithm, ApproximateSolver, ForceSolver, SolverError, StageTimings};
pub use timing::TimingLog;
pub use vector::{PointMass, Vec3, Vec4};

pub type Float = f64;
