use std::{fmt, fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error, gravity, Algorithm, BarnesHut, Configuration, DirectSummation, Float,
    ForceStrategy, Result,
};

/// Force evaluation used by the continuous simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Strategy {
    Direct,
    Tree,
    #[default]
    Multipole,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Tree => write!(f, "tree"),
            Strategy::Multipole => write!(f, "multipole"),
        }
    }
}

impl Strategy {
    /// The tree variant, if this is an approximate strategy.
    #[must_use]
    pub fn algorithm(self) -> Option<Algorithm> {
        match self {
            Strategy::Direct => None,
            Strategy::Tree => Some(Algorithm::Tree),
            Strategy::Multipole => Some(Algorithm::Multipole),
        }
    }
}

/// Settings of one run, read once at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub configuration: Configuration,
    /// Seed for the initial conditions. Fresh entropy if unset.
    pub seed: Option<u64>,
    /// Number of bodies in a continuous simulation.
    pub bodies: usize,
    /// Bodies allocated for the accuracy benchmark, which bounds its schedule.
    pub max_bodies: usize,
    pub iterations: usize,
    pub frames: usize,
    pub time_step: Float,
    pub strategy: Strategy,
    pub theta: Float,
    pub softening: Float,
    pub gravitational_constant: Float,
    /// Threads used by direct summation.
    pub threads: usize,
    pub timing_log: Option<PathBuf>,
    pub frames_csv: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            configuration: Configuration::default(),
            seed: None,
            bodies: 1000,
            max_bodies: 100_000,
            iterations: 25,
            frames: 300,
            time_step: 0.01,
            strategy: Strategy::default(),
            theta: 0.5,
            softening: gravity::SOFTENING,
            gravitational_constant: gravity::G,
            threads: 1,
            timing_log: None,
            frames_csv: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.) {
            return Err(Error::Config(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        if !(self.theta.is_finite() && self.theta >= 0.) {
            return Err(Error::Config(format!(
                "opening angle must be non-negative, got {}",
                self.theta
            )));
        }
        if !(self.softening.is_finite() && self.softening > 0.) {
            return Err(Error::Config(format!(
                "softening must be positive, got {}",
                self.softening
            )));
        }
        if self.threads == 0 {
            return Err(Error::Config("at least one thread is required".into()));
        }

        let required = self.configuration.min_bodies();
        if self.bodies < required {
            return Err(Error::TooFewBodies {
                configuration: self.configuration,
                required,
                requested: self.bodies,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn direct_summation(&self) -> DirectSummation {
        let direct = DirectSummation::new().with_softening(self.softening);
        if self.threads > 1 {
            direct.multithreaded(self.threads)
        } else {
            direct
        }
    }

    #[must_use]
    pub fn barnes_hut(&self) -> BarnesHut {
        BarnesHut::new(self.theta).with_softening(self.softening)
    }

    /// Variant compared against direct summation in the accuracy benchmark.
    pub fn approximate_algorithm(&self) -> Result<Algorithm> {
        self.strategy.algorithm().ok_or_else(|| {
            Error::Config(format!(
                "strategy `{}` has no approximate variant to benchmark, use `tree` or `multipole`",
                self.strategy
            ))
        })
    }

    #[must_use]
    pub fn force_strategy(&self) -> ForceStrategy {
        match self.strategy.algorithm() {
            None => ForceStrategy::Direct(self.direct_summation()),
            Some(algorithm) => ForceStrategy::Approximate {
                solver: self.barnes_hut(),
                algorithm,
            },
        }
    }
}
