//! Initial conditions.
//!
//! Each [`Configuration`] has a [`BodyCreator`] that produces the mass,
//! position and velocity of body `i`. Random parts are drawn from an explicit
//! RNG so that a seed reproduces a configuration exactly.

use std::{f64::consts::PI, fmt};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    gravity::{circular_speed, G},
    BodyId, Bodies, Float, Result, Vec3,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Configuration {
    /// Uniform cloud in a cube of half-width 10.
    UniformRandom,
    /// Heavy center with a thin disk of bodies on circular orbits.
    #[default]
    SpiralGalaxy,
    /// Two stars orbiting each other, surrounded by planets.
    BinarySystem,
    /// A sun, nine planets on fixed orbits, and debris.
    SolarSystem,
}

impl Configuration {
    /// Number of bodies at fixed indices.
    #[must_use]
    pub fn min_bodies(self) -> usize {
        match self {
            Configuration::UniformRandom | Configuration::SpiralGalaxy => 1,
            Configuration::BinarySystem => 2,
            Configuration::SolarSystem => 1 + PLANET_RADII.len(),
        }
    }

    pub fn creator<R: Rng + 'static>(
        self,
        rng: R,
        gravitational_constant: Float,
    ) -> Box<dyn BodyCreator> {
        match self {
            Configuration::UniformRandom => Box::new(UniformCreator::new(rng)),
            Configuration::SpiralGalaxy => Box::new(
                SpiralGalaxyCreator::new(rng).gravitational_constant(gravitational_constant),
            ),
            Configuration::BinarySystem => Box::new(
                BinarySystemCreator::new(rng).gravitational_constant(gravitational_constant),
            ),
            Configuration::SolarSystem => Box::new(
                SolarSystemCreator::new(rng).gravitational_constant(gravitational_constant),
            ),
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Configuration::UniformRandom => "uniform-random",
            Configuration::SpiralGalaxy => "spiral-galaxy",
            Configuration::BinarySystem => "binary-system",
            Configuration::SolarSystem => "solar-system",
        };
        f.write_str(name)
    }
}

pub trait BodyCreator {
    fn configuration(&self) -> Configuration;

    /// Mass, position and velocity of body `index`.
    fn create_body(&mut self, index: usize) -> (Float, Vec3, Vec3);

    /// Overwrite the first `n` bodies. Nothing is written if `n` is invalid.
    fn create_bodies(&mut self, bodies: &mut Bodies, n: usize) -> Result<()> {
        Error::check_capacity(n, bodies.len())?;

        let configuration = self.configuration();
        if n < configuration.min_bodies() {
            return Err(Error::TooFewBodies {
                configuration,
                required: configuration.min_bodies(),
                requested: n,
            });
        }

        for i in 0..n {
            let (m, p, v) = self.create_body(i);
            bodies.set(BodyId(i), m, p, v);
        }
        Ok(())
    }
}

/// Fill the first `count` bodies of `bodies` with `configuration`.
///
/// With `seed == None` the RNG is seeded from OS entropy and runs differ.
pub fn generate(
    configuration: Configuration,
    bodies: &mut Bodies,
    count: usize,
    seed: Option<u64>,
) -> Result<()> {
    generate_with(configuration, bodies, count, seed, G)
}

pub fn generate_with(
    configuration: Configuration,
    bodies: &mut Bodies,
    count: usize,
    seed: Option<u64>,
    gravitational_constant: Float,
) -> Result<()> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    configuration
        .creator(rng, gravitational_constant)
        .create_bodies(bodies, count)
}

fn angle_distr() -> Uniform<Float> {
    Uniform::new(0., 2. * PI)
}

/// Unit vector perpendicular to the radius at `angle`, rotating counter-clockwise.
fn tangent(angle: Float) -> Vec3 {
    Vec3::new(-angle.sin(), angle.cos(), 0.)
}

pub struct UniformCreator<R: Rng> {
    rng: R,
    position_distr: Uniform<Float>,
    mass_distr: Uniform<Float>,
}

impl<R: Rng> UniformCreator<R> {
    pub const HALF_WIDTH: Float = 10.;
    pub const VELOCITY_SCALE: Float = 0.1;

    pub fn new(rng: R) -> Self {
        Self {
            rng,
            position_distr: Uniform::new(-Self::HALF_WIDTH, Self::HALF_WIDTH),
            mass_distr: Uniform::new(0.1, 1.),
        }
    }

    fn sample_vector(&mut self) -> Vec3 {
        let rng = &mut self.rng;
        Vec3::new(
            self.position_distr.sample(rng),
            self.position_distr.sample(rng),
            self.position_distr.sample(rng),
        )
    }
}

impl<R: Rng> BodyCreator for UniformCreator<R> {
    fn configuration(&self) -> Configuration {
        Configuration::UniformRandom
    }

    fn create_body(&mut self, _index: usize) -> (Float, Vec3, Vec3) {
        let pos = self.sample_vector();
        let m = self.mass_distr.sample(&mut self.rng);
        let vel = self.sample_vector() * Self::VELOCITY_SCALE;
        (m, pos, vel)
    }
}

/// Bodies on circular orbits of radius 0.1 to 10 around a central mass of 100.
///
/// Orbital speeds use [`G`] by default while the force law works in G = 1
/// units, so the disk starts far below circular speed and collapses. Pass
/// `gravitational_constant(1.)` for orbits that stay circular.
pub struct SpiralGalaxyCreator<R: Rng> {
    rng: R,
    gravitational_constant: Float,
    radial_distr: Uniform<Float>,
    height_distr: Uniform<Float>,
    mass_distr: Uniform<Float>,
}

impl<R: Rng> SpiralGalaxyCreator<R> {
    pub const CENTRAL_MASS: Float = 100.;

    pub fn new(rng: R) -> Self {
        Self {
            rng,
            gravitational_constant: G,
            radial_distr: Uniform::new(0.1, 10.),
            height_distr: Uniform::new(-0.5, 0.5),
            mass_distr: Uniform::new(0.1, 1.),
        }
    }

    #[must_use]
    pub fn gravitational_constant(mut self, gravitational_constant: Float) -> Self {
        self.gravitational_constant = gravitational_constant;
        self
    }
}

impl<R: Rng> BodyCreator for SpiralGalaxyCreator<R> {
    fn configuration(&self) -> Configuration {
        Configuration::SpiralGalaxy
    }

    fn create_body(&mut self, index: usize) -> (Float, Vec3, Vec3) {
        if index == 0 {
            return (Self::CENTRAL_MASS, Vec3::zeros(), Vec3::zeros());
        }

        let rng = &mut self.rng;
        let angle = angle_distr().sample(rng);
        let r = self.radial_distr.sample(rng);
        // winding grows with angle, which lays the bodies out along spiral arms
        let phi = angle + angle / 10.;

        let pos = Vec3::new(
            r * phi.cos(),
            r * phi.sin(),
            self.height_distr.sample(rng) * (r / 10.),
        );
        let m = self.mass_distr.sample(rng);
        let vel = tangent(phi) * circular_speed(self.gravitational_constant, Self::CENTRAL_MASS, r);

        (m, pos, vel)
    }
}

pub struct BinarySystemCreator<R: Rng> {
    rng: R,
    gravitational_constant: Float,
    radial_distr: Uniform<Float>,
    mass_distr: Uniform<Float>,
}

impl<R: Rng> BinarySystemCreator<R> {
    pub const STAR_MASS: Float = 50.;
    pub const STAR_OFFSET: Float = 2.;
    pub const STAR_SPEED: Float = 1.;
    /// Planets get less than circular speed and end up on eccentric orbits.
    pub const PLANET_SPEED_FACTOR: Float = 0.7;

    pub fn new(rng: R) -> Self {
        Self {
            rng,
            gravitational_constant: G,
            radial_distr: Uniform::new(3., 10.),
            mass_distr: Uniform::new(0.1, 0.5),
        }
    }

    #[must_use]
    pub fn gravitational_constant(mut self, gravitational_constant: Float) -> Self {
        self.gravitational_constant = gravitational_constant;
        self
    }
}

impl<R: Rng> BodyCreator for BinarySystemCreator<R> {
    fn configuration(&self) -> Configuration {
        Configuration::BinarySystem
    }

    fn create_body(&mut self, index: usize) -> (Float, Vec3, Vec3) {
        match index {
            0 => {
                return (
                    Self::STAR_MASS,
                    Vec3::new(-Self::STAR_OFFSET, 0., 0.),
                    Vec3::new(0., -Self::STAR_SPEED, 0.),
                )
            }
            1 => {
                return (
                    Self::STAR_MASS,
                    Vec3::new(Self::STAR_OFFSET, 0., 0.),
                    Vec3::new(0., Self::STAR_SPEED, 0.),
                )
            }
            _ => {}
        }

        let rng = &mut self.rng;
        let angle = angle_distr().sample(rng);
        let r = self.radial_distr.sample(rng);

        let pos = Vec3::new(
            r * angle.cos(),
            r * angle.sin(),
            (angle_distr().sample(rng) - PI) * 0.1,
        );
        let m = self.mass_distr.sample(rng);
        let speed = circular_speed(self.gravitational_constant, 2. * Self::STAR_MASS, r)
            * Self::PLANET_SPEED_FACTOR;

        (m, pos, tangent(angle) * speed)
    }
}

/// Orbital radii of the planets, roughly in astronomical units.
pub const PLANET_RADII: [Float; 9] = [0.4, 0.7, 1.0, 1.5, 5.2, 9.5, 19.2, 30.1, 39.5];

/// Planet masses relative to earth.
pub const PLANET_MASSES: [Float; 9] = [0.055, 0.815, 1.0, 0.107, 317.8, 95.2, 14.5, 17.1, 0.002];

pub struct SolarSystemCreator<R: Rng> {
    rng: R,
    gravitational_constant: Float,
    radial_distr: Uniform<Float>,
    height_distr: Uniform<Float>,
    mass_distr: Uniform<Float>,
}

impl<R: Rng> SolarSystemCreator<R> {
    pub const SUN_MASS: Float = 50.;
    pub const SPEED_FACTOR: Float = 0.5;

    pub fn new(rng: R) -> Self {
        Self {
            rng,
            gravitational_constant: G,
            radial_distr: Uniform::new(0.3, 40.),
            height_distr: Uniform::new(-0.5, 0.5),
            mass_distr: Uniform::new(0.01, 0.1),
        }
    }

    #[must_use]
    pub fn gravitational_constant(mut self, gravitational_constant: Float) -> Self {
        self.gravitational_constant = gravitational_constant;
        self
    }

    /// Planet masses are compressed so the giants don't dwarf everything else.
    #[must_use]
    pub fn planet_mass(planet: usize) -> Float {
        0.5 + PLANET_MASSES[planet] * 0.1
    }

    fn orbital_speed(&self, r: Float) -> Float {
        circular_speed(self.gravitational_constant, Self::SUN_MASS, r) * Self::SPEED_FACTOR
    }
}

impl<R: Rng> BodyCreator for SolarSystemCreator<R> {
    fn configuration(&self) -> Configuration {
        Configuration::SolarSystem
    }

    fn create_body(&mut self, index: usize) -> (Float, Vec3, Vec3) {
        if index == 0 {
            return (Self::SUN_MASS, Vec3::zeros(), Vec3::zeros());
        }

        let planet = index - 1;
        if planet < PLANET_RADII.len() {
            let angle = 2. * PI * planet as Float / PLANET_RADII.len() as Float;
            let r = PLANET_RADII[planet];
            let pos = Vec3::new(r * angle.cos(), r * angle.sin(), 0.);

            return (
                Self::planet_mass(planet),
                pos,
                tangent(angle) * self.orbital_speed(r),
            );
        }

        // debris
        let rng = &mut self.rng;
        let angle = angle_distr().sample(rng);
        let r = self.radial_distr.sample(rng);
        let pos = Vec3::new(
            r * angle.cos(),
            r * angle.sin(),
            self.height_distr.sample(rng),
        );
        let m = self.mass_distr.sample(rng);

        (m, pos, tangent(angle) * self.orbital_speed(r))
    }
}
