use tracing::{debug, info};

use crate::{
    integrator,
    render::{finalize_or_warn, render_or_warn},
    Algorithm, ApproximateSolver, BarnesHut, Bodies, DirectSummation, Float, ForceSolver,
    Renderer, Result, Vec3, Vec4,
};

/// How accelerations are computed in every step.
#[derive(Clone, Copy, Debug)]
pub enum ForceStrategy {
    Direct(DirectSummation),
    Approximate {
        solver: BarnesHut,
        algorithm: Algorithm,
    },
}

/// Continuous simulation with a fixed time step.
#[derive(Debug)]
pub struct Simulation {
    bodies: Bodies,
    strategy: ForceStrategy,
    time_step: Float,
    accelerations: Vec<Vec3>,
    /// Packed bodies handed to the renderer, reused across frames.
    frame: Vec<Vec4>,
}

impl Simulation {
    pub fn new(bodies: Bodies, strategy: ForceStrategy, time_step: Float) -> Self {
        let n = bodies.len();
        Self {
            bodies,
            strategy,
            time_step,
            accelerations: vec![Vec3::zeros(); n],
            frame: Vec::with_capacity(n),
        }
    }

    #[must_use]
    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    #[must_use]
    pub fn into_bodies(self) -> Bodies {
        self.bodies
    }

    /// Accelerations computed in the last step.
    #[must_use]
    pub fn accelerations(&self) -> &[Vec3] {
        &self.accelerations
    }

    fn calculate_accelerations(&mut self) -> Result<()> {
        let bodies = self.bodies.view(self.bodies.len())?;
        match self.strategy {
            ForceStrategy::Direct(direct) => {
                direct.calculate_accelerations(bodies, &mut self.accelerations)?;
            }
            ForceStrategy::Approximate { solver, algorithm } => {
                let stages =
                    solver.approximate_accelerations(bodies, algorithm, &mut self.accelerations)?;
                debug!(build = ?stages.build, evaluate = ?stages.evaluate, "tree solve");
            }
        }
        Ok(())
    }

    fn integrate(&mut self) -> Result<()> {
        let n = self.bodies.len();
        integrator::step(self.bodies.view_mut(n)?, &self.accelerations, self.time_step)
    }

    /// Compute the accelerations of the current state and advance by one time step.
    pub fn step(&mut self) -> Result<()> {
        self.calculate_accelerations()?;
        self.integrate()
    }

    /// Run `num_frames` steps, handing the state before every step to `renderer`.
    pub fn run(&mut self, num_frames: usize, renderer: &mut dyn Renderer) -> Result<()> {
        let n = self.bodies.len();

        for frame in 0..num_frames {
            info!(frame, num_frames, "processing frame");

            self.calculate_accelerations()?;
            self.bodies.view(n)?.pack_into(&mut self.frame);
            render_or_warn(renderer, &self.frame, frame);
            self.integrate()?;
        }

        finalize_or_warn(renderer);
        info!(num_frames, n, "simulation complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        creator::generate_with, integrator::total_momentum, CsvRecorder, Configuration,
        NullRenderer,
    };

    fn galaxy(n: usize) -> Bodies {
        let mut bodies = Bodies::with_capacity(n);
        generate_with(Configuration::SpiralGalaxy, &mut bodies, n, Some(8), 1.).unwrap();
        bodies
    }

    fn cloud(n: usize) -> Bodies {
        let mut bodies = Bodies::with_capacity(n);
        generate_with(Configuration::UniformRandom, &mut bodies, n, Some(8), 1.).unwrap();
        bodies
    }

    #[test]
    fn direct_and_zero_theta_agree() {
        let mut direct = Simulation::new(
            cloud(60),
            ForceStrategy::Direct(DirectSummation::new()),
            0.01,
        );
        let mut tree = Simulation::new(
            cloud(60),
            ForceStrategy::Approximate {
                solver: BarnesHut::new(0.),
                algorithm: Algorithm::Tree,
            },
            0.01,
        );

        for _ in 0..20 {
            direct.step().unwrap();
            tree.step().unwrap();
        }

        for (a, b) in direct.bodies().positions().iter().zip(tree.bodies().positions()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-8);
        }
    }

    #[test]
    fn masses_never_change() {
        let bodies = galaxy(30);
        let masses = bodies.masses().to_vec();

        let mut sim = Simulation::new(bodies, ForceStrategy::Direct(DirectSummation::new()), 0.01);
        sim.run(10, &mut NullRenderer).unwrap();

        assert_eq!(sim.bodies().masses(), masses.as_slice());
    }

    #[test]
    fn momentum_with_multipole() {
        let bodies = cloud(40);
        let p0 = total_momentum(bodies.masses(), bodies.velocities());

        // theta = 0 opens every node, so all forces stay pairwise
        let mut sim = Simulation::new(
            bodies,
            ForceStrategy::Approximate {
                solver: BarnesHut::new(0.),
                algorithm: Algorithm::Multipole,
            },
            0.001,
        );
        for _ in 0..50 {
            sim.step().unwrap();
        }

        let bodies = sim.into_bodies();
        let p1 = total_momentum(bodies.masses(), bodies.velocities());
        assert_abs_diff_eq!(p0, p1, epsilon = 1e-9);
    }

    #[test]
    fn one_frame_per_step() {
        let mut sim = Simulation::new(galaxy(5), ForceStrategy::Direct(DirectSummation::new()), 0.1);
        let mut rec = CsvRecorder::new(Vec::new());
        sim.run(3, &mut rec).unwrap();

        let out = String::from_utf8(rec.into_inner()).unwrap();
        // header + 3 frames of 5 bodies
        assert_eq!(out.lines().count(), 1 + 3 * 5);
        assert!(out.lines().last().unwrap().starts_with("2,4,"));
    }

    #[test]
    fn frame_buffer_is_reused() {
        let mut sim = Simulation::new(cloud(16), ForceStrategy::Direct(DirectSummation::new()), 0.01);
        sim.run(1, &mut NullRenderer).unwrap();
        let buffer = sim.frame.as_ptr();

        sim.run(5, &mut NullRenderer).unwrap();
        assert_eq!(sim.frame.as_ptr(), buffer);
        assert_eq!(sim.frame.len(), 16);
    }
}
