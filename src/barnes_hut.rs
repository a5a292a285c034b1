//! Barnes–Hut tree code.
//!
//! Bodies are sorted into an octree; far away nodes are replaced by their
//! multipole expansion. `theta` is the opening angle: a node of edge length
//! `s` at distance `d` from its center of mass is used as a whole if
//! `s / d < theta`. With `theta = 0` every node is opened and the result is
//! the direct sum.

use std::time::Instant;

use nalgebra::Matrix3;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    gravity,
    solver::{Algorithm, ApproximateSolver, SolverError, StageTimings},
    BodySlice, Float, Vec3,
};

/// Bodies closer than the cell size at this depth share a leaf.
const MAX_DEPTH: usize = 48;

#[derive(Clone, Copy, Debug)]
pub struct BarnesHut {
    theta: Float,
    softening: Float,
    parallel: bool,
}

impl BarnesHut {
    #[must_use]
    pub fn new(theta: Float) -> Self {
        Self {
            theta,
            softening: gravity::SOFTENING,
            parallel: false,
        }
    }

    #[must_use]
    pub fn with_softening(mut self, softening: Float) -> Self {
        self.softening = softening;
        self
    }

    /// Traverse the tree for all bodies in parallel.
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn rayon(mut self) -> Self {
        self.parallel = true;
        self
    }

    #[must_use]
    pub fn theta(&self) -> Float {
        self.theta
    }
}

impl ApproximateSolver for BarnesHut {
    fn approximate_accelerations(
        &self,
        bodies: BodySlice<'_>,
        algorithm: Algorithm,
        accelerations: &mut [Vec3],
    ) -> Result<StageTimings, SolverError> {
        let n = bodies.len();
        if accelerations.len() < n {
            return Err(SolverError::OutputTooShort {
                len: accelerations.len(),
                required: n,
            });
        }
        if let Some(index) = bodies
            .positions
            .iter()
            .position(|p| !p.iter().all(|x| x.is_finite()))
        {
            return Err(SolverError::NonFinitePosition { index });
        }

        let accelerations = &mut accelerations[..n];
        let quadrupole = algorithm == Algorithm::Multipole;

        let tic = Instant::now();
        let octree = Node::from_bodies(bodies);
        let build = tic.elapsed();

        let tic = Instant::now();
        let eval = |(i, a): (usize, &mut Vec3)| {
            *a = Vec3::zeros();
            octree.accumulate(bodies, i, self, quadrupole, a);
        };
        if self.parallel {
            #[cfg(feature = "rayon")]
            accelerations.par_iter_mut().enumerate().for_each(eval);
            #[cfg(not(feature = "rayon"))]
            unreachable!("activated multithreading without rayon");
        } else {
            accelerations.iter_mut().enumerate().for_each(eval);
        }
        let evaluate = tic.elapsed();

        Ok(StageTimings { build, evaluate })
    }
}

#[derive(Clone, Debug, Default)]
enum Content {
    #[default]
    Empty,
    /// Indices of bodies in this cell. More than one only if they can't be separated.
    Leaf(Vec<usize>),
    Inner(Box<Subnodes>),
}

type Subnodes = [Option<Node>; 8];

#[derive(Clone, Debug)]
struct Node {
    content: Content,
    center: Vec3,
    half_width: Float,
    mass: Float,
    center_of_mass: Vec3,
    /// Traceless quadrupole `sum m (3 d dᵀ - |d|² I)` about the center of mass.
    quadrupole: Matrix3<Float>,
}

impl Node {
    fn new(center: Vec3, half_width: Float) -> Self {
        Self {
            content: Content::Empty,
            center,
            half_width,
            mass: 0.,
            center_of_mass: center,
            quadrupole: Matrix3::zeros(),
        }
    }

    fn from_bodies(bodies: BodySlice<'_>) -> Self {
        let (center, half_width) = get_center_and_half_width(bodies.positions);
        let mut root = Self::new(center, half_width);

        for i in 0..bodies.len() {
            root.insert(bodies.positions, i, 0);
        }
        root.calculate_moments(bodies);

        root
    }

    fn insert(&mut self, positions: &[Vec3], index: usize, depth: usize) {
        match &mut self.content {
            Content::Empty => self.content = Content::Leaf(vec![index]),
            Content::Leaf(indices) => {
                if depth >= MAX_DEPTH || positions[indices[0]] == positions[index] {
                    indices.push(index);
                    return;
                }

                // subdivide
                let previous = std::mem::take(indices);
                self.content = Content::Inner(Box::default());
                for i in previous {
                    self.insert_into_subnode(positions, i, depth);
                }
                self.insert_into_subnode(positions, index, depth);
            }
            Content::Inner(_) => self.insert_into_subnode(positions, index, depth),
        }
    }

    fn insert_into_subnode(&mut self, positions: &[Vec3], index: usize, depth: usize) {
        let (center, half_width) = (self.center, self.half_width);
        let Content::Inner(subnodes) = &mut self.content else {
            unreachable!("only inner nodes have subnodes")
        };

        let k = choose_subnode(&center, &positions[index]);
        subnodes[k]
            .get_or_insert_with(|| {
                Node::new(center_from_subnode(half_width, center, k), half_width / 2.)
            })
            .insert(positions, index, depth + 1);
    }

    fn calculate_moments(&mut self, bodies: BodySlice<'_>) {
        let mut mass = 0.;
        let mut weighted = Vec3::zeros();
        let mut quadrupole = Matrix3::zeros();

        match &mut self.content {
            Content::Empty => {}
            Content::Leaf(indices) => {
                for &i in indices.iter() {
                    mass += bodies.masses[i];
                    weighted += bodies.positions[i] * bodies.masses[i];
                }
                self.center_of_mass = center_of_mass(mass, weighted, bodies.positions[indices[0]]);
                for &i in indices.iter() {
                    let d = bodies.positions[i] - self.center_of_mass;
                    quadrupole += quadrupole_of(bodies.masses[i], &d);
                }
            }
            Content::Inner(subnodes) => {
                for node in subnodes.iter_mut().flatten() {
                    node.calculate_moments(bodies);
                    mass += node.mass;
                    weighted += node.center_of_mass * node.mass;
                }
                self.center_of_mass = center_of_mass(mass, weighted, self.center);
                // parallel axis theorem
                for node in subnodes.iter().flatten() {
                    let d = node.center_of_mass - self.center_of_mass;
                    quadrupole += node.quadrupole + quadrupole_of(node.mass, &d);
                }
            }
        }

        self.mass = mass;
        self.quadrupole = quadrupole;
    }

    fn contains(&self, position: &Vec3) -> bool {
        (position - self.center)
            .iter()
            .all(|x| x.abs() <= self.half_width)
    }

    fn accumulate(
        &self,
        bodies: BodySlice<'_>,
        i: usize,
        solver: &BarnesHut,
        quadrupole: bool,
        acc: &mut Vec3,
    ) {
        let position = bodies.positions[i];

        match &self.content {
            Content::Empty => {}
            Content::Leaf(indices) => {
                for &j in indices {
                    if i == j {
                        continue;
                    }
                    *acc += gravity::acceleration(
                        position,
                        bodies.masses[j],
                        bodies.positions[j],
                        solver.softening,
                    );
                }
            }
            Content::Inner(subnodes) => {
                let r = position - self.center_of_mass;
                let distance = r.norm();

                if 2. * self.half_width < solver.theta * distance && !self.contains(&position) {
                    // node is far enough away
                    *acc += gravity::acceleration(
                        position,
                        self.mass,
                        self.center_of_mass,
                        solver.softening,
                    );
                    if quadrupole {
                        *acc += quadrupole_acceleration(&self.quadrupole, &r);
                    }
                } else {
                    // near field forces, go deeper into tree
                    for node in subnodes.iter().flatten() {
                        node.accumulate(bodies, i, solver, quadrupole, acc);
                    }
                }
            }
        }
    }
}

fn center_of_mass(mass: Float, weighted: Vec3, fallback: Vec3) -> Vec3 {
    if mass > 0. {
        weighted / mass
    } else {
        fallback
    }
}

fn quadrupole_of(mass: Float, d: &Vec3) -> Matrix3<Float> {
    (d * d.transpose() * 3. - Matrix3::identity() * d.norm_squared()) * mass
}

/// Quadrupole correction at offset `r` from the center of mass.
///
/// Gradient of the potential `-rᵀ Q r / (2 |r|⁵)`.
fn quadrupole_acceleration(quadrupole: &Matrix3<Float>, r: &Vec3) -> Vec3 {
    let r2 = r.norm_squared();
    if r2 == 0. {
        return Vec3::zeros();
    }
    let r5 = r2 * r2 * r2.sqrt();
    let qr = quadrupole * r;
    let rqr = r.dot(&qr);

    qr / r5 - r * (2.5 * rqr / (r5 * r2))
}

fn get_center_and_half_width(positions: &[Vec3]) -> (Vec3, Float) {
    let Some(first) = positions.first() else {
        return (Vec3::zeros(), 1.);
    };

    let mut v_min = *first;
    let mut v_max = *first;
    for pos in positions {
        v_min = v_min.inf(pos);
        v_max = v_max.sup(pos);
    }
    let half_width = (v_max - v_min).max() / 2.;
    let center = (v_min + v_max) / 2.;

    (center, half_width)
}

fn choose_subnode(center: &Vec3, position: &Vec3) -> usize {
    if position.x > center.x {
        if position.y > center.y {
            if position.z > center.z {
                return 0;
            }
            return 4;
        }
        if position.z > center.z {
            return 3;
        }
        return 7;
    }
    if position.y > center.y {
        if position.z > center.z {
            return 1;
        }
        return 5;
    }
    if position.z > center.z {
        return 2;
    }
    6
}

fn center_from_subnode(half_width: Float, center: Vec3, i: usize) -> Vec3 {
    let step_size = half_width / 2.;
    let (x, y, z) = match i {
        0 => (1., 1., 1.),
        1 => (-1., 1., 1.),
        2 => (-1., -1., 1.),
        3 => (1., -1., 1.),
        4 => (1., 1., -1.),
        5 => (-1., 1., -1.),
        6 => (-1., -1., -1.),
        _ => (1., -1., -1.),
    };
    center + Vec3::new(x, y, z) * step_size
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{generate, relative_l2_error, Bodies, Configuration, DirectSummation, ForceSolver};

    fn direct(bodies: &Bodies) -> Vec<Vec3> {
        let mut accs = vec![Vec3::zeros(); bodies.len()];
        DirectSummation::new()
            .calculate_accelerations(bodies.view(bodies.len()).unwrap(), &mut accs)
            .unwrap();
        accs
    }

    fn barnes_hut(bh: &BarnesHut, bodies: &Bodies, algorithm: Algorithm) -> Vec<Vec3> {
        let mut accs = vec![Vec3::zeros(); bodies.len()];
        bh.approximate_accelerations(bodies.view(bodies.len()).unwrap(), algorithm, &mut accs)
            .unwrap();
        accs
    }

    #[test]
    fn zero_theta_is_direct_summation() {
        let mut bodies = Bodies::with_capacity(300);
        generate(Configuration::UniformRandom, &mut bodies, 300, Some(1)).unwrap();

        let reference = direct(&bodies);
        for algorithm in [Algorithm::Tree, Algorithm::Multipole] {
            let approx = barnes_hut(&BarnesHut::new(0.), &bodies, algorithm);
            for (a, r) in approx.iter().zip(&reference) {
                assert_abs_diff_eq!(a, r, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn coincident_bodies() {
        let p = Vec3::new(0.5, 0.5, 0.5);
        let bodies = Bodies::new(
            vec![1., 2., 3., 4.],
            vec![p, p, p, Vec3::new(-1., 0., 0.)],
            vec![Vec3::zeros(); 4],
        )
        .unwrap();

        let reference = direct(&bodies);
        let approx = barnes_hut(&BarnesHut::new(0.), &bodies, Algorithm::Tree);
        for (a, r) in approx.iter().zip(&reference) {
            assert!(a.iter().all(|x| x.is_finite()));
            assert_abs_diff_eq!(a, r, epsilon = 1e-12);
        }
    }

    #[test]
    fn opening_angle_accuracy() {
        let n = 500;
        let mut bodies = Bodies::with_capacity(n);
        generate(Configuration::UniformRandom, &mut bodies, n, Some(2)).unwrap();
        let reference = direct(&bodies);

        let bh = BarnesHut::new(0.5);
        let tree = relative_l2_error(&barnes_hut(&bh, &bodies, Algorithm::Tree), &reference);
        let multipole =
            relative_l2_error(&barnes_hut(&bh, &bodies, Algorithm::Multipole), &reference);

        assert!(tree.l2 > 0.);
        assert!(tree.l2 < 5e-2, "{}", tree.l2);
        assert!(multipole.l2 < 2e-2, "{}", multipole.l2);
        assert!(multipole.l2 <= tree.l2);
    }

    #[test]
    fn quadrupole_of_symmetric_pair() {
        // two unit masses on the x axis, seen from far along x
        let bodies = Bodies::new(
            vec![1., 1.],
            vec![Vec3::new(-0.1, 0., 0.), Vec3::new(0.1, 0., 0.)],
            vec![Vec3::zeros(); 2],
        )
        .unwrap();
        let node = Node::from_bodies(bodies.view(2).unwrap());
        assert_abs_diff_eq!(node.mass, 2.);
        assert_abs_diff_eq!(node.center_of_mass, Vec3::zeros());
        assert_abs_diff_eq!(node.quadrupole.trace(), 0., epsilon = 1e-15);

        let r = Vec3::new(10., 0., 0.);
        let exact = gravity::acceleration(r, 1., bodies.positions()[0], 0.)
            + gravity::acceleration(r, 1., bodies.positions()[1], 0.);
        let monopole = gravity::acceleration(r, 2., Vec3::zeros(), 0.);
        let corrected = monopole + quadrupole_acceleration(&node.quadrupole, &r);

        assert!((corrected - exact).norm() < (monopole - exact).norm() / 100.);
    }

    #[test]
    fn empty_and_single() {
        let bh = BarnesHut::new(0.7);
        let bodies = Bodies::with_capacity(1);

        let mut accs = vec![Vec3::new(1., 1., 1.)];
        bh.approximate_accelerations(bodies.view(0).unwrap(), Algorithm::Tree, &mut accs)
            .unwrap();
        bh.approximate_accelerations(bodies.view(1).unwrap(), Algorithm::Tree, &mut accs)
            .unwrap();
        assert_eq!(accs[0], Vec3::zeros());
    }

    #[test]
    fn non_finite_position() {
        let bodies = Bodies::new(
            vec![1., 1.],
            vec![Vec3::zeros(), Vec3::new(Float::NAN, 0., 0.)],
            vec![Vec3::zeros(); 2],
        )
        .unwrap();
        let mut accs = vec![Vec3::zeros(); 2];

        let res = BarnesHut::new(0.5).approximate_accelerations(
            bodies.view(2).unwrap(),
            Algorithm::Multipole,
            &mut accs,
        );
        assert!(matches!(res, Err(SolverError::NonFinitePosition { index: 1 })));
    }

    #[test]
    fn short_output() {
        let bodies = Bodies::with_capacity(3);
        let mut accs = vec![Vec3::zeros(); 2];
        let res = BarnesHut::new(0.5).approximate_accelerations(
            bodies.view(3).unwrap(),
            Algorithm::Tree,
            &mut accs,
        );
        assert!(matches!(res, Err(SolverError::OutputTooShort { .. })));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn rayon() {
        let mut bodies = Bodies::with_capacity(200);
        generate(Configuration::SpiralGalaxy, &mut bodies, 200, Some(4)).unwrap();

        let single = barnes_hut(&BarnesHut::new(0.6), &bodies, Algorithm::Multipole);
        let par = barnes_hut(&BarnesHut::new(0.6).rayon(), &bodies, Algorithm::Multipole);
        assert_eq!(single, par);
    }
}
