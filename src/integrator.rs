use crate::{error::Error, BodySliceMut, Float, Result, Vec3};

/// Advance the bodies by one semi-implicit Euler step.
///
/// The velocity is updated first and the new velocity moves the position:
/// ```text
/// v_(i + 1) = v_i + a_i dt
/// x_(i + 1) = x_i + v_(i + 1) dt
/// ```
/// Masses are left untouched. Fails without moving anything if there are
/// fewer accelerations than bodies.
pub fn step(bodies: BodySliceMut<'_>, accelerations: &[Vec3], time_step: Float) -> Result<()> {
    Error::check_capacity(bodies.len(), accelerations.len())?;

    let BodySliceMut {
        positions,
        velocities,
        ..
    } = bodies;

    for ((pos, vel), acc) in positions.iter_mut().zip(velocities.iter_mut()).zip(accelerations)
    {
        *vel += acc * time_step;
        *pos += *vel * time_step;
    }
    Ok(())
}

/// Sum of `m * v` over all bodies.
#[must_use]
pub fn total_momentum(masses: &[Float], velocities: &[Vec3]) -> Vec3 {
    masses
        .iter()
        .zip(velocities)
        .fold(Vec3::zeros(), |acc, (&m, v)| acc + v * m)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{generate, Bodies, Configuration, DirectSummation, ForceSolver};

    #[test]
    fn velocity_is_updated_before_position() {
        let mut bodies = Bodies::new(vec![1.], vec![Vec3::zeros()], vec![Vec3::zeros()]).unwrap();
        let acc = [Vec3::new(1., 0., 0.)];

        step(bodies.view_mut(1).unwrap(), &acc, 0.5).unwrap();

        // explicit Euler would leave the position at the origin
        assert_eq!(bodies.velocities()[0], Vec3::new(0.5, 0., 0.));
        assert_eq!(bodies.positions()[0], Vec3::new(0.25, 0., 0.));
        assert_eq!(bodies.masses()[0], 1.);
    }

    #[test]
    fn short_acceleration_buffer_is_rejected() {
        let mut bodies = Bodies::with_capacity(3);
        generate(Configuration::UniformRandom, &mut bodies, 3, Some(1)).unwrap();
        let before = bodies.clone();

        let res = step(bodies.view_mut(3).unwrap(), &[Vec3::new(1., 1., 1.); 2], 0.01);

        assert!(matches!(
            res,
            Err(Error::InvalidCapacity {
                requested: 3,
                capacity: 2
            })
        ));
        assert_eq!(bodies.positions(), before.positions());
        assert_eq!(bodies.velocities(), before.velocities());
    }

    #[test]
    fn binary_stars_move_apart_symmetrically() {
        let mut bodies = Bodies::with_capacity(2);
        generate(Configuration::BinarySystem, &mut bodies, 2, Some(0)).unwrap();
        let initial = bodies.positions().to_vec();

        let mut accs = vec![Vec3::zeros(); 2];
        DirectSummation::new()
            .calculate_accelerations(bodies.view(2).unwrap(), &mut accs)
            .unwrap();
        step(bodies.view_mut(2).unwrap(), &accs, 0.01).unwrap();

        let d0 = bodies.positions()[0] - initial[0];
        let d1 = bodies.positions()[1] - initial[1];
        assert!(d0.norm() > 0.);
        assert!(d1.norm() > 0.);
        assert_abs_diff_eq!(d0.normalize().dot(&d1.normalize()), -1., epsilon = 1e-12);
        assert_eq!(bodies.masses(), &[50., 50.]);
    }

    #[test]
    fn momentum_is_conserved() {
        let n = 64;
        let mut bodies = Bodies::with_capacity(n);
        generate(Configuration::UniformRandom, &mut bodies, n, Some(9)).unwrap();

        let ds = DirectSummation::new();
        let mut accs = vec![Vec3::zeros(); n];
        let p0 = total_momentum(bodies.masses(), bodies.velocities());

        for _ in 0..200 {
            ds.calculate_accelerations(bodies.view(n).unwrap(), &mut accs)
                .unwrap();
            step(bodies.view_mut(n).unwrap(), &accs, 0.01).unwrap();
        }

        let p1 = total_momentum(bodies.masses(), bodies.velocities());
        assert_abs_diff_eq!(p0, p1, epsilon = 1e-8);
    }
}
