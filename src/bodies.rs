use crate::{error::Error, vector::PointMass, Float, Result, Vec3, Vec4};

/// Index of a body in a [`Bodies`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub usize);

/// A collection of bodies.
///
/// Masses, positions and velocities are kept as Struct-of-Arrays and always
/// have the same length, so index `i` refers to the same body in every buffer.
/// The arena is allocated once at full capacity; runs work on a prefix of it
/// through [`BodySlice`] and [`BodySliceMut`].
#[derive(Clone, Debug, Default)]
pub struct Bodies {
    masses: Vec<Float>,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

/// Read-only view of the first `n` bodies, as consumed by force solvers.
#[derive(Clone, Copy, Debug)]
pub struct BodySlice<'a> {
    pub masses: &'a [Float],
    pub positions: &'a [Vec3],
}

/// Mutable view of the first `n` bodies, as consumed by the integrator.
///
/// Masses stay read-only.
#[derive(Debug)]
pub struct BodySliceMut<'a> {
    pub masses: &'a [Float],
    pub positions: &'a mut [Vec3],
    pub velocities: &'a mut [Vec3],
}

impl Bodies {
    /// Zero-initialized arena holding `capacity` bodies.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            masses: vec![0.; capacity],
            positions: vec![Vec3::zeros(); capacity],
            velocities: vec![Vec3::zeros(); capacity],
        }
    }

    pub fn new(masses: Vec<Float>, positions: Vec<Vec3>, velocities: Vec<Vec3>) -> Result<Self> {
        let len = masses.len();
        if positions.len() != len || velocities.len() != len {
            return Err(Error::MisalignedBuffers {
                masses: len,
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }

        Ok(Self {
            masses,
            positions,
            velocities,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    #[must_use]
    pub fn masses(&self) -> &[Float] {
        &self.masses
    }

    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[must_use]
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    #[must_use]
    pub fn point_mass(&self, id: BodyId) -> Option<PointMass> {
        Some(PointMass::new(
            *self.masses.get(id.0)?,
            *self.positions.get(id.0)?,
        ))
    }

    #[must_use]
    pub fn velocity(&self, id: BodyId) -> Option<Vec3> {
        self.velocities.get(id.0).copied()
    }

    /// Overwrite one body. Panics if `id` is outside the arena.
    pub fn set(&mut self, id: BodyId, mass: Float, position: Vec3, velocity: Vec3) {
        self.masses[id.0] = mass;
        self.positions[id.0] = position;
        self.velocities[id.0] = velocity;
    }

    pub fn view(&self, n: usize) -> Result<BodySlice<'_>> {
        Error::check_capacity(n, self.len())?;
        Ok(BodySlice {
            masses: &self.masses[..n],
            positions: &self.positions[..n],
        })
    }

    pub fn view_mut(&mut self, n: usize) -> Result<BodySliceMut<'_>> {
        Error::check_capacity(n, self.len())?;
        Ok(BodySliceMut {
            masses: &self.masses[..n],
            positions: &mut self.positions[..n],
            velocities: &mut self.velocities[..n],
        })
    }
}

impl BodySlice<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Bodies packed as `(x, y, z, mass)`, the form renderers consume.
    #[must_use]
    pub fn to_vec4s(&self) -> Vec<Vec4> {
        let mut packed = Vec::with_capacity(self.len());
        self.pack_into(&mut packed);
        packed
    }

    /// Replace the contents of `packed` with `(x, y, z, mass)` per body,
    /// reusing its allocation.
    pub fn pack_into(&self, packed: &mut Vec<Vec4>) {
        packed.clear();
        packed.extend(
            self.positions
                .iter()
                .zip(self.masses)
                .map(|(&position, &mass)| PointMass::new(mass, position).to_vec4()),
        );
    }
}

impl BodySliceMut<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misaligned_buffers_are_rejected() {
        let res = Bodies::new(vec![1.; 3], vec![Vec3::zeros(); 3], vec![Vec3::zeros(); 2]);
        assert!(matches!(
            res,
            Err(Error::MisalignedBuffers {
                masses: 3,
                positions: 3,
                velocities: 2
            })
        ));
    }

    #[test]
    fn view_beyond_capacity_fails() {
        let bodies = Bodies::with_capacity(4);
        assert!(bodies.view(4).is_ok());
        assert!(matches!(
            bodies.view(5),
            Err(Error::InvalidCapacity {
                requested: 5,
                capacity: 4
            })
        ));
    }

    #[test]
    fn set_keeps_buffers_aligned() {
        let mut bodies = Bodies::with_capacity(3);
        bodies.set(BodyId(1), 2., Vec3::new(1., 2., 3.), Vec3::new(0., 1., 0.));

        let pm = bodies.point_mass(BodyId(1)).unwrap();
        assert_eq!(pm.mass, 2.);
        assert_eq!(pm.position, Vec3::new(1., 2., 3.));
        assert_eq!(bodies.velocity(BodyId(1)), Some(Vec3::new(0., 1., 0.)));
        assert_eq!(bodies.point_mass(BodyId(3)), None);

        let packed = bodies.view(2).unwrap().to_vec4s();
        assert_eq!(packed[1], Vec4::new(1., 2., 3., 2.));
    }

    #[test]
    fn pack_into_overwrites_previous_frame() {
        let mut bodies = Bodies::with_capacity(2);
        bodies.set(BodyId(0), 1., Vec3::new(1., 0., 0.), Vec3::zeros());
        bodies.set(BodyId(1), 3., Vec3::new(0., 2., 0.), Vec3::zeros());

        let mut packed = vec![Vec4::repeat(7.); 5];
        bodies.view(2).unwrap().pack_into(&mut packed);
        assert_eq!(packed, [Vec4::new(1., 0., 0., 1.), Vec4::new(0., 2., 0., 3.)]);
        assert!(packed.capacity() >= 5);
    }
}
