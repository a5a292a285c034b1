use nalgebra::{Vector3, Vector4};

use crate::Float;

pub type Vec3 = Vector3<Float>;

/// Position and mass packed as `(x, y, z, mass)`.
pub type Vec4 = Vector4<Float>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointMass {
    pub position: Vec3,
    pub mass: Float,
}

impl PointMass {
    #[must_use]
    pub fn new(mass: Float, position: Vec3) -> Self {
        Self { position, mass }
    }

    #[must_use]
    pub fn to_vec4(&self) -> Vec4 {
        self.position.push(self.mass)
    }

    #[must_use]
    pub fn from_vec4(v: &Vec4) -> Self {
        Self {
            position: v.xyz(),
            mass: v.w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_is_fourth_component() {
        let pm = PointMass::new(2.5, Vec3::new(1., -2., 3.));
        let v = pm.to_vec4();

        assert_eq!(v, Vec4::new(1., -2., 3., 2.5));
        assert_eq!(PointMass::from_vec4(&v), pm);
    }
}
