use crate::{Float, Vec3};

/// Gravitational constant used to derive orbital velocities of generated bodies.
pub const G: Float = 6.6743015e-11;

/// Plummer softening length added to every pairwise distance.
pub const SOFTENING: Float = 0.1;

/// Acceleration that a body of mass `mass2` at `position2` exerts on `position1`.
///
/// The force law is in units where G = 1:
/// `a = r * m2 / (|r|² + softening²)^(3/2)` with `r = position2 - position1`.
#[inline]
#[must_use]
pub fn acceleration(position1: Vec3, mass2: Float, position2: Vec3, softening: Float) -> Vec3 {
    let r = position2 - position1;
    let r_square = r.norm_squared() + softening * softening;
    r * (mass2 / (r_square * r_square.sqrt()))
}

/// Speed of a circular orbit of radius `radius` around `central_mass`.
#[inline]
#[must_use]
pub fn circular_speed(gravitational_constant: Float, central_mass: Float, radius: Float) -> Float {
    (gravitational_constant * central_mass / radius).sqrt()
}
