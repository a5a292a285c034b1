use crate::{Float, Vec3};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErrorReport {
    /// Root of the mean relative squared error over all bodies.
    pub l2: Float,
    /// Bodies whose reference acceleration vanished while the approximation did not.
    /// Their absolute squared error enters the sum in place of the relative one.
    pub degenerate_bodies: usize,
}

/// Relative L2 error of `approximate` against `reference`.
///
/// ```text
/// l2 = sqrt( sum_i |a_i - r_i|² / |r_i|² / N )
/// ```
/// A body with `|r_i| = 0` contributes nothing if `a_i` is zero too and
/// `|a_i|² / N` otherwise, so the result is always finite for finite inputs.
///
/// # Panics
///
/// If `approximate` and `reference` have different lengths.
#[must_use]
pub fn relative_l2_error(approximate: &[Vec3], reference: &[Vec3]) -> ErrorReport {
    assert_eq!(
        approximate.len(),
        reference.len(),
        "accelerations of different runs can't be compared"
    );

    let n = reference.len() as Float;
    let mut sum = 0.;
    let mut degenerate_bodies = 0;

    for (a, r) in approximate.iter().zip(reference) {
        let difference = (a - r).norm_squared();
        let normalizer = r.norm_squared();

        if normalizer > 0. {
            sum += difference / normalizer / n;
        } else if difference > 0. {
            degenerate_bodies += 1;
            sum += difference / n;
        }
    }

    ErrorReport {
        l2: sum.sqrt(),
        degenerate_bodies,
    }
}
