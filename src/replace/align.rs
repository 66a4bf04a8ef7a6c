//! Rigid-body alignment of the replacement onto a matched parent subset.

use log::warn;
use nalgebra::{Matrix3, Vector3};

use super::error::Error;
use crate::model::cell::nearest_image;

/// Makes an ordered fractional point cloud locally contiguous under periodic
/// boundary conditions.
///
/// The first point anchors the cloud; every other point is replaced by its
/// nearest image relative to the anchor. This is what makes SVD alignment
/// meaningful for matches that straddle a cell face.
///
/// # Errors
///
/// Returns [`Error::GeometricPrecondition`] when any displacement component
/// relative to the anchor falls outside `(-2, 2)`, i.e. the points are not
/// within the same or adjacent unit cells.
pub(crate) fn adjust_for_pbc(points: &mut [Vector3<f64>]) -> Result<(), Error> {
    if points.is_empty() {
        return Ok(());
    }
    let anchor = points[0];

    for point in &mut points[1..] {
        let d = *point - anchor;
        for axis in 0..3 {
            if d[axis].abs() >= 2.0 {
                return Err(Error::GeometricPrecondition {
                    axis,
                    value: d[axis],
                });
            }
        }
        *point = anchor + nearest_image(&d);
    }
    Ok(())
}

/// Orthogonal Procrustes rotation: the `R = V·Uᵀ` minimizing `‖R·A − B‖_F`
/// over correlated, centered Cartesian point clouds, from the SVD of `A·Bᵀ`.
///
/// No reflection correction is applied: when the optimal orthogonal map is
/// improper (`det(R) = −1`) it is returned as-is, so chiral inversion of the
/// replacement is possible. Fewer than three points cannot pin down a unique
/// rotation; the SVD result is still returned deterministically, with a
/// warning.
pub(crate) fn procrustes(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> Matrix3<f64> {
    debug_assert_eq!(a.len(), b.len());
    if a.len() < 3 {
        warn!(
            "aligning only {} point(s); rotation is not uniquely determined",
            a.len()
        );
    }

    let mut f = Matrix3::zeros();
    for (p, q) in a.iter().zip(b) {
        f += p * q.transpose();
    }

    let svd = f.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Matrix3::identity();
    };
    v_t.transpose() * u.transpose()
}

/// Root-mean-square deviation between two paired Cartesian point clouds.
pub(crate) fn rmsd(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    if a.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = a.iter().zip(b).map(|(p, q)| (p - q).norm_squared()).sum();
    (sum_sq / a.len() as f64).sqrt()
}
