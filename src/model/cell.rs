use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unit cell basis is singular and cannot be inverted")]
pub struct SingularCellError;

/// A (generally triclinic) unit cell.
///
/// Holds the fractional-to-Cartesian basis matrix (cell vectors as columns)
/// and its cached inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCell {
    f_to_c: Matrix3<f64>,
    c_to_f: Matrix3<f64>,
}

impl UnitCell {
    /// Builds a cell from its fractional-to-Cartesian matrix.
    pub fn new(f_to_c: Matrix3<f64>) -> Result<Self, SingularCellError> {
        let c_to_f = f_to_c.try_inverse().ok_or(SingularCellError)?;
        Ok(Self { f_to_c, c_to_f })
    }

    /// Cubic cell with edge length `a` (Å).
    pub fn cubic(a: f64) -> Self {
        Self {
            f_to_c: Matrix3::from_diagonal_element(a),
            c_to_f: Matrix3::from_diagonal_element(1.0 / a),
        }
    }

    #[inline]
    pub fn f_to_c(&self) -> &Matrix3<f64> {
        &self.f_to_c
    }

    #[inline]
    pub fn c_to_f(&self) -> &Matrix3<f64> {
        &self.c_to_f
    }

    #[inline]
    pub fn frac_to_cart(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.f_to_c * v
    }

    #[inline]
    pub fn cart_to_frac(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.c_to_f * v
    }

    pub fn volume(&self) -> f64 {
        self.f_to_c.determinant().abs()
    }

    /// Cartesian distance between two fractional points, ignoring periodicity.
    pub fn distance(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        self.frac_to_cart(&(a - b)).norm()
    }

    /// Cartesian distance between two fractional points under the
    /// nearest-image convention.
    pub fn distance_pbc(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        self.frac_to_cart(&nearest_image(&(a - b))).norm()
    }
}

/// Maps each fractional component to its representative in `[0, 1)`.
pub fn wrap(v: &Vector3<f64>) -> Vector3<f64> {
    v.map(|x| x - x.floor())
}

/// Nearest-image correction of a fractional displacement: each component is
/// shifted by an integer so it lands in `[-0.5, 0.5]`.
///
/// Callers must ensure every component of `d` lies within `(-2, 2)`, i.e.
/// the two points are in the same or adjacent unit cells.
pub fn nearest_image(d: &Vector3<f64>) -> Vector3<f64> {
    d.map(|x| x - x.round())
}
