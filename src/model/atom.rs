use nalgebra::Vector3;

use super::species::Species;

/// An atom: species label plus fractional coordinates in some unit cell.
///
/// Fractional coordinates are not restricted to `[0, 1)`;
/// [`Crystal::wrap`](super::crystal::Crystal::wrap) brings them back.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub species: Species,
    pub frac: Vector3<f64>,
}

impl Atom {
    pub fn new(species: Species, frac: [f64; 3]) -> Self {
        Self {
            species,
            frac: Vector3::from(frac),
        }
    }
}
