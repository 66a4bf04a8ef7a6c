use nalgebra::Vector3;

use super::atom::Atom;
use super::cell::{self, UnitCell};
use super::graph::BondGraph;
use super::species::Species;

/// A periodic crystal: atoms with fractional coordinates in a unit cell,
/// plus a bond graph and optional per-atom charges.
///
/// Atom order is stable and defines vertex identity in the bond graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Crystal {
    pub name: String,
    pub cell: UnitCell,
    pub atoms: Vec<Atom>,
    pub bonds: BondGraph,
    pub charges: Option<Vec<f64>>,
}

impl Crystal {
    /// Creates a crystal with no bonds and no charges.
    pub fn new(name: impl Into<String>, cell: UnitCell, atoms: Vec<Atom>) -> Self {
        let bonds = BondGraph::with_vertices(atoms.len());
        Self {
            name: name.into(),
            cell,
            atoms,
            bonds,
            charges: None,
        }
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn species(&self, i: usize) -> &Species {
        &self.atoms[i].species
    }

    /// Adds a bond, computing its PBC-aware distance and cross-boundary flag
    /// from the current coordinates.
    pub fn add_bond(&mut self, u: usize, v: usize) {
        let a = &self.atoms[u].frac;
        let b = &self.atoms[v].frac;
        let d_pbc = self.cell.distance_pbc(a, b);
        let d_cell = self.cell.distance(a, b);
        let cross = (d_pbc - d_cell).abs() > 1e-9;
        self.bonds.add_edge(u, v, d_pbc, cross);
    }

    /// In-cell bond length, ignoring periodicity.
    pub fn bond_length(&self, u: usize, v: usize) -> f64 {
        self.cell.distance(&self.atoms[u].frac, &self.atoms[v].frac)
    }

    /// Nearest-image bond length.
    pub fn bond_length_pbc(&self, u: usize, v: usize) -> f64 {
        self.cell
            .distance_pbc(&self.atoms[u].frac, &self.atoms[v].frac)
    }

    /// Recomputes `distance` and `cross_boundary` on every bond from the
    /// current coordinates.
    pub fn refresh_bond_geometry(&mut self) {
        let cell = &self.cell;
        for edge in self.bonds.edges_mut() {
            let a = &self.atoms[edge.u].frac;
            let b = &self.atoms[edge.v].frac;
            let d_pbc = cell.distance_pbc(a, b);
            let d_cell = cell.distance(a, b);
            edge.distance = d_pbc;
            edge.cross_boundary = (d_pbc - d_cell).abs() > 1e-9;
        }
    }

    /// Wraps every atom into the `[0, 1)` unit cell.
    pub fn wrap(&mut self) {
        for atom in &mut self.atoms {
            atom.frac = cell::wrap(&atom.frac);
        }
    }

    /// Mean fractional position of the atoms at `indices`.
    pub fn centroid(&self, indices: &[usize]) -> Vector3<f64> {
        let sum: Vector3<f64> = indices.iter().map(|&i| self.atoms[i].frac).sum();
        sum / indices.len() as f64
    }

    /// Sub-crystal at `indices`, relabeled to `0..indices.len()` in the given
    /// order, with induced bonds and sliced charges.
    pub fn slice(&self, indices: &[usize]) -> Crystal {
        Crystal {
            name: self.name.clone(),
            cell: self.cell.clone(),
            atoms: indices.iter().map(|&i| self.atoms[i].clone()).collect(),
            bonds: self.bonds.induced(indices),
            charges: self
                .charges
                .as_ref()
                .map(|q| indices.iter().map(|&i| q[i]).collect()),
        }
    }

    /// Appends another crystal's atoms and bonds, offsetting its vertex
    /// indices. The receiver's cell is kept; charges merge, with missing
    /// sides defaulting to zero.
    pub fn append(&mut self, other: &Crystal) {
        let own_count = self.atoms.len();
        self.atoms.extend(other.atoms.iter().cloned());
        self.bonds.append(&other.bonds);

        if self.charges.is_some() || other.charges.is_some() {
            let mut merged = self.charges.take().unwrap_or_else(|| vec![0.0; own_count]);
            match &other.charges {
                Some(q) => merged.extend(q.iter().copied()),
                None => merged.extend(std::iter::repeat(0.0).take(other.atoms.len())),
            }
            self.charges = Some(merged);
        }
    }

    /// Indices of the atoms whose species is not masked.
    pub fn unmasked_indices(&self) -> Vec<usize> {
        (0..self.atoms.len())
            .filter(|&i| !self.atoms[i].species.is_masked())
            .collect()
    }

    #[inline]
    pub fn unmasked_count(&self) -> usize {
        self.atoms
            .iter()
            .filter(|a| !a.species.is_masked())
            .count()
    }

    /// Reorders the crystal so all unmasked atoms form a prefix (stable
    /// within each class), mirroring the moiety-loader convention of placing
    /// masked atoms last. Bonds and charges are remapped accordingly.
    pub fn normalized_for_search(&self) -> Crystal {
        let mut order = self.unmasked_indices();
        order.extend(
            (0..self.atoms.len()).filter(|&i| self.atoms[i].species.is_masked()),
        );
        self.slice(&order)
    }
}
