//! Find-and-replace of moieties in periodic crystals.
//!
//! The pipeline takes a [`Search`] (every occurrence of a query in a parent,
//! grouped by location), resolves the caller's scheme into concrete
//! `(location, orientation)` configurations, rigidly aligns the replacement
//! onto each chosen match (orthogonal Procrustes under periodic boundary
//! conditions), rewires bonds between preserved parent atoms and the
//! inserted fragments, deletes the matched atoms, and wraps the result back
//! into the unit cell.

mod align;
mod config;
mod engine;
mod error;

pub use config::ReplaceConfig;
pub use error::Error;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::model::crystal::Crystal;
use crate::search::{substructure_search, Search};

/// Replaces the query matched by `search` with `replacement` at the sites
/// selected by `config`, producing a new crystal.
///
/// Masked (R-group) query atoms are deleted along with the rest of each
/// match but take no part in the alignment: the rigid placement of the
/// replacement is driven by the unmasked query core, which must occur in the
/// replacement as a subgraph. When it does not, matches are deleted without
/// substitution. When it occurs more than once, or when a location's
/// orientation is left optimal, every candidate is aligned and the lowest
/// RMSD wins.
///
/// An empty search returns the parent unchanged (renamed), with a warning.
///
/// # Errors
///
/// Returns [`Error::InvalidScheme`] for contradictory scheme arguments and
/// [`Error::GeometricPrecondition`] when matched atoms are further apart
/// than adjacent unit cells. Fatal errors leave no partial result; inputs
/// are never mutated.
pub fn substructure_replace(
    search: &Search,
    replacement: &Crystal,
    config: &ReplaceConfig,
) -> Result<Crystal, Error> {
    if search.is_empty() {
        warn!(
            "query '{}' not found in parent '{}'; returning the parent unchanged",
            search.query().name,
            search.parent().name
        );
        let mut unchanged = search.parent().clone();
        unchanged.name = config.name.clone();
        return Ok(unchanged);
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let configs = config::resolve_scheme(search, config, &mut rng)?;

    if config.verbose {
        info!(
            "replacing {} of {} location(s) of '{}' in '{}'",
            configs.len(),
            search.nb_locations(),
            search.query().name,
            search.parent().name
        );
    }

    engine::build(search, replacement, &configs, &config.name, config.verbose)
}

/// Searches `query` in `parent` and substitutes `replacement` in one step.
///
/// Sugar for [`substructure_search`] followed by [`substructure_replace`].
///
/// # Examples
///
/// ```
/// use moiety_forge::{replace, Atom, Crystal, ReplaceConfig, Species, UnitCell};
///
/// // methane in a 20 Å box
/// let cell = UnitCell::cubic(20.0);
/// let mut parent = Crystal::new(
///     "methane",
///     cell.clone(),
///     vec![
///         Atom::new(Species::new("C"), [0.5, 0.5, 0.5]),
///         Atom::new(Species::new("H"), [0.555, 0.5, 0.5]),
///         Atom::new(Species::new("H"), [0.482, 0.552, 0.5]),
///         Atom::new(Species::new("H"), [0.482, 0.474, 0.545]),
///         Atom::new(Species::new("H"), [0.482, 0.474, 0.455]),
///     ],
/// );
/// for h in 1..5 {
///     parent.add_bond(0, h);
/// }
///
/// // C with a masked H: the hydrogen is swapped out, the carbon anchors
/// let mut query = Crystal::new(
///     "c-h",
///     cell.clone(),
///     vec![
///         Atom::new(Species::new("C"), [0.5, 0.5, 0.5]),
///         Atom::new(Species::masked("H"), [0.555, 0.5, 0.5]),
///     ],
/// );
/// query.add_bond(0, 1);
///
/// let mut fluoride = Crystal::new(
///     "c-f",
///     cell,
///     vec![
///         Atom::new(Species::masked("C"), [0.5, 0.5, 0.5]),
///         Atom::new(Species::new("F"), [0.57, 0.5, 0.5]),
///     ],
/// );
/// fluoride.add_bond(0, 1);
///
/// let config = ReplaceConfig {
///     loc: vec![1],
///     ..Default::default()
/// };
/// let product = replace(&parent, &query, &fluoride, &config)?;
///
/// assert_eq!(product.atom_count(), 5); // CH3F
/// assert_eq!(
///     product.atoms.iter().filter(|a| a.species.symbol() == "F").count(),
///     1
/// );
/// # Ok::<(), moiety_forge::ReplaceError>(())
/// ```
pub fn replace(
    parent: &Crystal,
    query: &Crystal,
    replacement: &Crystal,
    config: &ReplaceConfig,
) -> Result<Crystal, Error> {
    let search = substructure_search(query, parent, false);
    substructure_replace(&search, replacement, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::cell::UnitCell;
    use crate::model::species::Species;
    use crate::search::substructure_search;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    fn make_benzene(center: [f64; 3], a: f64) -> Crystal {
        let cell = UnitCell::cubic(a);
        let mut atoms = Vec::new();
        for i in 0..6 {
            let angle = i as f64 * std::f64::consts::PI / 3.0;
            atoms.push(Atom::new(
                Species::new("C"),
                [
                    center[0] + 1.4 / a * angle.cos(),
                    center[1] + 1.4 / a * angle.sin(),
                    center[2],
                ],
            ));
        }
        for i in 0..6 {
            let angle = i as f64 * std::f64::consts::PI / 3.0;
            atoms.push(Atom::new(
                Species::new("H"),
                [
                    center[0] + 2.5 / a * angle.cos(),
                    center[1] + 2.5 / a * angle.sin(),
                    center[2],
                ],
            ));
        }
        let mut xtal = Crystal::new("benzene", cell, atoms);
        for i in 0..6 {
            xtal.add_bond(i, (i + 1) % 6);
            xtal.add_bond(i, i + 6);
        }
        xtal
    }

    /// Two hexagons bridged at their first carbons: C12H10.
    fn make_biphenyl() -> Crystal {
        let a = 40.0;
        let cell = UnitCell::cubic(a);
        let mut atoms = Vec::new();
        for (ring, cx) in [(0usize, 0.4), (1usize, 0.6)] {
            let flip = if ring == 0 { 1.0 } else { -1.0 };
            for i in 0..6 {
                let angle = i as f64 * std::f64::consts::PI / 3.0;
                atoms.push(Atom::new(
                    Species::new("C"),
                    [
                        cx + flip * 1.4 / a * angle.cos(),
                        0.5 + 1.4 / a * angle.sin(),
                        0.5,
                    ],
                ));
            }
        }
        for ring in 0..2 {
            let flip = if ring == 0 { 1.0 } else { -1.0 };
            let cx = if ring == 0 { 0.4 } else { 0.6 };
            for i in 1..6 {
                let angle = i as f64 * std::f64::consts::PI / 3.0;
                atoms.push(Atom::new(
                    Species::new("H"),
                    [
                        cx + flip * 2.5 / a * angle.cos(),
                        0.5 + 2.5 / a * angle.sin(),
                        0.5,
                    ],
                ));
            }
        }
        let mut xtal = Crystal::new("biphenyl", cell, atoms);
        for ring in 0..2 {
            let base = 6 * ring;
            for i in 0..6 {
                xtal.add_bond(base + i, base + (i + 1) % 6);
            }
        }
        xtal.add_bond(0, 6); // bridge
        for ring in 0..2 {
            for i in 1..6 {
                xtal.add_bond(6 * ring + i, 12 + 5 * ring + (i - 1));
            }
        }
        xtal
    }

    /// Hydrogen with its anchor carbon masked, per the loader convention.
    fn make_h_query(cell: &UnitCell) -> Crystal {
        let mut query = Crystal::new(
            "h-stub",
            cell.clone(),
            vec![
                Atom::new(Species::new("H"), [0.5, 0.5, 0.5]),
                Atom::new(Species::masked("C"), [0.47, 0.5, 0.5]),
            ],
        );
        query.add_bond(0, 1);
        query
    }

    /// Methyl with the attachment carbon masked.
    fn make_methyl(cell: &UnitCell) -> Crystal {
        let mut methyl = Crystal::new(
            "methyl",
            cell.clone(),
            vec![
                Atom::new(Species::masked("C"), [0.5, 0.5, 0.5]),
                Atom::new(Species::new("H"), [0.53, 0.5, 0.5]),
                Atom::new(Species::new("H"), [0.485, 0.526, 0.5]),
                Atom::new(Species::new("H"), [0.485, 0.474, 0.5]),
            ],
        );
        for h in 1..4 {
            methyl.add_bond(0, h);
        }
        methyl
    }

    #[test]
    fn identity_replacement_reconstructs_the_parent() {
        let parent = make_benzene([0.5, 0.5, 0.5], 20.0);
        let search = substructure_search(&parent, &parent, false);
        assert_eq!(search.nb_locations(), 1);

        let result =
            substructure_replace(&search, &parent, &ReplaceConfig::default()).unwrap();

        assert_eq!(result.atom_count(), parent.atom_count());
        assert_eq!(result.bonds.edge_count(), parent.bonds.edge_count());
        // bond-isomorphic to the parent up to reindexing
        let back = substructure_search(&parent, &result, true);
        assert!(!back.is_empty());
        for edge in result.bonds.edges() {
            assert!(edge.distance > 0.9 && edge.distance < 1.6);
        }
    }

    #[test]
    fn replaces_every_ring_hydrogen_with_methyl() {
        let parent = make_biphenyl();
        assert_eq!(parent.atom_count(), 22);

        let query = make_h_query(&parent.cell);
        let search = substructure_search(&query, &parent, false);
        assert_eq!(search.nb_locations(), 10);

        let methyl = make_methyl(&parent.cell);
        let result =
            substructure_replace(&search, &methyl, &ReplaceConfig::default()).unwrap();

        // 22 - 10 * |{H, C}| + 10 * |methyl| = 42
        assert_eq!(result.atom_count(), 42);
        assert_eq!(
            result
                .atoms
                .iter()
                .filter(|a| a.species.symbol() == "C")
                .count(),
            12
        );
        assert!(result.atoms.iter().all(|a| !a.species.is_masked()));
    }

    #[test]
    fn replacement_across_the_cell_boundary_keeps_bonds_valid() {
        let mut parent = make_benzene([0.99, 0.5, 0.5], 10.0);
        parent.wrap();
        parent.refresh_bond_geometry();
        let query = make_benzene([0.5, 0.5, 0.5], 10.0);

        let search = substructure_search(&query, &parent, false);
        assert_eq!(search.nb_locations(), 1);

        let result =
            substructure_replace(&search, &query, &ReplaceConfig::default()).unwrap();

        assert_eq!(result.atom_count(), 12);
        for edge in result.bonds.edges() {
            assert!(
                edge.distance > 0.9 && edge.distance < 1.6,
                "bond {}-{} has distance {}",
                edge.u,
                edge.v,
                edge.distance
            );
        }
        assert!(result.bonds.edges().iter().any(|e| e.cross_boundary));
        assert!(result
            .atoms
            .iter()
            .all(|a| a.frac.iter().all(|&x| (0.0..1.0).contains(&x))));
    }

    #[test]
    fn no_match_returns_the_parent_unchanged() {
        let parent = make_benzene([0.5, 0.5, 0.5], 20.0);
        let cell = parent.cell.clone();
        let query = Crystal::new(
            "lone-iron",
            cell.clone(),
            vec![Atom::new(Species::new("Fe"), [0.5, 0.5, 0.5])],
        );
        let replacement = Crystal::new(
            "lone-cobalt",
            cell,
            vec![Atom::new(Species::new("Co"), [0.5, 0.5, 0.5])],
        );

        let search = substructure_search(&query, &parent, false);
        assert!(search.is_empty());

        let result =
            substructure_replace(&search, &replacement, &ReplaceConfig::default()).unwrap();
        assert_eq!(result.atom_count(), parent.atom_count());
        assert_eq!(result.bonds.edge_count(), parent.bonds.edge_count());
        assert_eq!(result.name, "new_xtal");
    }

    #[test]
    fn mismatched_loc_and_ori_lengths_error() {
        let parent = make_benzene([0.5, 0.5, 0.5], 20.0);
        let query = make_h_query(&parent.cell);
        let search = substructure_search(&query, &parent, false);

        let config = ReplaceConfig {
            loc: vec![1, 2],
            ori: vec![1],
            ..Default::default()
        };
        let result = substructure_replace(&search, &make_methyl(&parent.cell), &config);
        assert!(matches!(result, Err(Error::InvalidScheme(_))));
    }

    #[test]
    fn null_replacement_map_deletes_the_match() {
        let parent = make_benzene([0.5, 0.5, 0.5], 20.0);
        let query = make_h_query(&parent.cell);
        let search = substructure_search(&query, &parent, false);
        assert_eq!(search.nb_locations(), 6);

        // no hydrogen in the replacement, so no unmasked-query isomorphism
        let replacement = Crystal::new(
            "lone-nitrogen",
            parent.cell.clone(),
            vec![Atom::new(Species::new("N"), [0.5, 0.5, 0.5])],
        );

        let config = ReplaceConfig {
            loc: vec![1],
            ..Default::default()
        };
        let result = substructure_replace(&search, &replacement, &config).unwrap();
        assert_eq!(result.atom_count(), parent.atom_count() - 2);
        assert_eq!(
            result
                .atoms
                .iter()
                .filter(|a| a.species.symbol() == "N")
                .count(),
            0
        );
    }

    #[test]
    fn matched_atoms_never_survive() {
        let parent = make_biphenyl();
        let query = make_h_query(&parent.cell);
        let search = substructure_search(&query, &parent, false);

        let config = ReplaceConfig {
            loc: vec![1, 3],
            ..Default::default()
        };
        let result =
            substructure_replace(&search, &make_methyl(&parent.cell), &config).unwrap();

        let deleted = 2 * 2;
        let inserted = 2 * 4;
        assert_eq!(
            result.atom_count(),
            parent.atom_count() - deleted + inserted
        );
    }

    #[test]
    fn external_bonds_connect_fragments_to_survivors() {
        let parent = make_benzene([0.5, 0.5, 0.5], 20.0);
        let cell = parent.cell.clone();

        // carbon with a masked hydrogen: the ring atom is swapped for the
        // fragment's attachment carbon
        let mut query = Crystal::new(
            "c-stub",
            cell.clone(),
            vec![
                Atom::new(Species::new("C"), [0.5, 0.5, 0.5]),
                Atom::new(Species::masked("H"), [0.55, 0.5, 0.5]),
            ],
        );
        query.add_bond(0, 1);

        let search = substructure_search(&query, &parent, false);
        assert_eq!(search.nb_locations(), 6);

        let methyl = make_methyl(&cell);
        let config = ReplaceConfig {
            loc: vec![1],
            ..Default::default()
        };
        let result = substructure_replace(&search, &methyl, &config).unwrap();

        // 12 - {C, H} + CH3
        assert_eq!(result.atom_count(), 14);
        // the attachment carbon is the only fragment atom bonded into the ring:
        // two ring bonds plus its three hydrogens
        let attachment = 10; // survivors (10 parent atoms) precede the fragment
        assert_eq!(result.bonds.degree(attachment), 5);
        let ring_neighbors: Vec<usize> = result
            .bonds
            .neighbors(attachment)
            .iter()
            .copied()
            .filter(|&n| n < 10)
            .collect();
        assert_eq!(ring_neighbors.len(), 2);
    }

    #[test]
    fn random_orientations_are_reproducible_with_a_seed() {
        let parent = make_benzene([0.5, 0.5, 0.5], 20.0);
        let search = substructure_search(&parent, &parent, false);
        let config = ReplaceConfig {
            random: true,
            seed: Some(42),
            ..Default::default()
        };

        let a = substructure_replace(&search, &parent, &config).unwrap();
        let b = substructure_replace(&search, &parent, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn replacement_charges_carry_into_the_product() {
        let parent = make_benzene([0.5, 0.5, 0.5], 20.0);
        let query = make_h_query(&parent.cell);
        let search = substructure_search(&query, &parent, false);

        let mut methyl = make_methyl(&parent.cell);
        methyl.charges = Some(vec![-0.3, 0.1, 0.1, 0.1]);

        let config = ReplaceConfig {
            loc: vec![1],
            ..Default::default()
        };
        let result = substructure_replace(&search, &methyl, &config).unwrap();

        let charges = result.charges.as_ref().unwrap();
        assert_eq!(charges.len(), result.atom_count());
        let total: f64 = charges.iter().sum();
        assert!(approx_eq(total, 0.0, 1e-12));
        assert!(charges.iter().any(|&q| approx_eq(q, -0.3, 1e-12)));
    }

    #[test]
    fn produced_crystal_takes_the_configured_name() {
        let parent = make_benzene([0.5, 0.5, 0.5], 20.0);
        let search = substructure_search(&parent, &parent, false);
        let config = ReplaceConfig {
            name: "functionalized".to_string(),
            ..Default::default()
        };
        let result = substructure_replace(&search, &parent, &config).unwrap();
        assert_eq!(result.name, "functionalized");
    }
}
