//! Per-configuration alignment of the replacement and assembly of the
//! output crystal.

use std::collections::HashSet;

use log::{debug, info, warn};
use nalgebra::{Matrix3, Vector3};

use super::align;
use super::error::Error;
use crate::model::crystal::Crystal;
use crate::search::{ullmann, Search};

/// One accepted substitution: the matched parent atoms, the map from the
/// unmasked query into the replacement, and the rigidly transformed
/// replacement fragment (`None` for a pure deletion).
struct Placement {
    iso: Vec<usize>,
    u2r: Vec<usize>,
    fragment: Option<Crystal>,
    rmsd: f64,
}

pub(crate) fn build(
    search: &Search,
    replacement: &Crystal,
    configs: &[(usize, Option<usize>)],
    name: &str,
    verbose: bool,
) -> Result<Crystal, Error> {
    let parent = search.parent();
    let query = search.query();
    let n_unmasked = query.unmasked_count();

    // Maps of the unmasked query core into the replacement. The search's
    // query is normalized, so the core is simply the leading prefix.
    let u2r_candidates = if n_unmasked == 0 {
        Vec::new()
    } else {
        let prefix: Vec<usize> = (0..n_unmasked).collect();
        ullmann::find_isomorphisms(&query.slice(&prefix), replacement, false)
    };

    if u2r_candidates.is_empty() {
        warn!(
            "replacement '{}' contains no copy of the unmasked query; \
             matches will be deleted without substitution",
            replacement.name
        );
    } else if u2r_candidates.len() > 1 {
        warn!(
            "unmasked query maps into replacement '{}' in {} ways; \
             keeping the lowest-RMSD map per site",
            replacement.name,
            u2r_candidates.len()
        );
    }

    let mut placements = Vec::with_capacity(configs.len());
    for &(loc, ori) in configs {
        let location = &search.locations()[loc];
        let placement = place_at(
            search,
            replacement,
            &u2r_candidates,
            loc,
            ori,
            n_unmasked,
        )?;
        if verbose {
            info!(
                "location {} ({} atoms): rmsd {:.4}",
                loc + 1,
                location.atoms().len(),
                placement.rmsd
            );
        } else {
            debug!("location {}: rmsd {:.4}", loc + 1, placement.rmsd);
        }
        placements.push(placement);
    }

    // Assembly: parent first, then every fragment at its running offset.
    let mut assembly = parent.clone();
    for placement in &placements {
        let Some(fragment) = &placement.fragment else {
            continue;
        };
        let offset = assembly.atom_count();
        assembly.append(fragment);

        // bonds between preserved parent atoms and the inserted fragment
        for (q, &p) in placement.iso[..n_unmasked].iter().enumerate() {
            let r = placement.u2r[q];
            for &n in parent.bonds.neighbors(p) {
                if !placement.iso.contains(&n) {
                    assembly.add_bond(n, offset + r);
                }
            }
        }
    }

    let deleted: HashSet<usize> = placements
        .iter()
        .flat_map(|pl| pl.iso.iter().copied())
        .collect();
    let survivors: Vec<usize> = (0..assembly.atom_count())
        .filter(|i| !deleted.contains(i))
        .collect();

    assembly.wrap();
    let mut result = assembly.slice(&survivors);
    result.name = name.to_string();
    result.refresh_bond_geometry();
    Ok(result)
}

/// Chooses the isomorphism and replacement map for one configuration and
/// produces the transformed fragment. With `ori = None` every orientation at
/// the location competes on alignment RMSD; ties keep the earliest candidate.
fn place_at(
    search: &Search,
    replacement: &Crystal,
    u2r_candidates: &[Vec<usize>],
    loc: usize,
    ori: Option<usize>,
    n_unmasked: usize,
) -> Result<Placement, Error> {
    let parent = search.parent();
    let location = &search.locations()[loc];
    let orientations: Vec<usize> = match ori {
        Some(o) => vec![o],
        None => (0..location.orientations().len()).collect(),
    };

    if u2r_candidates.is_empty() {
        return Ok(Placement {
            iso: location.orientations()[orientations[0]].clone(),
            u2r: Vec::new(),
            fragment: None,
            rmsd: 0.0,
        });
    }

    let mut best: Option<Placement> = None;
    for &o in &orientations {
        let iso = &location.orientations()[o];

        // contiguous Cartesian cloud of the matched parent atoms
        let mut subset: Vec<Vector3<f64>> =
            iso.iter().map(|&p| parent.atoms[p].frac).collect();
        align::adjust_for_pbc(&mut subset)?;
        let b_cart: Vec<Vector3<f64>> = subset[..n_unmasked]
            .iter()
            .map(|f| parent.cell.frac_to_cart(f))
            .collect();
        let b_centroid = centroid(&b_cart);
        let b_centered: Vec<Vector3<f64>> = b_cart.iter().map(|p| p - b_centroid).collect();

        for u2r in u2r_candidates {
            let a_cart: Vec<Vector3<f64>> = u2r
                .iter()
                .map(|&r| replacement.cell.frac_to_cart(&replacement.atoms[r].frac))
                .collect();
            let a_centroid = centroid(&a_cart);
            let a_centered: Vec<Vector3<f64>> =
                a_cart.iter().map(|p| p - a_centroid).collect();

            let rotation = align::procrustes(&a_centered, &b_centered);
            let aligned: Vec<Vector3<f64>> =
                a_centered.iter().map(|p| rotation * p).collect();
            let rmsd = align::rmsd(&aligned, &b_centered);

            if best.as_ref().is_none_or(|b| rmsd < b.rmsd) {
                best = Some(Placement {
                    iso: iso.clone(),
                    u2r: u2r.clone(),
                    fragment: Some(transformed_replacement(
                        replacement,
                        parent,
                        &rotation,
                        &a_centroid,
                        &b_centroid,
                    )),
                    rmsd,
                });
            }
        }
    }

    // orientations is never empty and u2r_candidates was checked above
    Ok(best.expect("at least one alignment candidate"))
}

/// Rigid copy of the replacement in the parent's cell: rotated about its
/// attachment centroid, translated onto the parent-subset centroid, mask
/// tags cleared. Internal bonds carry over unchanged.
fn transformed_replacement(
    replacement: &Crystal,
    parent: &Crystal,
    rotation: &Matrix3<f64>,
    a_centroid: &Vector3<f64>,
    b_centroid: &Vector3<f64>,
) -> Crystal {
    let mut fragment = replacement.clone();
    fragment.cell = parent.cell.clone();
    for atom in &mut fragment.atoms {
        let cart = replacement.cell.frac_to_cart(&atom.frac);
        let moved = rotation * (cart - a_centroid) + b_centroid;
        atom.frac = parent.cell.cart_to_frac(&moved);
        atom.species = atom.species.unmask();
    }
    fragment
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    points.iter().sum::<Vector3<f64>>() / points.len() as f64
}
