//! Substructure search over periodic crystal graphs.

pub(crate) mod ullmann;

use std::collections::BTreeMap;

use crate::model::crystal::Crystal;

/// One match site: a canonical (sorted) set of parent atoms, together with
/// every isomorphism whose image is that set.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    atoms: Vec<usize>,
    orientations: Vec<Vec<usize>>,
}

impl Location {
    /// Sorted parent atom indices covered by this site.
    #[inline]
    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    /// The isomorphisms at this site, in enumeration order. Each entry maps
    /// query vertex `i` to parent vertex `orientation[i]`.
    #[inline]
    pub fn orientations(&self) -> &[Vec<usize>] {
        &self.orientations
    }
}

/// Result of a substructure search: all isomorphisms of a query in a parent,
/// grouped by location. Read-only after construction.
///
/// The contained query is a normalized copy (masked atoms moved last), so
/// orientation maps index into it rather than into the caller's moiety.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    query: Crystal,
    parent: Crystal,
    locations: Vec<Location>,
}

impl Search {
    #[inline]
    pub fn query(&self) -> &Crystal {
        &self.query
    }

    #[inline]
    pub fn parent(&self) -> &Crystal {
        &self.parent
    }

    #[inline]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[inline]
    pub fn nb_locations(&self) -> usize {
        self.locations.len()
    }

    pub fn nb_orientations(&self, location: usize) -> usize {
        self.locations[location].orientations.len()
    }

    pub fn nb_isomorphisms(&self) -> usize {
        self.locations.iter().map(|l| l.orientations.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Finds every occurrence of `query` in `parent` as a species- and
/// adjacency-preserving subgraph, grouped by location.
///
/// Species comparison ignores mask tags, so masked (R-group) query atoms
/// participate in topology matching like any other atom. With `exact` the
/// match must be a full graph isomorphism (two-way edge preservation and
/// equal sizes).
///
/// Locations are ordered lexicographically by their sorted parent atom sets;
/// orientations keep the engine's deterministic enumeration order. The same
/// inputs therefore always produce the same grouped result.
pub fn substructure_search(query: &Crystal, parent: &Crystal, exact: bool) -> Search {
    let query = query.normalized_for_search();
    let isos = ullmann::find_isomorphisms(&query, parent, exact);

    let mut groups: BTreeMap<Vec<usize>, Vec<Vec<usize>>> = BTreeMap::new();
    for iso in isos {
        let mut image = iso.clone();
        image.sort_unstable();
        groups.entry(image).or_default().push(iso);
    }

    Search {
        query,
        parent: parent.clone(),
        locations: groups
            .into_iter()
            .map(|(atoms, orientations)| Location { atoms, orientations })
            .collect(),
    }
}
