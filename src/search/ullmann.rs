//! Subgraph isomorphism via Ullmann's algorithm.
//!
//! Vertices are labeled by species (compared tag-insensitively) and the
//! compatibility matrix is refined with Ullmann's neighborhood condition
//! after every tentative assignment. Periodic boundaries need no special
//! handling here: bonds that cross the unit cell are ordinary graph edges,
//! so matches wrapping around a cell face are found transparently.
//!
//! Worst-case cost is exponential in the query size; pragmatic inputs are
//! small moieties against parents of thousands of atoms, where the species
//! and degree filters prune most of the matrix up front.

use std::collections::HashMap;

use crate::model::crystal::Crystal;

/// Enumerates every injective map `m` with `m[i]` the parent vertex matched
/// to query vertex `i`, preserving species and adjacency. In `exact` mode the
/// map must be a full graph isomorphism.
///
/// Enumeration order is deterministic: query vertices are assigned in
/// increasing index order and parent candidates tried in increasing column
/// order.
pub(crate) fn find_isomorphisms(
    query: &Crystal,
    parent: &Crystal,
    exact: bool,
) -> Vec<Vec<usize>> {
    let nq = query.atom_count();
    let np = parent.atom_count();

    if nq == 0 || nq > np || (exact && nq != np) {
        return Vec::new();
    }
    if exact && query.bonds.edge_count() != parent.bonds.edge_count() {
        return Vec::new();
    }
    if !species_multiset_covered(query, parent) {
        return Vec::new();
    }

    let mut state = UllmannState {
        query,
        parent,
        exact,
        assignment: Vec::with_capacity(nq),
        used: vec![false; np],
        matches: Vec::new(),
    };

    let mut m = state.initial_matrix();
    if state.refine(&mut m) {
        state.recurse(0, &m);
    }
    state.matches
}

/// True iff every species of the query occurs at least as often in the
/// parent (tag-insensitive).
fn species_multiset_covered(query: &Crystal, parent: &Crystal) -> bool {
    let mut counts: HashMap<&str, isize> = HashMap::new();
    for atom in &parent.atoms {
        *counts.entry(atom.species.symbol()).or_insert(0) += 1;
    }
    for atom in &query.atoms {
        let entry = counts.entry(atom.species.symbol()).or_insert(0);
        *entry -= 1;
        if *entry < 0 {
            return false;
        }
    }
    true
}

struct UllmannState<'a> {
    query: &'a Crystal,
    parent: &'a Crystal,
    exact: bool,
    assignment: Vec<usize>,
    used: Vec<bool>,
    matches: Vec<Vec<usize>>,
}

impl UllmannState<'_> {
    /// `m[i][p]` starts true iff species match and the degree condition
    /// holds (`<=` for subgraph search, `==` for exact isomorphism).
    fn initial_matrix(&self) -> Vec<Vec<bool>> {
        let nq = self.query.atom_count();
        let np = self.parent.atom_count();
        let mut m = vec![vec![false; np]; nq];

        for (i, row) in m.iter_mut().enumerate() {
            let qi = &self.query.atoms[i].species;
            let deg_q = self.query.bonds.degree(i);
            for (p, slot) in row.iter_mut().enumerate() {
                let deg_ok = if self.exact {
                    deg_q == self.parent.bonds.degree(p)
                } else {
                    deg_q <= self.parent.bonds.degree(p)
                };
                *slot = deg_ok && qi.matches_unmasked(&self.parent.atoms[p].species);
            }
        }
        m
    }

    /// Ullmann's neighborhood condition, iterated to a fixed point: a
    /// candidate `(i, p)` survives only while every query-neighbor of `i`
    /// still has a candidate among the parent-neighbors of `p`. Returns
    /// false when some row empties out.
    fn refine(&self, m: &mut [Vec<bool>]) -> bool {
        loop {
            let mut changed = false;
            for i in 0..m.len() {
                let mut row_alive = false;
                for p in 0..m[i].len() {
                    if !m[i][p] {
                        continue;
                    }
                    let supported = self.query.bonds.neighbors(i).iter().all(|&j| {
                        self.parent
                            .bonds
                            .neighbors(p)
                            .iter()
                            .any(|&q| m[j][q])
                    });
                    if supported {
                        row_alive = true;
                    } else {
                        m[i][p] = false;
                        changed = true;
                    }
                }
                if !row_alive {
                    return false;
                }
            }
            if !changed {
                return true;
            }
        }
    }

    fn recurse(&mut self, depth: usize, m: &[Vec<bool>]) {
        if depth == self.query.atom_count() {
            if self.is_valid_map() {
                self.matches.push(self.assignment.clone());
            }
            return;
        }

        let np = self.parent.atom_count();
        for p in 0..np {
            if !m[depth][p] || self.used[p] {
                continue;
            }

            let mut next = m.to_vec();
            for q in 0..np {
                next[depth][q] = q == p;
            }
            for (i, row) in next.iter_mut().enumerate() {
                if i != depth {
                    row[p] = false;
                }
            }
            if !self.refine(&mut next) {
                continue;
            }

            self.assignment.push(p);
            self.used[p] = true;
            self.recurse(depth + 1, &next);
            self.used[p] = false;
            self.assignment.pop();
        }
    }

    /// Verifies adjacency preservation on a complete assignment; in exact
    /// mode also the reverse direction (every parent edge is the image of a
    /// query edge).
    fn is_valid_map(&self) -> bool {
        for edge in self.query.bonds.edges() {
            if !self
                .parent
                .bonds
                .has_edge(self.assignment[edge.u], self.assignment[edge.v])
            {
                return false;
            }
        }

        if self.exact {
            let mut inverse = vec![usize::MAX; self.parent.atom_count()];
            for (i, &p) in self.assignment.iter().enumerate() {
                inverse[p] = i;
            }
            for edge in self.parent.bonds.edges() {
                if !self.query.bonds.has_edge(inverse[edge.u], inverse[edge.v]) {
                    return false;
                }
            }
        }
        true
    }
}
