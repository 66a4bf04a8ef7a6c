/// A bond between two atoms, stored with `u <= v`.
///
/// `distance` is the PBC-aware Euclidean length; `cross_boundary` is true iff
/// the nearest-image distance differs from the in-cell distance, i.e. the
/// bond wraps around a face of the unit cell.
#[derive(Debug, Clone, PartialEq)]
pub struct BondEdge {
    pub u: usize,
    pub v: usize,
    pub distance: f64,
    pub cross_boundary: bool,
}

impl BondEdge {
    fn new(a: usize, b: usize, distance: f64, cross_boundary: bool) -> Self {
        let (u, v) = if a <= b { (a, b) } else { (b, a) };
        Self {
            u,
            v,
            distance,
            cross_boundary,
        }
    }
}

/// Undirected simple graph over the atoms of a crystal.
///
/// Vertices are atom indices `0..n`; self-loops and duplicate edges are
/// ignored on insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondGraph {
    n: usize,
    edges: Vec<BondEdge>,
    adjacency: Vec<Vec<usize>>,
}

impl BondGraph {
    pub fn with_vertices(n: usize) -> Self {
        Self {
            n,
            edges: Vec::new(),
            adjacency: vec![Vec::new(); n],
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Adds an undirected edge with its geometric properties. Returns false
    /// (and leaves the graph unchanged) for self-loops and duplicates.
    pub fn add_edge(&mut self, a: usize, b: usize, distance: f64, cross_boundary: bool) -> bool {
        assert!(a < self.n && b < self.n, "bond endpoint out of range");
        if a == b || self.has_edge(a, b) {
            return false;
        }
        self.edges.push(BondEdge::new(a, b, distance, cross_boundary));
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        true
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].contains(&b)
    }

    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.adjacency[v]
    }

    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.adjacency[v].len()
    }

    #[inline]
    pub fn edges(&self) -> &[BondEdge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [BondEdge] {
        &mut self.edges
    }

    /// Induced subgraph on `vertices`, relabeled to `0..vertices.len()` in the
    /// given order. Edges with an endpoint outside the subset are dropped;
    /// edge properties are carried over.
    pub fn induced(&self, vertices: &[usize]) -> BondGraph {
        let mut relabel = vec![usize::MAX; self.n];
        for (new, &old) in vertices.iter().enumerate() {
            relabel[old] = new;
        }

        let mut sub = BondGraph::with_vertices(vertices.len());
        for edge in &self.edges {
            let (u, v) = (relabel[edge.u], relabel[edge.v]);
            if u != usize::MAX && v != usize::MAX {
                sub.add_edge(u, v, edge.distance, edge.cross_boundary);
            }
        }
        sub
    }

    /// Appends another graph's vertices and edges, offsetting its indices by
    /// the current vertex count.
    pub fn append(&mut self, other: &BondGraph) {
        let offset = self.n;
        self.n += other.n;
        self.adjacency
            .extend(other.adjacency.iter().map(|nbrs| {
                nbrs.iter().map(|&v| v + offset).collect::<Vec<_>>()
            }));
        self.edges.extend(other.edges.iter().map(|e| {
            BondEdge::new(e.u + offset, e.v + offset, e.distance, e.cross_boundary)
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(n: usize) -> BondGraph {
        let mut g = BondGraph::with_vertices(n);
        for i in 1..n {
            g.add_edge(i - 1, i, 1.0, false);
        }
        g
    }

    #[test]
    fn rejects_self_loops_and_duplicates() {
        let mut g = BondGraph::with_vertices(3);
        assert!(!g.add_edge(1, 1, 0.0, false));
        assert!(g.add_edge(0, 1, 1.0, false));
        assert!(!g.add_edge(1, 0, 1.0, false));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn neighbors_and_degree() {
        let g = path_graph(4);
        assert_eq!(g.neighbors(0), &[1]);
        assert_eq!(g.neighbors(1), &[0, 2]);
        assert_eq!(g.degree(1), 2);
        assert_eq!(g.degree(3), 1);
    }

    #[test]
    fn edges_are_normalized() {
        let mut g = BondGraph::with_vertices(3);
        g.add_edge(2, 0, 1.5, true);
        let edge = &g.edges()[0];
        assert_eq!((edge.u, edge.v), (0, 2));
        assert!(edge.cross_boundary);
    }

    #[test]
    fn induced_subgraph_relabels_in_order() {
        let g = path_graph(5);
        let sub = g.induced(&[3, 2, 4]);
        assert_eq!(sub.vertex_count(), 3);
        assert_eq!(sub.edge_count(), 2);
        assert!(sub.has_edge(0, 1)); // old 2-3
        assert!(sub.has_edge(0, 2)); // old 3-4
        assert!(!sub.has_edge(1, 2));
    }

    #[test]
    fn induced_subgraph_keeps_edge_properties() {
        let mut g = BondGraph::with_vertices(3);
        g.add_edge(0, 2, 2.5, true);
        let sub = g.induced(&[2, 0]);
        let edge = &sub.edges()[0];
        assert_eq!(edge.distance, 2.5);
        assert!(edge.cross_boundary);
    }

    #[test]
    fn append_offsets_indices() {
        let mut g = path_graph(2);
        g.append(&path_graph(3));
        assert_eq!(g.vertex_count(), 5);
        assert_eq!(g.edge_count(), 3);
        assert!(g.has_edge(2, 3));
        assert!(g.has_edge(3, 4));
        assert!(!g.has_edge(1, 2));
    }
}
