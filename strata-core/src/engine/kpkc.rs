//! Delta k-partite k-clique enumeration
//!
//! Per rule, the engine keeps a k-partite graph whose partitions are the
//! rule's parameters and whose vertices are `(parameter, object)` pairs.
//! A k-clique is a candidate variable binding. Semi-naive evaluation needs
//! only the cliques that touch the latest delta: a vertex or an edge that
//! entered the graph this iteration.
//!
//! Storage is bitset-partitioned: every adjacency row is divided into one
//! bitset per partition, laid out back to back in a single `u64` buffer.
//! A cell `(vertex, partition)` is EXPLICIT when the rule's
//! variable-dependency graph co-constrains the two parameters (the cell
//! owns its bitset) and IMPLICIT otherwise (the cell aliases the
//! partition's activity mask, since an unconstrained pair admits every
//! active partner).

use crate::analysis::VariableDependencyGraph;
use crate::bitset::{blocks_for, BitsetSlice, DynamicBitset};

/// Bit offsets and row strides of a partitioned vertex space.
#[derive(Debug, Clone, Default)]
pub struct GraphLayout {
    /// Total vertices.
    pub nv: usize,
    /// Number of partitions.
    pub k: usize,
    /// Vertices per partition.
    pub partition_sizes: Vec<u32>,
    /// First global vertex index of each partition.
    pub vertex_offset: Vec<u32>,
    /// First word of each partition within a row.
    pub block_offset: Vec<u32>,
    /// Words per partition.
    pub num_blocks: Vec<u32>,
    /// Words per full row.
    pub row_blocks: usize,
    /// Partition of each global vertex.
    pub vertex_to_partition: Vec<u32>,
    /// Within-partition bit of each global vertex.
    pub vertex_to_bit: Vec<u32>,
}

impl GraphLayout {
    /// Lay out partitions of the given sizes, globally contiguous.
    pub fn new(partition_sizes: Vec<u32>) -> Self {
        let k = partition_sizes.len();
        let nv: usize = partition_sizes.iter().map(|&s| s as usize).sum();

        let mut vertex_offset = Vec::with_capacity(k);
        let mut block_offset = Vec::with_capacity(k);
        let mut num_blocks = Vec::with_capacity(k);
        let mut vertex_to_partition = Vec::with_capacity(nv);
        let mut vertex_to_bit = Vec::with_capacity(nv);

        let mut v = 0u32;
        let mut blocks = 0u32;
        for (p, &size) in partition_sizes.iter().enumerate() {
            vertex_offset.push(v);
            block_offset.push(blocks);
            num_blocks.push(blocks_for(size as usize) as u32);
            for bit in 0..size {
                vertex_to_partition.push(p as u32);
                vertex_to_bit.push(bit);
            }
            v += size;
            blocks += blocks_for(size as usize) as u32;
        }

        GraphLayout {
            nv,
            k,
            partition_sizes,
            vertex_offset,
            block_offset,
            num_blocks,
            row_blocks: blocks as usize,
            vertex_to_partition,
            vertex_to_bit,
        }
    }

    /// Global index of bit `bit` in partition `p`.
    #[inline]
    pub fn vertex(&self, p: u32, bit: u32) -> u32 {
        self.vertex_offset[p as usize] + bit
    }
}

/// One activity bitset per partition, packed into a single buffer.
#[derive(Debug, Clone, Default)]
pub struct VertexPartitions {
    data: Vec<u64>,
}

impl VertexPartitions {
    /// Allocate for `layout`, all bits zero.
    pub fn new(layout: &GraphLayout) -> Self {
        VertexPartitions {
            data: vec![0; layout.row_blocks],
        }
    }

    /// The bitset of partition `p`.
    #[inline]
    pub fn partition<'a>(&'a self, layout: &GraphLayout, p: u32) -> BitsetSlice<'a> {
        let off = layout.block_offset[p as usize] as usize;
        let nb = layout.num_blocks[p as usize] as usize;
        BitsetSlice::new(
            &self.data[off..off + nb],
            layout.partition_sizes[p as usize] as usize,
        )
    }

    /// The words of partition `p`.
    #[inline]
    pub fn partition_words<'a>(&'a self, layout: &GraphLayout, p: u32) -> &'a [u64] {
        let off = layout.block_offset[p as usize] as usize;
        let nb = layout.num_blocks[p as usize] as usize;
        &self.data[off..off + nb]
    }

    /// Set the bit of global vertex `v`.
    #[inline]
    pub fn set(&mut self, layout: &GraphLayout, v: u32) {
        let p = layout.vertex_to_partition[v as usize] as usize;
        let bit = layout.vertex_to_bit[v as usize] as usize;
        self.data[layout.block_offset[p] as usize + bit / 64] |= 1u64 << (bit % 64);
    }

    /// Test the bit of global vertex `v`.
    #[inline]
    pub fn test(&self, layout: &GraphLayout, v: u32) -> bool {
        let p = layout.vertex_to_partition[v as usize] as usize;
        let bit = layout.vertex_to_bit[v as usize] as usize;
        self.data[layout.block_offset[p] as usize + bit / 64] & (1u64 << (bit % 64)) != 0
    }

    /// Zero all bits.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// True if any bit is set.
    pub fn any(&self) -> bool {
        self.data.iter().any(|&w| w != 0)
    }
}

/// Cell mode of the partitioned adjacency matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    /// Aliases the partition activity mask.
    Implicit,
    /// Owns a bitset at `offset` words into the matrix buffer.
    Explicit {
        /// Word offset.
        offset: u32,
    },
}

/// Adjacency rows partitioned by parameter, with explicit storage only for
/// co-constrained parameter pairs.
#[derive(Debug, Clone)]
pub struct PartitionedAdjacencyMatrix {
    cells: Vec<Cell>,
    data: Vec<u64>,
    touched: DynamicBitset,
}

impl PartitionedAdjacencyMatrix {
    /// Allocate for `layout`; a cell `(v in p_i, p_j)` is explicit exactly
    /// when the dependency graph carries a label for `(p_i, p_j)`.
    pub fn new(layout: &GraphLayout, dependency: &VariableDependencyGraph) -> Self {
        let k = layout.k;
        let mut cells = vec![Cell::Implicit; layout.nv * k];
        let mut words = 0u32;

        for v in 0..layout.nv {
            let pi = layout.vertex_to_partition[v];
            for pj in 0..k as u32 {
                if pi != pj && !dependency.is_independent(pi, pj) {
                    cells[v * k + pj as usize] = Cell::Explicit { offset: words };
                    words += layout.num_blocks[pj as usize];
                }
            }
        }

        PartitionedAdjacencyMatrix {
            cells,
            data: vec![0; words as usize],
            touched: DynamicBitset::new(layout.nv * k),
        }
    }

    #[inline]
    fn cell(&self, layout: &GraphLayout, v: u32, p: u32) -> Cell {
        self.cells[v as usize * layout.k + p as usize]
    }

    /// True if the cell `(v, p)` owns storage.
    #[inline]
    pub fn is_explicit(&self, layout: &GraphLayout, v: u32, p: u32) -> bool {
        matches!(self.cell(layout, v, p), Cell::Explicit { .. })
    }

    /// Insert the undirected edge `(u, v)`; both cells must be explicit.
    pub fn set_edge(&mut self, layout: &GraphLayout, u: u32, v: u32) {
        let pu = layout.vertex_to_partition[u as usize];
        let pv = layout.vertex_to_partition[v as usize];
        debug_assert_ne!(pu, pv);
        self.set_half_edge(layout, u, pv, layout.vertex_to_bit[v as usize]);
        self.set_half_edge(layout, v, pu, layout.vertex_to_bit[u as usize]);
    }

    fn set_half_edge(&mut self, layout: &GraphLayout, from: u32, p: u32, bit: u32) {
        match self.cell(layout, from, p) {
            Cell::Explicit { offset } => {
                self.data[offset as usize + bit as usize / 64] |= 1u64 << (bit % 64);
                self.touched.set(from as usize * layout.k + p as usize);
            }
            Cell::Implicit => {
                debug_assert!(false, "edge into an implicit cell");
            }
        }
    }

    /// The adjacency words from `v` into partition `p`. Implicit cells
    /// alias `active`'s partition mask.
    #[inline]
    pub fn row<'a>(
        &'a self,
        layout: &GraphLayout,
        active: &'a VertexPartitions,
        v: u32,
        p: u32,
    ) -> &'a [u64] {
        match self.cell(layout, v, p) {
            Cell::Explicit { offset } => {
                let nb = layout.num_blocks[p as usize] as usize;
                &self.data[offset as usize..offset as usize + nb]
            }
            Cell::Implicit => active.partition_words(layout, p),
        }
    }

    /// Test the stored bit for `(u, v)`; implicit cells read false.
    #[inline]
    pub fn test_explicit(&self, layout: &GraphLayout, u: u32, v: u32) -> bool {
        let pv = layout.vertex_to_partition[v as usize];
        match self.cell(layout, u, pv) {
            Cell::Explicit { offset } => {
                let bit = layout.vertex_to_bit[v as usize];
                self.data[offset as usize + bit as usize / 64] & (1u64 << (bit % 64)) != 0
            }
            Cell::Implicit => false,
        }
    }

    /// Zero every touched explicit cell.
    pub fn clear_touched(&mut self, layout: &GraphLayout) {
        let touched: Vec<usize> = self.touched.iter_ones().collect();
        for t in touched {
            let v = (t / layout.k) as u32;
            let p = (t % layout.k) as u32;
            if let Cell::Explicit { offset } = self.cell(layout, v, p) {
                let nb = layout.num_blocks[p as usize] as usize;
                self.data[offset as usize..offset as usize + nb].fill(0);
            }
        }
        self.touched.clear();
    }
}

/// Reusable buffers for the clique walk.
#[derive(Debug, Clone, Default)]
pub struct CliqueWorkspace {
    /// Candidate bitsets: `[depth][partition]`.
    candidates: Vec<Vec<DynamicBitset>>,
    /// Chosen global vertex per depth.
    chosen: Vec<u32>,
}

impl CliqueWorkspace {
    /// Allocate for `layout`.
    pub fn new(layout: &GraphLayout) -> Self {
        let row = || {
            layout
                .partition_sizes
                .iter()
                .map(|&s| DynamicBitset::new(s as usize))
                .collect::<Vec<_>>()
        };
        CliqueWorkspace {
            candidates: (0..layout.k + 1).map(|_| row()).collect(),
            chosen: Vec::with_capacity(layout.k),
        }
    }
}

/// The dynamic graph of one rule: activity masks, the current adjacency,
/// and this iteration's delta.
#[derive(Debug, Clone)]
pub struct DeltaGraph {
    /// Active vertices of the full graph.
    pub affected: VertexPartitions,
    /// Vertices that became active this iteration.
    pub delta_vertices: VertexPartitions,
    /// Delta vertices plus the endpoints of delta edges; the enumerator's
    /// pruning mask.
    pub delta_candidates: VertexPartitions,
    /// Current adjacency.
    pub matrix: PartitionedAdjacencyMatrix,
    /// Edges inserted this iteration.
    pub delta_matrix: PartitionedAdjacencyMatrix,
}

impl DeltaGraph {
    /// Allocate an empty dynamic graph.
    pub fn new(layout: &GraphLayout, dependency: &VariableDependencyGraph) -> Self {
        DeltaGraph {
            affected: VertexPartitions::new(layout),
            delta_vertices: VertexPartitions::new(layout),
            delta_candidates: VertexPartitions::new(layout),
            matrix: PartitionedAdjacencyMatrix::new(layout, dependency),
            delta_matrix: PartitionedAdjacencyMatrix::new(layout, dependency),
        }
    }

    /// Drop all activity and adjacency.
    pub fn reset(&mut self, layout: &GraphLayout) {
        self.affected.clear();
        self.delta_vertices.clear();
        self.delta_candidates.clear();
        self.matrix.clear_touched(layout);
        self.delta_matrix.clear_touched(layout);
        // clear_touched only wipes touched cells; the touched set itself is
        // rebuilt from scratch, so a full clear keeps both in sync.
        self.matrix.data.fill(0);
        self.delta_matrix.data.fill(0);
    }

    /// Start a new iteration: yesterday's delta dissolves into the full
    /// graph.
    pub fn begin_iteration(&mut self, layout: &GraphLayout) {
        self.delta_vertices.clear();
        self.delta_candidates.clear();
        self.delta_matrix.clear_touched(layout);
    }

    /// Activate vertex `v`, marking it delta.
    pub fn activate_vertex(&mut self, layout: &GraphLayout, v: u32) {
        debug_assert!(!self.affected.test(layout, v));
        self.affected.set(layout, v);
        self.delta_vertices.set(layout, v);
        self.delta_candidates.set(layout, v);
    }

    /// Activate the edge `(u, v)`, marking both endpoints delta
    /// candidates.
    pub fn activate_edge(&mut self, layout: &GraphLayout, u: u32, v: u32) {
        self.matrix.set_edge(layout, u, v);
        self.delta_matrix.set_edge(layout, u, v);
        self.delta_candidates.set(layout, u);
        self.delta_candidates.set(layout, v);
    }
}

/// Emit every k-clique of the current graph that touches at least one
/// delta vertex or delta edge, exactly once. Partitions are visited in
/// index order and vertices in bit-scan order; cliques land flat in `out`,
/// `k` vertices per clique.
pub fn enumerate_new_cliques(
    layout: &GraphLayout,
    graph: &DeltaGraph,
    workspace: &mut CliqueWorkspace,
    out: &mut Vec<u32>,
) {
    if layout.k == 0 {
        return;
    }

    // Depth 0: every partition's candidate set is its activity mask.
    for p in 0..layout.k as u32 {
        workspace.candidates[0][p as usize].assign(graph.affected.partition_words(layout, p));
    }
    workspace.chosen.clear();

    descend(layout, graph, &mut workspace.candidates, &mut workspace.chosen, 0, false, out);
}

#[allow(clippy::too_many_arguments)]
fn descend(
    layout: &GraphLayout,
    graph: &DeltaGraph,
    candidates: &mut [Vec<DynamicBitset>],
    chosen: &mut Vec<u32>,
    depth: usize,
    has_delta: bool,
    out: &mut Vec<u32>,
) {
    let k = layout.k;
    if depth == k {
        if has_delta {
            out.extend_from_slice(chosen);
        }
        return;
    }

    let (current, rest) = candidates.split_at_mut(1);
    let current = &current[0];
    let p = depth as u32;

    for bit in current[depth].iter_ones() {
        let v = layout.vertex(p, bit as u32);

        // The path is delta-touched once it picks a delta vertex or
        // crosses a delta edge to an earlier pick.
        let mut delta = has_delta || graph.delta_vertices.test(layout, v);
        if !delta {
            delta = chosen
                .iter()
                .any(|&u| graph.delta_matrix.test_explicit(layout, u, v));
        }

        // Narrow the remaining partitions by v's adjacency. Implicit
        // cells alias the activity mask, so intersecting is a no-op there.
        let next = &mut rest[0];
        let mut dead = false;
        for q in depth + 1..k {
            if graph.matrix.is_explicit(layout, v, q as u32) {
                let row = graph.matrix.row(layout, &graph.affected, v, q as u32);
                next[q].assign_and(current[q].words(), row);
            } else {
                next[q].assign(current[q].words());
            }
            if next[q].none() {
                dead = true;
                break;
            }
        }
        if dead {
            continue;
        }

        // A delta-free path must still be able to reach a delta vertex or
        // a delta-edge endpoint in some remaining partition.
        if !delta
            && !(depth + 1..k).any(|q| {
                next[q].intersects(graph.delta_candidates.partition_words(layout, q as u32))
            })
        {
            continue;
        }

        chosen.push(v);
        descend(layout, graph, rest, chosen, depth + 1, delta, out);
        chosen.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fully explicit 3-partite graph over partitions of the given
    /// sizes, with the given vertices and edges active from the start.
    fn graph(
        sizes: &[u32],
        vertices: &[u32],
        edges: &[(u32, u32)],
    ) -> (GraphLayout, DeltaGraph) {
        let layout = GraphLayout::new(sizes.to_vec());
        let dependency = VariableDependencyGraph::complete(sizes.len());
        let mut graph = DeltaGraph::new(&layout, &dependency);
        for &v in vertices {
            graph.activate_vertex(&layout, v);
        }
        for &(u, v) in edges {
            graph.activate_edge(&layout, u, v);
        }
        (layout, graph)
    }

    fn cliques(layout: &GraphLayout, graph: &DeltaGraph) -> Vec<Vec<u32>> {
        let mut ws = CliqueWorkspace::new(layout);
        let mut out = Vec::new();
        enumerate_new_cliques(layout, graph, &mut ws, &mut out);
        out.chunks_exact(layout.k).map(|c| c.to_vec()).collect()
    }

    #[test]
    fn test_layout_offsets() {
        let layout = GraphLayout::new(vec![3, 70, 2]);
        assert_eq!(layout.nv, 75);
        assert_eq!(layout.vertex_offset, vec![0, 3, 73]);
        assert_eq!(layout.num_blocks, vec![1, 2, 1]);
        assert_eq!(layout.block_offset, vec![0, 1, 3]);
        assert_eq!(layout.row_blocks, 4);
        assert_eq!(layout.vertex_to_partition[72], 1);
        assert_eq!(layout.vertex_to_bit[72], 69);
    }

    #[test]
    fn test_triangle_enumeration() {
        // Partitions {0,1}, {2,3}, {4,5}; a single triangle 0-2-4.
        let (layout, graph) = graph(
            &[2, 2, 2],
            &[0, 1, 2, 3, 4, 5],
            &[(0, 2), (0, 4), (2, 4), (1, 3)],
        );
        assert_eq!(cliques(&layout, &graph), vec![vec![0, 2, 4]]);
    }

    #[test]
    fn test_second_iteration_emits_only_new() {
        // Start with the complete tripartite graph over {0},{2},{4}.
        let (layout, mut graph) = graph(
            &[2, 2, 2],
            &[0, 2, 4],
            &[(0, 2), (0, 4), (2, 4)],
        );
        assert_eq!(cliques(&layout, &graph), vec![vec![0, 2, 4]]);

        // Next iteration: vertex 3 joins with edges to 0 and 4. Only the
        // clique through the new vertex is emitted; {0,2,4} stays silent.
        graph.begin_iteration(&layout);
        graph.activate_vertex(&layout, 3);
        graph.activate_edge(&layout, 0, 3);
        graph.activate_edge(&layout, 3, 4);
        assert_eq!(cliques(&layout, &graph), vec![vec![0, 3, 4]]);
    }

    #[test]
    fn test_new_edge_between_old_vertices() {
        // All vertices active but the 1-3 edge is missing.
        let (layout, mut graph) = graph(
            &[2, 2],
            &[0, 1, 2, 3],
            &[(0, 2), (0, 3), (1, 2)],
        );
        let first: Vec<_> = cliques(&layout, &graph);
        assert_eq!(first, vec![vec![0, 2], vec![0, 3], vec![1, 2]]);

        // The edge (1, 3) arrives: exactly one new clique.
        graph.begin_iteration(&layout);
        graph.activate_edge(&layout, 1, 3);
        assert_eq!(cliques(&layout, &graph), vec![vec![1, 3]]);
    }

    #[test]
    fn test_quiet_iteration_emits_nothing() {
        let (layout, mut graph) = graph(&[1, 1], &[0, 1], &[(0, 1)]);
        assert_eq!(cliques(&layout, &graph), vec![vec![0, 1]]);
        graph.begin_iteration(&layout);
        assert!(cliques(&layout, &graph).is_empty());
    }

    #[test]
    fn test_implicit_cells_admit_all_active_partners() {
        // Independent parameter pair: no explicit storage, every active
        // pair is a clique.
        let layout = GraphLayout::new(vec![2, 2]);
        let dependency = VariableDependencyGraph::empty(2);
        let mut graph = DeltaGraph::new(&layout, &dependency);
        graph.activate_vertex(&layout, 0);
        graph.activate_vertex(&layout, 2);
        graph.activate_vertex(&layout, 3);
        assert!(!graph.matrix.is_explicit(&layout, 0, 1));
        assert_eq!(
            cliques(&layout, &graph),
            vec![vec![0, 2], vec![0, 3]]
        );
    }

    #[test]
    fn test_eight_initial_cliques_three_new() {
        // 3-ary rule; partitions sized 1/3/4. Two vertices of the middle
        // partition start active with full adjacency: 1 * 2 * 4 = 8
        // cliques. One more middle vertex arrives, adjacent to only three
        // vertices of the last partition: exactly 3 new cliques, no
        // duplicates against the 8 already reported.
        let mut initial_edges = vec![(0u32, 1u32), (0, 2)];
        for p1 in [1u32, 2] {
            for p2 in 4u32..8 {
                initial_edges.push((p1, p2));
            }
        }
        for p2 in 4u32..8 {
            initial_edges.push((0, p2));
        }
        let (layout, mut graph) = graph(
            &[1, 3, 4],
            &[0, 1, 2, 4, 5, 6, 7],
            &initial_edges,
        );
        assert_eq!(cliques(&layout, &graph).len(), 8);

        graph.begin_iteration(&layout);
        graph.activate_vertex(&layout, 3);
        graph.activate_edge(&layout, 0, 3);
        for p2 in [4u32, 5, 6] {
            graph.activate_edge(&layout, 3, p2);
        }
        let novel = cliques(&layout, &graph);
        assert_eq!(
            novel,
            vec![vec![0, 3, 4], vec![0, 3, 5], vec![0, 3, 6]]
        );
    }

    #[test]
    fn test_delta_exact_count_after_single_insertion() {
        // 3-ary rule, partitions sized 2/2/1: the static graph admits 2
        // cliques initially; activating one more vertex with full
        // adjacency admits 2 more, and only those 2 are emitted.
        let (layout, mut graph) = graph(
            &[2, 2, 1],
            &[0, 1, 2, 4],
            &[(0, 2), (0, 4), (2, 4), (1, 2), (1, 4)],
        );
        let initial = cliques(&layout, &graph);
        assert_eq!(initial.len(), 2);

        graph.begin_iteration(&layout);
        graph.activate_vertex(&layout, 3);
        graph.activate_edge(&layout, 0, 3);
        graph.activate_edge(&layout, 1, 3);
        graph.activate_edge(&layout, 3, 4);
        let novel = cliques(&layout, &graph);
        assert_eq!(novel, vec![vec![0, 3, 4], vec![1, 3, 4]]);
    }
}
