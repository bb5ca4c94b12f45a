use crate::network::ResidualNetwork;
use log::trace;
use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

/// Bellman-Ford over the residual network from a virtual root joined to every node by a zero-cost
/// arc. Arcs without residual capacity are ignored.
#[derive(Default)]
pub struct BellmanFord<Flow> {
    distances: Vec<Flow>,
    predecessors: Vec<Option<usize>>,
}

impl<Flow> BellmanFord<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    /// Returns true when the distances converged, false when a negative cycle exists.
    pub fn run(&mut self, graph: &ResidualNetwork<Flow>) -> bool {
        let num_ids = graph.num_nodes_allocated() + 1;
        self.distances.clear();
        self.distances.resize(num_ids, Flow::zero());
        self.predecessors.clear();
        self.predecessors.resize(num_ids, None);

        for _ in 0..graph.num_nodes() {
            let mut updated = false;
            for u in graph.node_ids() {
                for arc in graph.residual_arcs(u) {
                    if arc.residual_capacity <= Flow::zero() {
                        continue;
                    }
                    let new_distance = self.distances[u] + arc.cost;
                    if new_distance < self.distances[arc.dst] {
                        self.distances[arc.dst] = new_distance;
                        self.predecessors[arc.dst] = Some(u);
                        updated = true;
                    }
                }
            }
            if !updated {
                return true;
            }
        }
        false
    }

    #[inline]
    pub fn distances(&self) -> &[Flow] {
        &self.distances
    }

    /// Node-disjoint negative cycles of the residual network, each listed in arc order
    /// (`cycle[i] -> cycle[i + 1]`, wrapping around). Empty when none exists.
    pub fn negative_cycles(&mut self, graph: &ResidualNetwork<Flow>) -> Vec<Vec<usize>> {
        if self.run(graph) {
            return Vec::new();
        }

        // every node has at most one predecessor, so cycles of the predecessor graph are disjoint
        let mut walk_id = vec![usize::MAX; self.predecessors.len()];
        let mut cycles = Vec::new();
        for start in graph.node_ids() {
            if walk_id[start] != usize::MAX {
                continue;
            }

            let mut v = start;
            while walk_id[v] == usize::MAX {
                walk_id[v] = start;
                match self.predecessors[v] {
                    Some(u) => v = u,
                    None => break,
                }
            }
            if walk_id[v] != start || self.predecessors[v].is_none() {
                continue;
            }

            // v lies on a cycle found during this walk
            let mut cycle = vec![v];
            let mut u = self.predecessors[v];
            while let Some(w) = u.filter(|&w| w != v) {
                cycle.push(w);
                u = self.predecessors[w];
            }
            cycle.reverse();
            if let Some(first) = (0..cycle.len()).min_by_key(|&i| cycle[i]) {
                cycle.rotate_left(first);
            }

            if self.cycle_cost(graph, &cycle) < Flow::zero() {
                trace!("negative cycle {:?}", cycle);
                cycles.push(cycle);
            }
        }
        cycles
    }

    fn cycle_cost(&self, graph: &ResidualNetwork<Flow>, cycle: &[usize]) -> Flow {
        let mut cost = Flow::zero();
        for (i, &u) in cycle.iter().enumerate() {
            let v = cycle[(i + 1) % cycle.len()];
            match graph.arc_between(u, v) {
                Some(arc) => cost += arc.directed_cost(u),
                None => return Flow::zero(),
            }
        }
        cost
    }

    /// Potentials satisfying reduced-cost optimality for the current flow (negated shortest
    /// distances from the virtual root), or `None` when the flow is not optimal.
    pub fn optimal_potentials(graph: &ResidualNetwork<Flow>) -> Option<Vec<Flow>>
    where
        Flow: Default,
    {
        let mut bellman_ford = BellmanFord::default();
        if !bellman_ford.run(graph) {
            return None;
        }
        Some(bellman_ford.distances.iter().map(|&distance| -distance).collect())
    }
}
