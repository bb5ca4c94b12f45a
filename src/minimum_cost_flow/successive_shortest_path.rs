use crate::minimum_cost_flow::binary_heap::IndexedBinaryHeap;
use crate::minimum_cost_flow::incremental_solver::{bring_arcs_in_kilter, fit_potentials, is_balanced, IncrementalSolver};
use crate::minimum_cost_flow::status::Status;
use crate::network::ResidualNetwork;
use log::{debug, info, trace};
use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

#[derive(Default)]
pub struct SuccessiveShortestPath<Flow> {
    potentials: Vec<Flow>,
    distances: Vec<Option<Flow>>,
    predecessors: Vec<Option<usize>>,
    permanent: Vec<bool>,
    // nodes whose distance was set during the last search
    labelled: Vec<usize>,
    // permanently labelled nodes of the last search
    scanned: Vec<usize>,
    heap: IndexedBinaryHeap<Flow>,
}

impl<Flow> SuccessiveShortestPath<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default,
{
    /// Saturates negative-cost arcs so that zero potentials are optimal for the starting pseudoflow.
    fn init(&mut self, graph: &mut ResidualNetwork<Flow>) {
        self.potentials.clear();
        fit_potentials(&mut self.potentials, graph);
        bring_arcs_in_kilter(graph, &self.potentials);
    }

    fn resize(&mut self, num_ids: usize) {
        self.distances.resize(num_ids, None);
        self.predecessors.resize(num_ids, None);
        self.permanent.resize(num_ids, false);
        self.heap.resize(num_ids);
    }

    fn reset(&mut self) {
        for &v in self.labelled.iter() {
            self.distances[v] = None;
            self.predecessors[v] = None;
            self.permanent[v] = false;
        }
        self.labelled.clear();
        self.scanned.clear();
        self.heap.clear();
    }

    /// Dijkstra over reduced costs from `source`. Stops as soon as a deficit node is permanently
    /// labelled and returns it.
    fn shortest_path(&mut self, graph: &ResidualNetwork<Flow>, source: usize) -> Option<usize> {
        self.reset();
        self.distances[source] = Some(Flow::zero());
        self.labelled.push(source);
        self.heap.push_or_decrease(source, Flow::zero());

        while let Some((distance, u)) = self.heap.pop() {
            self.permanent[u] = true;
            self.scanned.push(u);

            if graph.excess(u) < Flow::zero() {
                return Some(u);
            }

            for arc in graph.residual_arcs(u) {
                if arc.residual_capacity <= Flow::zero() || self.permanent[arc.dst] {
                    continue;
                }

                let reduced_cost = arc.reduced_cost(&self.potentials);
                debug_assert!(reduced_cost >= Flow::zero(), "negative reduced cost {:?} on {}->{}", reduced_cost, u, arc.dst);

                let new_distance = distance + reduced_cost;
                match self.distances[arc.dst] {
                    Some(old) if old <= new_distance => continue,
                    Some(_) => {}
                    None => self.labelled.push(arc.dst),
                }
                self.distances[arc.dst] = Some(new_distance);
                self.predecessors[arc.dst] = Some(u);
                self.heap.push_or_decrease(arc.dst, new_distance);
                trace!("label {} with {:?} via {}", arc.dst, new_distance, u);
            }
        }

        None
    }

    // only permanently labelled nodes move; reduced costs of scanned arcs stay non-negative
    fn update_potentials(&mut self, sink: usize) {
        let Some(sink_distance) = self.distances[sink] else {
            return;
        };
        for &v in self.scanned.iter() {
            if let Some(distance) = self.distances[v] {
                self.potentials[v] += sink_distance - distance;
            }
        }
    }

    fn augment(&mut self, graph: &mut ResidualNetwork<Flow>, source: usize, sink: usize) -> Flow {
        debug_assert!(graph.excess(source) > Flow::zero() && graph.excess(sink) < Flow::zero());

        let mut delta = graph.excess(source).min(-graph.excess(sink));
        let mut path = Vec::new();
        let mut v = sink;
        while let Some(u) = self.predecessors[v] {
            delta = delta.min(graph.residual_capacity(u, v));
            path.push((u, v));
            v = u;
        }
        debug_assert_eq!(v, source);
        debug_assert!(delta > Flow::zero());

        for (u, v) in path {
            graph.push_flow(u, v, delta).expect("path arcs are residual arcs");
        }
        delta
    }
}

impl<Flow> IncrementalSolver<Flow> for SuccessiveShortestPath<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default,
{
    fn run(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        if !is_balanced(graph) {
            return Status::Unbalanced;
        }
        self.init(graph);
        self.reoptimize(graph)
    }

    fn reoptimize(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        if !is_balanced(graph) {
            return Status::Unbalanced;
        }
        fit_potentials(&mut self.potentials, graph);
        self.resize(graph.num_nodes_allocated() + 1);

        info!("successive shortest path: {} sources, {} sinks", graph.sources().len(), graph.sinks().len());
        let mut num_augmentations = 0;
        while let Some(&source) = graph.sources().first() {
            let Some(sink) = self.shortest_path(graph, source) else {
                debug!("no deficit node reachable from source {}", source);
                return Status::Infeasible;
            };
            self.update_potentials(sink);
            let delta = self.augment(graph, source, sink);
            num_augmentations += 1;
            debug!("augmented {:?} from {} to {} after scanning {} nodes", delta, source, sink, self.scanned.len());
        }
        info!("successive shortest path: optimal after {} augmentations", num_augmentations);

        Status::Optimal
    }

    fn potentials(&self) -> &[Flow] {
        &self.potentials
    }

    fn potentials_mut(&mut self) -> &mut Vec<Flow> {
        &mut self.potentials
    }
}
