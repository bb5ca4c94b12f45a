use crate::network::ResidualNetwork;
use log::debug;
use num_traits::NumAssign;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::ops::Neg;

/// Routes as much excess as possible from the source nodes to the sink nodes along shortest
/// (fewest-arc) augmenting paths, ignoring costs.
#[derive(Default)]
pub struct EdmondsKarp {
    predecessors: Vec<Option<usize>>,
    visited: Vec<bool>,
}

impl EdmondsKarp {
    /// Returns the total amount of flow routed.
    pub fn solve<Flow>(&mut self, graph: &mut ResidualNetwork<Flow>) -> Flow
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
    {
        let num_ids = graph.num_nodes_allocated() + 1;
        let mut total = Flow::zero();

        loop {
            self.predecessors.clear();
            self.predecessors.resize(num_ids, None);
            self.visited.clear();
            self.visited.resize(num_ids, false);

            // bfs from every source at once
            let mut queue: VecDeque<usize> = graph.sources().iter().copied().collect();
            queue.iter().for_each(|&s| self.visited[s] = true);
            let mut sink = None;
            while let Some(u) = queue.pop_front() {
                if graph.excess(u) < Flow::zero() {
                    sink = Some(u);
                    break;
                }

                for arc in graph.residual_arcs(u) {
                    if self.visited[arc.dst] || arc.residual_capacity <= Flow::zero() {
                        continue;
                    }
                    self.visited[arc.dst] = true;
                    self.predecessors[arc.dst] = Some(u);
                    queue.push_back(arc.dst);
                }
            }

            let Some(sink) = sink else {
                break;
            };

            // calculate delta
            let mut delta = -graph.excess(sink);
            let mut path = Vec::new();
            let mut v = sink;
            while let Some(u) = self.predecessors[v] {
                delta = delta.min(graph.residual_capacity(u, v));
                path.push((u, v));
                v = u;
            }
            delta = delta.min(graph.excess(v));
            debug_assert!(delta > Flow::zero());

            // update flow
            for (u, v) in path {
                graph.push_flow(u, v, delta).expect("path arcs are residual arcs");
            }
            total += delta;
        }

        debug!("edmonds-karp routed {:?}, {} sources left", total, graph.sources().len());
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::{check_capacity_bounds, check_flow_conservation, parse_graph};
    use rstest::*;

    #[rstest]
    #[case::single_path("p min 2 1\nn 1 3\nn 2 -3\na 1 2 0 5 1\n", 3, 0)]
    #[case::bottleneck("p min 3 2\nn 1 4\nn 3 -4\na 1 2 0 5 1\na 2 3 0 1 1\n", 1, 1)]
    #[case::two_sources("p min 4 3\nn 1 2\nn 2 2\nn 4 -4\na 1 3 0 2 1\na 2 3 0 2 1\na 3 4 0 3 1\n", 3, 1)]
    #[case::uses_reverse_arcs("p min 4 5\nn 1 2\nn 4 -2\na 1 2 0 1 0\na 1 3 0 1 0\na 2 3 0 1 0\na 2 4 0 1 0\na 3 4 0 1 0\n", 2, 0)]
    fn routes_excess(#[case] input: &str, #[case] expected: i64, #[case] sources_left: usize) {
        let mut graph: ResidualNetwork<i64> = parse_graph(input);
        let routed = EdmondsKarp::default().solve(&mut graph);

        assert_eq!(routed, expected);
        assert_eq!(graph.sources().len(), sources_left);
        check_flow_conservation(&graph);
        check_capacity_bounds(&graph);
    }
}
