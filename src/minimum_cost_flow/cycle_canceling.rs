use crate::maximum_flow::edmonds_karp::EdmondsKarp;
use crate::minimum_cost_flow::bellman_ford::BellmanFord;
use crate::minimum_cost_flow::incremental_solver::{is_balanced, IncrementalSolver};
use crate::minimum_cost_flow::status::Status;
use crate::network::ResidualNetwork;
use log::{debug, info};
use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

/// Finds a feasible flow with Edmonds-Karp, then cancels negative cycles found by Bellman-Ford
/// until none is left. Slow, but simple enough to serve as a reference for the other solvers.
#[derive(Default)]
pub struct CycleCanceling<Flow> {
    potentials: Vec<Flow>,
    edmonds_karp: EdmondsKarp,
    bellman_ford: BellmanFord<Flow>,
}

impl<Flow> CycleCanceling<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default,
{
    pub fn solve(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        if !is_balanced(graph) {
            return Status::Unbalanced;
        }

        self.edmonds_karp.solve(graph);
        if !graph.sources().is_empty() {
            debug!("no feasible flow: {} sources left after max flow", graph.sources().len());
            return Status::Infeasible;
        }

        let mut num_canceled = 0;
        loop {
            let cycles = self.bellman_ford.negative_cycles(graph);
            if cycles.is_empty() {
                break;
            }
            for cycle in cycles.iter() {
                self.cancel(graph, cycle);
            }
            num_canceled += cycles.len();
        }
        info!("cycle canceling: optimal after canceling {} cycles", num_canceled);

        match BellmanFord::optimal_potentials(graph) {
            Some(potentials) => {
                self.potentials = potentials;
                Status::Optimal
            }
            None => Status::NotSolved,
        }
    }

    fn cancel(&mut self, graph: &mut ResidualNetwork<Flow>, cycle: &[usize]) {
        let arcs: Vec<(usize, usize)> = (0..cycle.len()).map(|i| (cycle[i], cycle[(i + 1) % cycle.len()])).collect();
        let delta = arcs.iter().map(|&(u, v)| graph.residual_capacity(u, v)).min().unwrap_or(Flow::zero());
        debug_assert!(delta > Flow::zero());

        for (u, v) in arcs {
            graph.push_flow(u, v, delta).expect("cycle arcs are residual arcs");
        }
        debug!("canceled {:?} around {:?}", delta, cycle);
    }
}

impl<Flow> IncrementalSolver<Flow> for CycleCanceling<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default,
{
    fn run(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        self.solve(graph)
    }

    // any flow is a valid starting point, so there is nothing to reuse
    fn reoptimize(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        self.solve(graph)
    }

    fn potentials(&self) -> &[Flow] {
        &self.potentials
    }

    fn potentials_mut(&mut self) -> &mut Vec<Flow> {
        &mut self.potentials
    }
}
