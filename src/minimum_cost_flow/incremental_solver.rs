use crate::minimum_cost_flow::status::Status;
use crate::network::ResidualNetwork;
use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

/// A min-cost flow solver that can be resumed after the network was edited.
///
/// `run` solves from scratch. `reoptimize` assumes the current pseudoflow satisfies reduced-cost
/// optimality with respect to [`IncrementalSolver::potentials`] (which is what
/// [`DynamicMaintainOptimality`](crate::minimum_cost_flow::dynamic_maintain_optimality::DynamicMaintainOptimality)
/// preserves) and only restores feasibility.
pub trait IncrementalSolver<Flow> {
    fn run(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status;

    fn reoptimize(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status;

    /// Node potentials indexed by node id; index 0 is unused.
    fn potentials(&self) -> &[Flow];

    fn potentials_mut(&mut self) -> &mut Vec<Flow>;
}

pub(crate) fn is_balanced<Flow>(graph: &ResidualNetwork<Flow>) -> bool
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    graph.node_ids().fold(Flow::zero(), |sum, id| sum + graph.excess(id)) == Flow::zero()
}

/// Grows `potentials` to cover every allocated node id. New entries are zero.
pub(crate) fn fit_potentials<Flow>(potentials: &mut Vec<Flow>, graph: &ResidualNetwork<Flow>)
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    if potentials.len() < graph.num_nodes_allocated() + 1 {
        potentials.resize(graph.num_nodes_allocated() + 1, Flow::zero());
    }
}

/// Saturates every arc with negative reduced cost and empties every arc with positive reduced
/// cost, so the resulting pseudoflow satisfies reduced-cost optimality.
pub(crate) fn bring_arcs_in_kilter<Flow>(graph: &mut ResidualNetwork<Flow>, potentials: &[Flow])
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    let mut pushes = Vec::new();
    for arc in graph.arcs() {
        let reduced_cost = arc.reduced_cost(arc.src(), potentials);
        if reduced_cost < Flow::zero() && arc.capacity() > Flow::zero() {
            pushes.push((arc.src(), arc.dst(), arc.capacity()));
        } else if reduced_cost > Flow::zero() && arc.flow() > Flow::zero() {
            pushes.push((arc.dst(), arc.src(), arc.flow()));
        }
    }

    for (src, dst, amount) in pushes {
        graph.push_flow(src, dst, amount).expect("arc taken from the network");
    }
}
