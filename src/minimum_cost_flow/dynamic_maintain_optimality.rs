use crate::error::FlowError;
use crate::network::{Arc, DynamicGraph, ResidualNetwork};
use log::trace;
use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

/// Applies edits to a solved network while keeping reduced-cost optimality with respect to the
/// solver's potentials. Feasibility is not restored; call
/// [`IncrementalSolver::reoptimize`](crate::minimum_cost_flow::incremental_solver::IncrementalSolver::reoptimize)
/// once the batch is applied.
pub struct DynamicMaintainOptimality<'a, Flow> {
    graph: &'a mut ResidualNetwork<Flow>,
    potentials: &'a mut Vec<Flow>,
}

impl<'a, Flow> DynamicMaintainOptimality<'a, Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    pub fn new(graph: &'a mut ResidualNetwork<Flow>, potentials: &'a mut Vec<Flow>) -> Self {
        if potentials.len() < graph.num_nodes_allocated() + 1 {
            potentials.resize(graph.num_nodes_allocated() + 1, Flow::zero());
        }
        DynamicMaintainOptimality { graph, potentials }
    }

    fn grow_potentials(&mut self, id: usize) {
        if id >= self.potentials.len() {
            self.potentials.resize(id + 1, Flow::zero());
        }
    }

    fn reduced_cost(&self, src: usize, dst: usize, cost: Flow) -> Flow {
        cost - self.potentials[src] + self.potentials[dst]
    }

    fn arc(&self, src: usize, dst: usize) -> Result<&Arc<Flow>, FlowError> {
        self.graph.get_arc(src, dst).ok_or(FlowError::MissingArc { src, dst })
    }
}

impl<'a, Flow> DynamicGraph<Flow> for DynamicMaintainOptimality<'a, Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    fn get_arc(&self, src: usize, dst: usize) -> Option<&Arc<Flow>> {
        self.graph.get_arc(src, dst)
    }

    fn contains_node(&self, id: usize) -> bool {
        self.graph.contains_node(id)
    }

    // a node without arcs cannot affect optimality
    fn add_node(&mut self) -> usize {
        let id = self.graph.add_node();
        self.grow_potentials(id);
        id
    }

    fn add_node_with_id(&mut self, id: usize) -> Result<(), FlowError> {
        self.graph.add_node_with_id(id)?;
        self.grow_potentials(id);
        Ok(())
    }

    fn remove_node(&mut self, id: usize) -> Result<(), FlowError> {
        if !self.graph.contains_node(id) {
            return Err(FlowError::InvalidNode(id));
        }
        let arcs: Vec<(usize, usize)> = self.graph.adjacencies(id).map(|(_, arc)| (arc.src(), arc.dst())).collect();
        for (src, dst) in arcs {
            self.remove_arc(src, dst)?;
        }

        self.graph.remove_node(id)?;
        self.potentials[id] = Flow::zero();
        Ok(())
    }

    // supplies only affect feasibility
    fn set_supply(&mut self, id: usize, supply: Flow) -> Result<(), FlowError> {
        self.graph.set_supply(id, supply)
    }

    // same as adding the arc with no capacity and then growing it
    fn add_arc(&mut self, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError> {
        self.graph.add_arc(src, dst, Flow::zero(), cost)?;
        self.change_arc_capacity(src, dst, capacity)?;
        Ok(())
    }

    fn change_arc_cost(&mut self, src: usize, dst: usize, cost: Flow) -> Result<(), FlowError> {
        let arc = self.arc(src, dst)?;
        let (flow, residual) = (arc.flow(), arc.capacity());
        let old_reduced_cost = self.reduced_cost(src, dst, arc.cost());
        let new_reduced_cost = self.reduced_cost(src, dst, cost);
        trace!("cost of {}->{}: reduced cost {:?} -> {:?}", src, dst, old_reduced_cost, new_reduced_cost);

        // only the sign of the reduced cost matters; any flow is fine at zero
        if new_reduced_cost > Flow::zero() && flow > Flow::zero() {
            self.graph.push_flow(src, dst, -flow)?;
        } else if new_reduced_cost < Flow::zero() && residual > Flow::zero() {
            self.graph.push_flow(src, dst, residual)?;
        }
        self.graph.change_arc_cost(src, dst, cost)
    }

    /// Always restores the capacity constraint, so it returns true.
    fn change_arc_capacity(&mut self, src: usize, dst: usize, capacity: Flow) -> Result<bool, FlowError> {
        let arc = self.arc(src, dst)?;
        let old_capacity = arc.initial_capacity();
        let reduced_cost = self.reduced_cost(src, dst, arc.cost());
        trace!("capacity of {}->{}: {:?} -> {:?}", src, dst, old_capacity, capacity);

        if capacity < old_capacity {
            // cannot break optimality, but the flow may no longer fit
            if !self.graph.change_arc_capacity(src, dst, capacity)? {
                let excess = self.arc(src, dst)?.capacity();
                self.graph.push_flow(src, dst, excess)?;
            }
        } else if capacity > old_capacity {
            // an arc saturated at negative reduced cost must stay saturated
            let fits = self.graph.change_arc_capacity(src, dst, capacity)?;
            debug_assert!(fits);
            if reduced_cost < Flow::zero() {
                self.graph.push_flow(src, dst, capacity - old_capacity)?;
            }
        }
        Ok(true)
    }

    // same as dropping the capacity to zero and then deleting the arc
    fn remove_arc(&mut self, src: usize, dst: usize) -> Result<(), FlowError> {
        self.change_arc_capacity(src, dst, Flow::zero())?;
        self.graph.remove_arc(src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimum_cost_flow::incremental_solver::IncrementalSolver;
    use crate::minimum_cost_flow::status::Status;
    use crate::minimum_cost_flow::successive_shortest_path::SuccessiveShortestPath;
    use crate::network::Graph;
    use crate::test_utilities::{check_capacity_bounds, check_flow_conservation, check_reduced_cost_optimality, parse_graph, SCHEDULING_NETWORK};
    use rstest::*;

    #[fixture]
    fn solved() -> (ResidualNetwork<i64>, SuccessiveShortestPath<i64>) {
        let mut graph = parse_graph(SCHEDULING_NETWORK);
        let mut solver = SuccessiveShortestPath::default();
        assert_eq!(solver.run(&mut graph), Status::Optimal);
        (graph, solver)
    }

    fn edit_and_check(solved: (ResidualNetwork<i64>, SuccessiveShortestPath<i64>), edit: impl FnOnce(&mut DynamicMaintainOptimality<i64>)) {
        let (mut graph, mut solver) = solved;
        {
            let mut dynamic = DynamicMaintainOptimality::new(&mut graph, solver.potentials_mut());
            edit(&mut dynamic);
        }
        check_reduced_cost_optimality(&graph, solver.potentials());
        check_capacity_bounds(&graph);
        check_flow_conservation(&graph);

        assert_eq!(solver.reoptimize(&mut graph), Status::Optimal);
        check_reduced_cost_optimality(&graph, solver.potentials());
        assert!(graph.sources().is_empty() && graph.sinks().is_empty());
    }

    #[rstest]
    fn cheaper_arc_gets_saturated(solved: (ResidualNetwork<i64>, SuccessiveShortestPath<i64>)) {
        edit_and_check(solved, |dynamic| {
            dynamic.change_arc_cost(2, 5, -50).unwrap();
            assert_eq!(dynamic.get_arc(2, 5).unwrap().flow(), 1);
        });
    }

    #[rstest]
    fn expensive_arc_is_drained(solved: (ResidualNetwork<i64>, SuccessiveShortestPath<i64>)) {
        edit_and_check(solved, |dynamic| {
            let used: Vec<(usize, usize)> = [(2, 4), (2, 5), (3, 4), (3, 5)].into_iter().filter(|&(u, v)| dynamic.get_arc(u, v).unwrap().flow() > 0).collect();
            let (u, v) = used[0];
            dynamic.change_arc_cost(u, v, 100).unwrap();
            assert_eq!(dynamic.get_arc(u, v).unwrap().flow(), 0);
        });
    }

    #[rstest]
    fn shrinking_capacity_clamps_flow(solved: (ResidualNetwork<i64>, SuccessiveShortestPath<i64>)) {
        edit_and_check(solved, |dynamic| {
            assert_eq!(dynamic.get_arc(4, 1).unwrap().flow(), 1);
            assert!(dynamic.change_arc_capacity(4, 1, 0).unwrap());
            assert_eq!(dynamic.get_arc(4, 1).unwrap().flow(), 0);
        });
    }

    #[rstest]
    fn removing_a_machine(solved: (ResidualNetwork<i64>, SuccessiveShortestPath<i64>)) {
        edit_and_check(solved, |dynamic| {
            dynamic.remove_node(4).unwrap();
            assert!(!dynamic.contains_node(4));
        });
    }

    #[rstest]
    fn adding_a_task(solved: (ResidualNetwork<i64>, SuccessiveShortestPath<i64>)) {
        edit_and_check(solved, |dynamic| {
            let task = dynamic.add_node();
            dynamic.set_supply(task, 1).unwrap();
            dynamic.add_arc(task, 6, 1, 10).unwrap();
            dynamic.add_arc(task, 5, 1, 1).unwrap();
            dynamic.set_supply(1, -3).unwrap();
        });
    }

    #[rstest]
    fn missing_arc_is_an_error(solved: (ResidualNetwork<i64>, SuccessiveShortestPath<i64>)) {
        let (mut graph, mut solver) = solved;
        let mut dynamic = DynamicMaintainOptimality::new(&mut graph, solver.potentials_mut());
        assert!(matches!(dynamic.change_arc_cost(5, 2, 1), Err(FlowError::MissingArc { src: 5, dst: 2 })));
        assert!(matches!(dynamic.remove_arc(1, 2), Err(FlowError::MissingArc { .. })));
        assert!(matches!(dynamic.remove_node(42), Err(FlowError::InvalidNode(42))));
    }

    #[test]
    fn negative_cost_arc_added_saturated() {
        let mut graph: ResidualNetwork<i64> = parse_graph("p min 2 0\n");
        let mut potentials = vec![0; 3];
        let mut dynamic = DynamicMaintainOptimality::new(&mut graph, &mut potentials);
        dynamic.add_arc(1, 2, 4, -1).unwrap();
        assert_eq!(dynamic.get_arc(1, 2).unwrap().flow(), 4);
        assert_eq!(graph.balance(2).unwrap(), 4);
        assert_eq!(graph.total_cost(), -4);
    }
}
