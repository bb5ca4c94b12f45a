use crate::maximum_flow::edmonds_karp::EdmondsKarp;
use crate::minimum_cost_flow::incremental_solver::{bring_arcs_in_kilter, fit_potentials, is_balanced, IncrementalSolver};
use crate::minimum_cost_flow::status::Status;
use crate::network::ResidualNetwork;
use log::{debug, info, trace};
use num_traits::NumAssign;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::ops::Neg;

enum Step {
    Augmented,
    Adjusted,
    Infeasible,
}

/// Dual ascent: grows a tree of zero-reduced-cost arcs from a source until it reaches a deficit
/// node, raising the tree's potentials whenever its excess cannot leave through the cut.
///
/// Tree invariants: every tree node has a non-negative balance, tree arcs have zero reduced cost,
/// `tree_excess` is the sum of tree balances and `tree_residual_cut` the residual capacity of the
/// zero-reduced-cost arcs in `cut`.
#[derive(Default)]
pub struct Relax<Flow> {
    potentials: Vec<Flow>,
    in_tree: Vec<bool>,
    tree: Vec<usize>,
    predecessors: Vec<Option<usize>>,
    cut: BTreeSet<(usize, usize)>,
    tree_excess: Flow,
    tree_residual_cut: Flow,
}

impl<Flow> Relax<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default,
{
    fn resize(&mut self, num_ids: usize) {
        self.in_tree.resize(num_ids, false);
        self.predecessors.resize(num_ids, None);
    }

    fn reset_tree(&mut self) {
        for &u in self.tree.iter() {
            self.in_tree[u] = false;
        }
        self.tree.clear();
        self.predecessors.fill(None);
        self.cut.clear();
        self.tree_excess = Flow::zero();
        self.tree_residual_cut = Flow::zero();
    }

    // updates the cut incrementally: arcs into v stop being cut arcs, arcs out of v may start
    fn add_to_tree(&mut self, graph: &ResidualNetwork<Flow>, v: usize) {
        debug_assert!(graph.excess(v) >= Flow::zero());
        self.in_tree[v] = true;
        self.tree.push(v);
        self.tree_excess += graph.excess(v);

        for arc in graph.residual_arcs(v) {
            if self.in_tree[arc.dst] {
                if self.cut.remove(&(arc.dst, v)) {
                    self.tree_residual_cut -= graph.residual_capacity(arc.dst, v);
                }
            } else if arc.residual_capacity > Flow::zero() && arc.reduced_cost(&self.potentials) == Flow::zero() {
                self.cut.insert((v, arc.dst));
                self.tree_residual_cut += arc.residual_capacity;
            }
        }
    }

    fn grow(&mut self, graph: &mut ResidualNetwork<Flow>, source: usize) -> Step {
        self.reset_tree();
        self.add_to_tree(graph, source);

        loop {
            if self.tree_excess > self.tree_residual_cut {
                return if self.adjust_potential(graph) { Step::Adjusted } else { Step::Infeasible };
            }

            // the tree has positive excess, so the cut is not empty here
            let Some(&(u, v)) = self.cut.first() else {
                return Step::Infeasible;
            };
            self.predecessors[v] = Some(u);
            trace!("follow {}->{}", u, v);

            if graph.excess(v) < Flow::zero() {
                self.augment(graph, source, v);
                return Step::Augmented;
            }
            self.add_to_tree(graph, v);
        }
    }

    /// Saturates the zero-reduced-cost cut arcs, then raises the tree's potentials by the smallest
    /// positive reduced cost on the cut. Returns false when no residual arc leaves the tree.
    fn adjust_potential(&mut self, graph: &mut ResidualNetwork<Flow>) -> bool {
        let saturations: Vec<(usize, usize, Flow)> = self.cut.iter().map(|&(u, v)| (u, v, graph.residual_capacity(u, v))).collect();
        for (u, v, amount) in saturations {
            graph.push_flow(u, v, amount).expect("cut arcs are residual arcs");
        }

        let mut delta = None;
        for &u in self.tree.iter() {
            for arc in graph.residual_arcs(u) {
                if self.in_tree[arc.dst] || arc.residual_capacity <= Flow::zero() {
                    continue;
                }
                let reduced_cost = arc.reduced_cost(&self.potentials);
                debug_assert!(reduced_cost > Flow::zero());
                delta = Some(delta.map_or(reduced_cost, |d: Flow| d.min(reduced_cost)));
            }
        }

        let Some(delta) = delta else {
            debug!("tree of {} nodes has excess {:?} and no residual arc leaving it", self.tree.len(), self.tree_excess);
            return false;
        };
        for &u in self.tree.iter() {
            self.potentials[u] += delta;
        }
        trace!("raised potentials of {} tree nodes by {:?}", self.tree.len(), delta);
        true
    }

    // routes the remaining balances on a copy, ignoring costs
    fn is_feasible(graph: &ResidualNetwork<Flow>) -> bool {
        let mut copy = graph.clone();
        EdmondsKarp::default().solve(&mut copy);
        copy.sources().is_empty()
    }

    fn augment(&mut self, graph: &mut ResidualNetwork<Flow>, source: usize, sink: usize) {
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
            graph.push_flow(u, v, delta).expect("tree arcs are residual arcs");
        }
        debug!("augmented {:?} from {} to {}", delta, source, sink);
    }
}

impl<Flow> IncrementalSolver<Flow> for Relax<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default,
{
    fn run(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        if !is_balanced(graph) {
            return Status::Unbalanced;
        }
        self.potentials.clear();
        fit_potentials(&mut self.potentials, graph);
        bring_arcs_in_kilter(graph, &self.potentials);
        self.reoptimize(graph)
    }

    fn reoptimize(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        if !is_balanced(graph) {
            return Status::Unbalanced;
        }
        fit_potentials(&mut self.potentials, graph);
        self.resize(graph.num_nodes_allocated() + 1);

        // On an infeasible network the potentials can rise forever without a tree ever running
        // out of residual arcs, so feasibility is checked once the adjustments outnumber the nodes.
        let (mut num_augmentations, mut num_adjustments) = (0, 0);
        let mut feasibility_checked = false;
        while let Some(&source) = graph.sources().first() {
            match self.grow(graph, source) {
                Step::Augmented => num_augmentations += 1,
                Step::Adjusted => {
                    num_adjustments += 1;
                    if !feasibility_checked && num_adjustments >= graph.num_nodes() {
                        if !Self::is_feasible(graph) {
                            debug!("relax: remaining balances cannot be routed after {} potential adjustments", num_adjustments);
                            return Status::Infeasible;
                        }
                        feasibility_checked = true;
                    }
                }
                Step::Infeasible => return Status::Infeasible,
            }
        }
        info!("relax: optimal after {} augmentations and {} potential adjustments", num_augmentations, num_adjustments);

        Status::Optimal
    }

    fn potentials(&self) -> &[Flow] {
        &self.potentials
    }

    fn potentials_mut(&mut self) -> &mut Vec<Flow> {
        &mut self.potentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimum_cost_flow::dynamic_maintain_optimality::DynamicMaintainOptimality;
    use crate::network::{DynamicGraph, Graph};
    use crate::test_utilities::{check_capacity_bounds, check_flow_conservation, check_reduced_cost_optimality, parse_graph, read_expected, DEFICIT_WITHOUT_INFLOW};
    use rstest::*;
    use std::fs::read_to_string;
    use std::path::PathBuf;
    use std::time::Duration;

    #[rstest]
    fn single_arc_then_cheaper_arc() {
        let mut graph: ResidualNetwork<i64> = parse_graph("p min 2 1\nn 1 -3\nn 2 3\na 2 1 0 3 5\n");
        let mut solver = Relax::default();
        assert_eq!(solver.run(&mut graph), Status::Optimal);
        assert_eq!(graph.total_cost(), 15);

        {
            let mut dynamic = DynamicMaintainOptimality::new(&mut graph, solver.potentials_mut());
            dynamic.add_node_with_id(3).unwrap();
            dynamic.set_supply(3, 2).unwrap();
            dynamic.add_arc(3, 1, 2, 1).unwrap();
            dynamic.set_supply(1, -5).unwrap();
        }
        assert_eq!(solver.reoptimize(&mut graph), Status::Optimal);
        assert_eq!(graph.total_cost(), 17);
        check_reduced_cost_optimality(&graph, solver.potentials());
    }

    #[rstest]
    fn splits_excess_over_cut() {
        // the cheap route has room for 2 units, the rest must take the expensive one
        let mut graph: ResidualNetwork<i64> = parse_graph("p min 4 4\nn 1 5\nn 4 -5\na 1 2 0 2 1\na 2 4 0 2 1\na 1 3 0 5 3\na 3 4 0 5 3\n");
        let mut solver = Relax::default();
        assert_eq!(solver.run(&mut graph), Status::Optimal);

        assert_eq!(graph.total_cost(), 2 * 2 + 3 * 6);
        check_flow_conservation(&graph);
        check_capacity_bounds(&graph);
        check_reduced_cost_optimality(&graph, solver.potentials());
    }

    #[rstest]
    #[case::unbalanced("p min 2 1\nn 1 2\na 1 2 0 5 1\n", Status::Unbalanced)]
    #[case::no_capacity("p min 3 2\nn 1 4\nn 3 -4\na 1 2 0 4 1\na 2 3 0 3 1\n", Status::Infeasible)]
    #[case::deficit_without_inflow(DEFICIT_WITHOUT_INFLOW, Status::Infeasible)]
    #[timeout(Duration::from_secs(10))]
    fn reports_status(#[case] input: &str, #[case] expected: Status) {
        let mut graph: ResidualNetwork<i64> = parse_graph(input);
        assert_eq!(Relax::default().run(&mut graph), expected);
    }

    #[rstest]
    fn min_cost_flow(#[files("test_cases/min_cost_flow/*.in")] path: PathBuf) {
        let mut expected_file_path = path.clone();
        expected_file_path.set_extension("out");

        let mut graph: ResidualNetwork<i64> = parse_graph(&read_to_string(&path).unwrap());
        let mut solver = Relax::default();
        assert_eq!(solver.run(&mut graph), Status::Optimal);
        assert_eq!(graph.total_cost(), read_expected(&expected_file_path));
        check_flow_conservation(&graph);
        check_capacity_bounds(&graph);
        check_reduced_cost_optimality(&graph, solver.potentials());
    }
}
