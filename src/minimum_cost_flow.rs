pub mod bellman_ford;
mod binary_heap;
pub mod cost_scaling_push_relabel;
pub mod cycle_canceling;
pub mod dynamic_maintain_optimality;
pub mod incremental_solver;
pub mod relax;
pub mod status;
pub mod successive_shortest_path;
pub mod task_assignment;

#[cfg(test)]
mod tests {
    use super::cost_scaling_push_relabel::CostScalingPushRelabel;
    use super::cycle_canceling::CycleCanceling;
    use super::dynamic_maintain_optimality::DynamicMaintainOptimality;
    use super::incremental_solver::IncrementalSolver;
    use super::relax::Relax;
    use super::status::Status;
    use super::successive_shortest_path::SuccessiveShortestPath;
    use crate::dimacs::IncrementalImporter;
    use crate::network::{FlowNetwork, Graph, ResidualNetwork};
    use crate::test_utilities::{check_capacity_bounds, check_flow_conservation, check_reduced_cost_optimality, parse_graph, read_graph, DEFICIT_WITHOUT_INFLOW};
    use rstest::*;
    use std::fs::read_to_string;
    use std::path::PathBuf;
    use std::time::Duration;

    fn solvers() -> Vec<(&'static str, Box<dyn IncrementalSolver<i64>>)> {
        let successive_shortest_path: Box<dyn IncrementalSolver<i64>> = Box::new(SuccessiveShortestPath::<i64>::default());
        let cost_scaling: Box<dyn IncrementalSolver<i64>> = Box::new(CostScalingPushRelabel::<i64>::default());
        let relax: Box<dyn IncrementalSolver<i64>> = Box::new(Relax::<i64>::default());
        let cycle_canceling: Box<dyn IncrementalSolver<i64>> = Box::new(CycleCanceling::<i64>::default());
        vec![
            ("successive shortest path", successive_shortest_path),
            ("cost scaling", cost_scaling),
            ("relax", relax),
            ("cycle canceling", cycle_canceling),
        ]
    }

    #[rstest]
    fn solvers_agree(#[files("test_cases/min_cost_flow/*.in")] path: PathBuf) {
        let graph: ResidualNetwork<i64> = read_graph(&path);

        let mut network = FlowNetwork::from(&graph);
        assert_eq!(CostScalingPushRelabel::default().solve(&mut network), Status::Optimal);
        let expected = network.total_cost();

        for (name, mut solver) in solvers() {
            let mut graph = graph.clone();
            assert_eq!(solver.run(&mut graph), Status::Optimal, "{}", name);
            assert_eq!(graph.total_cost(), expected, "{}", name);
        }
    }

    #[rstest]
    #[case::unbalanced("p min 2 1\nn 1 2\na 1 2 0 5 1\n", Status::Unbalanced)]
    #[case::bottleneck("p min 3 2\nn 1 4\nn 3 -4\na 1 2 0 4 1\na 2 3 0 3 1\n", Status::Infeasible)]
    #[case::unreachable_sink("p min 3 1\nn 1 2\nn 3 -2\na 1 2 0 2 1\n", Status::Infeasible)]
    #[case::deficit_without_inflow(DEFICIT_WITHOUT_INFLOW, Status::Infeasible)]
    #[timeout(Duration::from_secs(10))]
    fn reports_status(#[case] input: &str, #[case] expected: Status) {
        let graph: ResidualNetwork<i64> = parse_graph(input);
        for (name, mut solver) in solvers() {
            let mut graph = graph.clone();
            assert_eq!(solver.run(&mut graph), expected, "{}", name);
        }
    }

    #[rstest]
    fn incremental_matches_cold(#[files("test_cases/incremental/*.delta")] path: PathBuf) {
        let deltas = read_to_string(&path).unwrap();
        let mut graph_path = path.clone();
        graph_path.set_extension("in");
        let original: ResidualNetwork<i64> = read_graph(&graph_path);

        for (name, mut solver) in solvers() {
            let mut graph = original.clone();
            assert_eq!(solver.run(&mut graph), Status::Optimal, "{}", name);

            let mut cold = original.clone();
            let mut warm_batches = IncrementalImporter::new(deltas.as_bytes());
            let mut cold_batches = IncrementalImporter::new(deltas.as_bytes());
            for batch in 1.. {
                let more = {
                    let mut dynamic = DynamicMaintainOptimality::new(&mut graph, solver.potentials_mut());
                    warm_batches.read_batch(&mut dynamic).unwrap()
                };
                assert_eq!(cold_batches.read_batch(&mut cold).unwrap(), more);
                if !more {
                    break;
                }

                assert_eq!(solver.reoptimize(&mut graph), Status::Optimal, "{}, batch {}", name, batch);
                check_flow_conservation(&graph);
                check_capacity_bounds(&graph);
                check_reduced_cost_optimality(&graph, solver.potentials());

                let mut reference = cold.clone();
                assert_eq!(CycleCanceling::default().run(&mut reference), Status::Optimal);
                assert_eq!(graph.total_cost(), reference.total_cost(), "{}, batch {}", name, batch);
            }
        }
    }
}
