use crate::dimacs::OriginalImporter;
use crate::network::{Graph, ResidualNetwork};
use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::PathBuf;

/// Two tasks (2, 3), three leaves (4, 5, 6) and the sink 1. Optimal cost 6: 2 -> 4 and 3 -> 5.
pub const SCHEDULING_NETWORK: &str = "p min 6 9
n 1 -2
n 2 1
n 3 1
a 2 4 0 1 2
a 2 5 0 1 5
a 2 6 0 1 20
a 3 4 0 1 3
a 3 5 0 1 4
a 3 6 0 1 20
a 4 1 0 1 0
a 5 1 0 1 0
a 6 1 0 2 0
";

/// Node 3 demands 3 units but has no arc into it. Without a feasibility check, dual ascent
/// raises the potentials of nodes 1, 2, 4 and 5 forever while the excess circles between them.
pub const DEFICIT_WITHOUT_INFLOW: &str = "p min 5 6
n 1 1
n 3 -3
n 4 1
n 5 1
a 3 2 0 2 0
a 2 4 0 1 4
a 5 4 0 1 4
a 1 5 0 2 5
a 4 1 0 1 4
a 1 2 0 2 0
";

pub fn parse_graph<G: Graph<i64>>(input: &str) -> G {
    OriginalImporter::new(input.as_bytes()).read::<i64, G>().unwrap()
}

pub fn read_graph<G: Graph<i64>>(file_path: &PathBuf) -> G {
    parse_graph(&read_to_string(file_path).unwrap())
}

pub fn read_expected(file_path: &PathBuf) -> i64 {
    let data = read_to_string(file_path).unwrap();
    data.trim().parse().unwrap()
}

pub fn check_flow_conservation(graph: &ResidualNetwork<i64>) {
    let mut net_outflow: BTreeMap<usize, i64> = BTreeMap::new();
    for arc in graph.arcs() {
        *net_outflow.entry(arc.src()).or_default() += arc.flow();
        *net_outflow.entry(arc.dst()).or_default() -= arc.flow();
    }

    let (mut total_balance, mut total_supply) = (0, 0);
    for id in graph.node_ids() {
        let outflow = net_outflow.get(&id).copied().unwrap_or(0);
        let (balance, supply) = (graph.balance(id).unwrap(), graph.supply(id).unwrap());
        assert_eq!(balance, supply - outflow, "balance of node {}", id);
        total_balance += balance;
        total_supply += supply;
    }
    assert_eq!(total_balance, total_supply);
}

pub fn check_capacity_bounds(graph: &ResidualNetwork<i64>) {
    for arc in graph.arcs() {
        assert!(0 <= arc.flow() && arc.flow() <= arc.initial_capacity(), "flow {} on {}->{} with capacity {}", arc.flow(), arc.src(), arc.dst(), arc.initial_capacity());
    }
}

pub fn check_reduced_cost_optimality(graph: &ResidualNetwork<i64>, potentials: &[i64]) {
    let potential = |id: usize| potentials.get(id).copied().unwrap_or(0);
    for arc in graph.arcs() {
        let reduced_cost = arc.cost() - potential(arc.src()) + potential(arc.dst());
        if arc.capacity() > 0 {
            assert!(reduced_cost >= 0, "residual arc {}->{} has reduced cost {}", arc.src(), arc.dst(), reduced_cost);
        }
        if arc.flow() > 0 {
            assert!(reduced_cost <= 0, "residual arc {}->{} has reduced cost {}", arc.dst(), arc.src(), -reduced_cost);
        }
    }
}
