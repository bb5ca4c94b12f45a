use crate::error::FlowError;
use crate::network::Graph;
use num_traits::NumAssign;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Neg;

pub const SINK_NODE: usize = 1;

/// Reads task placements out of a solved scheduling network.
///
/// The network has its sink at node 1, a task at every other node with supply 1 and no other
/// node with non-zero supply. Leaves (machines and unscheduled aggregators) are the neighbours of
/// the sink.
#[derive(Debug, Clone)]
pub struct TaskAssignment {
    tasks: BTreeSet<usize>,
    leaves: BTreeSet<usize>,
}

impl TaskAssignment {
    pub fn new<Flow, G>(graph: &G) -> Result<Self, FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy,
        G: Graph<Flow>,
    {
        if graph.supply(SINK_NODE).map_or(true, |supply| supply >= Flow::zero()) {
            return Err(FlowError::TaskNetwork(format!("node {} is not the sink", SINK_NODE)));
        }

        let mut tasks = BTreeSet::new();
        for id in graph.node_ids().filter(|&id| id != SINK_NODE) {
            let supply = graph.supply(id)?;
            if supply == Flow::one() {
                tasks.insert(id);
            } else if supply != Flow::zero() {
                return Err(FlowError::TaskNetwork(format!("node {} is neither a task nor the sink", id)));
            }
        }

        let leaves = graph
            .arcs()
            .filter_map(|arc| match (arc.src(), arc.dst()) {
                (SINK_NODE, dst) => Some(dst),
                (src, SINK_NODE) => Some(src),
                _ => None,
            })
            .collect();

        Ok(TaskAssignment { tasks, leaves })
    }

    pub fn tasks(&self) -> &BTreeSet<usize> {
        &self.tasks
    }

    pub fn leaves(&self) -> &BTreeSet<usize> {
        &self.leaves
    }

    /// Maps every scheduled task to its leaf by walking the flow backwards from the sink.
    pub fn assignments<Flow, G>(&self, graph: &G) -> Result<BTreeMap<usize, usize>, FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy,
        G: Graph<Flow>,
    {
        // dst -> (src -> flow), positive flows only
        let mut flows: BTreeMap<usize, BTreeMap<usize, Flow>> = BTreeMap::new();
        for arc in graph.arcs().filter(|arc| arc.flow() > Flow::zero()) {
            flows.entry(arc.dst()).or_default().insert(arc.src(), arc.flow());
        }

        let mut assignments = BTreeMap::new();
        for &leaf in self.leaves.iter() {
            let mut remaining = flows.get(&SINK_NODE).and_then(|incoming| incoming.get(&leaf)).copied().unwrap_or(Flow::zero());
            while remaining > Flow::zero() {
                let task = self
                    .find_task(&mut flows, leaf)
                    .ok_or_else(|| FlowError::TaskNetwork(format!("no task reaches leaf {} despite flow to the sink", leaf)))?;
                assignments.insert(task, leaf);
                remaining -= Flow::one();
            }
        }
        Ok(assignments)
    }

    /// Number of tasks whose placement differs between two assignment maps, counting tasks
    /// present in only one of them.
    pub fn num_changed(old: &BTreeMap<usize, usize>, new: &BTreeMap<usize, usize>) -> usize {
        let changed = new.iter().filter(|(task, leaf)| old.get(task) != Some(leaf)).count();
        changed + old.keys().filter(|task| !new.contains_key(task)).count()
    }

    // consumes one unit of flow on the way back from `leaf` to a task
    fn find_task<Flow>(&self, flows: &mut BTreeMap<usize, BTreeMap<usize, Flow>>, leaf: usize) -> Option<usize>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy,
    {
        let mut v = leaf;
        loop {
            let incoming = flows.get_mut(&v)?;
            let u = incoming.keys().copied().find(|u| self.tasks.contains(u)).or_else(|| incoming.keys().next().copied())?;

            let flow = incoming.entry(u).or_insert(Flow::zero());
            *flow -= Flow::one();
            if *flow <= Flow::zero() {
                incoming.remove(&u);
            }

            if self.tasks.contains(&u) {
                return Some(u);
            }
            v = u;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{FlowNetwork, ResidualNetwork};
    use crate::test_utilities::{parse_graph, SCHEDULING_NETWORK};
    use rstest::*;

    #[rstest]
    fn tasks_and_leaves() {
        let graph: FlowNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        let task_assignment = TaskAssignment::new(&graph).unwrap();
        assert_eq!(task_assignment.tasks().iter().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(task_assignment.leaves().iter().copied().collect::<Vec<_>>(), vec![4, 5, 6]);
    }

    #[rstest]
    fn follows_flow_back_to_tasks() {
        let mut graph: ResidualNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        let task_assignment = TaskAssignment::new(&graph).unwrap();
        assert!(task_assignment.assignments(&graph).unwrap().is_empty());

        for (u, v) in [(2, 6), (6, 1), (3, 6)] {
            graph.push_flow(u, v, 1).unwrap();
        }
        graph.push_flow(6, 1, 1).unwrap();

        let assignments = task_assignment.assignments(&graph).unwrap();
        assert_eq!(assignments, BTreeMap::from([(2, 6), (3, 6)]));

        let moved = BTreeMap::from([(2, 4), (3, 6)]);
        assert_eq!(TaskAssignment::num_changed(&assignments, &moved), 1);
        assert_eq!(TaskAssignment::num_changed(&BTreeMap::new(), &moved), 2);
    }

    #[rstest]
    #[case::no_sink("p min 2 1\nn 2 1\nn 1 1\na 2 1 0 1 1\n")]
    #[case::source_node("p min 3 2\nn 1 -2\nn 2 2\na 2 3 0 2 1\na 3 1 0 2 1\n")]
    fn rejects_non_scheduling_networks(#[case] input: &str) {
        let graph: FlowNetwork<i64> = parse_graph(input);
        assert!(matches!(TaskAssignment::new(&graph), Err(FlowError::TaskNetwork(_))));
    }
}
