use crate::error::FlowError;
use crate::network::{Arc, Graph, ResidualNetwork};
use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

/// Static network storing each arc once, referenced from the adjacency lists of both endpoints.
/// Used by push-relabel, which walks a fixed arc order per node.
#[derive(Clone, Debug, Default)]
pub struct FlowNetwork<Flow> {
    num_nodes: usize,
    balances: Vec<Flow>,
    supplies: Vec<Flow>,
    arcs: Vec<Arc<Flow>>,
    adjacencies: Vec<Vec<usize>>,
}

impl<Flow> FlowNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    pub fn new(num_nodes: usize) -> Self {
        FlowNetwork {
            num_nodes,
            balances: vec![Flow::zero(); num_nodes + 1],
            supplies: vec![Flow::zero(); num_nodes + 1],
            arcs: Vec::new(),
            adjacencies: vec![Vec::new(); num_nodes + 1],
        }
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline]
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    #[inline]
    pub fn contains_node(&self, id: usize) -> bool {
        id != 0 && id <= self.num_nodes
    }

    #[inline]
    pub fn balance(&self, id: usize) -> Flow {
        self.balances[id]
    }

    #[inline]
    pub fn supply(&self, id: usize) -> Flow {
        self.supplies[id]
    }

    #[inline]
    pub fn arc(&self, arc_id: usize) -> &Arc<Flow> {
        &self.arcs[arc_id]
    }

    /// Ids of the arcs incident to `id`, in both orientations.
    #[inline]
    pub fn adjacencies(&self, id: usize) -> &[usize] {
        &self.adjacencies[id]
    }

    pub fn arcs(&self) -> std::slice::Iter<Arc<Flow>> {
        self.arcs.iter()
    }

    // O(degree of u)
    pub fn find_arc(&self, u: usize, v: usize) -> Option<usize> {
        self.adjacencies.get(u)?.iter().copied().find(|&arc_id| self.arcs[arc_id].opposite(u) == v)
    }

    pub fn get_arc(&self, src: usize, dst: usize) -> Option<&Arc<Flow>> {
        self.find_arc(src, dst).map(|arc_id| &self.arcs[arc_id]).filter(|arc| arc.src() == src)
    }

    pub fn add_arc(&mut self, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError> {
        for id in [src, dst] {
            if !self.contains_node(id) {
                return Err(FlowError::InvalidNode(id));
            }
        }
        if src == dst {
            return Err(FlowError::SelfLoop(src));
        }
        if self.find_arc(src, dst).is_some() {
            return Err(FlowError::DuplicateArc { src, dst });
        }

        self.arcs.push(Arc::new(src, dst, capacity, cost));
        let arc_id = self.arcs.len() - 1;
        self.adjacencies[src].push(arc_id);
        self.adjacencies[dst].push(arc_id);
        Ok(())
    }

    pub fn set_supply(&mut self, id: usize, supply: Flow) -> Result<(), FlowError> {
        if !self.contains_node(id) {
            return Err(FlowError::InvalidNode(id));
        }
        self.balances[id] += supply - self.supplies[id];
        self.supplies[id] = supply;
        Ok(())
    }

    #[inline]
    pub fn residual_capacity(&self, arc_id: usize, from: usize) -> Flow {
        self.arcs[arc_id].residual_capacity(from)
    }

    /// Pushes `amount` from `from` across the arc and returns the new balance at the other end.
    #[inline]
    pub fn push_flow_on(&mut self, arc_id: usize, from: usize, amount: Flow) -> Flow {
        let arc = &mut self.arcs[arc_id];
        let to = arc.opposite(from);
        if arc.src() == from {
            arc.push_flow(amount);
        } else {
            arc.push_flow(-amount);
        }
        self.balances[from] -= amount;
        self.balances[to] += amount;
        self.balances[to]
    }

    pub fn push_flow(&mut self, src: usize, dst: usize, amount: Flow) -> Result<(), FlowError> {
        let arc_id = self.find_arc(src, dst).ok_or(FlowError::MissingArc { src, dst })?;
        self.push_flow_on(arc_id, src, amount);
        Ok(())
    }
}

impl<Flow> PartialEq for FlowNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    fn eq(&self, other: &Self) -> bool {
        self.num_nodes == other.num_nodes
            && self.arcs.len() == other.arcs.len()
            && self.balances == other.balances
            && self.supplies == other.supplies
            && self.arcs.iter().all(|arc| other.get_arc(arc.src(), arc.dst()) == Some(arc))
    }
}

impl<Flow> From<&ResidualNetwork<Flow>> for FlowNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    fn from(residual: &ResidualNetwork<Flow>) -> Self {
        let mut network = FlowNetwork::new(residual.num_nodes_allocated());
        for id in residual.node_ids() {
            network.supplies[id] = residual.supply(id).unwrap_or(Flow::zero());
            network.balances[id] = residual.excess(id);
        }
        for arc in residual.arcs() {
            network.arcs.push(arc.clone());
            let arc_id = network.arcs.len() - 1;
            network.adjacencies[arc.src()].push(arc_id);
            network.adjacencies[arc.dst()].push(arc_id);
        }
        network
    }
}

impl<Flow> Graph<Flow> for FlowNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    fn with_nodes(num_nodes: usize) -> Self {
        FlowNetwork::new(num_nodes)
    }

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    fn contains_node(&self, id: usize) -> bool {
        FlowNetwork::contains_node(self, id)
    }

    fn node_ids(&self) -> impl Iterator<Item = usize> + '_ {
        1..=self.num_nodes
    }

    fn add_arc(&mut self, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError> {
        FlowNetwork::add_arc(self, src, dst, capacity, cost)
    }

    fn get_arc(&self, src: usize, dst: usize) -> Option<&Arc<Flow>> {
        FlowNetwork::get_arc(self, src, dst)
    }

    fn set_supply(&mut self, id: usize, supply: Flow) -> Result<(), FlowError> {
        FlowNetwork::set_supply(self, id, supply)
    }

    fn supply(&self, id: usize) -> Result<Flow, FlowError> {
        self.supplies.get(id).copied().filter(|_| self.contains_node(id)).ok_or(FlowError::InvalidNode(id))
    }

    fn balance(&self, id: usize) -> Result<Flow, FlowError> {
        self.balances.get(id).copied().filter(|_| self.contains_node(id)).ok_or(FlowError::InvalidNode(id))
    }

    fn push_flow(&mut self, src: usize, dst: usize, amount: Flow) -> Result<(), FlowError> {
        FlowNetwork::push_flow(self, src, dst, amount)
    }

    fn arcs<'a>(&'a self) -> impl Iterator<Item = &'a Arc<Flow>> + 'a where Flow: 'a {
        self.arcs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::{parse_graph, SCHEDULING_NETWORK};
    use rstest::*;

    #[test]
    fn push_flow_on_reverse_direction() {
        let mut network = FlowNetwork::<i64>::new(2);
        network.add_arc(1, 2, 5, 3).unwrap();
        network.set_supply(1, 5).unwrap();
        network.set_supply(2, -5).unwrap();

        let arc_id = network.find_arc(2, 1).unwrap();
        assert_eq!(network.push_flow_on(arc_id, 1, 4), -1);
        assert_eq!(network.residual_capacity(arc_id, 1), 1);
        assert_eq!(network.residual_capacity(arc_id, 2), 4);

        assert_eq!(network.push_flow_on(arc_id, 2, 1), 2);
        assert_eq!(network.arc(arc_id).flow(), 3);
        assert_eq!(network.total_cost(), 9);
    }

    #[rstest]
    #[case::scheduling(SCHEDULING_NETWORK)]
    #[case::diamond("p min 4 5\nn 1 4\nn 4 -4\na 1 2 0 4 2\na 1 3 0 2 2\na 2 3 0 2 1\na 2 4 0 3 3\na 3 4 0 5 1\n")]
    fn conversion_round_trip(#[case] input: &str) {
        let residual: ResidualNetwork<i64> = parse_graph(input);
        let flow_network: FlowNetwork<i64> = parse_graph(input);

        assert!(FlowNetwork::from(&residual) == flow_network);
        assert!(ResidualNetwork::from(&flow_network) == residual);
        assert!(ResidualNetwork::from(&FlowNetwork::from(&residual)) == residual);
    }

    #[rstest]
    fn conversion_keeps_flow() {
        let mut residual: ResidualNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        residual.push_flow(2, 4, 1).unwrap();
        residual.push_flow(4, 1, 1).unwrap();

        let flow_network = FlowNetwork::from(&residual);
        assert_eq!(flow_network.get_arc(2, 4).unwrap().flow(), 1);
        assert_eq!(flow_network.balance(2), residual.balance(2).unwrap());
        assert!(ResidualNetwork::from(&flow_network) == residual);
    }

    #[rstest]
    fn unequal_networks() {
        let a: FlowNetwork<i64> = parse_graph(SCHEDULING_NETWORK);

        let mut b = a.clone();
        b.set_supply(5, 42).unwrap();
        assert!(a != b);

        let mut c = a.clone();
        c.add_arc(3, 5, 1, 1).unwrap();
        assert!(a != c);
    }
}
