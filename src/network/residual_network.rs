use crate::error::FlowError;
use crate::network::{Arc, DynamicGraph, FlowNetwork, Graph};
use log::trace;
use num_traits::NumAssign;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::ops::Neg;

/// An arc of the residual network seen from `src`.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ResidualArc<Flow> {
    pub src: usize,
    pub dst: usize,
    pub residual_capacity: Flow,
    pub cost: Flow,
}

impl<Flow> ResidualArc<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy,
{
    #[inline]
    pub fn reduced_cost(&self, potentials: &[Flow]) -> Flow {
        self.cost - potentials[self.src] + potentials[self.dst]
    }
}

/// Node ids are 1-based; slot 0 is never used. Removed ids go to a free list and are handed out
/// again by [`ResidualNetwork::add_node`].
#[derive(Clone, Debug)]
pub struct ResidualNetwork<Flow> {
    num_nodes: usize,
    num_arcs: usize,
    balances: Vec<Flow>,
    supplies: Vec<Flow>,
    // neighbour -> slot in `arcs`, registered at both endpoints
    adjacencies: Vec<BTreeMap<usize, usize>>,
    arcs: Vec<Option<Arc<Flow>>>,
    free_arcs: Vec<usize>,
    sources: BTreeSet<usize>,
    sinks: BTreeSet<usize>,
    free_nodes: BTreeSet<usize>,
}

impl<Flow> ResidualNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    pub fn new(num_nodes: usize) -> Self {
        ResidualNetwork {
            num_nodes,
            num_arcs: 0,
            balances: vec![Flow::zero(); num_nodes + 1],
            supplies: vec![Flow::zero(); num_nodes + 1],
            adjacencies: vec![BTreeMap::new(); num_nodes + 1],
            arcs: Vec::new(),
            free_arcs: Vec::new(),
            sources: BTreeSet::new(),
            sinks: BTreeSet::new(),
            free_nodes: BTreeSet::new(),
        }
    }

    /// Number of nodes currently present.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Highest id ever handed out; per-node vectors are indexed up to and including it.
    #[inline]
    pub fn num_nodes_allocated(&self) -> usize {
        self.balances.len() - 1
    }

    #[inline]
    pub fn num_arcs(&self) -> usize {
        self.num_arcs
    }

    #[inline]
    pub fn contains_node(&self, id: usize) -> bool {
        id != 0 && id < self.balances.len() && !self.free_nodes.contains(&id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = usize> + '_ {
        (1..self.balances.len()).filter(|id| !self.free_nodes.contains(id))
    }

    pub fn balance(&self, id: usize) -> Result<Flow, FlowError> {
        self.balances.get(id).copied().filter(|_| self.contains_node(id)).ok_or(FlowError::InvalidNode(id))
    }

    pub fn supply(&self, id: usize) -> Result<Flow, FlowError> {
        self.supplies.get(id).copied().filter(|_| self.contains_node(id)).ok_or(FlowError::InvalidNode(id))
    }

    /// Balance of a node taken from the network's own adjacency or source/sink sets; negative
    /// for deficits.
    #[inline]
    pub(crate) fn excess(&self, id: usize) -> Flow {
        self.balances[id]
    }

    #[inline]
    pub fn sources(&self) -> &BTreeSet<usize> {
        &self.sources
    }

    #[inline]
    pub fn sinks(&self) -> &BTreeSet<usize> {
        &self.sinks
    }

    /// The logical arc oriented `src -> dst`.
    pub fn get_arc(&self, src: usize, dst: usize) -> Option<&Arc<Flow>> {
        self.arc_between(src, dst).filter(|arc| arc.src() == src)
    }

    /// The logical arc joining `u` and `v`, in either orientation.
    pub fn arc_between(&self, u: usize, v: usize) -> Option<&Arc<Flow>> {
        let slot = *self.adjacencies.get(u)?.get(&v)?;
        self.arcs[slot].as_ref()
    }

    #[inline]
    pub fn residual_capacity(&self, src: usize, dst: usize) -> Flow {
        self.arc_between(src, dst).map_or(Flow::zero(), |arc| arc.residual_capacity(src))
    }

    /// Logical arcs incident to `id`, keyed by the opposite endpoint.
    pub fn adjacencies(&self, id: usize) -> impl Iterator<Item = (usize, &Arc<Flow>)> + '_ {
        self.adjacencies[id].iter().filter_map(|(&v, &slot)| self.arcs[slot].as_ref().map(|arc| (v, arc)))
    }

    /// Residual arcs leaving `id`, including those with zero residual capacity.
    pub fn residual_arcs(&self, id: usize) -> impl Iterator<Item = ResidualArc<Flow>> + '_ {
        self.adjacencies(id).map(move |(dst, arc)| ResidualArc { src: id, dst, residual_capacity: arc.residual_capacity(id), cost: arc.directed_cost(id) })
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc<Flow>> + '_ {
        self.arcs.iter().flatten()
    }

    pub fn add_node(&mut self) -> usize {
        self.num_nodes += 1;
        match self.free_nodes.pop_first() {
            Some(id) => {
                debug_assert!(self.balances[id] == Flow::zero() && self.adjacencies[id].is_empty());
                id
            }
            None => {
                self.balances.push(Flow::zero());
                self.supplies.push(Flow::zero());
                self.adjacencies.push(BTreeMap::new());
                self.balances.len() - 1
            }
        }
    }

    /// Claims a specific id. Ids skipped over when growing are placed on the free list.
    pub fn add_node_with_id(&mut self, id: usize) -> Result<(), FlowError> {
        if id == 0 {
            return Err(FlowError::InvalidNode(id));
        }
        if self.contains_node(id) {
            return Err(FlowError::DuplicateNode(id));
        }
        while self.balances.len() <= id {
            self.free_nodes.insert(self.balances.len());
            self.balances.push(Flow::zero());
            self.supplies.push(Flow::zero());
            self.adjacencies.push(BTreeMap::new());
        }
        self.free_nodes.remove(&id);
        self.num_nodes += 1;
        Ok(())
    }

    /// Drops every incident arc, clears the node's state and frees its id.
    pub fn remove_node(&mut self, id: usize) -> Result<(), FlowError> {
        self.check_node(id)?;

        let neighbors: Vec<(usize, usize)> = self.adjacencies(id).map(|(_, arc)| (arc.src(), arc.dst())).collect();
        for (src, dst) in neighbors {
            self.remove_arc(src, dst)?;
        }
        debug_assert!(self.adjacencies[id].is_empty());

        self.sources.remove(&id);
        self.sinks.remove(&id);
        self.balances[id] = Flow::zero();
        self.supplies[id] = Flow::zero();

        self.num_nodes -= 1;
        self.free_nodes.insert(id);
        Ok(())
    }

    pub fn add_arc(&mut self, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError> {
        self.check_node(src)?;
        self.check_node(dst)?;
        if src == dst {
            return Err(FlowError::SelfLoop(src));
        }
        if self.adjacencies[src].contains_key(&dst) {
            return Err(FlowError::DuplicateArc { src, dst });
        }

        let arc = Arc::new(src, dst, capacity, cost);
        let slot = match self.free_arcs.pop() {
            Some(slot) => {
                self.arcs[slot] = Some(arc);
                slot
            }
            None => {
                self.arcs.push(Some(arc));
                self.arcs.len() - 1
            }
        };
        self.adjacencies[src].insert(dst, slot);
        self.adjacencies[dst].insert(src, slot);
        self.num_arcs += 1;
        Ok(())
    }

    /// Removes the arc `src -> dst`. Flow it carried is returned to its endpoints' balances.
    pub fn remove_arc(&mut self, src: usize, dst: usize) -> Result<(), FlowError> {
        let slot = self.forward_slot(src, dst)?;
        let flow = self.arcs[slot].as_ref().map_or(Flow::zero(), |arc| arc.flow());
        if flow != Flow::zero() {
            self.change_balance(src, flow);
            self.change_balance(dst, -flow);
        }

        self.adjacencies[src].remove(&dst);
        self.adjacencies[dst].remove(&src);
        self.arcs[slot] = None;
        self.free_arcs.push(slot);
        self.num_arcs -= 1;
        Ok(())
    }

    pub fn change_arc_cost(&mut self, src: usize, dst: usize, cost: Flow) -> Result<(), FlowError> {
        let slot = self.forward_slot(src, dst)?;
        if let Some(arc) = self.arcs[slot].as_mut() {
            arc.set_cost(cost);
        }
        Ok(())
    }

    /// Returns whether the current flow still satisfies the new capacity. When it does not, the
    /// forward residual capacity is negative until the caller pushes the excess flow back.
    pub fn change_arc_capacity(&mut self, src: usize, dst: usize, capacity: Flow) -> Result<bool, FlowError> {
        let slot = self.forward_slot(src, dst)?;
        Ok(self.arcs[slot].as_mut().map_or(true, |arc| arc.set_capacity(capacity)))
    }

    /// Sets the declared supply; the balance moves by the same delta so that
    /// `balance = supply - net outflow` keeps holding.
    pub fn set_supply(&mut self, id: usize, supply: Flow) -> Result<(), FlowError> {
        self.check_node(id)?;
        let delta = supply - self.supplies[id];
        self.supplies[id] = supply;
        self.change_balance(id, delta);
        Ok(())
    }

    /// Pushes `amount` along the residual arc `src -> dst`, which may be the reverse of a
    /// logical arc (then the flow on `dst -> src` decreases).
    pub fn push_flow(&mut self, src: usize, dst: usize, amount: Flow) -> Result<(), FlowError> {
        let slot = *self.adjacencies.get(src).and_then(|adjacency| adjacency.get(&dst)).ok_or(FlowError::MissingArc { src, dst })?;
        if let Some(arc) = self.arcs[slot].as_mut() {
            if arc.src() == src {
                arc.push_flow(amount);
            } else {
                arc.push_flow(-amount);
            }
            debug_assert!(arc.capacity() <= arc.initial_capacity(), "{}->{} carries negative flow", arc.src(), arc.dst());
        }
        trace!("pushed {:?} along {}->{}", amount, src, dst);

        self.change_balance(src, -amount);
        self.change_balance(dst, amount);
        Ok(())
    }

    fn change_balance(&mut self, id: usize, delta: Flow) {
        let old = self.balances[id];
        let new = old + delta;
        if old > Flow::zero() {
            self.sources.remove(&id);
        } else if old < Flow::zero() {
            self.sinks.remove(&id);
        }
        if new > Flow::zero() {
            self.sources.insert(id);
        } else if new < Flow::zero() {
            self.sinks.insert(id);
        }
        self.balances[id] = new;
    }

    fn check_node(&self, id: usize) -> Result<(), FlowError> {
        if self.contains_node(id) {
            Ok(())
        } else {
            Err(FlowError::InvalidNode(id))
        }
    }

    fn forward_slot(&self, src: usize, dst: usize) -> Result<usize, FlowError> {
        self.adjacencies
            .get(src)
            .and_then(|adjacency| adjacency.get(&dst))
            .copied()
            .filter(|&slot| self.arcs[slot].as_ref().is_some_and(|arc| arc.src() == src))
            .ok_or(FlowError::MissingArc { src, dst })
    }
}

impl<Flow> PartialEq for ResidualNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    fn eq(&self, other: &Self) -> bool {
        self.num_nodes_allocated() == other.num_nodes_allocated()
            && self.num_arcs == other.num_arcs
            && self.balances == other.balances
            && self.supplies == other.supplies
            && self.arcs().all(|arc| other.get_arc(arc.src(), arc.dst()) == Some(arc))
    }
}

impl<Flow> From<&FlowNetwork<Flow>> for ResidualNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    fn from(network: &FlowNetwork<Flow>) -> Self {
        let mut residual = ResidualNetwork::new(network.num_nodes());
        for id in 1..=network.num_nodes() {
            residual.supplies[id] = network.supply(id);
            residual.change_balance(id, network.balance(id));
        }
        for arc in network.arcs() {
            // FlowNetwork never holds duplicate or dangling arcs
            let slot = residual.arcs.len();
            residual.arcs.push(Some(arc.clone()));
            residual.adjacencies[arc.src()].insert(arc.dst(), slot);
            residual.adjacencies[arc.dst()].insert(arc.src(), slot);
            residual.num_arcs += 1;
        }
        residual
    }
}

impl<Flow> Graph<Flow> for ResidualNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    fn with_nodes(num_nodes: usize) -> Self {
        ResidualNetwork::new(num_nodes)
    }

    fn num_nodes(&self) -> usize {
        ResidualNetwork::num_nodes(self)
    }

    fn num_arcs(&self) -> usize {
        ResidualNetwork::num_arcs(self)
    }

    fn contains_node(&self, id: usize) -> bool {
        ResidualNetwork::contains_node(self, id)
    }

    fn node_ids(&self) -> impl Iterator<Item = usize> + '_ {
        ResidualNetwork::node_ids(self)
    }

    fn add_arc(&mut self, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError> {
        ResidualNetwork::add_arc(self, src, dst, capacity, cost)
    }

    fn get_arc(&self, src: usize, dst: usize) -> Option<&Arc<Flow>> {
        ResidualNetwork::get_arc(self, src, dst)
    }

    fn set_supply(&mut self, id: usize, supply: Flow) -> Result<(), FlowError> {
        ResidualNetwork::set_supply(self, id, supply)
    }

    fn supply(&self, id: usize) -> Result<Flow, FlowError> {
        ResidualNetwork::supply(self, id)
    }

    fn balance(&self, id: usize) -> Result<Flow, FlowError> {
        ResidualNetwork::balance(self, id)
    }

    fn push_flow(&mut self, src: usize, dst: usize, amount: Flow) -> Result<(), FlowError> {
        ResidualNetwork::push_flow(self, src, dst, amount)
    }

    fn arcs<'a>(&'a self) -> impl Iterator<Item = &'a Arc<Flow>> + 'a where Flow: 'a {
        ResidualNetwork::arcs(self)
    }
}

impl<Flow> DynamicGraph<Flow> for ResidualNetwork<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug,
{
    fn get_arc(&self, src: usize, dst: usize) -> Option<&Arc<Flow>> {
        ResidualNetwork::get_arc(self, src, dst)
    }

    fn contains_node(&self, id: usize) -> bool {
        ResidualNetwork::contains_node(self, id)
    }

    fn add_node(&mut self) -> usize {
        ResidualNetwork::add_node(self)
    }

    fn add_node_with_id(&mut self, id: usize) -> Result<(), FlowError> {
        ResidualNetwork::add_node_with_id(self, id)
    }

    fn remove_node(&mut self, id: usize) -> Result<(), FlowError> {
        ResidualNetwork::remove_node(self, id)
    }

    fn set_supply(&mut self, id: usize, supply: Flow) -> Result<(), FlowError> {
        ResidualNetwork::set_supply(self, id, supply)
    }

    fn add_arc(&mut self, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError> {
        ResidualNetwork::add_arc(self, src, dst, capacity, cost)
    }

    fn change_arc_cost(&mut self, src: usize, dst: usize, cost: Flow) -> Result<(), FlowError> {
        ResidualNetwork::change_arc_cost(self, src, dst, cost)
    }

    fn change_arc_capacity(&mut self, src: usize, dst: usize, capacity: Flow) -> Result<bool, FlowError> {
        ResidualNetwork::change_arc_capacity(self, src, dst, capacity)
    }

    fn remove_arc(&mut self, src: usize, dst: usize) -> Result<(), FlowError> {
        ResidualNetwork::remove_arc(self, src, dst)
    }
}
