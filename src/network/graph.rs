use crate::error::FlowError;
use crate::network::Arc;
use num_traits::NumAssign;
use std::ops::Neg;

/// Capabilities shared by both network representations: enough to load a graph, read back a
/// solution and export it.
pub trait Graph<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy,
{
    /// Creates a network with nodes `1..=num_nodes` and no arcs.
    fn with_nodes(num_nodes: usize) -> Self
    where
        Self: Sized;

    fn num_nodes(&self) -> usize;

    fn num_arcs(&self) -> usize;

    fn contains_node(&self, id: usize) -> bool;

    fn node_ids(&self) -> impl Iterator<Item = usize> + '_;

    fn add_arc(&mut self, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError>;

    /// The arc oriented `src -> dst`, if any.
    fn get_arc(&self, src: usize, dst: usize) -> Option<&Arc<Flow>>;

    fn set_supply(&mut self, id: usize, supply: Flow) -> Result<(), FlowError>;

    fn supply(&self, id: usize) -> Result<Flow, FlowError>;

    fn balance(&self, id: usize) -> Result<Flow, FlowError>;

    /// Pushes `amount` units along the residual arc `src -> dst`.
    fn push_flow(&mut self, src: usize, dst: usize, amount: Flow) -> Result<(), FlowError>;

    /// Every logical arc exactly once.
    fn arcs<'a>(&'a self) -> impl Iterator<Item = &'a Arc<Flow>> + 'a where Flow: 'a;

    fn total_cost(&self) -> Flow {
        self.arcs().fold(Flow::zero(), |cost, arc| cost + arc.cost() * arc.flow())
    }
}

/// Mutations applied between scheduling rounds.
pub trait DynamicGraph<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy,
{
    fn get_arc(&self, src: usize, dst: usize) -> Option<&Arc<Flow>>;

    fn contains_node(&self, id: usize) -> bool;

    fn add_node(&mut self) -> usize;

    fn add_node_with_id(&mut self, id: usize) -> Result<(), FlowError>;

    fn remove_node(&mut self, id: usize) -> Result<(), FlowError>;

    fn set_supply(&mut self, id: usize, supply: Flow) -> Result<(), FlowError>;

    fn add_arc(&mut self, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError>;

    fn change_arc_cost(&mut self, src: usize, dst: usize, cost: Flow) -> Result<(), FlowError>;

    /// Returns whether the current flow still satisfies the new capacity.
    fn change_arc_capacity(&mut self, src: usize, dst: usize, capacity: Flow) -> Result<bool, FlowError>;

    fn remove_arc(&mut self, src: usize, dst: usize) -> Result<(), FlowError>;
}
