mod arc;
mod flow_network;
mod graph;
mod residual_network;

pub use arc::Arc;
pub use flow_network::FlowNetwork;
pub use graph::{DynamicGraph, Graph};
pub use residual_network::{ResidualArc, ResidualNetwork};
