//! Incremental minimum-cost flow.
//!
//! A [`network::ResidualNetwork`] is solved once from cold with any
//! [`IncrementalSolver`](minimum_cost_flow::incremental_solver::IncrementalSolver), then mutated through
//! [`DynamicMaintainOptimality`](minimum_cost_flow::dynamic_maintain_optimality::DynamicMaintainOptimality) between scheduling rounds and
//! reoptimized from the carried potentials instead of from scratch.

pub mod dimacs;
pub mod error;
pub mod maximum_flow;
pub mod minimum_cost_flow;
pub mod network;

#[cfg(test)]
mod test_utilities;

pub use error::FlowError;
