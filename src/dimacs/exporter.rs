use crate::dimacs::END_OF_ITERATION;
use crate::error::FlowError;
use crate::network::Graph;
use log::debug;
use num_traits::NumAssign;
use std::fmt::Display;
use std::io::Write;
use std::ops::Neg;

/// How potentials appear on `p` lines of a solution.
///
/// Inside the crate the reduced cost of `u -> v` is `cost - p[u] + p[v]`. Consumers that use
/// `cost + p[u] - p[v]` need the potentials negated.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotentialSign {
    #[default]
    Normal,
    Negated,
}

impl PotentialSign {
    pub fn apply<Flow: Neg<Output = Flow>>(self, potential: Flow) -> Flow {
        match self {
            PotentialSign::Normal => potential,
            PotentialSign::Negated => -potential,
        }
    }

    /// Guesses the convention of potentials produced elsewhere for a graph with a known optimal
    /// flow: picks the sign under which fewer residual arcs have a negative reduced cost. Ties,
    /// including all-zero potentials, go to `Normal`. This is a heuristic; a non-optimal flow or
    /// potentials of a different solution can fool it.
    pub fn detect<Flow, G>(graph: &G, potentials: &[Flow]) -> Self
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy,
        G: Graph<Flow>,
    {
        let potential = |id: usize| potentials.get(id).copied().unwrap_or(Flow::zero());
        let (mut normal_violations, mut negated_violations) = (0usize, 0usize);

        for arc in graph.arcs() {
            let difference = potential(arc.dst()) - potential(arc.src());
            let normal = arc.cost() + difference;
            let negated = arc.cost() - difference;
            // forward residual needs a non-negative reduced cost, reverse residual a non-positive one
            for (reduced_cost, violations) in [(normal, &mut normal_violations), (negated, &mut negated_violations)] {
                if (arc.capacity() > Flow::zero() && reduced_cost < Flow::zero()) || (arc.flow() > Flow::zero() && reduced_cost > Flow::zero()) {
                    *violations += 1;
                }
            }
        }

        debug!("potential sign violations: {} normal, {} negated", normal_violations, negated_violations);
        if negated_violations < normal_violations {
            PotentialSign::Negated
        } else {
            PotentialSign::Normal
        }
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Append one `p <id> <potential>` line per node to a solution.
    pub potentials: bool,
    pub potential_sign: PotentialSign,
}

/// Writes graphs as `p min` problems and solutions as `s`/`f`/`p` lines, each closed by `c EOI`.
pub struct Exporter<W> {
    writer: W,
    options: ExportOptions,
}

impl<W: Write> Exporter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, ExportOptions::default())
    }

    pub fn with_options(writer: W, options: ExportOptions) -> Self {
        Exporter { writer, options }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes the problem the graph currently describes. Removed ids keep their numbers, so the
    /// problem line declares the highest id in use.
    pub fn write<Flow, G>(&mut self, graph: &G) -> Result<(), FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Display,
        G: Graph<Flow>,
    {
        let max_id = graph.node_ids().max().unwrap_or(0);
        writeln!(self.writer, "p min {} {}", max_id, graph.num_arcs())?;
        for id in graph.node_ids() {
            let supply = graph.supply(id)?;
            if supply != Flow::zero() {
                writeln!(self.writer, "n {} {}", id, supply)?;
            }
        }
        for arc in graph.arcs() {
            writeln!(self.writer, "a {} {} 0 {} {}", arc.src(), arc.dst(), arc.initial_capacity(), arc.cost())?;
        }
        writeln!(self.writer, "c {}", END_OF_ITERATION)?;
        Ok(())
    }

    /// Writes the total cost, every arc with positive flow and, if enabled, the potentials.
    pub fn write_flow<Flow, G>(&mut self, graph: &G, potentials: &[Flow]) -> Result<(), FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Display,
        G: Graph<Flow>,
    {
        writeln!(self.writer, "s {}", graph.total_cost())?;
        for arc in graph.arcs().filter(|arc| arc.flow() > Flow::zero()) {
            writeln!(self.writer, "f {} {} {}", arc.src(), arc.dst(), arc.flow())?;
        }
        if self.options.potentials {
            for id in graph.node_ids() {
                let potential = potentials.get(id).copied().unwrap_or(Flow::zero());
                writeln!(self.writer, "p {} {}", id, self.options.potential_sign.apply(potential))?;
            }
        }
        writeln!(self.writer, "c {}", END_OF_ITERATION)?;
        self.writer.flush()?;
        Ok(())
    }
}
