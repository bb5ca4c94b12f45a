use crate::dimacs::LineReader;
use crate::error::FlowError;
use crate::network::Graph;
use log::{debug, warn};
use num_traits::NumAssign;
use std::collections::BTreeSet;
use std::io::BufRead;
use std::ops::Neg;
use std::str::FromStr;

/// Reads a complete `p min` problem into any [`Graph`].
pub struct OriginalImporter<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> OriginalImporter<R> {
    pub fn new(reader: R) -> Self {
        OriginalImporter { lines: LineReader::new(reader) }
    }

    /// Parses until `c EOI` or end of input. The rest of the stream (delta batches, typically)
    /// is left unread.
    pub fn read<Flow, G>(&mut self) -> Result<G, FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + FromStr,
        G: Graph<Flow>,
    {
        let mut graph: Option<G> = None;
        let mut num_declared_arcs = 0;
        let mut defined_nodes = BTreeSet::new();
        let mut defined_arcs = BTreeSet::new();
        let mut last_line = 0;

        while let Some(mut line) = self.lines.next_line()? {
            last_line = line.number;
            match line.kind {
                "c" => {
                    if line.is_end_of_iteration() {
                        break;
                    }
                }
                "p" => {
                    if graph.is_some() {
                        return Err(FlowError::parse(line.number, "duplicate problem line"));
                    }
                    let problem: String = line.next("problem type")?;
                    if problem != "min" {
                        return Err(FlowError::parse(line.number, format!("unsupported problem type '{}'", problem)));
                    }
                    let num_nodes: usize = line.next("number of nodes")?;
                    num_declared_arcs = line.next("number of arcs")?;
                    line.finish()?;
                    graph = Some(G::with_nodes(num_nodes));
                }
                "n" => {
                    let number = line.number;
                    let graph = graph.as_mut().ok_or_else(|| FlowError::parse(number, "node line before the problem line"))?;
                    let id: usize = line.next("node id")?;
                    let supply: Flow = line.next("supply")?;
                    line.finish()?;

                    if !graph.contains_node(id) {
                        return Err(FlowError::parse(number, format!("node {} out of range", id)));
                    }
                    if !defined_nodes.insert(id) {
                        warn!("line {}: node {} defined twice, keeping the first definition", number, id);
                        continue;
                    }
                    graph.set_supply(id, supply)?;
                }
                "a" => {
                    let number = line.number;
                    let graph = graph.as_mut().ok_or_else(|| FlowError::parse(number, "arc line before the problem line"))?;
                    let src: usize = line.next("source")?;
                    let dst: usize = line.next("destination")?;
                    let lower_bound: Flow = line.next("lower bound")?;
                    let upper_bound: Flow = line.next("upper bound")?;
                    let cost: Flow = line.next("cost")?;
                    line.finish()?;

                    if lower_bound != Flow::zero() {
                        return Err(FlowError::parse(number, "non-zero lower bounds are not supported"));
                    }
                    for id in [src, dst] {
                        if !graph.contains_node(id) {
                            return Err(FlowError::parse(number, format!("node {} out of range", id)));
                        }
                    }
                    if src == dst {
                        return Err(FlowError::parse(number, format!("self-loop on node {}", src)));
                    }
                    if !defined_arcs.insert((src.min(dst), src.max(dst))) {
                        warn!("line {}: arc between {} and {} defined twice, keeping the first definition", number, src, dst);
                        continue;
                    }
                    if upper_bound == Flow::zero() {
                        debug!("line {}: skipping zero-capacity arc {}->{}", number, src, dst);
                        continue;
                    }
                    graph.add_arc(src, dst, upper_bound, cost)?;
                }
                kind => return Err(FlowError::parse(line.number, format!("unknown line type '{}'", kind))),
            }
        }

        let graph = graph.ok_or_else(|| FlowError::parse(last_line, "missing problem line"))?;
        if graph.num_arcs() != num_declared_arcs {
            debug!("problem line declares {} arcs, {} were added", num_declared_arcs, graph.num_arcs());
        }
        Ok(graph)
    }
}
