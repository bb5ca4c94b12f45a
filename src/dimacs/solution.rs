use crate::dimacs::LineReader;
use crate::error::FlowError;
use crate::network::Graph;
use num_traits::NumAssign;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::ops::Neg;
use std::str::FromStr;

/// What a solution file states besides the flows themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<Flow> {
    pub cost: Flow,
    /// Potentials exactly as written, without any sign normalisation.
    pub potentials: BTreeMap<usize, Flow>,
}

/// Loads a previously computed solution (`s`, `f` and optional `p` lines) onto a graph that
/// carries no flow yet.
pub struct SolutionImporter<R> {
    lines: LineReader<R>,
}

impl<R: BufRead> SolutionImporter<R> {
    pub fn new(reader: R) -> Self {
        SolutionImporter { lines: LineReader::new(reader) }
    }

    pub fn read<Flow, G>(&mut self, graph: &mut G) -> Result<Solution<Flow>, FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + FromStr,
        G: Graph<Flow>,
    {
        let mut cost = None;
        let mut potentials = BTreeMap::new();
        let mut last_line = 0;

        while let Some(mut line) = self.lines.next_line()? {
            last_line = line.number;
            match line.kind {
                "c" => {
                    if line.is_end_of_iteration() {
                        break;
                    }
                }
                "s" => {
                    if cost.is_some() {
                        return Err(FlowError::parse(line.number, "duplicate solution line"));
                    }
                    cost = Some(line.next("cost")?);
                    line.finish()?;
                }
                "f" => {
                    if cost.is_none() {
                        return Err(FlowError::parse(line.number, "flow line before the solution line"));
                    }
                    let number = line.number;
                    let src: usize = line.next("source")?;
                    let dst: usize = line.next("destination")?;
                    let flow: Flow = line.next("flow")?;
                    line.finish()?;

                    if graph.get_arc(src, dst).is_none() {
                        return Err(FlowError::parse(number, format!("flow on arc {}->{} which does not exist", src, dst)));
                    }
                    graph.push_flow(src, dst, flow)?;
                }
                "p" => {
                    let number = line.number;
                    let id: usize = line.next("node id")?;
                    let potential: Flow = line.next("potential")?;
                    line.finish()?;
                    if !graph.contains_node(id) {
                        return Err(FlowError::parse(number, format!("potential of node {} which does not exist", id)));
                    }
                    potentials.insert(id, potential);
                }
                kind => return Err(FlowError::parse(line.number, format!("unknown line type '{}'", kind))),
            }
        }

        let cost = cost.ok_or_else(|| FlowError::parse(last_line, "missing solution line"))?;
        Ok(Solution { cost, potentials })
    }
}
