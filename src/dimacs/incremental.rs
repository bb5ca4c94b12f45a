use crate::dimacs::{Line, LineReader};
use crate::error::FlowError;
use crate::network::DynamicGraph;
use log::{debug, warn};
use num_traits::NumAssign;
use std::fmt::Debug;
use std::io::BufRead;
use std::ops::Neg;
use std::str::FromStr;

/// Applies delta batches, each terminated by `c EOI`, to a [`DynamicGraph`].
///
/// Besides `n` lines, which create a node under a chosen id, a `d <supply> <potential> <arcs>`
/// line creates a node under the next free id. The given number of `a` lines that follow it name
/// that node as `0`.
///
/// Wrap the network in a
/// [`DynamicMaintainOptimality`](crate::minimum_cost_flow::dynamic_maintain_optimality::DynamicMaintainOptimality)
/// to keep a solver's potentials valid while the batch is applied.
pub struct IncrementalImporter<R> {
    lines: LineReader<R>,
    // node of the last `d` line and how many of its arcs are still to come
    pending_arcs: Option<(usize, usize)>,
}

impl<R: BufRead> IncrementalImporter<R> {
    pub fn new(reader: R) -> Self {
        IncrementalImporter { lines: LineReader::new(reader), pending_arcs: None }
    }

    /// Applies the next batch. Returns `false` if the input ended before any line of a new batch.
    pub fn read_batch<Flow, G>(&mut self, graph: &mut G) -> Result<bool, FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + FromStr,
        G: DynamicGraph<Flow>,
    {
        let mut num_lines = 0;
        while let Some(mut line) = self.lines.next_line()? {
            num_lines += 1;
            match line.kind {
                "c" => {
                    if line.is_end_of_iteration() {
                        Self::drop_pending_arcs(&mut self.pending_arcs);
                        return Ok(true);
                    }
                }
                "r" => {
                    let id: usize = line.next("node id")?;
                    let number = line.number;
                    line.finish()?;
                    if graph.contains_node(id) {
                        graph.remove_node(id)?;
                    } else {
                        warn!("line {}: removing node {} which does not exist", number, id);
                    }
                }
                "n" => {
                    let id: usize = line.next("node id")?;
                    let supply: Flow = line.next("supply")?;
                    line.finish()?;
                    if !graph.contains_node(id) {
                        graph.add_node_with_id(id)?;
                    }
                    graph.set_supply(id, supply)?;
                }
                "d" => {
                    let number = line.number;
                    let supply: Flow = line.next("supply")?;
                    let potential: Flow = line.next("potential")?;
                    let num_arcs: usize = line.next("number of arcs")?;
                    line.finish()?;
                    if let Some((id, remaining)) = self.pending_arcs {
                        return Err(FlowError::parse(number, format!("new node while {} arcs of node {} are still missing", remaining, id)));
                    }
                    if potential != Flow::zero() {
                        warn!("line {}: ignoring potential {:?} of the new node", number, potential);
                    }

                    let id = graph.add_node();
                    graph.set_supply(id, supply)?;
                    debug!("line {}: added node {} with supply {:?} and {} arcs", number, id, supply, num_arcs);
                    self.pending_arcs = (num_arcs > 0).then_some((id, num_arcs));
                }
                "x" => Self::change_arc(graph, line)?,
                "a" => {
                    let new_node = Self::next_pending_arc(&mut self.pending_arcs);
                    Self::add_arc(graph, line, new_node)?
                }
                "p" => return Err(FlowError::parse(line.number, "problem line inside a delta batch")),
                kind => return Err(FlowError::parse(line.number, format!("unknown line type '{}'", kind))),
            }
        }

        if num_lines > 0 {
            debug!("input ended inside a batch of {} lines", num_lines);
        }
        Self::drop_pending_arcs(&mut self.pending_arcs);
        Ok(num_lines > 0)
    }

    // the node an `a` line means by `0`, while arcs of a `d` line are pending
    fn next_pending_arc(pending_arcs: &mut Option<(usize, usize)>) -> Option<usize> {
        let (id, remaining) = (*pending_arcs)?;
        *pending_arcs = (remaining > 1).then_some((id, remaining - 1));
        Some(id)
    }

    fn drop_pending_arcs(pending_arcs: &mut Option<(usize, usize)>) {
        if let Some((id, remaining)) = pending_arcs.take() {
            warn!("batch ended with {} arcs of new node {} missing", remaining, id);
        }
    }

    fn change_arc<Flow, G>(graph: &mut G, mut line: Line) -> Result<(), FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + FromStr,
        G: DynamicGraph<Flow>,
    {
        let number = line.number;
        let (src, dst, capacity, cost) = Self::arc_fields(graph, &mut line, None)?;
        line.finish()?;

        let Some((old_capacity, old_cost)) = graph.get_arc(src, dst).map(|arc| (arc.initial_capacity(), arc.cost())) else {
            if capacity == Flow::zero() {
                warn!("line {}: deleting arc {}->{} which does not exist", number, src, dst);
            } else {
                warn!("line {}: changing arc {}->{} which does not exist, adding it instead", number, src, dst);
                return Self::insert_arc(graph, number, src, dst, capacity, cost);
            }
            return Ok(());
        };

        if capacity == Flow::zero() {
            return graph.remove_arc(src, dst);
        }
        if capacity == old_capacity && cost == old_cost {
            warn!("line {}: change of arc {}->{} changes nothing", number, src, dst);
            return Ok(());
        }
        if capacity != old_capacity {
            graph.change_arc_capacity(src, dst, capacity)?;
        }
        if cost != old_cost {
            graph.change_arc_cost(src, dst, cost)?;
        }
        Ok(())
    }

    fn add_arc<Flow, G>(graph: &mut G, mut line: Line, new_node: Option<usize>) -> Result<(), FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + FromStr,
        G: DynamicGraph<Flow>,
    {
        let number = line.number;
        let (src, dst, capacity, cost) = Self::arc_fields(graph, &mut line, new_node)?;
        line.finish()?;

        if capacity == Flow::zero() {
            warn!("line {}: skipping zero-capacity arc {}->{}", number, src, dst);
            return Ok(());
        }
        Self::insert_arc(graph, number, src, dst, capacity, cost)
    }

    // an arc between two already connected nodes is skipped
    fn insert_arc<Flow, G>(graph: &mut G, number: usize, src: usize, dst: usize, capacity: Flow, cost: Flow) -> Result<(), FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + FromStr,
        G: DynamicGraph<Flow>,
    {
        match graph.add_arc(src, dst, capacity, cost) {
            Err(FlowError::DuplicateArc { .. }) => {
                warn!("line {}: arc between {} and {} already exists", number, src, dst);
                Ok(())
            }
            result => result,
        }
    }

    // src, dst, upper bound and cost of an `a` or `x` line; `0` stands for `new_node` if given
    fn arc_fields<Flow, G>(graph: &G, line: &mut Line, new_node: Option<usize>) -> Result<(usize, usize, Flow, Flow), FlowError>
    where
        Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + FromStr,
        G: DynamicGraph<Flow>,
    {
        let resolve = |id: usize| match (id, new_node) {
            (0, Some(new_node)) => new_node,
            _ => id,
        };
        let src = resolve(line.next("source")?);
        let dst = resolve(line.next("destination")?);
        let lower_bound: Flow = line.next("lower bound")?;
        let upper_bound: Flow = line.next("upper bound")?;
        let cost: Flow = line.next("cost")?;

        if lower_bound != Flow::zero() {
            return Err(FlowError::parse(line.number, "non-zero lower bounds are not supported"));
        }
        for id in [src, dst] {
            if !graph.contains_node(id) {
                return Err(FlowError::parse(line.number, format!("arc references node {} which does not exist", id)));
            }
        }
        if src == dst {
            return Err(FlowError::parse(line.number, format!("self-loop on node {}", src)));
        }
        Ok((src, dst, upper_bound, cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Graph, ResidualNetwork};
    use crate::test_utilities::{parse_graph, SCHEDULING_NETWORK};
    use rstest::*;

    fn apply(graph: &mut ResidualNetwork<i64>, deltas: &str) -> Result<bool, FlowError> {
        IncrementalImporter::new(deltas.as_bytes()).read_batch(graph)
    }

    #[rstest]
    fn reads_one_batch_at_a_time() {
        let mut graph: ResidualNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        let deltas = "r 6\nc EOI\nn 7 1\nn 1 -3\na 7 4 0 1 6\nc EOI\n";
        let mut importer = IncrementalImporter::new(deltas.as_bytes());

        assert!(importer.read_batch(&mut graph).unwrap());
        assert!(!graph.contains_node(6));
        assert_eq!(graph.num_arcs(), 6);

        assert!(importer.read_batch(&mut graph).unwrap());
        assert_eq!(graph.supply(7).unwrap(), 1);
        assert_eq!(graph.supply(1).unwrap(), -3);
        assert_eq!(graph.get_arc(7, 4).unwrap().cost(), 6);

        assert!(!importer.read_batch(&mut graph).unwrap());
    }

    #[rstest]
    fn changes_arcs() {
        let mut graph: ResidualNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        let deltas = "x 2 4 0 3 2\nx 2 5 0 1 9\nx 2 6 0 0 20\nx 3 4 0 1 3\nx 4 5 0 2 1\nx 5 4 0 0 1\n";
        assert!(apply(&mut graph, deltas).unwrap());

        assert_eq!(graph.get_arc(2, 4).unwrap().initial_capacity(), 3);
        assert_eq!(graph.get_arc(2, 5).unwrap().cost(), 9);
        assert!(graph.get_arc(2, 6).is_none());
        assert_eq!(graph.get_arc(3, 4).unwrap().cost(), 3);
        // a change of an absent arc becomes an add, a delete of an absent arc is ignored
        assert_eq!(graph.get_arc(4, 5).unwrap().initial_capacity(), 2);
        assert!(graph.get_arc(5, 4).is_none());
        assert_eq!(graph.num_arcs(), 9);
    }

    #[rstest]
    fn recoverable_anomalies_are_skipped() {
        let mut graph: ResidualNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        let deltas = "r 42\na 2 4 0 5 5\na 4 2 0 5 5\na 4 5 0 0 1\nc EOI\n";
        assert!(apply(&mut graph, deltas).unwrap());

        assert_eq!(graph.num_nodes(), 6);
        assert_eq!(graph.num_arcs(), 9);
        assert_eq!(graph.get_arc(2, 4).unwrap().initial_capacity(), 1);
    }

    #[rstest]
    fn change_of_reversed_arc_is_skipped() {
        let mut graph: ResidualNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        assert!(apply(&mut graph, "x 4 2 0 1 3\nc EOI\n").unwrap());

        assert!(graph.get_arc(4, 2).is_none());
        assert_eq!(graph.get_arc(2, 4).unwrap().cost(), 2);
        assert_eq!(graph.num_arcs(), 9);
    }

    #[rstest]
    fn new_node_takes_next_free_id() {
        let mut graph: ResidualNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        let deltas = "d 1 0 2\na 0 4 0 1 3\na 0 6 0 1 9\nn 1 -3\nc EOI\nr 5\nd 0 7 1\na 0 1 0 2 0\nc EOI\n";
        let mut importer = IncrementalImporter::new(deltas.as_bytes());

        assert!(importer.read_batch(&mut graph).unwrap());
        assert_eq!(graph.num_nodes(), 7);
        assert_eq!(graph.supply(7).unwrap(), 1);
        assert_eq!(graph.get_arc(7, 4).unwrap().cost(), 3);
        assert_eq!(graph.get_arc(7, 6).unwrap().cost(), 9);

        // the freed id comes back
        assert!(importer.read_batch(&mut graph).unwrap());
        assert!(graph.contains_node(5));
        assert_eq!(graph.supply(5).unwrap(), 0);
        assert_eq!(graph.get_arc(5, 1).unwrap().initial_capacity(), 2);
        assert_eq!(graph.adjacencies(5).count(), 1);
    }

    #[rstest]
    #[case::problem_line("c start\np min 2 0\n", 2)]
    #[case::unknown_type("q 1\n", 1)]
    #[case::missing_node("a 2 9 0 1 1\n", 1)]
    #[case::lower_bound("x 2 4 1 1 1\n", 1)]
    #[case::self_loop("a 2 2 0 1 1\n", 1)]
    #[case::bad_supply("n 7 x\n", 1)]
    #[case::placeholder_without_new_node("a 0 4 0 1 1\n", 1)]
    #[case::more_arcs_than_announced("d 1 0 1\na 0 4 0 1 1\na 0 5 0 1 1\n", 3)]
    #[case::new_node_before_arcs_of_previous("d 1 0 2\na 0 4 0 1 1\nd 1 0 1\n", 3)]
    fn fatal_errors(#[case] deltas: &str, #[case] expected_line: usize) {
        let mut graph: ResidualNetwork<i64> = parse_graph(SCHEDULING_NETWORK);
        assert!(matches!(apply(&mut graph, deltas), Err(FlowError::Parse { line, .. }) if line == expected_line));
    }
}
