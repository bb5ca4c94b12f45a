//! Reads a DIMACS min-cost flow problem followed by delta batches from stdin. Prints the solution
//! of the problem and of every batch, each closed by `c EOI`.
//!
//! Usage: incremental_min_cost [ssp|relax|cost_scaling|cycle_canceling] [--potentials] [-v]

use incremental_flow::dimacs::{ExportOptions, Exporter, IncrementalImporter, OriginalImporter};
use incremental_flow::minimum_cost_flow::cost_scaling_push_relabel::CostScalingPushRelabel;
use incremental_flow::minimum_cost_flow::cycle_canceling::CycleCanceling;
use incremental_flow::minimum_cost_flow::dynamic_maintain_optimality::DynamicMaintainOptimality;
use incremental_flow::minimum_cost_flow::incremental_solver::IncrementalSolver;
use incremental_flow::minimum_cost_flow::relax::Relax;
use incremental_flow::minimum_cost_flow::status::Status;
use incremental_flow::minimum_cost_flow::successive_shortest_path::SuccessiveShortestPath;
use incremental_flow::minimum_cost_flow::task_assignment::TaskAssignment;
use incremental_flow::network::{Graph, ResidualNetwork};
use incremental_flow::FlowError;
use log::{info, warn, LevelFilter, Log, Metadata, Record};
use std::collections::BTreeMap;
use std::io::{stdin, stdout};
use std::process::ExitCode;
use std::time::Instant;

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5} {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn solver(name: &str) -> Option<Box<dyn IncrementalSolver<i64>>> {
    match name {
        "ssp" => Some(Box::new(SuccessiveShortestPath::<i64>::default())),
        "relax" => Some(Box::new(Relax::<i64>::default())),
        "cost_scaling" => Some(Box::new(CostScalingPushRelabel::<i64>::default())),
        "cycle_canceling" => Some(Box::new(CycleCanceling::<i64>::default())),
        _ => None,
    }
}

// None once an edit makes the network stop looking like a scheduling network
fn assignments(graph: &ResidualNetwork<i64>) -> Option<BTreeMap<usize, usize>> {
    TaskAssignment::new(graph).ok().and_then(|task_assignment| task_assignment.assignments(graph).ok())
}

fn run(mut solver: Box<dyn IncrementalSolver<i64>>, options: ExportOptions) -> Result<(), FlowError> {
    let mut input = stdin().lock();
    let mut exporter = Exporter::with_options(stdout().lock(), options);

    let mut graph: ResidualNetwork<i64> = OriginalImporter::new(&mut input).read()?;
    info!("read {} nodes and {} arcs", graph.num_nodes(), graph.num_arcs());

    let start = Instant::now();
    let status = solver.run(&mut graph);
    info!("initial solve: {:?} in {:?}", status, start.elapsed());
    if status != Status::Optimal {
        warn!("initial problem not solved to optimality");
    }
    exporter.write_flow(&graph, solver.potentials())?;

    let mut previous = assignments(&graph);

    let mut deltas = IncrementalImporter::new(&mut input);
    for round in 1.. {
        let more = {
            let mut dynamic = DynamicMaintainOptimality::new(&mut graph, solver.potentials_mut());
            deltas.read_batch(&mut dynamic)?
        };
        if !more {
            break;
        }

        let start = Instant::now();
        let status = solver.reoptimize(&mut graph);
        info!("round {}: {:?} in {:?}, cost {}", round, status, start.elapsed(), graph.total_cost());
        if status != Status::Optimal {
            warn!("round {} not solved to optimality", round);
        }

        let current = assignments(&graph);
        if let (Some(previous), Some(current)) = (&previous, &current) {
            info!("round {}: {} tasks changed placement", round, TaskAssignment::num_changed(previous, current));
        }
        previous = current;

        exporter.write_flow(&graph, solver.potentials())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|arg| arg == "-v");
    let options = ExportOptions { potentials: args.iter().any(|arg| arg == "--potentials"), ..ExportOptions::default() };
    let name = args.iter().find(|arg| !arg.starts_with('-')).map_or("ssp", |arg| arg.as_str());

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    }

    let Some(solver) = solver(name) else {
        eprintln!("unknown solver '{}', expected ssp, relax, cost_scaling or cycle_canceling", name);
        return ExitCode::FAILURE;
    };

    match run(solver, options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}
