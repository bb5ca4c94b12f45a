use crate::minimum_cost_flow::bellman_ford::BellmanFord;
use crate::minimum_cost_flow::incremental_solver::{fit_potentials, is_balanced, IncrementalSolver};
use crate::minimum_cost_flow::status::Status;
use crate::minimum_cost_flow::task_assignment::TaskAssignment;
use crate::network::{FlowNetwork, Graph, ResidualNetwork};
use log::{debug, info, trace, warn};
use num_traits::{FromPrimitive, NumAssign, ToPrimitive};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Debug;
use std::ops::Neg;

/// When to stop scaling epsilon down. Everything but `Optimal` trades optimality for time.
#[derive(Default, PartialEq, Debug, Clone, Copy)]
pub enum Termination {
    #[default]
    Optimal,
    /// Stop once epsilon, in unscaled cost units, is at most the threshold.
    EpsilonOptimal(f64),
    /// Stop after this many refine iterations following the first one.
    FixedIterations(usize),
    /// Stop when an iteration changes the total cost by at most this fraction.
    CostThreshold(f64),
    /// Stop when an iteration moves fewer than this many tasks to another leaf.
    TaskAssignmentThreshold(usize),
}

enum Progress {
    Stateless,
    Cost(Option<f64>),
    Assignments(TaskAssignment, Option<BTreeMap<usize, usize>>),
}

pub struct CostScalingPushRelabel<Flow> {
    alpha: Flow,
    termination: Termination,
    // unscaled, exposed through IncrementalSolver
    potentials: Vec<Flow>,
    scaled_potentials: Vec<Flow>,
    refine_start_potentials: Vec<Flow>,
    current_arc: Vec<usize>,
    active_nodes: VecDeque<usize>,
    cost_scaling_factor: Flow,
    max_potential_increase: Flow,
    epsilon: Flow,
    num_iterations: usize,
}

impl<Flow> Default for CostScalingPushRelabel<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default + FromPrimitive + ToPrimitive,
{
    fn default() -> Self {
        Self {
            alpha: Flow::one() + Flow::one(),
            termination: Termination::default(),
            potentials: Vec::new(),
            scaled_potentials: Vec::new(),
            refine_start_potentials: Vec::new(),
            current_arc: Vec::new(),
            active_nodes: VecDeque::new(),
            cost_scaling_factor: Flow::one(),
            max_potential_increase: Flow::zero(),
            epsilon: Flow::zero(),
            num_iterations: 0,
        }
    }
}

impl<Flow> CostScalingPushRelabel<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default + FromPrimitive + ToPrimitive,
{
    // epsilon is divided by scaling_factor between refines; default scaling factor is 2
    pub fn new(scaling_factor: Flow) -> Self {
        assert!(scaling_factor > Flow::one());
        Self { alpha: scaling_factor, ..Self::default() }
    }

    pub fn with_termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    /// Epsilon at the end of the last solve, in scaled cost units.
    pub fn epsilon(&self) -> Flow {
        self.epsilon
    }

    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    /// Solves from zero potentials.
    pub fn solve(&mut self, network: &mut FlowNetwork<Flow>) -> Status {
        self.solve_from(network, &[])
    }

    // `potentials` are unscaled; missing entries count as zero
    fn solve_from(&mut self, network: &mut FlowNetwork<Flow>, potentials: &[Flow]) -> Status {
        let num_nodes = network.num_nodes();
        if (1..=num_nodes).fold(Flow::zero(), |sum, u| sum + network.balance(u)) != Flow::zero() {
            return Status::Unbalanced;
        }
        let Some(n) = Flow::from_usize(num_nodes.max(1)) else {
            warn!("{} nodes do not fit into the flow type", num_nodes);
            return Status::NotSolved;
        };

        self.cost_scaling_factor = self.alpha * n;
        self.scaled_potentials.clear();
        self.scaled_potentials.resize(num_nodes + 1, Flow::zero());
        for (scaled, &potential) in self.scaled_potentials.iter_mut().zip(potentials.iter()) {
            *scaled = potential * self.cost_scaling_factor;
        }
        self.current_arc.clear();
        self.current_arc.resize(num_nodes + 1, 0);
        self.num_iterations = 0;

        // any flow is epsilon-optimal for the largest reduced cost magnitude
        self.epsilon = (0..network.num_arcs())
            .map(|arc_id| {
                let reduced_cost = self.reduced_cost(network, arc_id, network.arc(arc_id).src());
                reduced_cost.max(-reduced_cost)
            })
            .fold(Flow::one(), |epsilon, magnitude| epsilon.max(magnitude));
        info!("cost scaling: {} nodes, {} arcs, initial epsilon {:?}", num_nodes, network.num_arcs(), self.epsilon);

        let mut progress = self.start_progress(network);
        if !self.refine(network, n) {
            return Status::Infeasible;
        }

        let mut carry_on = self.continue_running(network, &mut progress);
        while self.epsilon > Flow::one() && carry_on {
            self.epsilon = Flow::one().max((self.epsilon + self.alpha - Flow::one()) / self.alpha);
            if !self.refine(network, n) {
                return Status::Infeasible;
            }
            self.num_iterations += 1;
            carry_on = self.continue_running(network, &mut progress);
        }

        if self.epsilon > Flow::one() {
            info!("cost scaling: stopped at epsilon {:?} after {} iterations", self.epsilon, self.num_iterations);
            Status::Approximate
        } else {
            info!("cost scaling: optimal after {} iterations", self.num_iterations);
            Status::Optimal
        }
    }

    #[inline]
    fn reduced_cost(&self, network: &FlowNetwork<Flow>, arc_id: usize, from: usize) -> Flow {
        let arc = network.arc(arc_id);
        arc.directed_cost(from) * self.cost_scaling_factor - self.scaled_potentials[from] + self.scaled_potentials[arc.opposite(from)]
    }

    /// Turns the epsilon-optimal flow of the previous round into an epsilon-optimal flow for the
    /// current epsilon. Returns false when a potential grows beyond what a feasible problem allows.
    fn refine(&mut self, network: &mut FlowNetwork<Flow>, n: Flow) -> bool {
        // bring all arcs in kilter
        for arc_id in 0..network.num_arcs() {
            let arc = network.arc(arc_id);
            let (src, dst, capacity, flow) = (arc.src(), arc.dst(), arc.capacity(), arc.flow());
            let reduced_cost = self.reduced_cost(network, arc_id, src);
            if reduced_cost < Flow::zero() && capacity > Flow::zero() {
                network.push_flow_on(arc_id, src, capacity);
            } else if reduced_cost > Flow::zero() && flow > Flow::zero() {
                network.push_flow_on(arc_id, dst, flow);
            }
        }

        self.current_arc.fill(0);
        self.refine_start_potentials.clone_from(&self.scaled_potentials);
        self.max_potential_increase = (self.alpha + Flow::one() + Flow::one()) * n * self.epsilon;

        debug_assert!(self.active_nodes.is_empty());
        self.active_nodes.extend((1..=network.num_nodes()).filter(|&u| network.balance(u) > Flow::zero()));
        debug!("refine with epsilon {:?}: {} active nodes", self.epsilon, self.active_nodes.len());

        while let Some(u) = self.active_nodes.pop_front() {
            if !self.discharge(network, u) {
                self.active_nodes.clear();
                return false;
            }
        }
        true
    }

    // pushes along the current arc until u is inactive or relabeled
    fn discharge(&mut self, network: &mut FlowNetwork<Flow>, u: usize) -> bool {
        while network.balance(u) > Flow::zero() {
            let degree = network.adjacencies(u).len();
            if degree == 0 {
                debug!("node {} has excess {:?} and no arcs", u, network.balance(u));
                return false;
            }

            let arc_id = network.adjacencies(u)[self.current_arc[u]];
            let residual_capacity = network.residual_capacity(arc_id, u);
            if residual_capacity > Flow::zero() && self.reduced_cost(network, arc_id, u) < Flow::zero() {
                let amount = residual_capacity.min(network.balance(u));
                let v = network.arc(arc_id).opposite(u);
                let new_balance = network.push_flow_on(arc_id, u, amount);
                // this push just made v active
                if new_balance > Flow::zero() && new_balance <= amount {
                    self.active_nodes.push_back(v);
                }
                continue;
            }

            self.current_arc[u] += 1;
            if self.current_arc[u] == degree {
                self.current_arc[u] = 0;
                if !self.relabel(network, u) {
                    return false;
                }
                self.active_nodes.push_back(u);
                return true;
            }
        }
        true
    }

    fn relabel(&mut self, network: &FlowNetwork<Flow>, u: usize) -> bool {
        let mut new_potential = None;
        for &arc_id in network.adjacencies(u) {
            if network.residual_capacity(arc_id, u) <= Flow::zero() {
                continue;
            }
            let arc = network.arc(arc_id);
            let candidate = self.scaled_potentials[arc.opposite(u)] + arc.directed_cost(u) * self.cost_scaling_factor + self.epsilon;
            new_potential = Some(new_potential.map_or(candidate, |p: Flow| p.min(candidate)));
        }

        let Some(new_potential) = new_potential else {
            debug!("node {} has excess {:?} and no residual arc", u, network.balance(u));
            return false;
        };
        // feasible problems raise no potential by more than (alpha + 2) * n * epsilon within one refine, checked in every refine
        if new_potential - self.refine_start_potentials[u] > self.max_potential_increase {
            debug!("potential of node {} grew beyond {:?}", u, self.max_potential_increase);
            return false;
        }
        trace!("relabel {}: {:?} -> {:?}", u, self.scaled_potentials[u], new_potential);
        self.scaled_potentials[u] = new_potential;
        true
    }

    fn start_progress(&self, network: &FlowNetwork<Flow>) -> Progress {
        match self.termination {
            Termination::CostThreshold(_) => Progress::Cost(None),
            Termination::TaskAssignmentThreshold(_) => match TaskAssignment::new(network) {
                Ok(task_assignment) => Progress::Assignments(task_assignment, None),
                Err(err) => {
                    warn!("{}; running to optimality instead", err);
                    Progress::Stateless
                }
            },
            _ => Progress::Stateless,
        }
    }

    fn continue_running(&self, network: &FlowNetwork<Flow>, progress: &mut Progress) -> bool {
        match (self.termination, progress) {
            (Termination::Optimal, _) => true,
            (Termination::EpsilonOptimal(threshold), _) => match (self.epsilon.to_f64(), self.cost_scaling_factor.to_f64()) {
                (Some(epsilon), Some(factor)) => epsilon > threshold * factor,
                _ => true,
            },
            (Termination::FixedIterations(max_iterations), _) => self.num_iterations < max_iterations,
            (Termination::CostThreshold(minimum_factor), Progress::Cost(previous)) => {
                let Some(cost) = network.total_cost().to_f64() else {
                    return true;
                };
                let carry_on = match previous.replace(cost) {
                    None => true,
                    Some(previous) if previous == 0.0 => cost != 0.0,
                    Some(previous) => ((previous - cost) / previous).abs() > minimum_factor,
                };
                debug!("total cost {} after iteration {}", cost, self.num_iterations);
                carry_on
            }
            (Termination::TaskAssignmentThreshold(min_assignments), Progress::Assignments(task_assignment, previous)) => {
                let assignments = match task_assignment.assignments(network) {
                    Ok(assignments) => assignments,
                    Err(err) => {
                        warn!("{}", err);
                        return true;
                    }
                };
                let changed = match previous.as_ref() {
                    None => assignments.len(),
                    Some(previous) => TaskAssignment::num_changed(previous, &assignments),
                };
                debug!("{} task assignments changed in iteration {}", changed, self.num_iterations);
                *previous = Some(assignments);
                changed >= min_assignments
            }
            _ => true,
        }
    }

    // copies the flow of `network` into `graph`, which must have the same arcs
    fn write_flow(network: &FlowNetwork<Flow>, graph: &mut ResidualNetwork<Flow>) {
        for arc in network.arcs() {
            let current = graph.get_arc(arc.src(), arc.dst()).map_or(Flow::zero(), |residual_arc| residual_arc.flow());
            let delta = arc.flow() - current;
            let pushed = if delta > Flow::zero() {
                graph.push_flow(arc.src(), arc.dst(), delta)
            } else if delta < Flow::zero() {
                graph.push_flow(arc.dst(), arc.src(), -delta)
            } else {
                Ok(())
            };
            pushed.expect("both networks hold the same arcs");
        }
    }
}

impl<Flow> IncrementalSolver<Flow> for CostScalingPushRelabel<Flow>
where
    Flow: NumAssign + Neg<Output = Flow> + Ord + Copy + Debug + Default + FromPrimitive + ToPrimitive,
{
    fn run(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        self.potentials.clear();
        self.reoptimize(graph)
    }

    fn reoptimize(&mut self, graph: &mut ResidualNetwork<Flow>) -> Status {
        if !is_balanced(graph) {
            return Status::Unbalanced;
        }
        fit_potentials(&mut self.potentials, graph);

        let mut network = FlowNetwork::from(&*graph);
        let potentials = std::mem::take(&mut self.potentials);
        let status = self.solve_from(&mut network, &potentials);
        self.potentials = potentials;
        if status != Status::Optimal && status != Status::Approximate {
            return status;
        }
        Self::write_flow(&network, graph);

        let exact = match status {
            Status::Optimal => BellmanFord::optimal_potentials(graph),
            _ => None,
        };
        match exact {
            Some(potentials) => self.potentials = potentials,
            None => {
                for (potential, &scaled) in self.potentials.iter_mut().zip(self.scaled_potentials.iter()) {
                    *potential = scaled / self.cost_scaling_factor;
                }
            }
        }
        status
    }

    fn potentials(&self) -> &[Flow] {
        &self.potentials
    }

    fn potentials_mut(&mut self) -> &mut Vec<Flow> {
        &mut self.potentials
    }
}
