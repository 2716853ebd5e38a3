// Branch-and-bound MILP backend
//
// LP relaxations are solved with minilp. The search is depth-first: each node
// fixes some binaries to 0 or 1, solves the relaxation, and either prunes
// (bound no better than the incumbent), accepts (all binaries integral) or
// branches on the most fractional binary. A rounding heuristic turns
// fractional relaxations into incumbents early.
//
// Workers share one node stack, one incumbent, and the deadline. With a single
// thread the exploration order is fixed, so equal-objective ties always resolve
// to the first assignment found.

use super::{Comparison, MilpBackend, MilpModel, MilpOutcome, MilpSolution, SolveLimits, SolveStatus};
use super::model::Assignment;
use crate::error::{Result, SelectorError};
use crossbeam::atomic::AtomicCell;
use minilp::{ComparisonOp, OptimizationDirection, Problem};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Distance from 0/1 below which a binary counts as integral
const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// A node must beat the incumbent by more than this to be explored
const PRUNE_TOLERANCE: f64 = 1e-9;

/// How long an idle worker sleeps before re-checking the deadline
const IDLE_WAIT: Duration = Duration::from_millis(20);

/// Depth-first branch and bound over minilp relaxations
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

impl BranchAndBound {
    pub fn new() -> Self {
        Self
    }
}

impl MilpBackend for BranchAndBound {
    fn solve(
        &self,
        model: &MilpModel,
        limits: &SolveLimits,
        hint: Option<&[f64]>,
    ) -> Result<MilpOutcome> {
        let search = Search::new(model, limits.deadline);

        if let Some(hint) = hint {
            if model.is_feasible(hint) {
                search.offer(hint.to_vec(), model.evaluate_objective(hint));
            } else {
                tracing::debug!("Ignoring infeasible starting hint");
            }
        }

        // The root is always evaluated, even past the deadline
        let root = Node {
            fixings: Vec::new(),
            parent_bound: f64::NEG_INFINITY,
        };
        let children = search.expand(root)?;
        search.lock_frontier().stack.extend(children);

        if limits.threads <= 1 {
            search.run_worker();
        } else {
            crossbeam::scope(|scope| {
                for _ in 0..limits.threads {
                    scope.spawn(|_| search.run_worker());
                }
            })
            .map_err(|_| SelectorError::Solver("branch-and-bound worker panicked".into()))?;
        }

        search.finish()
    }

    fn name(&self) -> &'static str {
        "branch-and-bound (minilp)"
    }
}

/// Subproblem: binaries fixed along the path from the root
#[derive(Debug, Clone)]
struct Node {
    fixings: Vec<(usize, f64)>,
    parent_bound: f64,
}

#[derive(Debug, Default)]
struct Frontier {
    stack: Vec<Node>,
    busy: usize,
    stop: bool,
}

enum Relaxation {
    Infeasible,
    Solved { values: Vec<f64>, objective: f64 },
}

struct Search<'a> {
    model: &'a MilpModel,
    binaries: Vec<usize>,
    deadline: Instant,
    frontier: Mutex<Frontier>,
    wakeup: Condvar,
    incumbent: Mutex<Option<Assignment>>,
    best_objective: AtomicCell<f64>,
    nodes: AtomicUsize,
    timed_out: AtomicBool,
    failure: Mutex<Option<SelectorError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<'a> Search<'a> {
    fn new(model: &'a MilpModel, deadline: Instant) -> Self {
        Self {
            model,
            binaries: model.binary_variables(),
            deadline,
            frontier: Mutex::new(Frontier::default()),
            wakeup: Condvar::new(),
            incumbent: Mutex::new(None),
            best_objective: AtomicCell::new(f64::INFINITY),
            nodes: AtomicUsize::new(0),
            timed_out: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    fn lock_frontier(&self) -> MutexGuard<'_, Frontier> {
        lock(&self.frontier)
    }

    fn run_worker(&self) {
        while let Some(node) = self.next_node() {
            let children = match self.expand(node) {
                Ok(children) => children,
                Err(e) => {
                    *lock(&self.failure) = Some(e);
                    self.lock_frontier().stop = true;
                    Vec::new()
                }
            };
            let mut frontier = self.lock_frontier();
            frontier.busy -= 1;
            frontier.stack.extend(children);
            self.wakeup.notify_all();
        }
    }

    fn next_node(&self) -> Option<Node> {
        let mut frontier = self.lock_frontier();
        loop {
            if frontier.stop {
                return None;
            }
            if frontier.stack.is_empty() && frontier.busy == 0 {
                frontier.stop = true;
                self.wakeup.notify_all();
                return None;
            }
            if Instant::now() >= self.deadline {
                self.timed_out.store(true, Ordering::SeqCst);
                frontier.stop = true;
                self.wakeup.notify_all();
                return None;
            }
            if let Some(node) = frontier.stack.pop() {
                frontier.busy += 1;
                return Some(node);
            }
            frontier = self
                .wakeup
                .wait_timeout(frontier, IDLE_WAIT)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// Evaluate one node and return its children (possibly none)
    fn expand(&self, node: Node) -> Result<Vec<Node>> {
        self.nodes.fetch_add(1, Ordering::Relaxed);

        if self.is_dominated(node.parent_bound) {
            return Ok(Vec::new());
        }

        let (values, objective) = match solve_relaxation(self.model, &node.fixings)? {
            Relaxation::Infeasible => return Ok(Vec::new()),
            Relaxation::Solved { values, objective } => (values, objective),
        };

        if self.is_dominated(objective) {
            return Ok(Vec::new());
        }

        let Some(branch_var) = self.most_fractional(&values) else {
            self.offer(self.snap_binaries(values), objective);
            return Ok(Vec::new());
        };

        if let Some(rounded) = self.round_up(&values) {
            let rounded_objective = self.model.evaluate_objective(&rounded);
            self.offer(rounded, rounded_objective);
            if rounded_objective <= objective + PRUNE_TOLERANCE {
                return Ok(Vec::new());
            }
        }

        let mut down = node.fixings.clone();
        down.push((branch_var, 0.0));
        let mut up = node.fixings;
        up.push((branch_var, 1.0));

        // Stack order: the up branch is popped first
        Ok(vec![
            Node {
                fixings: down,
                parent_bound: objective,
            },
            Node {
                fixings: up,
                parent_bound: objective,
            },
        ])
    }

    fn is_dominated(&self, bound: f64) -> bool {
        bound >= self.best_objective.load() - PRUNE_TOLERANCE
    }

    /// Binary with value furthest from {0, 1}; lowest index wins ties
    fn most_fractional(&self, values: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for &i in &self.binaries {
            let distance = values[i].min(1.0 - values[i]);
            if distance <= INTEGRALITY_TOLERANCE {
                continue;
            }
            if best.map_or(true, |(_, d)| distance > d) {
                best = Some((i, distance));
            }
        }
        best.map(|(i, _)| i)
    }

    fn snap_binaries(&self, mut values: Vec<f64>) -> Vec<f64> {
        for &i in &self.binaries {
            values[i] = values[i].round();
        }
        values
    }

    /// Turn every binary with non-negligible value on; keep if still feasible
    fn round_up(&self, values: &[f64]) -> Option<Vec<f64>> {
        let mut rounded = values.to_vec();
        for &i in &self.binaries {
            rounded[i] = if values[i] > INTEGRALITY_TOLERANCE { 1.0 } else { 0.0 };
        }
        self.model.is_feasible(&rounded).then_some(rounded)
    }

    /// Record a feasible assignment if it strictly improves the incumbent
    fn offer(&self, values: Vec<f64>, objective: f64) {
        let mut incumbent = lock(&self.incumbent);
        let improves = incumbent
            .as_ref()
            .map_or(true, |current| objective < current.objective - PRUNE_TOLERANCE);
        if improves {
            tracing::trace!("New incumbent with objective {:.6}", objective);
            self.best_objective.store(objective);
            *incumbent = Some(Assignment { values, objective });
        }
    }

    fn finish(self) -> Result<MilpOutcome> {
        if let Some(e) = self.failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(e);
        }

        let timed_out = self.timed_out.load(Ordering::SeqCst);
        let nodes_explored = self.nodes.load(Ordering::Relaxed);
        let incumbent = self
            .incumbent
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        tracing::debug!(
            "Branch and bound explored {} nodes (timed out: {})",
            nodes_explored,
            timed_out
        );

        Ok(match (incumbent, timed_out) {
            (Some(assignment), timed_out) => MilpOutcome::Solved(MilpSolution {
                assignment,
                status: if timed_out {
                    SolveStatus::TimeLimit
                } else {
                    SolveStatus::Optimal
                },
                nodes_explored,
            }),
            (None, true) => MilpOutcome::NoSolution,
            (None, false) => MilpOutcome::Infeasible,
        })
    }
}

/// Solve the LP relaxation of `model` with some binaries fixed
fn solve_relaxation(model: &MilpModel, fixings: &[(usize, f64)]) -> Result<Relaxation> {
    let mut costs = vec![0.0; model.variables().len()];
    for &(var, coeff) in model.objective() {
        costs[var.index()] += coeff;
    }

    let mut bounds: Vec<(f64, f64)> = model.variables().iter().map(|v| (v.lower, v.upper)).collect();
    for &(i, value) in fixings {
        bounds[i] = (value, value);
    }

    let mut problem = Problem::new(OptimizationDirection::Minimize);
    let vars: Vec<minilp::Variable> = costs
        .iter()
        .zip(&bounds)
        .map(|(&cost, &range)| problem.add_var(cost, range))
        .collect();

    for constraint in model.constraints() {
        let expr: Vec<(minilp::Variable, f64)> = constraint
            .terms
            .iter()
            .map(|&(var, coeff)| (vars[var.index()], coeff))
            .collect();
        let op = match constraint.op {
            Comparison::Le => ComparisonOp::Le,
            Comparison::Ge => ComparisonOp::Ge,
            Comparison::Eq => ComparisonOp::Eq,
        };
        problem.add_constraint(expr, op, constraint.rhs);
    }

    match problem.solve() {
        Ok(solution) => Ok(Relaxation::Solved {
            values: vars.iter().map(|&v| solution[v]).collect(),
            objective: solution.objective(),
        }),
        Err(minilp::Error::Infeasible) => Ok(Relaxation::Infeasible),
        Err(e) => Err(SelectorError::Solver(format!(
            "LP relaxation failed: {:?}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{VarId, VarKind};

    /// min -(5a + 4b + 3c) s.t. 2a + 3b + c <= 5, a,b,c binary
    fn knapsack() -> (MilpModel, Vec<VarId>) {
        let mut model = MilpModel::new();
        let vars: Vec<VarId> = ["a", "b", "c"]
            .iter()
            .map(|n| model.add_variable(*n, VarKind::Binary, 0.0, 1.0))
            .collect();
        model.add_constraint(
            "capacity",
            vec![(vars[0], 2.0), (vars[1], 3.0), (vars[2], 1.0)],
            Comparison::Le,
            5.0,
        );
        model.set_objective(vec![(vars[0], -5.0), (vars[1], -4.0), (vars[2], -3.0)]);
        (model, vars)
    }

    fn limits(threads: usize) -> SolveLimits {
        SolveLimits::new(Duration::from_secs(10), threads)
    }

    fn solved(outcome: MilpOutcome) -> MilpSolution {
        match outcome {
            MilpOutcome::Solved(solution) => solution,
            other => panic!("Expected a solution, got {:?}", other),
        }
    }

    #[test]
    fn test_knapsack_optimum() {
        let (model, vars) = knapsack();
        let solution = solved(BranchAndBound.solve(&model, &limits(1), None).unwrap());

        // a + b = weight 5, value 9; a + c = weight 3, value 8
        assert!(solution.is_optimal());
        assert!((solution.assignment.objective + 9.0).abs() < 1e-6);
        assert_eq!(solution.assignment.value(vars[0]), 1.0);
        assert_eq!(solution.assignment.value(vars[1]), 1.0);
        assert_eq!(solution.assignment.value(vars[2]), 0.0);
    }

    #[test]
    fn test_knapsack_parallel_matches() {
        let (model, _) = knapsack();
        let solution = solved(BranchAndBound.solve(&model, &limits(4), None).unwrap());
        assert!(solution.is_optimal());
        assert!((solution.assignment.objective + 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        let mut model = MilpModel::new();
        let x = model.add_variable("x", VarKind::Binary, 0.0, 1.0);
        let y = model.add_variable("y", VarKind::Binary, 0.0, 1.0);
        model.add_constraint("both", vec![(x, 1.0), (y, 1.0)], Comparison::Ge, 3.0);
        model.set_objective(vec![(x, 1.0)]);

        let outcome = BranchAndBound.solve(&model, &limits(1), None).unwrap();
        assert_eq!(outcome, MilpOutcome::Infeasible);
    }

    #[test]
    fn test_integrality_enforced() {
        // LP optimum is x = 0.5; the binary forces a choice
        let mut model = MilpModel::new();
        let x = model.add_variable("x", VarKind::Binary, 0.0, 1.0);
        let y = model.add_variable("y", VarKind::Continuous, 0.0, 10.0);
        model.add_constraint("cover", vec![(x, 2.0), (y, 1.0)], Comparison::Ge, 1.0);
        model.set_objective(vec![(x, 1.0), (y, 0.6)]);

        let solution = solved(BranchAndBound.solve(&model, &limits(1), None).unwrap());
        // x = 0, y = 1 costs 0.6; x = 1, y = 0 costs 1.0
        assert_eq!(solution.assignment.value(x), 0.0);
        assert!((solution.assignment.value(y) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_expired_deadline_returns_hint() {
        let (model, _) = knapsack();
        let expired = SolveLimits::with_deadline(Instant::now(), 1);
        let hint = [0.0, 0.0, 1.0];

        let solution = solved(BranchAndBound.solve(&model, &expired, Some(&hint)).unwrap());
        // Only the root was evaluated; the search was cut short
        assert_eq!(solution.status, SolveStatus::TimeLimit);
        assert!(solution.assignment.objective <= -3.0);
    }

    #[test]
    fn test_infeasible_hint_ignored() {
        let (model, _) = knapsack();
        let hint = [1.0, 1.0, 1.0];
        let solution = solved(BranchAndBound.solve(&model, &limits(1), Some(&hint)).unwrap());
        assert!((solution.assignment.objective + 9.0).abs() < 1e-6);
    }
}
