// Mixed-integer linear programming capability layer
//
// Problems are described as data (`MilpModel`) and handed to a `MilpBackend`.
// The selection solver only talks to the trait, so the search engine can be
// swapped without touching the formulation.

mod branch_bound;
mod model;

pub use branch_bound::BranchAndBound;
pub use model::{Assignment, Comparison, Constraint, MilpModel, VarId, VarKind, Variable};

use crate::config::MAX_TIME_LIMIT_SECONDS;
use crate::error::Result;
use std::time::{Duration, Instant};

/// Time and parallelism limits for one solve
///
/// Threads only change how fast the search runs, never what it can find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveLimits {
    pub deadline: Instant,
    pub threads: usize,
}

impl SolveLimits {
    /// Limits starting now; time limits past the representable range are
    /// capped at the configuration maximum
    pub fn new(time_limit: Duration, threads: usize) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(time_limit)
            .unwrap_or_else(|| now + Duration::from_secs_f64(MAX_TIME_LIMIT_SECONDS));
        Self::with_deadline(deadline, threads)
    }

    pub fn with_deadline(deadline: Instant, threads: usize) -> Self {
        Self {
            deadline,
            threads: threads.max(1),
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// How much the backend can vouch for a returned assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The search finished; no better assignment exists
    Optimal,
    /// The deadline stopped the search; best incumbent found so far
    TimeLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MilpSolution {
    pub assignment: Assignment,
    pub status: SolveStatus,
    pub nodes_explored: usize,
}

impl MilpSolution {
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MilpOutcome {
    Solved(MilpSolution),
    /// The search finished without any feasible assignment
    Infeasible,
    /// The deadline expired before any feasible assignment was found
    NoSolution,
}

/// A MILP search engine
pub trait MilpBackend: Send + Sync {
    /// Minimize `model` within `limits`
    ///
    /// `hint` is an optional starting point. It is used as the first
    /// incumbent if it is feasible and ignored otherwise.
    fn solve(
        &self,
        model: &MilpModel,
        limits: &SolveLimits,
        hint: Option<&[f64]>,
    ) -> Result<MilpOutcome>;

    fn name(&self) -> &'static str;
}
