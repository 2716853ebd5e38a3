// Solver-independent MILP description
//
// A model is plain data: variables with bounds and a kind, linear constraints,
// and a linear objective to minimize. Backends translate it into whatever
// their library needs.

use serde::{Deserialize, Serialize};

/// Relative slack used when checking constraints against a candidate point
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Handle to a variable of one `MilpModel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Continuous,
    /// Integer restricted to {0, 1}
    Binary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Le,
    Ge,
    Eq,
}

/// Σ coeff·var (op) rhs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub op: Comparison,
    pub rhs: f64,
}

impl Constraint {
    fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coeff)| coeff * values[var.index()])
            .sum()
    }

    /// Whether `values` satisfies this constraint within tolerance
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let lhs = self.lhs(values);
        let slack = FEASIBILITY_TOLERANCE * (1.0 + self.rhs.abs());
        match self.op {
            Comparison::Le => lhs <= self.rhs + slack,
            Comparison::Ge => lhs >= self.rhs - slack,
            Comparison::Eq => (lhs - self.rhs).abs() <= slack,
        }
    }
}

/// A minimization problem over continuous and binary variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilpModel {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Vec<(VarId, f64)>,
}

impl MilpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable with bounds `[lower, upper]`
    ///
    /// Binary variables are clamped to `[0, 1]`.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> VarId {
        let (lower, upper) = match kind {
            VarKind::Continuous => (lower, upper),
            VarKind::Binary => (lower.max(0.0), upper.min(1.0)),
        };
        self.variables.push(Variable {
            name: name.into(),
            kind,
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        op: Comparison,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            op,
            rhs,
        });
    }

    /// Replace the objective (always minimized)
    pub fn set_objective(&mut self, terms: Vec<(VarId, f64)>) {
        self.objective = terms;
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    /// Positions of all binary variables
    pub fn binary_variables(&self) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind == VarKind::Binary)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|&(var, coeff)| coeff * values[var.index()])
            .sum()
    }

    /// Check bounds, integrality and every constraint
    pub fn is_feasible(&self, values: &[f64]) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let in_bounds = self.variables.iter().zip(values).all(|(var, &x)| {
            let slack = FEASIBILITY_TOLERANCE * (1.0 + x.abs());
            let bounded = x >= var.lower - slack && x <= var.upper + slack;
            let integral = match var.kind {
                VarKind::Continuous => true,
                VarKind::Binary => x.abs() <= slack || (x - 1.0).abs() <= slack,
            };
            bounded && integral
        });
        in_bounds && self.constraints.iter().all(|c| c.is_satisfied(values))
    }
}

/// Values for every variable of a model plus the objective they reach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub values: Vec<f64>,
    pub objective: f64,
}

impl Assignment {
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }
}
