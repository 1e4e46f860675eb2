//! A minimal linear-program description and a pluggable solver

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub terms: Vec<(usize, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub objective: f64,
    pub lower: f64,
    pub upper: f64,
}

/// A maximization problem over bounded continuous variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
}

impl LinearProgram {
    pub fn new() -> LinearProgram {
        LinearProgram::default()
    }

    /// Add a variable with objective coefficient and bounds, returning its index
    pub fn add_var(&mut self, objective: f64, lower: f64, upper: f64) -> usize {
        self.variables.push(Variable {
            objective,
            lower,
            upper,
        });
        self.variables.len() - 1
    }

    pub fn add_constraint(&mut self, terms: Vec<(usize, f64)>, relation: Relation, rhs: f64) {
        self.constraints.push(Constraint {
            terms,
            relation,
            rhs,
        });
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// Anything that can maximize a [`LinearProgram`]
///
/// Returns one value per variable, in the order they were added.
pub trait LpSolver {
    fn maximize(&self, program: &LinearProgram) -> Result<Vec<f64>>;
}

/// Dense simplex solver backed by `minilp`
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniLpSolver;

impl LpSolver for MiniLpSolver {
    fn maximize(&self, program: &LinearProgram) -> Result<Vec<f64>> {
        let mut problem = minilp::Problem::new(minilp::OptimizationDirection::Maximize);
        let vars: Vec<minilp::Variable> = program
            .variables()
            .iter()
            .map(|v| problem.add_var(v.objective, (v.lower, v.upper)))
            .collect();

        for constraint in program.constraints() {
            let mut expr = minilp::LinearExpr::empty();
            for &(var, coef) in &constraint.terms {
                expr.add(vars[var], coef);
            }
            let op = match constraint.relation {
                Relation::Le => minilp::ComparisonOp::Le,
                Relation::Ge => minilp::ComparisonOp::Ge,
                Relation::Eq => minilp::ComparisonOp::Eq,
            };
            problem.add_constraint(expr, op, constraint.rhs);
        }

        let solution = problem.solve().map_err(|e| match e {
            minilp::Error::Infeasible => Error::PricingInfeasible,
            _ => Error::PricingUnbounded,
        })?;
        // minilp reports some unbounded programs as an infinite optimum
        let values: Vec<f64> = vars.iter().map(|&v| solution[v]).collect();
        if !solution.objective().is_finite() || values.iter().any(|v| !v.is_finite()) {
            return Err(Error::PricingUnbounded);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_minilp_solves_small_program() {
        let mut lp = LinearProgram::new();
        let x = lp.add_var(1.0, 0.0, f64::INFINITY);
        let y = lp.add_var(2.0, 0.0, 3.0);
        lp.add_constraint(vec![(x, 1.0), (y, 1.0)], Relation::Le, 4.0);
        lp.add_constraint(vec![(x, 2.0), (y, 1.0)], Relation::Ge, 2.0);

        let values = MiniLpSolver.maximize(&lp).unwrap();
        assert_relative_eq!(values[x], 1.0, epsilon = 1e-9);
        assert_relative_eq!(values[y], 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_infeasible_program() {
        let mut lp = LinearProgram::new();
        let x = lp.add_var(1.0, 0.0, f64::INFINITY);
        lp.add_constraint(vec![(x, 1.0)], Relation::Le, 1.0);
        lp.add_constraint(vec![(x, 1.0)], Relation::Ge, 2.0);

        assert!(matches!(
            MiniLpSolver.maximize(&lp),
            Err(Error::PricingInfeasible)
        ));
    }

    #[test]
    fn test_unbounded_program() {
        let mut lp = LinearProgram::new();
        let x = lp.add_var(1.0, 0.0, f64::INFINITY);
        let y = lp.add_var(0.0, 0.0, f64::INFINITY);
        lp.add_constraint(vec![(x, 1.0), (y, -1.0)], Relation::Le, 1.0);

        assert!(matches!(
            MiniLpSolver.maximize(&lp),
            Err(Error::PricingUnbounded)
        ));
    }
}
