//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

use crate::configuration;

/// A continuous variable in an optimization problem
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Variable {
    /// Used to identify the variable (must be unique within a problem)
    #[builder(setter(into))]
    pub id: String,
    /// Human-readable variable name
    #[builder(setter(into, strip_option), default = "None")]
    pub name: Option<String>,
    /// Lowest value the variable can take
    #[builder(default = "configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Highest value the variable can take
    #[builder(default = "configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Position of the variable in the problem, assigned when it is added
    #[builder(setter(skip))]
    pub(crate) index: usize,
}

impl Variable {
    /// Position of this variable within its problem
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the lower and upper bounds coincide
    pub fn is_fixed(&self) -> bool {
        self.lower_bound == self.upper_bound
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(
                f,
                "{} <= {} <= {}",
                self.lower_bound, name, self.upper_bound
            ),
            None => write!(
                f,
                "{} <= {} <= {}",
                self.lower_bound, self.id, self.upper_bound
            ),
        }
    }
}

/// Handle to a variable inside a [`Problem`](crate::optimize::problem::Problem)
///
/// Handles are only meaningful for the problem that issued them (or a clone of it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableRef(pub(crate) usize);

impl VariableRef {
    /// Position of the referenced variable
    pub fn index(&self) -> usize {
        self.0
    }
}
