//! This module provides a struct for representing reactions
use derive_builder::Builder;
use indexmap::IndexMap;

use crate::configuration;
use crate::utils::hashing::hash_as_hex_string;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Metabolite stoichiometry of the reaction, metabolite id -> coefficient
    /// (negative for substrates, positive for products)
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lower flux bound
    #[builder(default = "configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Reaction {
    /// Whether the reaction is treated as a transporter
    ///
    /// A reaction with a single participating metabolite has no chemical transformation
    /// to estimate a Gibbs energy for, and is excluded from thermodynamic constraints.
    pub fn is_transport(&self) -> bool {
        self.metabolites.len() == 1
    }

    /// Determine the id to be associated with the forward reaction in the optimization problem
    ///
    /// # Note:
    /// The forward id is "{reaction_id}_forward"
    pub fn get_forward_id(&self) -> String {
        format!("{}_forward", &self.id)
    }

    /// Determine the id to be associated with the reverse reaction in the optimization problem
    ///
    /// # Note:
    /// The reverse id is "{reaction_id}_reverse_{hexidecimal hash of reaction_id}"
    pub fn get_reverse_id(&self) -> String {
        format!("{}_reverse_{}", &self.id, hash_as_hex_string(&self.id))
    }

    /// Bounds of the variable associated with the forward reaction
    pub(crate) fn get_forward_bounds(&self) -> (f64, f64) {
        (self.lower_bound.max(0f64), self.upper_bound.max(0f64))
    }

    /// Bounds of the variable associated with the reverse reaction
    pub(crate) fn get_reverse_bounds(&self) -> (f64, f64) {
        ((-self.upper_bound).max(0f64), (-self.lower_bound).max(0f64))
    }
}
