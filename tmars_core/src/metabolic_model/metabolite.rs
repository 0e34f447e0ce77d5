//! This module provides the metabolite struct representing a metabolite

use derive_builder::Builder;

/// Represents a metabolite
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(default = "None")]
    pub formula: Option<String>,
    /// Notes about the metabolite
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Metabolite annotations, stored as a JSON object string such as
    /// `{"kegg.compound": ["C00031"]}`
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Metabolite {
    /// Create a metabolite with only an id
    pub fn new(id: &str) -> Self {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: None,
            charge: 0,
            formula: None,
            notes: None,
            annotation: None,
        }
    }

    /// Id without the trailing `_{compartment}` suffix, if the metabolite has a compartment
    /// and its id carries it (`glc__D_c` -> `glc__D`)
    pub fn base_id(&self) -> Option<&str> {
        let compartment = self.compartment.as_ref()?;
        self.id
            .strip_suffix(compartment.as_str())
            .and_then(|s| s.strip_suffix('_'))
            .filter(|s| !s.is_empty())
    }
}
