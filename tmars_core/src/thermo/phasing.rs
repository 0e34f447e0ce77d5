//! Resolution of model metabolites to known compounds ("phasing")
//!
//! A reaction is phased once every one of its metabolites has been resolved to a compound
//! of a [`CompoundCache`]. Reactions which can't be resolved are reported back rather
//! than dropped silently.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;

/// Reference data for a compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    /// Identifier of the compound within the cache
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Other identifiers of the compound, either bare (`glc__D`) or namespaced
    /// (`kegg.compound:C00031`)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Standard transformed Gibbs energy of formation, kJ/mol
    #[serde(default)]
    pub formation_energy: Option<f64>,
    /// Uncertainty of the formation energy, kJ/mol
    #[serde(default)]
    pub formation_energy_uncertainty: f64,
}

/// On disk layout of a compound cache
#[derive(Serialize, Deserialize)]
struct JsonCompoundCache {
    compounds: Vec<Compound>,
}

/// Compounds indexed by id and by alias
#[derive(Debug, Clone, Default)]
pub struct CompoundCache {
    compounds: IndexMap<String, Compound>,
    /// alias -> position in `compounds`
    aliases: HashMap<String, usize>,
}

impl CompoundCache {
    /// Create a cache from a list of compounds
    ///
    /// When two compounds share an alias, the first one keeps it.
    pub fn new(compounds: Vec<Compound>) -> Result<Self, CacheError> {
        let mut cache = CompoundCache::default();
        for compound in compounds {
            if cache.compounds.contains_key(&compound.id) {
                return Err(CacheError::DuplicateCompound(compound.id));
            }
            let index = cache.compounds.len();
            for alias in std::iter::once(&compound.id).chain(compound.aliases.iter()) {
                if let Some(previous) = cache.aliases.get(alias) {
                    debug!(
                        "Alias {} of compound {} already belongs to compound at position {}",
                        alias, compound.id, previous
                    );
                    continue;
                }
                cache.aliases.insert(alias.clone(), index);
            }
            cache.compounds.insert(compound.id.clone(), compound);
        }
        Ok(cache)
    }

    /// Parse a cache from a JSON string of the form `{"compounds": [...]}`
    pub fn from_json_str(data: &str) -> Result<Self, CacheError> {
        let json_cache: JsonCompoundCache = serde_json::from_str(data)
            .map_err(|err| CacheError::UnableToParse(err.to_string()))?;
        CompoundCache::new(json_cache.compounds)
    }

    /// Read a cache from a JSON file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let data = fs::read_to_string(path)?;
        CompoundCache::from_json_str(&data)
    }

    /// Write the cache to a JSON file
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), CacheError> {
        let json_cache = JsonCompoundCache {
            compounds: self.compounds.values().cloned().collect(),
        };
        let data = serde_json::to_string_pretty(&json_cache)
            .map_err(|err| CacheError::UnableToParse(err.to_string()))?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Get a compound by its id
    pub fn get(&self, id: &str) -> Option<&Compound> {
        self.compounds.get(id)
    }

    /// Get a compound by its id or one of its aliases
    pub fn lookup(&self, alias: &str) -> Option<&Compound> {
        self.aliases
            .get(alias)
            .and_then(|index| self.compounds.get_index(*index))
            .map(|(_, compound)| compound)
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    /// Resolve a metabolite to a compound
    ///
    /// Tried in order: the metabolite id, the id without its compartment suffix (bare and
    /// as a `bigg.metabolite` accession), then every `namespace: accession(s)` entry of the
    /// metabolite annotation.
    pub fn resolve_metabolite(&self, metabolite: &Metabolite) -> Option<&Compound> {
        if let Some(compound) = self.lookup(&metabolite.id) {
            return Some(compound);
        }
        if let Some(base) = metabolite.base_id() {
            let found = self
                .lookup(base)
                .or_else(|| self.lookup(&format!("bigg.metabolite:{}", base)));
            if found.is_some() {
                return found;
            }
        }
        let annotation: Value = serde_json::from_str(metabolite.annotation.as_deref()?).ok()?;
        annotation
            .as_object()?
            .iter()
            .find_map(|(namespace, accessions)| match accessions {
                Value::String(accession) => self.lookup(&format!("{}:{}", namespace, accession)),
                Value::Array(values) => values
                    .iter()
                    .filter_map(Value::as_str)
                    .find_map(|accession| self.lookup(&format!("{}:{}", namespace, accession))),
                _ => None,
            })
    }
}

/// A reaction whose metabolites have been resolved to compounds
#[derive(Debug, Clone, PartialEq)]
pub struct PhasedReaction {
    /// Id of the reaction in the model
    pub id: String,
    /// Net stoichiometry over compounds, compound id -> coefficient
    pub compounds: IndexMap<String, f64>,
}

/// Outcome of phasing a set of reactions
#[derive(Debug, Clone, Default)]
pub struct PhasingOutcome {
    /// Phased reactions keyed by reaction id, in input order
    pub phased: IndexMap<String, PhasedReaction>,
    /// Ids of the reactions which could not be phased, in input order
    pub unresolved: Vec<String>,
}

/// Resolves model reactions to phased reactions
pub trait ReactionPhaser {
    /// Phase a single reaction, None if any of its metabolites can't be resolved
    fn phase_reaction(
        &self,
        reaction: &Reaction,
        metabolites: &IndexMap<String, Metabolite>,
    ) -> Option<PhasedReaction>;

    /// Phase every reaction, keeping track of the ones which could not be resolved
    fn phase_reactions<'r, I>(
        &self,
        reactions: I,
        metabolites: &IndexMap<String, Metabolite>,
    ) -> PhasingOutcome
    where
        I: IntoIterator<Item = &'r Reaction>,
        Self: Sized,
    {
        let mut outcome = PhasingOutcome::default();
        for reaction in reactions {
            match self.phase_reaction(reaction, metabolites) {
                Some(phased) => {
                    outcome.phased.insert(reaction.id.clone(), phased);
                }
                None => outcome.unresolved.push(reaction.id.clone()),
            }
        }
        outcome
    }
}

impl ReactionPhaser for CompoundCache {
    fn phase_reaction(
        &self,
        reaction: &Reaction,
        metabolites: &IndexMap<String, Metabolite>,
    ) -> Option<PhasedReaction> {
        let mut compounds: IndexMap<String, f64> = IndexMap::new();
        for (met_id, coefficient) in &reaction.metabolites {
            let compound = metabolites
                .get(met_id)
                .and_then(|met| self.resolve_metabolite(met));
            let Some(compound) = compound else {
                debug!(
                    "Metabolite {} of reaction {} could not be resolved",
                    met_id, reaction.id
                );
                return None;
            };
            *compounds.entry(compound.id.clone()).or_insert(0.) += coefficient;
        }
        compounds.retain(|_, coefficient| *coefficient != 0.);
        Some(PhasedReaction {
            id: reaction.id.clone(),
            compounds,
        })
    }
}

/// Errors raised while loading a compound cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Unable to read compound cache")]
    UnableToRead(#[from] std::io::Error),
    #[error("Unable to parse compound cache: {0}")]
    UnableToParse(String),
    #[error("Compound {0} appears more than once")]
    DuplicateCompound(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::metabolite::MetaboliteBuilder;
    use crate::metabolic_model::reaction::ReactionBuilder;

    const CACHE: &str = r#"{
"compounds": [
    {"id": "glucose", "aliases": ["bigg.metabolite:glc__D", "kegg.compound:C00031"], "formation_energy": -426.7, "formation_energy_uncertainty": 1.2},
    {"id": "g6p", "aliases": ["bigg.metabolite:g6p"]},
    {"id": "atp", "aliases": ["kegg.compound:C00002"]},
    {"id": "adp", "aliases": ["adp_c"]}
]
}"#;

    fn metabolite(id: &str, compartment: &str, annotation: Option<&str>) -> Metabolite {
        MetaboliteBuilder::default()
            .id(id)
            .compartment(Some(compartment.to_string()))
            .annotation(annotation.map(str::to_string))
            .build()
            .unwrap()
    }

    fn metabolites() -> IndexMap<String, Metabolite> {
        [
            metabolite("glc__D_c", "c", None),
            metabolite("glc__D_e", "e", None),
            metabolite("g6p_c", "c", None),
            metabolite("M_atp", "c", Some(r#"{"kegg.compound": ["C99999", "C00002"]}"#)),
            metabolite("adp_c", "c", None),
            metabolite("mystery_c", "c", Some(r#"{"sbo": "SBO:0000247"}"#)),
        ]
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect()
    }

    fn reaction(id: &str, metabolites: &[(&str, f64)]) -> Reaction {
        ReactionBuilder::default()
            .id(id)
            .metabolites(
                metabolites
                    .iter()
                    .map(|(m, c)| (m.to_string(), *c))
                    .collect(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn parse_cache() {
        let cache = CompoundCache::from_json_str(CACHE).unwrap();
        assert_eq!(cache.len(), 4);
        let glucose = cache.lookup("kegg.compound:C00031").unwrap();
        assert_eq!(glucose.id, "glucose");
        assert_eq!(glucose.formation_energy, Some(-426.7));
        assert_eq!(cache.get("g6p").unwrap().formation_energy, None);
        assert!(cache.lookup("glc__D").is_none());
    }

    #[test]
    fn duplicate_compound() {
        let data = r#"{"compounds": [{"id": "a"}, {"id": "a"}]}"#;
        assert!(matches!(
            CompoundCache::from_json_str(data),
            Err(CacheError::DuplicateCompound(id)) if id == "a"
        ));
        assert!(matches!(
            CompoundCache::from_json_str("not json"),
            Err(CacheError::UnableToParse(_))
        ));
    }

    #[test]
    fn file_round_trip() {
        let cache = CompoundCache::from_json_str(CACHE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compounds.json");
        cache.write_json(&path).unwrap();
        let reread = CompoundCache::read_json(&path).unwrap();
        assert_eq!(reread.len(), cache.len());
        assert_eq!(reread.lookup("adp_c").unwrap().id, "adp");
        assert!(matches!(
            CompoundCache::read_json(dir.path().join("missing.json")),
            Err(CacheError::UnableToRead(_))
        ));
    }

    #[test]
    fn resolve_metabolites() {
        let cache = CompoundCache::from_json_str(CACHE).unwrap();
        let mets = metabolites();
        // Compartment suffix stripped, then bigg namespace
        assert_eq!(cache.resolve_metabolite(&mets["glc__D_c"]).unwrap().id, "glucose");
        // Annotation array, second accession matches
        assert_eq!(cache.resolve_metabolite(&mets["M_atp"]).unwrap().id, "atp");
        // Direct alias
        assert_eq!(cache.resolve_metabolite(&mets["adp_c"]).unwrap().id, "adp");
        assert!(cache.resolve_metabolite(&mets["mystery_c"]).is_none());
    }

    #[test]
    fn phase_reactions_reports_unresolved() {
        let cache = CompoundCache::from_json_str(CACHE).unwrap();
        let mets = metabolites();
        let reactions = vec![
            reaction("HEX1", &[("glc__D_c", -1.), ("M_atp", -1.), ("g6p_c", 1.), ("adp_c", 1.)]),
            reaction("UNKNOWN", &[("glc__D_c", -1.), ("mystery_c", 1.)]),
            reaction("GLCt", &[("glc__D_e", -1.), ("glc__D_c", 1.)]),
            reaction("DANGLING", &[("not_in_model", -1.), ("g6p_c", 1.)]),
        ];
        let outcome = cache.phase_reactions(&reactions, &mets);
        assert_eq!(
            outcome.phased.keys().collect::<Vec<_>>(),
            vec!["HEX1", "GLCt"]
        );
        assert_eq!(outcome.unresolved, vec!["UNKNOWN", "DANGLING"]);

        let hex = &outcome.phased["HEX1"];
        assert_eq!(hex.compounds["glucose"], -1.);
        assert_eq!(hex.compounds["adp"], 1.);
        // Both sides resolve to glucose, the net stoichiometry is empty
        assert!(outcome.phased["GLCt"].compounds.is_empty());
    }
}
