//! Per-metabolite activity (log-concentration) variables
use indexmap::IndexMap;
use log::{debug, warn};

use crate::metabolic_model::model::Model;
use crate::optimize::variable::VariableRef;
use crate::thermo::TmaError;

/// Metabolite id -> handle of its activity variable
pub type ActivityMap = IndexMap<String, VariableRef>;

/// Id of the activity variable of a metabolite
pub fn activity_variable_id(metabolite_id: &str) -> String {
    format!("activity_{}", metabolite_id)
}

/// Create an activity variable for every metabolite of `model`
///
/// Every activity is fixed at [0, 0], i.e. at the reference concentration, until it is
/// widened with measured concentrations. Nothing is added if any of the variable ids
/// is already taken, so calling this twice on the same model fails with
/// [`TmaError::DuplicateVariable`].
///
/// # Examples
/// ```rust
/// use tmars_core::metabolic_model::metabolite::Metabolite;
/// use tmars_core::metabolic_model::model::Model;
/// use tmars_core::thermo::activity::formulate_activities;
/// let mut model = Model::new_empty();
/// model.add_metabolite(Metabolite::new("atp_c"));
/// let activities = formulate_activities(&mut model).unwrap();
/// let problem = model.problem().unwrap();
/// assert_eq!(problem.variable(activities["atp_c"]).unwrap().id, "activity_atp_c");
/// assert!(formulate_activities(&mut model).is_err());
/// ```
pub fn formulate_activities(model: &mut Model) -> Result<ActivityMap, TmaError> {
    let ids: Vec<(String, String)> = model
        .metabolites
        .keys()
        .map(|met_id| (met_id.clone(), activity_variable_id(met_id)))
        .collect();
    if ids.is_empty() {
        warn!("Model has no metabolites, no activity variables were created");
    }
    let problem = model.problem_mut()?;
    if let Some((_, taken)) = ids.iter().find(|(_, var_id)| problem.contains_variable(var_id)) {
        return Err(TmaError::DuplicateVariable(taken.clone()));
    }
    let mut activities = ActivityMap::with_capacity(ids.len());
    for (met_id, var_id) in ids {
        let variable = problem.add_new_variable(&var_id, 0., 0.)?;
        activities.insert(met_id, variable);
    }
    debug!("Created {} activity variables", activities.len());
    Ok(activities)
}
