//! Thermodynamic constraint of a single reaction
//!
//! For a reaction `R` the builder adds
//!
//! - `deltag0_R`, the standard Gibbs energy, bounded by the estimate ± its uncertainty
//! - `deltastd_R`, the Gibbs energy, `ΔG = ΔG° + RT Σ ln(activity_i)`
//! - `thermo_R`: `deltag0_R - deltastd_R + Σ RT * activity_i = 0`
//!
//! `deltastd_R` is pinned at [`DELTA_G_SENTINEL`] and the activities enter the sum with a
//! weight of RT regardless of their stoichiometric coefficient.
use log::debug;

use crate::metabolic_model::model::Model;
use crate::optimize::problem::ProblemError;
use crate::optimize::variable::VariableRef;
use crate::thermo::activity::{activity_variable_id, ActivityMap};
use crate::thermo::estimator::{GibbsEnergyEstimator, GibbsEstimate};
use crate::thermo::phasing::PhasedReaction;
use crate::thermo::TmaError;

/// Value both bounds of the Gibbs energy variable are fixed at
pub const DELTA_G_SENTINEL: f64 = 10e3;

/// Id of the standard Gibbs energy variable of a reaction
pub fn delta_g0_variable_id(reaction_id: &str) -> String {
    format!("deltag0_{}", reaction_id)
}

/// Id of the Gibbs energy variable of a reaction
pub fn delta_g_variable_id(reaction_id: &str) -> String {
    format!("deltastd_{}", reaction_id)
}

/// Id of the thermodynamic constraint of a reaction
pub fn thermo_constraint_id(reaction_id: &str) -> String {
    format!("thermo_{}", reaction_id)
}

/// Variables and constraint added for one reaction
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionThermo {
    /// Standard Gibbs energy variable
    pub delta_g0: VariableRef,
    /// Gibbs energy variable
    pub delta_g: VariableRef,
    /// Id of the thermodynamic constraint
    pub constraint: String,
    /// Estimate the standard Gibbs energy bounds were derived from
    pub estimate: GibbsEstimate,
}

/// Add the Gibbs energy variables and thermodynamic constraint of a phased reaction
///
/// The stoichiometry is read from the reaction of `model`, not from the phased reaction.
/// Every check (reaction present, activities present, estimate valid, ids free) runs before
/// anything is added, so on error `model` is left untouched.
///
/// # Parameters
/// - `phased_reaction`: reaction resolved by a [`ReactionPhaser`](crate::thermo::phasing::ReactionPhaser)
/// - `model`: model which already holds the activity variables
/// - `activities`: handles returned by [`formulate_activities`](crate::thermo::activity::formulate_activities)
/// - `estimator`: source of the standard Gibbs energy
/// - `rt`: gas constant times temperature, kJ/mol
pub fn create_thermo_constraint<E>(
    phased_reaction: &PhasedReaction,
    model: &mut Model,
    activities: &ActivityMap,
    estimator: &E,
    rt: f64,
) -> Result<ReactionThermo, TmaError>
where
    E: GibbsEnergyEstimator + ?Sized,
{
    if !(rt.is_finite() && rt > 0.) {
        return Err(TmaError::InvalidGasConstantProduct(rt));
    }
    let reaction_id = phased_reaction.id.as_str();
    let reaction = model
        .reactions
        .get(reaction_id)
        .ok_or_else(|| TmaError::ReactionNotFound(reaction_id.to_string()))?;
    let missing_activity = |metabolite: &str| TmaError::MissingActivityVariable {
        reaction: reaction_id.to_string(),
        metabolite: metabolite.to_string(),
    };
    let mut activity_terms: Vec<(String, VariableRef)> =
        Vec::with_capacity(reaction.metabolites.len());
    for met_id in reaction.metabolites.keys() {
        let variable = activities
            .get(met_id)
            .copied()
            .ok_or_else(|| missing_activity(met_id))?;
        activity_terms.push((met_id.clone(), variable));
    }

    let estimate = estimator
        .dg0_prime(phased_reaction)
        .and_then(GibbsEstimate::validated)
        .map_err(|source| TmaError::EstimationFailure {
            reaction: reaction_id.to_string(),
            source,
        })?;

    let delta_g0_id = delta_g0_variable_id(reaction_id);
    let delta_g_id = delta_g_variable_id(reaction_id);
    let constraint_id = thermo_constraint_id(reaction_id);

    let problem = model.problem_mut()?;
    for (met_id, variable) in &activity_terms {
        let registered = problem
            .variable(*variable)
            .is_some_and(|v| v.id == activity_variable_id(met_id));
        if !registered {
            return Err(missing_activity(met_id));
        }
    }
    if let Some(taken) = [&delta_g0_id, &delta_g_id]
        .into_iter()
        .find(|id| problem.contains_variable(id))
    {
        return Err(TmaError::DuplicateVariable(taken.clone()));
    }
    if problem.contains_constraint(&constraint_id) {
        return Err(ProblemError::ConstraintAlreadyExists(constraint_id).into());
    }

    let delta_g0 =
        problem.add_new_variable(&delta_g0_id, estimate.lower_bound(), estimate.upper_bound())?;
    let delta_g = problem.add_new_variable(&delta_g_id, DELTA_G_SENTINEL, DELTA_G_SENTINEL)?;

    let mut variables = vec![delta_g0, delta_g];
    let mut coefficients = vec![1., -1.];
    for (_, variable) in &activity_terms {
        variables.push(*variable);
        coefficients.push(rt);
    }
    problem.add_new_equality_constraint(&constraint_id, &variables, &coefficients, 0.)?;
    debug!(
        "Added thermodynamic constraint {}",
        problem
            .describe_constraint(&constraint_id)
            .unwrap_or_default()
    );

    Ok(ReactionThermo {
        delta_g0,
        delta_g,
        constraint: constraint_id,
        estimate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::metabolite::Metabolite;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use crate::optimize::constraint::Constraint;
    use crate::thermo::activity::formulate_activities;
    use crate::thermo::estimator::EstimationError;
    use approx::assert_abs_diff_eq;
    use indexmap::IndexMap;

    /// Returns the same estimate for every reaction, or fails
    struct FixedEstimator(Option<GibbsEstimate>);

    impl GibbsEnergyEstimator for FixedEstimator {
        fn temperature(&self) -> f64 {
            298.15
        }

        fn dg0_prime(&self, reaction: &PhasedReaction) -> Result<GibbsEstimate, EstimationError> {
            self.0
                .ok_or_else(|| EstimationError::UnknownCompound(reaction.id.clone()))
        }
    }

    /// A -> B
    fn model() -> Model {
        let mut model = Model::new_empty();
        model.add_metabolite(Metabolite::new("A"));
        model.add_metabolite(Metabolite::new("B"));
        let metabolites: IndexMap<String, f64> =
            [("A".to_string(), -1.), ("B".to_string(), 1.)].into_iter().collect();
        model.add_reaction(
            ReactionBuilder::default()
                .id("R")
                .metabolites(metabolites)
                .build()
                .unwrap(),
        );
        model
    }

    fn phased(id: &str) -> PhasedReaction {
        PhasedReaction {
            id: id.to_string(),
            compounds: IndexMap::new(),
        }
    }

    #[test]
    fn builds_constraint_for_simple_reaction() {
        let mut model = model();
        let activities = formulate_activities(&mut model).unwrap();
        let estimator = FixedEstimator(Some(GibbsEstimate::new(-10., 2.)));
        let thermo =
            create_thermo_constraint(&phased("R"), &mut model, &activities, &estimator, 2.577)
                .unwrap();

        let problem = model.problem().unwrap();
        let dg0 = problem.variable(thermo.delta_g0).unwrap();
        assert_eq!(dg0.id, "deltag0_R");
        assert_abs_diff_eq!(dg0.lower_bound, -12.);
        assert_abs_diff_eq!(dg0.upper_bound, -8.);
        let dg = problem.variable(thermo.delta_g).unwrap();
        assert_eq!(dg.id, "deltastd_R");
        assert_eq!((dg.lower_bound, dg.upper_bound), (10000., 10000.));

        assert_eq!(thermo.constraint, "thermo_R");
        assert_eq!(
            problem.describe_constraint("thermo_R").unwrap(),
            "1*deltag0_R + -1*deltastd_R + 2.577*activity_A + 2.577*activity_B = 0"
        );
        assert!(matches!(
            problem.get_constraint("thermo_R"),
            Some(Constraint::Equality { equals, .. }) if *equals == 0.
        ));
    }

    #[test]
    fn constraint_holds_when_energies_balance() {
        let mut model = model();
        let activities = formulate_activities(&mut model).unwrap();
        let estimator = FixedEstimator(Some(GibbsEstimate::new(3., 1.)));
        let rt = 2.5;
        let thermo =
            create_thermo_constraint(&phased("R"), &mut model, &activities, &estimator, rt)
                .unwrap();
        let problem = model.problem().unwrap();
        let constraint = problem.get_constraint(&thermo.constraint).unwrap();

        // Arbitrary activities and ΔG, with ΔG0 = ΔG - Σ RT * activity_i
        for (a, b, dg) in [(0.3, -1.2, 7.), (0., 0., 10000.), (-4., 2., -3.5)] {
            let mut values = vec![0.; problem.num_variables()];
            values[activities["A"].index()] = a;
            values[activities["B"].index()] = b;
            values[thermo.delta_g.index()] = dg;
            values[thermo.delta_g0.index()] = dg - rt * (a + b);
            assert!(constraint.is_satisfied(&values, 1e-9));
            values[thermo.delta_g0.index()] += 1.;
            assert!(!constraint.is_satisfied(&values, 1e-9));
        }
    }

    #[test]
    fn unknown_reaction() {
        let mut model = model();
        let activities = formulate_activities(&mut model).unwrap();
        let estimator = FixedEstimator(Some(GibbsEstimate::new(0., 0.)));
        let res = create_thermo_constraint(&phased("Q"), &mut model, &activities, &estimator, 1.);
        assert!(matches!(res, Err(TmaError::ReactionNotFound(id)) if id == "Q"));
    }

    #[test]
    fn missing_activity() {
        let mut model = model();
        let mut activities = formulate_activities(&mut model).unwrap();
        activities.shift_remove("B");
        let before = model.problem().unwrap().num_variables();
        let estimator = FixedEstimator(Some(GibbsEstimate::new(0., 0.)));
        let res = create_thermo_constraint(&phased("R"), &mut model, &activities, &estimator, 1.);
        assert!(matches!(
            res,
            Err(TmaError::MissingActivityVariable { metabolite, .. }) if metabolite == "B"
        ));
        assert_eq!(model.problem().unwrap().num_variables(), before);
    }

    #[test]
    fn handle_from_wrong_variable() {
        let mut model = model();
        let mut activities = formulate_activities(&mut model).unwrap();
        // Point B at the activity of A
        let a = activities["A"];
        activities.insert("B".to_string(), a);
        let estimator = FixedEstimator(Some(GibbsEstimate::new(0., 0.)));
        let res = create_thermo_constraint(&phased("R"), &mut model, &activities, &estimator, 1.);
        assert!(matches!(res, Err(TmaError::MissingActivityVariable { .. })));
    }

    #[test]
    fn estimation_failure_leaves_model_untouched() {
        let mut model = model();
        let activities = formulate_activities(&mut model).unwrap();
        let before = model.problem().unwrap().num_variables();

        let failing = FixedEstimator(None);
        let res = create_thermo_constraint(&phased("R"), &mut model, &activities, &failing, 1.);
        assert!(matches!(res, Err(TmaError::EstimationFailure { .. })));

        let negative = FixedEstimator(Some(GibbsEstimate::new(-1., -3.)));
        let res = create_thermo_constraint(&phased("R"), &mut model, &activities, &negative, 1.);
        assert!(matches!(
            res,
            Err(TmaError::EstimationFailure {
                source: EstimationError::InvalidEstimate { .. },
                ..
            })
        ));

        let problem = model.problem().unwrap();
        assert_eq!(problem.num_variables(), before);
        assert!(!problem.contains_constraint("thermo_R"));
    }

    #[test]
    fn duplicate_variables() {
        let mut model = model();
        let activities = formulate_activities(&mut model).unwrap();
        let estimator = FixedEstimator(Some(GibbsEstimate::new(0., 1.)));
        create_thermo_constraint(&phased("R"), &mut model, &activities, &estimator, 1.).unwrap();
        let res = create_thermo_constraint(&phased("R"), &mut model, &activities, &estimator, 1.);
        assert!(matches!(res, Err(TmaError::DuplicateVariable(id)) if id == "deltag0_R"));
    }

    #[test]
    fn invalid_rt() {
        let mut model = model();
        let activities = formulate_activities(&mut model).unwrap();
        let estimator = FixedEstimator(Some(GibbsEstimate::new(0., 1.)));
        for rt in [0., -1., f64::NAN] {
            let res =
                create_thermo_constraint(&phased("R"), &mut model, &activities, &estimator, rt);
            assert!(matches!(res, Err(TmaError::InvalidGasConstantProduct(_))));
        }
    }
}
