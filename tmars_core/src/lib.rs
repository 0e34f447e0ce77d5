//! Core rust implementation of Thermodynamics-based Metabolic Analysis (TMA).
//!
//! A flux balance [`Model`](metabolic_model::model::Model) is augmented with log-activity
//! variables for its metabolites and Gibbs energy constraints for its reactions, see
//! [`thermo`].

pub mod configuration;
pub mod metabolic_model;
pub mod optimize;
pub mod thermo;
mod utils;

pub use thermo::activity::formulate_activities;
pub use thermo::assembler::{build_tma_problem, tma, TmaProblem};
pub use thermo::constraint::create_thermo_constraint;
