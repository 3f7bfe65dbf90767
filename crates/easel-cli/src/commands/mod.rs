pub mod analytics;
pub mod analyze;
pub mod common;
pub mod interventions;
pub mod resolve;
pub mod run;
