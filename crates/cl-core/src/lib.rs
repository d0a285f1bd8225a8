//! catlearn core library.
//!
//! Hierarchical Normal-Inverse-Wishart model of perceptual category learning.
//! Validated data ([`data::ModelData`]) and a parameter draw
//! ([`params::ModelParams`]) go in; a scalar log density, per-cell
//! beliefs, per-trial category probabilities, and report matrices come out.

pub mod data;
pub mod density;
pub mod exit_codes;
pub mod hyper;
pub mod logging;
pub mod matrix;
pub mod params;
pub mod predictive;
pub mod report;
pub mod schema;
pub mod update;

pub use data::{DataError, ModelData, RawModelData, SufficientStatistics, TestTrial};
pub use density::{CategoryLearningModel, DensityBreakdown, DensityError, LogDensity, PriorTerms};
pub use hyper::Hyperparameters;
pub use params::{CorrCholesky, ModelParams, ParamError, ParameterLayout, ParamsFile};
pub use predictive::TrialProbabilities;
pub use report::{decompose, report_draw, CovarianceParts, DrawReport};
pub use update::{niw_update, Beliefs, NiwPrior, PosteriorState, PredictiveScale};
