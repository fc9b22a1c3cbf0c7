//! # sw-engine
//!
//! Staged hyperparameter optimization for Stepwise.
//!
//! Provides:
//! - [`StepwiseOptimizer`]: greedy stage-by-stage search with warm-started context
//! - Integer normalization of parameters proposed on continuous scales
//! - K-fold cross-validation and scoring rules used as the search objective
//! - Stage observers for progress reporting
//! - Reference estimators (ridge, regression tree, gradient boosting)

pub mod accumulator;
pub mod config;
pub mod cv;
pub mod models;
pub mod normalize;
pub mod objective;
pub mod observer;
pub mod scoring;
pub mod stepwise;

pub use accumulator::BestState;
pub use config::StepwiseConfig;
pub use cv::{CrossValidator, KFold, KFoldValidator};
pub use models::{DecisionTreeRegressor, GradientBoostingRegressor, RidgeRegression};
pub use normalize::IntegerRules;
pub use objective::Objective;
pub use observer::{ChannelObserver, NoopObserver, StageObserver, StageReport, TracingObserver};
pub use scoring::{ScoreFn, Scoring};
pub use stepwise::StepwiseOptimizer;
