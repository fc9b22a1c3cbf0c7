//! # sw-optimizer
//!
//! Search spaces and sequential minimization for Stepwise.
//!
//! Provides search-space descriptors, per-stage trial history, the
//! [`Minimizer`] capability consumed by the staged engine, and two backends:
//! a tree-structured Parzen estimator and plain random search.

mod minimizer;
mod random;
mod search;
mod tpe;
mod trial;

pub use minimizer::Minimizer;
pub use random::RandomMinimizer;
pub use search::{ParameterDef, ParameterKind, SearchSpace};
pub use tpe::TpeMinimizer;
pub use trial::{Trial, TrialStatus, Trials};
