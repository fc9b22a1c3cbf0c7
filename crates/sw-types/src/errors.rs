use thiserror::Error;

/// Main error type for the Stepwise system
#[derive(Error, Debug)]
pub enum SwError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Model is not fitted: {0}")]
    NotFitted(String),

    #[error("Optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised by a sequential minimizer before or while it searches.
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Empty search space")]
    EmptySpace,

    #[error("Invalid distribution for {parameter}: {message}")]
    InvalidDistribution { parameter: String, message: String },

    #[error("Evaluation budget must be positive")]
    ZeroBudget,

    #[error("No trials completed with a finite loss")]
    NoCompletedTrials,
}

impl SwError {
    /// True for errors the caller caused by supplying a bad configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Optimizer(OptimizerError::EmptySpace)
                | Self::Optimizer(OptimizerError::InvalidDistribution { .. })
                | Self::Optimizer(OptimizerError::ZeroBudget)
        )
    }
}

/// Result type alias for Stepwise operations
pub type SwResult<T> = Result<T, SwError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::SwError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::SwError::Config(format!($($arg)*))
    };
}

/// Macro for creating evaluation errors
#[macro_export]
macro_rules! evaluation_error {
    ($($arg:tt)*) => {
        $crate::SwError::Evaluation(format!($($arg)*))
    };
}
