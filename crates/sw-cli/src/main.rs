//! `stepwise-tune`: staged hyperparameter search over a CSV dataset.

mod data;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use sw_engine::{
    DecisionTreeRegressor, GradientBoostingRegressor, RidgeRegression, StageReport,
    StepwiseConfig, StepwiseOptimizer,
};
use sw_optimizer::SearchSpace;
use sw_types::{format_params, Dataset, Estimator, ParamSet};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelKind {
    /// Gradient-boosted regression trees
    Gbm,
    /// Single regression tree
    Tree,
    /// Ridge regression
    Ridge,
}

impl ModelKind {
    fn label(self) -> &'static str {
        match self {
            Self::Gbm => "gbm",
            Self::Tree => "tree",
            Self::Ridge => "ridge",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "stepwise-tune")]
#[command(about = "Greedy stage-by-stage hyperparameter tuning", long_about = None)]
struct Cli {
    /// Tuning file: `{"config": {...}, "stages": [...]}`
    #[arg(short, long)]
    config: PathBuf,

    /// Headed CSV of numeric columns
    #[arg(short, long)]
    data: PathBuf,

    /// Target column name (defaults to the last column)
    #[arg(short, long)]
    target: Option<String>,

    /// Estimator to tune
    #[arg(short, long, value_enum, default_value_t = ModelKind::Gbm)]
    model: ModelKind,

    /// Write the stage history as JSON
    #[arg(short, long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct TuningReport {
    model: String,
    best_params: ParamSet,
    best_score: Option<f64>,
    training_score: f64,
    stages: Vec<StageReport>,
}

fn tune<M>(
    model: M,
    stages: Vec<SearchSpace>,
    config: &StepwiseConfig,
    data: &Dataset,
) -> anyhow::Result<(ParamSet, Option<f64>, f64, Vec<StageReport>)>
where
    M: Estimator + Clone + Send + Sync,
{
    let mut opt = StepwiseOptimizer::from_config(model, stages, config)?;
    opt.fit(data)?;
    let training_score = opt.score(&data.features, &data.target)?;
    Ok((
        opt.best_params().clone(),
        opt.best_score(),
        training_score,
        opt.history().to_vec(),
    ))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let tuning = data::load_tuning_file(&cli.config)?;
    let dataset = data::load_csv(&cli.data, cli.target.as_deref())?;
    info!(
        "Tuning {} over {} stages ({} rows, {} features)",
        cli.model.label(),
        tuning.stages.len(),
        dataset.n_samples(),
        dataset.n_features()
    );

    let (best_params, best_score, training_score, stages) = match cli.model {
        ModelKind::Gbm => tune(GradientBoostingRegressor::new(), tuning.stages, &tuning.config, &dataset)?,
        ModelKind::Tree => tune(DecisionTreeRegressor::new(), tuning.stages, &tuning.config, &dataset)?,
        ModelKind::Ridge => tune(RidgeRegression::new(), tuning.stages, &tuning.config, &dataset)?,
    };

    println!("Best parameters: {}", format_params(&best_params));
    match best_score {
        Some(score) => println!("Best {}: {:.6}", tuning.config.scoring, score),
        None => println!("Best {}: n/a", tuning.config.scoring),
    }
    println!("Training R^2 of the final fit: {:.6}", training_score);

    if let Some(path) = cli.report {
        let report = TuningReport {
            model: cli.model.label().to_string(),
            best_params,
            best_score,
            training_score,
            stages,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
