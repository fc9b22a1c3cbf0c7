//! Staged hyperparameter search.
//!
//! [`StepwiseOptimizer`] searches an ordered list of small parameter spaces
//! one after another. Each stage is minimized by the configured
//! [`Minimizer`] with every earlier stage's best values held fixed; the
//! stage's best candidate is normalized and merged into the accumulated
//! state, and after the last stage the model is fitted once with the
//! accumulated parameters.

use sw_optimizer::{Minimizer, SearchSpace, TpeMinimizer, Trials};
use sw_types::{
    config_error, format_params, Dataset, Estimator, OptimizerError, ParamSet, SwResult,
};
use tracing::info;

use crate::accumulator::BestState;
use crate::config::StepwiseConfig;
use crate::cv::{CrossValidator, KFoldValidator};
use crate::normalize::IntegerRules;
use crate::objective::Objective;
use crate::observer::{StageObserver, StageReport, TracingObserver};
use crate::scoring::Scoring;

pub struct StepwiseOptimizer<M, O = TpeMinimizer, C = KFoldValidator> {
    model: M,
    stages: Vec<SearchSpace>,
    max_evals_per_stage: usize,
    cv_folds: usize,
    scoring: Scoring,
    random_state: Option<u64>,
    rules: IntegerRules,
    minimizer: O,
    validator: C,
    observer: Box<dyn StageObserver>,
    best: BestState,
    history: Vec<StageReport>,
    stage_trials: Vec<Trials>,
}

impl<M: Estimator> StepwiseOptimizer<M> {
    /// Optimizer with the default settings of [`StepwiseConfig`].
    pub fn new(model: M, stages: Vec<SearchSpace>) -> Self {
        let config = StepwiseConfig::default();
        Self {
            model,
            stages,
            max_evals_per_stage: config.max_evals_per_stage,
            cv_folds: config.cv_folds,
            scoring: Scoring::default(),
            random_state: config.random_state,
            rules: config.integer_rules(),
            minimizer: TpeMinimizer::new(),
            validator: KFoldValidator::new(),
            observer: Box::new(TracingObserver),
            best: BestState::new(),
            history: Vec::new(),
            stage_trials: Vec::new(),
        }
    }

    /// Optimizer configured from a (possibly deserialized) config. Budget,
    /// fold count and scoring name are checked here.
    pub fn from_config(model: M, stages: Vec<SearchSpace>, config: &StepwiseConfig) -> SwResult<Self> {
        config.validate()?;
        let mut optimizer = Self::new(model, stages);
        optimizer.max_evals_per_stage = config.max_evals_per_stage;
        optimizer.cv_folds = config.cv_folds;
        optimizer.scoring = config.scoring()?;
        optimizer.random_state = config.random_state;
        optimizer.rules = config.integer_rules();
        optimizer.validator =
            KFoldValidator::new().with_shuffle(config.shuffle_folds, config.random_state);
        Ok(optimizer)
    }
}

impl<M, O, C> StepwiseOptimizer<M, O, C> {
    pub fn with_minimizer<O2: Minimizer>(self, minimizer: O2) -> StepwiseOptimizer<M, O2, C> {
        StepwiseOptimizer {
            model: self.model,
            stages: self.stages,
            max_evals_per_stage: self.max_evals_per_stage,
            cv_folds: self.cv_folds,
            scoring: self.scoring,
            random_state: self.random_state,
            rules: self.rules,
            minimizer,
            validator: self.validator,
            observer: self.observer,
            best: self.best,
            history: self.history,
            stage_trials: self.stage_trials,
        }
    }

    pub fn with_validator<C2>(self, validator: C2) -> StepwiseOptimizer<M, O, C2> {
        StepwiseOptimizer {
            model: self.model,
            stages: self.stages,
            max_evals_per_stage: self.max_evals_per_stage,
            cv_folds: self.cv_folds,
            scoring: self.scoring,
            random_state: self.random_state,
            rules: self.rules,
            minimizer: self.minimizer,
            validator,
            observer: self.observer,
            best: self.best,
            history: self.history,
            stage_trials: self.stage_trials,
        }
    }

    pub fn with_observer(mut self, observer: impl StageObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_integer_rules(mut self, rules: IntegerRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_max_evals(mut self, n: usize) -> Self {
        self.max_evals_per_stage = n;
        self
    }

    pub fn with_cv_folds(mut self, n: usize) -> Self {
        self.cv_folds = n;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// Configuration checks that run before any evaluation.
    pub fn validate(&self) -> SwResult<()> {
        if self.stages.is_empty() {
            return Err(config_error!("at least one search stage is required"));
        }
        if self.max_evals_per_stage == 0 {
            return Err(config_error!("max_evals_per_stage must be positive"));
        }
        if self.cv_folds < 2 {
            return Err(config_error!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            ));
        }
        for (idx, space) in self.stages.iter().enumerate() {
            space
                .validate()
                .map_err(|e| config_error!("stage {}: {}", idx + 1, e))?;
        }
        Ok(())
    }

    /// Accumulated best parameters, including those of completed stages
    /// when a later stage failed.
    pub fn best_params(&self) -> &ParamSet {
        self.best.params()
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.score()
    }

    pub fn history(&self) -> &[StageReport] {
        &self.history
    }

    /// Trial history of each completed stage.
    pub fn stage_trials(&self) -> &[Trials] {
        &self.stage_trials
    }

    pub fn stages(&self) -> &[SearchSpace] {
        &self.stages
    }

    pub fn integer_rules(&self) -> &IntegerRules {
        &self.rules
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }
}

impl<M, O, C> StepwiseOptimizer<M, O, C>
where
    M: Estimator,
    O: Minimizer,
    C: CrossValidator<M>,
{
    /// Search every stage, then fit the model once with the result.
    pub fn fit(&mut self, data: &Dataset) -> SwResult<&mut Self> {
        let (best_params, best_score) = self.run_stages(data)?;

        info!(
            "Fitting final model with {} (score {})",
            format_params(&best_params),
            best_score
        );
        self.model.set_params(&best_params)?;
        self.model.fit(&data.features, &data.target)?;
        Ok(self)
    }

    /// Staged search only; the model is left configured by the last
    /// evaluation and is not fitted.
    pub fn run_stages(&mut self, data: &Dataset) -> SwResult<(ParamSet, f64)> {
        self.validate()?;
        self.best.reset();
        self.history.clear();
        self.stage_trials.clear();
        if let Some(seed) = self.random_state {
            self.minimizer.seed(seed);
        }

        let total = self.stages.len();
        for (idx, space) in self.stages.iter().enumerate() {
            let stage = idx + 1;
            info!(
                "Optimizing step {}/{} with {} ({} evaluations)",
                stage,
                total,
                self.minimizer.name(),
                self.max_evals_per_stage
            );

            let mut trials = Trials::new();
            let stage_best = {
                let mut objective = Objective {
                    model: &mut self.model,
                    best: self.best.params(),
                    rules: &self.rules,
                    validator: &self.validator,
                    data,
                    folds: self.cv_folds,
                    scoring: &self.scoring,
                };
                let mut evaluate = |candidate: &ParamSet| objective.evaluate(candidate);
                self.minimizer.minimize(
                    &mut evaluate,
                    space,
                    self.max_evals_per_stage,
                    &mut trials,
                )?
            };

            let stage_params = self.rules.normalize(&stage_best)?;
            self.best.merge(&stage_params);
            let min_loss = trials
                .min_loss()
                .ok_or(OptimizerError::NoCompletedTrials)?;
            self.best.set_score(-min_loss);

            let report = StageReport {
                stage,
                total_stages: total,
                stage_name: space.name.clone(),
                stage_params,
                best_params: self.best.params().clone(),
                best_score: -min_loss,
                n_trials: trials.len(),
            };
            self.observer.on_stage_complete(&report);
            self.history.push(report);
            self.stage_trials.push(trials);
        }

        let score = self.best.score().ok_or(OptimizerError::NoCompletedTrials)?;
        Ok((self.best.params().clone(), score))
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> SwResult<Vec<f64>> {
        self.model.predict(x)
    }

    pub fn score(&self, x: &[Vec<f64>], y: &[f64]) -> SwResult<f64> {
        self.model.score(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use sw_optimizer::RandomMinimizer;
    use sw_types::{ParamValue, SwError};

    /// Records every reconfiguration and fit; predicts zeros once fitted.
    #[derive(Debug, Clone, Default)]
    struct RecordingModel {
        params: ParamSet,
        set_params_calls: usize,
        fit_calls: usize,
        fitted_with: Option<ParamSet>,
    }

    impl Estimator for RecordingModel {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> SwResult<()> {
            self.fit_calls += 1;
            self.fitted_with = Some(self.params.clone());
            Ok(())
        }

        fn predict(&self, x: &[Vec<f64>]) -> SwResult<Vec<f64>> {
            match self.fitted_with {
                Some(_) => Ok(vec![0.0; x.len()]),
                None => Err(SwError::NotFitted("RecordingModel".into())),
            }
        }

        fn set_params(&mut self, params: &ParamSet) -> SwResult<()> {
            self.set_params_calls += 1;
            if params.contains_key("bogus") {
                return Err(config_error!("unknown parameter bogus"));
            }
            self.params
                .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        }

        fn get_params(&self) -> ParamSet {
            self.params.clone()
        }
    }

    /// Scores the model's configuration analytically instead of fitting it.
    /// Best at max_depth = 3, reg_alpha = 0.7.
    #[derive(Clone, Default)]
    struct AnalyticValidator {
        calls: Rc<Cell<usize>>,
        seen: Rc<RefCell<Vec<ParamSet>>>,
        fail_on: Option<&'static str>,
    }

    impl CrossValidator<RecordingModel> for AnalyticValidator {
        fn cross_val_scores(
            &self,
            model: &RecordingModel,
            _data: &Dataset,
            folds: usize,
            _scoring: &Scoring,
        ) -> SwResult<Vec<f64>> {
            self.calls.set(self.calls.get() + 1);
            let params = model.get_params();
            self.seen.borrow_mut().push(params.clone());
            if let Some(name) = self.fail_on {
                if params.contains_key(name) {
                    return Err(SwError::Evaluation(format!("{name} broke a fold")));
                }
            }
            let depth = params.get("max_depth").and_then(ParamValue::as_f64).unwrap_or(0.0);
            let alpha = params.get("reg_alpha").and_then(ParamValue::as_f64).unwrap_or(0.0);
            let score = -((depth - 3.0).powi(2) + (alpha - 0.7).powi(2));
            Ok(vec![score; folds])
        }
    }

    #[derive(Clone, Default)]
    struct Collect(Rc<RefCell<Vec<StageReport>>>);

    impl StageObserver for Collect {
        fn on_stage_complete(&mut self, report: &StageReport) {
            self.0.borrow_mut().push(report.clone());
        }
    }

    fn data() -> Dataset {
        Dataset::new(
            (0..12).map(|i| vec![i as f64]).collect(),
            (0..12).map(|i| i as f64).collect(),
        )
        .unwrap()
    }

    fn stages() -> Vec<SearchSpace> {
        vec![
            SearchSpace::named("depth").add_uniform("max_depth", 1.0, 6.0),
            SearchSpace::named("alpha").add_uniform("reg_alpha_weight", 0.0, 1.0),
        ]
    }

    fn optimizer(
        stages: Vec<SearchSpace>,
        validator: AnalyticValidator,
    ) -> StepwiseOptimizer<RecordingModel, RandomMinimizer, AnalyticValidator> {
        StepwiseOptimizer::new(RecordingModel::default(), stages)
            .with_minimizer(RandomMinimizer::new())
            .with_validator(validator)
            .with_observer(crate::observer::NoopObserver)
            .with_integer_rules(IntegerRules::new(["max_depth"]))
            .with_max_evals(8)
            .with_cv_folds(3)
            .with_random_state(Some(7))
    }

    #[test]
    fn candidate_wins_over_accumulated_best() {
        let mut model = RecordingModel::default();
        let validator = AnalyticValidator::default();
        let mut best = ParamSet::new();
        best.insert("a".into(), ParamValue::Int(1));
        let rules = IntegerRules::none();
        let data = data();
        let scoring = Scoring::default();

        let mut candidate = ParamSet::new();
        candidate.insert("a".into(), ParamValue::Int(2));
        candidate.insert("b".into(), ParamValue::Int(3));

        let mut objective = Objective {
            model: &mut model,
            best: &best,
            rules: &rules,
            validator: &validator,
            data: &data,
            folds: 3,
            scoring: &scoring,
        };
        assert_eq!(objective.effective_params(&candidate).unwrap(), candidate);
        objective.evaluate(&candidate).unwrap();

        assert_eq!(validator.seen.borrow()[0], candidate);
        assert_eq!(best.get("a"), Some(&ParamValue::Int(1)));
    }

    #[test]
    fn loss_is_negated_mean_of_fold_scores() {
        let mut model = RecordingModel::default();
        let validator = AnalyticValidator::default();
        let best = ParamSet::new();
        let rules = IntegerRules::default();
        let data = data();
        let scoring = Scoring::default();
        let mut objective = Objective {
            model: &mut model,
            best: &best,
            rules: &rules,
            validator: &validator,
            data: &data,
            folds: 4,
            scoring: &scoring,
        };

        let mut candidate = ParamSet::new();
        candidate.insert("max_depth".into(), ParamValue::Float(5.9));
        // depth truncates to 5: score = -(4 + 0.49)
        let loss = objective.evaluate(&candidate).unwrap();
        assert!((loss - 4.49).abs() < 1e-12);
        assert_eq!(model.params["max_depth"], ParamValue::Int(5));
    }

    #[test]
    fn best_score_is_negated_minimum_stage_loss() {
        let mut opt = optimizer(stages(), AnalyticValidator::default());
        let (_, score) = opt.run_stages(&data()).unwrap();

        for (report, trials) in opt.history().iter().zip(opt.stage_trials()) {
            let min_loss = trials.losses().into_iter().fold(f64::INFINITY, f64::min);
            assert_eq!(report.best_score, -min_loss);
            assert_eq!(report.n_trials, 8);
        }
        assert_eq!(Some(score), opt.best_score());
        assert_eq!(score, opt.history().last().unwrap().best_score);
    }

    #[test]
    fn model_is_fitted_exactly_once() {
        let validator = AnalyticValidator::default();
        let calls = validator.calls.clone();
        let three_stages = vec![
            SearchSpace::new().add_uniform("max_depth", 1.0, 6.0),
            SearchSpace::new().add_uniform("reg_alpha", 0.0, 1.0),
            SearchSpace::new().add_choice("booster", vec!["gbtree".into(), "dart".into()]),
        ];
        let mut opt = optimizer(three_stages, validator).with_max_evals(7);
        opt.fit(&data()).unwrap();

        let model = opt.model();
        assert_eq!(model.fit_calls, 1);
        assert_eq!(model.set_params_calls, 3 * 7 + 1);
        assert_eq!(calls.get(), 3 * 7);
        assert_eq!(model.fitted_with.as_ref(), Some(opt.best_params()));
        assert_eq!(opt.best_params().len(), 3);
    }

    #[test]
    fn zero_budget_fails_before_any_cross_validation() {
        let validator = AnalyticValidator::default();
        let calls = validator.calls.clone();
        let mut opt = optimizer(stages(), validator).with_max_evals(0);

        let err = opt.fit(&data()).err().unwrap();
        assert!(err.is_config());
        assert_eq!(calls.get(), 0);
        assert_eq!(opt.model().fit_calls, 0);
    }

    #[test]
    fn empty_stage_lists_and_spaces_are_config_errors() {
        let mut none = optimizer(Vec::new(), AnalyticValidator::default());
        assert!(none.fit(&data()).err().unwrap().is_config());

        let validator = AnalyticValidator::default();
        let calls = validator.calls.clone();
        let mut hollow = optimizer(
            vec![SearchSpace::new().add_int("k", 1, 3), SearchSpace::new()],
            validator,
        );
        assert!(hollow.fit(&data()).err().unwrap().is_config());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn single_fold_is_a_config_error() {
        let mut opt = optimizer(stages(), AnalyticValidator::default()).with_cv_folds(1);
        assert!(opt.run_stages(&data()).unwrap_err().is_config());
    }

    #[test]
    fn rejected_parameter_name_aborts_the_run() {
        let mut opt = optimizer(
            vec![SearchSpace::new().add_uniform("bogus", 0.0, 1.0)],
            AnalyticValidator::default(),
        );
        assert!(opt.fit(&data()).err().unwrap().is_config());
        assert_eq!(opt.model().fit_calls, 0);
    }

    #[test]
    fn failed_stage_keeps_earlier_results_but_skips_final_fit() {
        let validator = AnalyticValidator {
            fail_on: Some("reg_alpha_weight"),
            ..AnalyticValidator::default()
        };
        let mut opt = optimizer(stages(), validator);

        let err = opt.fit(&data()).err().unwrap();
        assert!(matches!(err, SwError::Evaluation(_)));
        assert_eq!(opt.history().len(), 1);
        assert!(matches!(opt.best_params().get("max_depth"), Some(ParamValue::Int(_))));
        assert!(!opt.best_params().contains_key("reg_alpha_weight"));
        assert_eq!(opt.model().fit_calls, 0);
    }

    #[test]
    fn later_stages_evaluate_with_earlier_best_fixed() {
        let validator = AnalyticValidator::default();
        let seen = validator.seen.clone();
        let mut opt = optimizer(stages(), validator);
        opt.run_stages(&data()).unwrap();

        let stage_one_depth = opt.history()[0].best_params["max_depth"].clone();
        let seen = seen.borrow();
        let stage_two_evals = &seen[8..];
        assert_eq!(stage_two_evals.len(), 8);
        for params in stage_two_evals {
            assert_eq!(params["max_depth"], stage_one_depth);
        }
    }

    #[test]
    fn observer_sees_every_stage_boundary() {
        let collect = Collect::default();
        let reports = collect.0.clone();
        let mut opt = optimizer(stages(), AnalyticValidator::default()).with_observer(collect);
        opt.run_stages(&data()).unwrap();

        let reports = reports.borrow();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].stage, 1);
        assert_eq!(reports[0].stage_name.as_deref(), Some("depth"));
        assert_eq!(reports[1].total_stages, 2);
        assert_eq!(reports[1].best_params, *opt.best_params());
    }

    #[test]
    fn same_seed_reproduces_the_search() {
        let run = || {
            let mut opt = optimizer(stages(), AnalyticValidator::default());
            opt.run_stages(&data()).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn from_config_rejects_invalid_settings() {
        let zero_budget = StepwiseConfig::default().with_max_evals(0);
        let err = StepwiseOptimizer::from_config(RecordingModel::default(), stages(), &zero_budget)
            .err()
            .unwrap();
        assert!(err.is_config());

        let one_fold = StepwiseConfig::default().with_cv_folds(1);
        assert!(StepwiseOptimizer::from_config(RecordingModel::default(), stages(), &one_fold).is_err());

        let ok = StepwiseConfig::default().with_max_evals(3).with_cv_folds(2);
        assert!(StepwiseOptimizer::from_config(RecordingModel::default(), stages(), &ok).is_ok());
    }

    #[test]
    fn predict_before_fit_surfaces_model_error() {
        let opt = optimizer(stages(), AnalyticValidator::default());
        let err = opt.predict(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, SwError::NotFitted(_)));
        assert!(opt.score(&[vec![1.0]], &[1.0]).is_err());
    }
}
