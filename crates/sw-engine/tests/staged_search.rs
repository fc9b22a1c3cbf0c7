//! End-to-end staged searches over the bundled estimators.

use sw_engine::{
    ChannelObserver, DecisionTreeRegressor, GradientBoostingRegressor, IntegerRules,
    KFoldValidator, RidgeRegression, Scoring, StepwiseConfig, StepwiseOptimizer,
};
use sw_optimizer::{SearchSpace, TpeMinimizer};
use sw_types::{Dataset, Estimator, ParamValue};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sw_engine=debug")
        .with_test_writer()
        .try_init();
}

/// Noise-free nonlinear target over two features.
fn regression_data() -> Dataset {
    let features: Vec<Vec<f64>> = (0..60)
        .map(|i| {
            let a = i as f64 / 10.0;
            let b = ((i * 7) % 13) as f64 / 4.0;
            vec![a, b]
        })
        .collect();
    let target = features
        .iter()
        .map(|r| (r[0]).sin() * 2.0 + 0.5 * r[1])
        .collect();
    Dataset::new(features, target).unwrap()
}

#[test]
fn two_stage_depth_then_alpha_scenario() {
    init_tracing();
    let data = regression_data();
    let stages = vec![
        SearchSpace::named("depth").add_uniform("max_depth", 1.0, 5.0),
        SearchSpace::named("regularization").add_uniform("reg_alpha", 0.0, 1.0),
    ];
    let model = GradientBoostingRegressor::new().with_n_estimators(20);

    let mut opt = StepwiseOptimizer::new(model, stages)
        .with_minimizer(TpeMinimizer::new().with_startup(5))
        .with_integer_rules(IntegerRules::new(["max_depth"]))
        .with_max_evals(20)
        .with_cv_folds(3)
        .with_random_state(Some(42));
    opt.fit(&data).unwrap();

    let history = opt.history();
    assert_eq!(history.len(), 2);
    assert!(matches!(history[0].best_params.get("max_depth"), Some(ParamValue::Int(1..=5))));
    assert!(!history[0].best_params.contains_key("reg_alpha"));

    let best = opt.best_params();
    assert!(matches!(best.get("max_depth"), Some(ParamValue::Int(_))));
    assert!(matches!(best.get("reg_alpha"), Some(ParamValue::Float(v)) if (0.0..=1.0).contains(v)));

    // The fitted model carries both keys at once.
    let fitted = opt.model().get_params();
    assert_eq!(fitted["max_depth"], best["max_depth"]);
    assert_eq!(fitted["reg_alpha"].as_f64(), best["reg_alpha"].as_f64());
    assert!(opt.score(&data.features, &data.target).unwrap() > 0.3);
    assert_eq!(opt.predict(&data.features).unwrap().len(), data.n_samples());
}

#[test]
fn default_rules_also_truncate_reg_alpha() {
    let data = regression_data();
    let stages = vec![SearchSpace::new().add_uniform("reg_alpha", 0.0, 1.0)];
    let mut opt = StepwiseOptimizer::new(GradientBoostingRegressor::new().with_n_estimators(5), stages)
        .with_max_evals(5)
        .with_cv_folds(3);
    opt.fit(&data).unwrap();

    assert_eq!(opt.best_params()["reg_alpha"], ParamValue::Int(0));
}

#[test]
fn stage_progression_keeps_earlier_keys() {
    let data = regression_data();
    let stages = vec![
        SearchSpace::new().add_quniform("max_depth", 1.0, 6.0, 1.0),
        SearchSpace::new()
            .add_int("min_samples_leaf", 1, 6)
            .add_quniform("max_depth", 1.0, 3.0, 1.0),
        SearchSpace::new().add_int("min_samples_split", 2, 10),
    ];
    let rules = IntegerRules::new(["max_depth"]);
    let mut opt = StepwiseOptimizer::new(DecisionTreeRegressor::new(), stages)
        .with_integer_rules(rules.clone())
        .with_max_evals(12)
        .with_cv_folds(4)
        .with_random_state(Some(3));
    opt.fit(&data).unwrap();

    let history = opt.history();
    for k in 1..history.len() {
        let before = &history[k - 1].best_params;
        let after = &history[k].best_params;
        let stage_names: Vec<&str> = opt.stages()[k].names().collect();

        for (name, value) in before {
            if !stage_names.contains(&name.as_str()) {
                assert_eq!(after.get(name), Some(value), "stage {} lost {}", k + 1, name);
            }
        }
        for name in &stage_names {
            let value = after.get(*name).unwrap_or_else(|| panic!("{name} missing"));
            if rules.contains(name) {
                assert!(matches!(value, ParamValue::Int(_)));
            }
        }
    }
    // Stage two re-searched max_depth in a narrower range and overwrote it.
    assert!(matches!(opt.best_params()["max_depth"], ParamValue::Int(1..=3)));
}

#[test]
fn config_driven_run_reports_over_channel() {
    let data = regression_data();
    let config: StepwiseConfig = serde_json::from_str(
        r#"{
            "max_evals_per_stage": 6,
            "cv_folds": 3,
            "scoring": "neg_mean_absolute_error",
            "random_state": 9,
            "integer_params": [],
            "shuffle_folds": true
        }"#,
    )
    .unwrap();
    let stages = vec![
        SearchSpace::new().add_log_uniform("alpha", 1e-3, 10.0),
        SearchSpace::new().add_choice(
            "fit_intercept",
            vec![ParamValue::Bool(true), ParamValue::Bool(false)],
        ),
    ];
    let (tx, rx) = crossbeam_channel::unbounded();

    let mut opt = StepwiseOptimizer::from_config(RidgeRegression::new(), stages, &config)
        .unwrap()
        .with_observer(ChannelObserver::new(tx));
    opt.fit(&data).unwrap();

    let reports: Vec<_> = rx.try_iter().collect();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.n_trials == 6));
    assert!(reports.iter().all(|r| r.best_score <= 0.0));
    assert!(opt.best_params().contains_key("alpha"));
    assert!(opt.best_params().contains_key("fit_intercept"));
}

#[test]
fn custom_scoring_and_sequential_folds() {
    let data = regression_data();
    let stages = vec![SearchSpace::new().add_int("max_depth", 1, 4)];
    let max_error = Scoring::custom("neg_max_error", |t: &[f64], p: &[f64]| {
        -t.iter().zip(p).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max)
    });

    let mut opt = StepwiseOptimizer::new(DecisionTreeRegressor::new(), stages)
        .with_validator(KFoldValidator::new().with_parallel(false))
        .with_scoring(max_error)
        .with_max_evals(8)
        .with_cv_folds(3);
    let (best, score) = opt.run_stages(&data).unwrap();

    assert!(score <= 0.0);
    assert!(matches!(best["max_depth"], ParamValue::Int(1..=4)));
    // run_stages alone never fits the held model
    assert!(opt.predict(&data.features).is_err());
}

#[test]
fn non_positive_budget_is_rejected_up_front() {
    let data = regression_data();
    let stages = vec![SearchSpace::new().add_int("max_depth", 1, 4)];
    let mut opt = StepwiseOptimizer::new(DecisionTreeRegressor::new(), stages).with_max_evals(0);

    let err = opt.fit(&data).err().unwrap();
    assert!(err.is_config());
    assert!(opt.best_params().is_empty());
    assert!(opt.history().is_empty());
}
