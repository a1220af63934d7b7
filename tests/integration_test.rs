//! Integration tests across the evaluation pipeline.
//!
//! Tests cover:
//! - Backtest engine on a known four-bar series
//! - No look-ahead: a position never influences its own bar or earlier bars
//! - Engine/environment equivalence under the same action sequence
//! - Clamping, strict mode and zero-cost accounting
//! - Drawdown bounds and metric edge cases
//! - Seeded baselines, rollout and strategy comparison through the ports

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use proptest::prelude::*;
use signalbench::domain::backtest::{self, BacktestConfig};
use signalbench::domain::baselines::{
    AlwaysFlat, AlwaysLong, RandomPolicy, RandomPositions, ScriptedPolicy,
};
use signalbench::domain::comparison;
use signalbench::domain::environment::{EnvironmentConfig, TradingEnvironment};
use signalbench::domain::error::SignalbenchError;
use signalbench::domain::metrics::{self, Metrics, MetricsConfig};
use signalbench::domain::normalizer;
use signalbench::domain::position::{Position, to_signal};
use signalbench::domain::strategy::{BatchStrategy, rollout};
use signalbench::ports::data_port::{PositionSource, SeriesSource};

fn closes_and_positions() -> impl Strategy<Value = (Vec<f64>, Vec<i64>)> {
    (3usize..60).prop_flat_map(|n| {
        (
            prop::collection::vec(50.0..150.0_f64, n),
            prop::collection::vec(-1i64..=1, n),
        )
    })
}

fn environment(series: &Series, cost: f64) -> TradingEnvironment {
    let config = EnvironmentConfig::from(&BacktestConfig::with_cost(cost));
    TradingEnvironment::with_fitted_stats(series, &[FEATURE.to_string()], &config).unwrap()
}

mod backtest_engine {
    use super::*;

    #[test]
    fn four_bar_scenario_through_ports() {
        let source = MockSeriesSource {
            series: Some(series_from_closes(&[100.0, 101.0, 100.0, 102.0])),
        };
        let positions = MockPositionSource {
            positions: vec![0, 1, 1, -1],
        };
        let series = source.load_series().unwrap();
        let signal = positions.load_positions().unwrap();
        let result = backtest::run(
            &series,
            signal.aligned_to(&series).unwrap(),
            &BacktestConfig::with_cost(0.0001),
        )
        .unwrap();
        let r = &result.records;

        assert_eq!(r[0].net_return, 0.0);
        assert_eq!(r[1].net_return, 0.0);
        assert_eq!(r[2].position_applied, 1);
        assert_eq!(r[2].trade_magnitude, 1);
        assert_abs_diff_eq!(r[2].net_return, -0.01005, epsilon = 1e-4);
        assert_eq!(r[3].trade_magnitude, 0);
        assert_abs_diff_eq!(r[3].net_return, (102.0f64 / 100.0).ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(result.final_equity(), 1.0098, epsilon = 1e-4);
    }

    #[test]
    fn missing_series_surfaces_data_error() {
        let source = MockSeriesSource { series: None };
        assert!(matches!(
            source.load_series(),
            Err(SignalbenchError::Data { .. })
        ));
    }

    #[test]
    fn zero_cost_equity_is_exp_of_gross_sum() {
        let closes = random_walk(200, 3);
        let series = series_from_closes(&closes);
        let positions = to_signal(
            &RandomPositions { seed: 11 }
                .produce_positions(&series)
                .unwrap(),
        );
        let result = backtest::run(&series, &positions, &BacktestConfig::with_cost(0.0)).unwrap();

        let gross: f64 = result.gross_returns().iter().sum();
        assert_abs_diff_eq!(result.final_equity(), gross.exp(), epsilon = 1e-9);
        assert!(result.records.iter().all(|r| r.cost == 0.0));
    }

    #[test]
    fn out_of_range_positions_are_clamped_and_reported() {
        let series = series_from_closes(&[100.0, 101.0, 102.0, 103.0]);
        let result =
            backtest::run(&series, &[5, -3, 0, 2], &BacktestConfig::with_cost(0.0)).unwrap();

        let applied: Vec<i64> = result.records.iter().map(|r| r.position_applied).collect();
        assert_eq!(applied, vec![0, 1, -1, 0]);
        assert_eq!(result.clamped.len(), 3);
        assert_eq!(result.clamped[0].raw, 5);
        assert_eq!(result.clamped[0].applied, Position::Long);
    }

    #[test]
    fn strict_mode_rejects_out_of_range_positions() {
        let series = series_from_closes(&[100.0, 101.0, 102.0]);
        let config = BacktestConfig {
            strict_positions: true,
            ..BacktestConfig::default()
        };
        let err = backtest::run(&series, &[0, 2, 0], &config).unwrap_err();
        assert!(matches!(
            err,
            SignalbenchError::PositionOutOfRange { index: 1, value: 2 }
        ));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let series = series_from_closes(&[100.0, 101.0, 102.0]);
        let err = backtest::run(&series, &[0, 1], &BacktestConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SignalbenchError::LengthMismatch {
                series: 3,
                other: 2,
                ..
            }
        ));
    }

    proptest! {
        /// Changing the position at bar j never changes records 0..=j.
        #[test]
        fn no_lookahead(
            (closes, positions) in closes_and_positions(),
            pick in any::<prop::sample::Index>(),
            replacement in -1i64..=1,
        ) {
            let series = series_from_closes(&closes);
            let config = BacktestConfig::with_cost(0.0002);
            let j = pick.index(positions.len());

            let mut altered = positions.clone();
            altered[j] = replacement;

            let a = backtest::run(&series, &positions, &config).unwrap();
            let b = backtest::run(&series, &altered, &config).unwrap();
            prop_assert_eq!(&a.records[..=j], &b.records[..=j]);
        }

        /// Out-of-range inputs behave exactly like their clamped values.
        #[test]
        fn clamping_matches_clamped_input(
            (closes, positions) in closes_and_positions(),
            scale in 1i64..5,
        ) {
            let series = series_from_closes(&closes);
            let config = BacktestConfig::with_cost(0.0001);
            let scaled: Vec<i64> = positions.iter().map(|p| p * scale).collect();

            let a = backtest::run(&series, &positions, &config).unwrap();
            let b = backtest::run(&series, &scaled, &config).unwrap();
            prop_assert_eq!(a.records, b.records);
        }
    }
}

mod environment_equivalence {
    use super::*;

    proptest! {
        #[test]
        fn rewards_match_engine_net_returns(
            (closes, mut positions) in closes_and_positions(),
            cost in 0.0..0.001_f64,
        ) {
            positions[0] = 0;
            let series = series_with_momentum(&closes);
            let actions: Vec<Position> = positions.iter().map(|&p| Position::clamp(p)).collect();

            let mut env = environment(&series, cost);
            let mut policy = ScriptedPolicy::new(actions[1..].to_vec());
            let episode = rollout(&mut env, &mut policy);

            let result = backtest::run(&series, &positions, &BacktestConfig::with_cost(cost)).unwrap();
            prop_assert_eq!(episode.steps(), closes.len() - 2);
            prop_assert_eq!(result.records[1].net_return, 0.0);
            for (k, reward) in episode.rewards.iter().enumerate() {
                prop_assert!((reward - result.records[k + 2].net_return).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn rollout_positions_reproduce_episode_in_engine() {
        let closes = random_walk(120, 5);
        let series = series_with_momentum(&closes);
        let mut env = environment(&series, 0.00005);
        let episode = rollout(&mut env, &mut RandomPolicy::new(42));

        assert_eq!(episode.positions.len(), series.len());
        assert_eq!(episode.positions[0], Position::Flat);

        let result = backtest::run(
            &series,
            &to_signal(&episode.positions),
            &BacktestConfig::with_cost(0.00005),
        )
        .unwrap();
        let engine_total: f64 = result.net_returns().iter().sum();
        assert_abs_diff_eq!(episode.total_reward, engine_total, epsilon = 1e-9);
    }

    #[test]
    fn environment_observations_use_supplied_stats() {
        let closes = random_walk(50, 8);
        let series = series_with_momentum(&closes);
        let stats = normalizer::fit(&series, &[FEATURE.to_string()]).unwrap();
        let mut env = TradingEnvironment::new(
            &series,
            stats.clone(),
            &EnvironmentConfig::from(&BacktestConfig::default()),
        )
        .unwrap();

        let observation = env.reset();
        let expected = normalizer::apply(&series.bars()[1].features, &stats).unwrap();
        assert_eq!(observation, expected);
        assert_eq!(env.observation_dim(), 1);
    }
}

mod metric_properties {
    use super::*;

    proptest! {
        #[test]
        fn drawdown_is_bounded((closes, positions) in closes_and_positions()) {
            let series = series_from_closes(&closes);
            let result = backtest::run(&series, &positions, &BacktestConfig::default()).unwrap();
            let (dd, duration) = metrics::compute_drawdown(&result.equity_curve());
            prop_assert!((-1.0..=0.0).contains(&dd));
            prop_assert!(duration < closes.len());
        }
    }

    #[test]
    fn always_flat_has_neutral_metrics() {
        let series = series_from_closes(&random_walk(100, 1));
        let result = comparison::evaluate(&series, &AlwaysFlat, &BacktestConfig::default()).unwrap();
        let m = Metrics::compute(&result, &MetricsConfig::default());

        assert_eq!(m.final_equity, 1.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.sharpe, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.trade_count, 0);
    }

    #[test]
    fn always_long_trades_once() {
        let series = series_from_closes(&random_walk(100, 2));
        let result = comparison::evaluate(&series, &AlwaysLong, &BacktestConfig::default()).unwrap();
        let m = Metrics::compute(&result, &MetricsConfig::default());
        assert_eq!(m.trade_count, 1);
        assert_eq!(m.bars, 100);
    }
}

mod baselines {
    use super::*;

    #[test]
    fn random_seed_42_is_deterministic_on_100_bars() {
        let series = series_from_closes(&random_walk(100, 0));
        let strategy = RandomPositions { seed: 42 };
        let first = strategy.produce_positions(&series).unwrap();
        for _ in 0..5 {
            assert_eq!(strategy.produce_positions(&series).unwrap(), first);
        }
        assert_eq!(first.len(), 100);
    }

    #[test]
    fn comparison_is_reproducible() {
        let series = series_from_closes(&random_walk(300, 4));
        let strategies: Vec<Box<dyn BatchStrategy>> = vec![
            Box::new(AlwaysLong),
            Box::new(AlwaysFlat),
            Box::new(RandomPositions { seed: 42 }),
        ];
        let config = BacktestConfig::default();
        let a = comparison::compare(&series, &strategies, &config, &MetricsConfig::default())
            .unwrap();
        let b = comparison::compare(&series, &strategies, &config, &MetricsConfig::default())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(
            comparison::best(&a).unwrap().metrics.final_equity,
            a.iter()
                .map(|r| r.metrics.final_equity)
                .fold(f64::MIN, f64::max)
        );
    }
}
