use spiralscore::config::Config;
use spiralscore::error::SpiralError;
use spiralscore::geometry::{CanvasGeometry, ReferenceSpiral};
use spiralscore::scorer::types::ScoreWarning;
use spiralscore::scorer::{
    Classification, Direction, Metric, PopulationStats, Scorer, StatEntry, WeightTable,
};
use spiralscore::synthetic::SyntheticSpiral;
use spiralscore::trace::RawPoint;
use std::collections::BTreeMap;

fn reference() -> ReferenceSpiral {
    ReferenceSpiral::new(250.0, 250.0, 5.0, 10.0).unwrap()
}

fn stats() -> PopulationStats {
    let entries: BTreeMap<Metric, StatEntry> = [
        (Metric::PointCount, 450.0, 150.0),
        (Metric::DurationMs, 6000.0, 2000.0),
        (Metric::MeanSpeed, 250.0, 100.0),
        (Metric::PathSmoothness, 0.8, 0.5),
        (Metric::RadialDeviation, 4.0, 2.0),
        (Metric::TremorAmplitude, 0.6, 0.5),
        (Metric::TremorFrequencyHz, 5.0, 2.5),
    ]
    .into_iter()
    .map(|(m, mean, std)| (m, StatEntry::new(mean, std, m.default_direction())))
    .collect();
    PopulationStats::new("test", entries)
}

fn weights() -> WeightTable {
    let w = [
        (Metric::RadialDeviation, 0.5),
        (Metric::TremorAmplitude, 0.3),
        (Metric::PathSmoothness, 0.2),
    ]
    .into_iter()
    .collect();
    WeightTable::new("test", w)
}

fn scorer() -> Scorer {
    Scorer::new(&Config::default(), stats(), weights()).unwrap()
}

fn exact_trace() -> Vec<RawPoint> {
    SyntheticSpiral {
        points: 500,
        duration_ms: 5000,
        ..Default::default()
    }
    .generate(&reference())
}

#[test]
fn test_exact_trace_scores_normal() {
    let result = scorer().score(&exact_trace(), &reference()).unwrap();

    let deviation = result.features.get(Metric::RadialDeviation).unwrap();
    let smoothness = result.features.get(Metric::PathSmoothness).unwrap();
    assert!(deviation < 1e-6, "deviation = {}", deviation);
    assert!(smoothness < 0.05, "smoothness = {}", smoothness);
    assert_eq!(result.features.get(Metric::PointCount), Some(500.0));
    assert_eq!(result.features.get(Metric::DurationMs), Some(5000.0));
    assert_eq!(result.classification, Classification::Normal);
    assert_eq!(result.severity_score, 0.0);
    assert!(result.was_clamped());
}

#[test]
fn test_duplicated_point_is_insufficient() {
    let points = vec![RawPoint::new(260.0, 250.0, 100); 10];
    match scorer().score(&points, &reference()) {
        Err(SpiralError::InsufficientData { kept, required }) => {
            assert_eq!(kept, 1);
            assert_eq!(required, 2);
        }
        other => panic!("expected InsufficientData, got {:?}", other),
    }
}

#[test]
fn test_duplicates_are_dropped_before_scoring() {
    let mut points = exact_trace();
    let dup = points[10];
    for _ in 0..10 {
        points.insert(10, dup);
    }
    let result = scorer().score(&points, &reference()).unwrap();
    assert_eq!(result.features.get(Metric::PointCount), Some(500.0));
}

#[test]
fn test_three_sigma_deviation_is_severe() {
    let s = stats();
    let mut features: spiralscore::scorer::FeatureVector = s
        .entries
        .iter()
        .map(|(m, e)| (*m, e.mean))
        .collect();
    let rd = s.get(Metric::RadialDeviation).unwrap();
    features.insert(Metric::RadialDeviation, rd.mean + 3.0 * rd.std);

    let only_rd = WeightTable::new(
        "rd",
        [(Metric::RadialDeviation, 1.0)].into_iter().collect(),
    );
    let scorer = Scorer::new(&Config::default(), s, only_rd).unwrap();
    let result = scorer.score_features(features).unwrap();

    assert!((result.severity_score - 3.0).abs() < 1e-9);
    assert_eq!(result.classification, Classification::Severe);
    assert_eq!(result.top_contributors.len(), 1);
    assert_eq!(result.top_contributors[0].metric, Metric::RadialDeviation);
}

#[test]
fn test_scoring_is_deterministic() {
    let trace = SyntheticSpiral {
        noise: 1.0,
        tremor_amplitude: 1.5,
        ..Default::default()
    }
    .generate(&reference());

    let s = scorer();
    let a = s.score(&trace, &reference()).unwrap();
    let b = s.score(&trace, &reference()).unwrap();
    assert_eq!(a, b);
    for ((m1, v1), (m2, v2)) in a.features.iter().zip(b.features.iter()) {
        assert_eq!(m1, m2);
        assert_eq!(v1.to_bits(), v2.to_bits());
    }
}

#[test]
fn test_noisier_trace_scores_higher() {
    // Wide start radius keeps noisy samples away from the center.
    let wide = ReferenceSpiral::new(250.0, 250.0, 40.0, 10.0).unwrap();
    let s = scorer();
    let mut last = f64::NEG_INFINITY;
    for noise in [0.0, 1.0, 2.0, 4.0] {
        let trace = SyntheticSpiral {
            noise,
            ..Default::default()
        }
        .generate(&wide);
        let r = s.score(&trace, &wide).unwrap();
        assert!(
            r.raw_score >= last,
            "noise {} gave raw score {} below {}",
            noise,
            r.raw_score,
            last
        );
        last = r.raw_score;
    }
}

#[test]
fn test_six_hz_tremor_is_detected() {
    let trace = SyntheticSpiral {
        tremor_amplitude: 3.0,
        tremor_frequency_hz: 6.0,
        ..Default::default()
    }
    .generate(&reference());

    let result = scorer().score(&trace, &reference()).unwrap();
    let freq = result.features.get(Metric::TremorFrequencyHz).unwrap();
    let amp = result.features.get(Metric::TremorAmplitude).unwrap();

    assert!((freq - 6.0).abs() <= 0.3, "frequency = {}", freq);
    assert!(amp > 1.5 && amp < 3.5, "amplitude = {}", amp);
    assert!(result.z_scores[&Metric::TremorAmplitude] > 2.0);
}

#[test]
fn test_clockwise_trace_matches_counter_clockwise() {
    let ccw = exact_trace();
    let cw = SyntheticSpiral {
        points: 500,
        duration_ms: 5000,
        clockwise: true,
        ..Default::default()
    }
    .generate(&reference());

    let s = scorer();
    let a = s.score(&ccw, &reference()).unwrap();
    let b = s.score(&cw, &reference()).unwrap();

    let da = a.features.get(Metric::RadialDeviation).unwrap();
    let db = b.features.get(Metric::RadialDeviation).unwrap();
    assert!(db < 1e-6, "clockwise deviation = {}", db);
    assert!((da - db).abs() < 1e-6);

    let ga = a.features.get(Metric::LogDrDthetaMean).unwrap();
    let gb = b.features.get(Metric::LogDrDthetaMean).unwrap();
    assert!((ga - gb).abs() < 1e-6);
}

#[test]
fn test_trace_on_center_is_degenerate() {
    // Alternating points inside the dead zone but farther apart than epsilon.
    let points: Vec<RawPoint> = (0..20)
        .map(|i| {
            let dx = if i % 2 == 0 { 0.008 } else { -0.008 };
            RawPoint::new(250.0 + dx, 250.0, i * 10)
        })
        .collect();
    assert!(matches!(
        scorer().score(&points, &reference()),
        Err(SpiralError::DegenerateGeometry)
    ));
}

#[test]
fn test_refit_recovers_shifted_center() {
    let drawn_around = ReferenceSpiral::new(253.0, 248.0, 5.0, 10.0).unwrap();
    let trace = SyntheticSpiral::default().generate(&drawn_around);

    let mut config = Config::default();
    let plain = Scorer::new(&config, stats(), weights()).unwrap();
    let off = plain.score(&trace, &reference()).unwrap();

    config.pipeline.refit_reference = true;
    let refit = Scorer::new(&config, stats(), weights()).unwrap();
    let fixed = refit.score(&trace, &reference()).unwrap();

    assert!(fixed
        .warnings
        .iter()
        .any(|w| matches!(w, ScoreWarning::ReferenceRefit { .. })));
    let before = off.features.get(Metric::RadialDeviation).unwrap();
    let after = fixed.features.get(Metric::RadialDeviation).unwrap();
    assert!(after < before, "refit {} vs supplied {}", after, before);
}

#[test]
fn test_canvas_reference_scores_like_explicit_reference() {
    let canvas = CanvasGeometry {
        center_x: 250.0,
        center_y: 250.0,
        max_radius: 5.0 + 10.0 * 3.0 * std::f64::consts::TAU,
        turns: 3.0,
        start_radius: 5.0,
    };
    let derived = ReferenceSpiral::from_canvas(&canvas).unwrap();
    assert!((derived.b - 10.0).abs() < 1e-9);

    let result = scorer().score(&exact_trace(), &derived).unwrap();
    assert!(result.features.get(Metric::RadialDeviation).unwrap() < 1e-6);
}

#[test]
fn test_missing_required_stat_fails_scoring() {
    let mut s = stats();
    s.entries.remove(&Metric::TremorFrequencyHz);
    assert!(matches!(
        Scorer::new(&Config::default(), s, weights()),
        Err(SpiralError::MissingReferenceStat(Metric::TremorFrequencyHz))
    ));
}

#[test]
fn test_supplemental_metrics_normalized_when_present() {
    let mut s = stats();
    s.entries.insert(
        Metric::NormalizedJerk,
        StatEntry::new(400.0, 300.0, Direction::HigherIsWorse),
    );
    let scorer = Scorer::new(&Config::default(), s, weights()).unwrap();
    let result = scorer.score(&exact_trace(), &reference()).unwrap();

    assert!(result.z_scores.contains_key(&Metric::NormalizedJerk));
    assert!(!result.z_scores.contains_key(&Metric::GeometricPower));
    assert!(result.features.get(Metric::GeometricPower).is_some());
}

#[test]
fn test_runaway_timestamp_is_a_typed_fault() {
    let points = vec![
        RawPoint::new(255.0, 250.0, 0),
        RawPoint::new(250.0, 270.0, 1000),
        RawPoint::new(214.0, 250.0, u64::MAX / 4),
    ];
    match scorer().score(&points, &reference()) {
        Err(SpiralError::FeatureComputation { metric, .. }) => {
            assert_eq!(metric, Metric::TremorAmplitude.to_string());
        }
        other => panic!("expected FeatureComputation, got {:?}", other),
    }
}

#[test]
fn test_resample_limit_comes_from_config() {
    let mut config = Config::default();
    config.pipeline.max_resample_points = 100;
    let tight = Scorer::new(&config, stats(), weights()).unwrap();
    assert!(matches!(
        tight.score(&exact_trace(), &reference()),
        Err(SpiralError::FeatureComputation { .. })
    ));
}

fn radial_stroke() -> Vec<RawPoint> {
    (0..50)
        .map(|i| RawPoint::new(255.0 + 2.0 * i as f64, 250.0, i * 20))
        .collect()
}

#[test]
fn test_unused_supplemental_failure_is_left_out() {
    let result = scorer().score(&radial_stroke(), &reference()).unwrap();

    assert!(result.features.get(Metric::AucRatio).is_none());
    assert!(result.features.get(Metric::LogDrDthetaMean).is_none());
    for metric in Metric::required() {
        assert!(result.features.get(metric).is_some(), "missing {}", metric);
    }
}

#[test]
fn test_weighted_supplemental_failure_fails_scoring() {
    let mut w = weights();
    w.weights.insert(Metric::AucRatio, 0.2);
    let strict = Scorer::new(&Config::default(), stats(), w).unwrap();

    match strict.score(&radial_stroke(), &reference()) {
        Err(SpiralError::FeatureComputation { metric, .. }) => {
            assert_eq!(metric, Metric::AucRatio.to_string());
        }
        other => panic!("expected FeatureComputation, got {:?}", other),
    }
}

#[test]
fn test_log_growth_rates_of_exact_trace() {
    let result = scorer().score(&exact_trace(), &reference()).unwrap();

    let dr_dtheta = result.features.get(Metric::LogDrDthetaMean).unwrap();
    assert!((dr_dtheta - 10.0f64.ln()).abs() < 1e-6, "ln dr/dθ = {}", dr_dtheta);

    // 3 turns in 5 s with b = 10.
    let expected_dr_dt = (10.0 * 3.0 * std::f64::consts::TAU / 5.0f64).ln();
    let dr_dt = result.features.get(Metric::LogDrDtMean).unwrap();
    assert!((dr_dt - expected_dr_dt).abs() < 0.01, "ln dr/dt = {}", dr_dt);
}

#[test]
fn test_inward_trace_has_no_outward_rate() {
    let forward = exact_trace();
    let end = forward[forward.len() - 1].t;
    let inward: Vec<RawPoint> = forward
        .iter()
        .rev()
        .map(|p| RawPoint::new(p.x, p.y, end - p.t))
        .collect();

    let mut s = stats();
    s.entries.insert(
        Metric::LogDrDtMean,
        StatEntry::new(3.2, 0.6, Direction::Neutral),
    );
    let strict = Scorer::new(&Config::default(), s, weights()).unwrap();

    match strict.score(&inward, &reference()) {
        Err(SpiralError::FeatureComputation { metric, .. }) => {
            assert_eq!(metric, Metric::LogDrDtMean.to_string());
        }
        other => panic!("expected FeatureComputation, got {:?}", other),
    }
}

#[test]
fn test_growing_radial_offset_is_monotone() {
    let s = scorer();
    let mut last_deviation = f64::NEG_INFINITY;
    let mut last_score = f64::NEG_INFINITY;

    for offset in [0.0, 0.5, 1.0, 2.0, 4.0, 8.0] {
        let drawn = ReferenceSpiral::new(250.0, 250.0, 5.0 + offset, 10.0).unwrap();
        let trace = SyntheticSpiral {
            points: 500,
            duration_ms: 5000,
            ..Default::default()
        }
        .generate(&drawn);
        let r = s.score(&trace, &reference()).unwrap();

        let deviation = r.features.get(Metric::RadialDeviation).unwrap();
        assert!((deviation - offset).abs() < 1e-6, "offset {} gave {}", offset, deviation);
        assert!(deviation >= last_deviation);
        assert!(
            r.raw_score >= last_score,
            "offset {} gave raw score {} below {}",
            offset,
            r.raw_score,
            last_score
        );
        last_deviation = deviation;
        last_score = r.raw_score;
    }
}
