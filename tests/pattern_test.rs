// tests/pattern_test.rs
// Pattern recognition properties over synthetic series

use emfcheckr::core::analysis::{recognize_patterns, PatternRecognizer, TrendDirection};
use emfcheckr::testgen::{ramp_series, sine_series, spike_series, square_series, with_noise, SurveyGenerator};
use emfcheckr::SignalChannel;

#[test]
fn test_constant_series() {
    let result = recognize_patterns(&vec![50.0; 50]);
    assert!(result.spikes.is_empty());
    assert!(result.trends.is_empty());
    assert!(result.complexity_score.abs() < 1e-6);
}

#[test]
fn test_trends_pass_r_squared_gate() {
    let mut series = with_noise(&sine_series(200, 25.0, 10.0, 100.0), 3.0, 11);
    series.extend(with_noise(&ramp_series(100, 0.8, 100.0), 1.0, 12));

    let result = recognize_patterns(&series);
    assert!(!result.trends.is_empty());
    for trend in &result.trends {
        assert!(trend.r_squared > 0.7, "trend {:?} below gate", trend);
    }
    assert!(result
        .trends
        .iter()
        .any(|t| t.direction == TrendDirection::Increasing));
}

#[test]
fn test_spikes_do_not_overlap() {
    let spikes = [(10, 40.0), (12, 35.0), (30, -45.0), (55, 60.0), (57, 20.0), (80, -30.0)];
    let series = with_noise(&spike_series(100, 5.0, &spikes), 0.5, 3);

    let result = recognize_patterns(&series);
    assert!(!result.spikes.is_empty());

    let mut ranges: Vec<(usize, usize)> = result
        .spikes
        .iter()
        .map(|s| (s.position, s.position + s.width))
        .collect();
    ranges.sort();
    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "overlapping spikes: {:?}", ranges);
    }
}

#[test]
fn test_noisy_sine_reports_its_period() {
    let series = with_noise(&sine_series(150, 12.0, 40.0, 0.0), 2.0, 5);
    let result = PatternRecognizer::default().recognize(&series);

    let period = result.dominant_period().unwrap();
    assert_eq!(period % 12, 0, "dominant period {}", period);
    assert!(result.periodic_patterns.iter().all(|p| p.correlation > 0.6));
}

#[test]
fn test_square_wave_complexity_is_bounded() {
    let result = recognize_patterns(&square_series(128, 16, 5.0));
    assert!((0.0..=1.0).contains(&result.complexity_score));
    assert!(!result.harmonics.is_empty());
}

#[test]
fn test_survey_channel_feeds_recognizer() {
    let readings = SurveyGenerator::new().transect(60, &[]);
    let phases = SignalChannel::Phase.extract(&readings);
    assert_eq!(phases.len(), 60);

    // Constant phase along a target-free transect
    let result = recognize_patterns(&phases);
    assert!(result.spikes.is_empty());
    assert!(result.trends.is_empty());
}
