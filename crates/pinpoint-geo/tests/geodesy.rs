//! Property-style tests for distance and scoring.
//!
//! Distance checks use well-known city pairs with a generous tolerance —
//! the sphere model is a few permille off the ellipsoid, and the game only
//! needs ordering, not survey-grade accuracy.

use pinpoint_geo::{distance_meters, Coordinate, ScoringConfig, EARTH_RADIUS_M};

fn coord(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).expect("test coordinate in range")
}

// =========================================================================
// distance_meters
// =========================================================================

#[test]
fn test_distance_to_self_is_zero() {
    for &(lat, lng) in &[(0.0, 0.0), (48.8566, 2.3522), (-90.0, 0.0), (12.3, -170.0)] {
        let c = coord(lat, lng);
        assert_eq!(distance_meters(c, c), 0.0, "d(a, a) at {c}");
    }
}

#[test]
fn test_distance_is_symmetric() {
    let paris = coord(48.8566, 2.3522);
    let tokyo = coord(35.6762, 139.6503);
    let there = distance_meters(paris, tokyo);
    let back = distance_meters(tokyo, paris);
    assert!((there - back).abs() < 1e-6);
}

#[test]
fn test_distance_paris_london() {
    // Paris ↔ London is about 344 km.
    let paris = coord(48.8566, 2.3522);
    let london = coord(51.5074, -0.1278);
    let d = distance_meters(paris, london);
    assert!((d - 344_000.0).abs() < 2_000.0, "got {d}");
}

#[test]
fn test_distance_quarter_circumference() {
    // (0,0) to (0,90) is a quarter of the great circle: πR/2.
    let d = distance_meters(coord(0.0, 0.0), coord(0.0, 90.0));
    let expected = std::f64::consts::PI * EARTH_RADIUS_M / 2.0;
    assert!((d - expected).abs() < 1.0, "got {d}, expected {expected}");
}

#[test]
fn test_distance_pole_to_pole() {
    // Antipodal points are half the circumference apart: πR.
    let d = distance_meters(coord(90.0, 0.0), coord(-90.0, 0.0));
    let expected = std::f64::consts::PI * EARTH_RADIUS_M;
    assert!((d - expected).abs() < 1.0, "got {d}, expected {expected}");
}

#[test]
fn test_distance_never_nan_near_antipode() {
    // Floating-point can push the haversine term past 1.0 here; the
    // implementation must clamp rather than return NaN.
    let d = distance_meters(coord(48.8566, 2.3522), coord(-48.8566, -177.6478));
    assert!(d.is_finite());
    assert!(d > 19_000_000.0);
}

// =========================================================================
// ScoringConfig::score
// =========================================================================

#[test]
fn test_score_perfect_guess_is_max_points() {
    let scoring = ScoringConfig::default();
    assert_eq!(scoring.score(0.0), scoring.max_points);
}

#[test]
fn test_score_at_and_beyond_cutoff_is_zero() {
    let scoring = ScoringConfig::default();
    assert_eq!(scoring.score(scoring.max_distance_m), 0);
    assert_eq!(scoring.score(scoring.max_distance_m * 2.0), 0);
}

#[test]
fn test_score_is_monotonically_non_increasing() {
    let scoring = ScoringConfig::default();
    let mut previous = scoring.score(0.0);
    // Sweep from 0 out past the cutoff in 50 km steps.
    let mut d = 0.0;
    while d <= scoring.max_distance_m + 100_000.0 {
        let s = scoring.score(d);
        assert!(s <= previous, "score rose at d={d}: {previous} -> {s}");
        previous = s;
        d += 50_000.0;
    }
}

#[test]
fn test_score_never_exceeds_max_points() {
    let scoring = ScoringConfig {
        max_points: 100,
        max_distance_m: 1_000.0,
        decay_m: 1.0e12, // effectively flat curve
    };
    assert_eq!(scoring.score(0.0), 100);
    assert_eq!(scoring.score(999.0), 100);
}

#[test]
fn test_score_with_custom_decay() {
    // At d == decay the curve sits at max_points / e.
    let scoring = ScoringConfig {
        max_points: 5_000,
        max_distance_m: 20_000_000.0,
        decay_m: 2_000_000.0,
    };
    let expected = (5_000.0 / std::f64::consts::E).round() as u32;
    assert_eq!(scoring.score(2_000_000.0), expected);
}
