//! Geodesy primitives for Pinpoint: coordinates, great-circle distance,
//! and the distance-to-points scoring curve.
//!
//! This crate is a leaf. It knows nothing about rooms, players, or the
//! wire protocol; everything here is a pure function of its inputs, which
//! is what makes the scoring path trivially testable.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Errors produced when constructing a [`Coordinate`] from raw degrees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Latitude must be within [-90, 90] degrees.
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Longitude must be within [-180, 180] degrees.
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// A point on the Earth's surface, in degrees.
///
/// The fields are private so a `Coordinate` can only be obtained through
/// [`Coordinate::new`], which rejects out-of-range values (and NaN, which
/// fails every range check). Deserialization funnels through the same
/// constructor via `try_from`, so a coordinate that exists is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LatLng")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

/// Raw wire shape used as the `try_from` intermediate for [`Coordinate`].
#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl TryFrom<LatLng> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: LatLng) -> Result<Self, GeoError> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

impl Coordinate {
    /// Validates and constructs a coordinate from degrees.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lng)
    }
}

/// Haversine great-circle distance between two coordinates, in meters.
///
/// Uses the mean-radius sphere model ([`EARTH_RADIUS_M`]); accurate to a
/// few kilometers at antipodal range, far below what the scoring curve can
/// distinguish. Deterministic for in-range inputs, and `d(a, a) == 0`.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let (lat_a, lat_b) = (a.lat.to_radians(), b.lat.to_radians());
    let half_dlat = (b.lat - a.lat).to_radians() / 2.0;
    let half_dlng = (b.lng - a.lng).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2)
        + lat_a.cos() * lat_b.cos() * half_dlng.sin().powi(2);

    // h can creep past 1.0 by a few ulps near the antipode; clamp so
    // asin stays defined.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Tunable parameters for the distance-to-points curve.
///
/// The exact curve shape is a gameplay decision; the rest of the system
/// only relies on the guarantees documented on [`ScoringConfig::score`],
/// so these knobs can be retuned without touching leaderboard logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points awarded for a perfect guess (distance 0).
    pub max_points: u32,

    /// Distances at or beyond this score zero regardless of the curve.
    /// The default is roughly half the Earth's circumference, i.e. no
    /// guess on the planet is ever cut off by it.
    pub max_distance_m: f64,

    /// e-folding distance of the exponential falloff. Smaller values
    /// punish distance harder.
    pub decay_m: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_points: 5_000,
            max_distance_m: 20_000_000.0,
            decay_m: 1_500_000.0,
        }
    }
}

impl ScoringConfig {
    /// Converts a distance in meters into awarded points.
    ///
    /// Guarantees: monotonically non-increasing in distance,
    /// `score(0) == max_points`, and `score(d) == 0` for
    /// `d >= max_distance_m`.
    pub fn score(&self, distance_m: f64) -> u32 {
        if distance_m >= self.max_distance_m {
            return 0;
        }
        let raw = f64::from(self.max_points) * (-distance_m / self.decay_m).exp();
        (raw.round() as u32).min(self.max_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_range_boundaries() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_new_rejects_out_of_range_latitude() {
        let err = Coordinate::new(90.1, 0.0).unwrap_err();
        assert_eq!(err, GeoError::LatitudeOutOfRange(90.1));
    }

    #[test]
    fn test_new_rejects_out_of_range_longitude() {
        let err = Coordinate::new(0.0, -180.5).unwrap_err();
        assert_eq!(err, GeoError::LongitudeOutOfRange(-180.5));
    }

    #[test]
    fn test_new_rejects_nan() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<Coordinate, _> =
            serde_json::from_str(r#"{"lat": 48.8566, "lng": 2.3522}"#);
        assert!(ok.is_ok());

        let bad: Result<Coordinate, _> =
            serde_json::from_str(r#"{"lat": 123.0, "lng": 0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_serialize_shape() {
        let c = Coordinate::new(10.5, -20.25).unwrap();
        let json: serde_json::Value = serde_json::to_value(c).unwrap();
        assert_eq!(json["lat"], 10.5);
        assert_eq!(json["lng"], -20.25);
    }

    #[test]
    fn test_display() {
        let c = Coordinate::new(48.8566, 2.3522).unwrap();
        assert_eq!(c.to_string(), "(48.8566, 2.3522)");
    }
}
