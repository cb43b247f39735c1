//! Map-ready simplified track.

use crate::geo_utils::haversine_distance;
use crate::simplify::simplify_indices;
use crate::{Bounds, Fix, GpsPoint};

/// A simplified track, ready to be serialized for the map.
///
/// Bounds and center are pre-computed so the map can frame the track
/// without walking the vertices again.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polyline {
    /// Simplified vertices, in track order
    pub points: Vec<GpsPoint>,
    /// Timestamps of the kept vertices
    pub timestamps: Vec<i64>,
    pub bounds: Bounds,
    pub center: GpsPoint,
    /// Length of the simplified track in meters
    pub distance: f64,
    /// Number of fixes before simplification
    pub source_points: usize,
}

impl Polyline {
    /// Simplify `fixes` with Douglas-Peucker at `tolerance` degrees.
    ///
    /// Returns `None` for an empty track.
    ///
    /// # Example
    /// ```
    /// use ride_tracker::{Fix, Polyline};
    ///
    /// let fixes: Vec<Fix> = (0..100)
    ///     .map(|i| Fix::new(55.0 + i as f64 * 0.001, 12.0, 0.0, i * 60))
    ///     .collect();
    ///
    /// let polyline = Polyline::from_fixes(&fixes, 0.0002).unwrap();
    /// assert_eq!(polyline.points.len(), 2);
    /// assert_eq!(polyline.source_points, 100);
    /// ```
    pub fn from_fixes(fixes: &[Fix], tolerance: f64) -> Option<Self> {
        if fixes.is_empty() {
            return None;
        }

        let kept = simplify_indices(fixes, tolerance);
        let points: Vec<GpsPoint> = kept.iter().map(|&i| fixes[i].position()).collect();
        let timestamps = kept.iter().map(|&i| fixes[i].timestamp).collect();

        let bounds = Bounds::from_points(&points)?;
        let center = bounds.center();
        let distance = points
            .windows(2)
            .map(|w| haversine_distance(&w[0], &w[1]))
            .sum();

        Some(Self {
            points,
            timestamps,
            bounds,
            center,
            distance,
            source_points: fixes.len(),
        })
    }

    /// `[latitude, longitude]` pairs, the shape most map libraries take.
    pub fn lat_lngs(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.latitude, p.longitude]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::path_distance;

    fn zigzag(n: usize) -> Vec<Fix> {
        (0..n)
            .map(|i| {
                let lng = if i % 2 == 0 { 12.0 } else { 12.01 };
                Fix::new(55.0 + i as f64 * 0.01, lng, 0.0, i as i64 * 60)
            })
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(Polyline::from_fixes(&[], 0.0002).is_none());
    }

    #[test]
    fn test_single_fix() {
        let fixes = vec![Fix::new(55.0, 12.0, 0.0, 0)];
        let polyline = Polyline::from_fixes(&fixes, 0.0002).unwrap();
        assert_eq!(polyline.points, vec![GpsPoint::new(55.0, 12.0)]);
        assert_eq!(polyline.center, GpsPoint::new(55.0, 12.0));
        assert_eq!(polyline.distance, 0.0);
    }

    #[test]
    fn test_keeps_significant_vertices() {
        let fixes = zigzag(9);
        let polyline = Polyline::from_fixes(&fixes, 0.0002).unwrap();
        assert_eq!(polyline.points.len(), 9);
        assert_eq!(polyline.timestamps.len(), 9);
        assert!((polyline.distance - path_distance(&fixes)).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_and_center() {
        let polyline = Polyline::from_fixes(&zigzag(5), 0.0002).unwrap();
        assert_eq!(polyline.bounds.min_lng, 12.0);
        assert_eq!(polyline.bounds.max_lng, 12.01);
        assert_eq!(polyline.bounds.min_lat, 55.0);
        assert!((polyline.center.latitude - 55.02).abs() < 1e-9);
    }

    #[test]
    fn test_lat_lngs() {
        let polyline = Polyline::from_fixes(&zigzag(3), 0.0002).unwrap();
        assert_eq!(polyline.lat_lngs()[0], [55.0, 12.0]);
    }
}
