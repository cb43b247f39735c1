//! Ramer-Douglas-Peucker simplification of fix sequences.
//!
//! Distances are planar, measured in raw latitude/longitude degrees, so the
//! tolerance is in degrees as well. At the latitudes a ride covers this is
//! close enough for deciding which vertices a map needs.
//!
//! The split search runs on an explicit stack of index ranges instead of
//! recursing, so long near-collinear tracks cannot exhaust the call stack.
//! The kept vertices are exactly those of the recursive formulation.

use crate::Fix;

/// Perpendicular distance from `point` to the line through `start` and `end`,
/// in degrees.
///
/// Falls back to the straight-line distance to `start` when the two line
/// points coincide.
fn perpendicular_distance(point: &Fix, start: &Fix, end: &Fix) -> f64 {
    let d_lat = end.latitude - start.latitude;
    let d_lng = end.longitude - start.longitude;

    if d_lat == 0.0 && d_lng == 0.0 {
        return (point.latitude - start.latitude).hypot(point.longitude - start.longitude);
    }

    let numerator = (d_lng * point.latitude - d_lat * point.longitude
        + end.latitude * start.longitude
        - end.longitude * start.latitude)
        .abs();
    numerator / d_lng.hypot(d_lat)
}

/// Indices of the fixes kept by Douglas-Peucker simplification, ascending.
///
/// Sequences shorter than three fixes keep every index.
pub fn simplify_indices(fixes: &[Fix], epsilon: f64) -> Vec<usize> {
    let n = fixes.len();
    if n < 3 {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((first, last)) = stack.pop() {
        if last - first < 2 {
            continue;
        }

        // First maximum wins on ties
        let mut max_distance = 0.0;
        let mut split = first;
        for i in first + 1..last {
            let d = perpendicular_distance(&fixes[i], &fixes[first], &fixes[last]);
            if max_distance < d {
                max_distance = d;
                split = i;
            }
        }

        if max_distance > epsilon {
            keep[split] = true;
            stack.push((split, last));
            stack.push((first, split));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &kept)| kept.then_some(i))
        .collect()
}

/// Simplify a fix sequence with the Douglas-Peucker algorithm.
///
/// The first and last fix are always kept, and the output is never longer
/// than the input. Sequences shorter than three fixes are returned as they
/// are.
///
/// # Example
///
/// ```rust
/// use ride_tracker::{Fix, simplify};
///
/// // A straight line with a detour in the middle
/// let fixes = vec![
///     Fix::new(0.0, 0.0, 0.0, 0),
///     Fix::new(0.0, 0.001, 0.0, 60),
///     Fix::new(0.01, 0.002, 0.0, 120),
///     Fix::new(0.0, 0.003, 0.0, 180),
///     Fix::new(0.0, 0.004, 0.0, 240),
/// ];
///
/// let simplified = simplify(&fixes, 0.002);
/// assert_eq!(simplified.len(), 3);
/// assert_eq!(simplified[1], fixes[2]);
/// ```
pub fn simplify(fixes: &[Fix], epsilon: f64) -> Vec<Fix> {
    simplify_indices(fixes, epsilon)
        .into_iter()
        .map(|i| fixes[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lng: f64) -> Fix {
        Fix::new(lat, lng, 0.0, 0)
    }

    /// Textbook recursive formulation, used as the reference.
    fn recursive(fixes: &[Fix], epsilon: f64) -> Vec<Fix> {
        if fixes.len() < 3 {
            return fixes.to_vec();
        }
        let end = fixes.len() - 1;
        let mut max_distance = 0.0;
        let mut index = 0;
        for i in 1..end {
            let d = perpendicular_distance(&fixes[i], &fixes[0], &fixes[end]);
            if max_distance < d {
                index = i;
                max_distance = d;
            }
        }
        if max_distance > epsilon {
            let mut left = recursive(&fixes[..=index], epsilon);
            let right = recursive(&fixes[index..], epsilon);
            left.pop();
            left.extend(right);
            left
        } else {
            vec![fixes[0], fixes[end]]
        }
    }

    /// Deterministic wiggly track: a slow drift with pseudo-random jitter.
    fn wiggly_track(n: usize) -> Vec<Fix> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..n)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let jitter = (state % 1000) as f64 / 1000.0 - 0.5;
                Fix::new(
                    55.0 + i as f64 * 0.0003 + jitter * 0.001,
                    12.0 + (i as f64 * 0.05).sin() * 0.01,
                    0.0,
                    i as i64 * 30,
                )
            })
            .collect()
    }

    #[test]
    fn test_short_sequences_unchanged() {
        let empty: Vec<Fix> = vec![];
        assert!(simplify(&empty, 0.0).is_empty());

        let one = vec![fix(1.0, 1.0)];
        assert_eq!(simplify(&one, 10.0), one);

        let two = vec![fix(1.0, 1.0), fix(2.0, 2.0)];
        assert_eq!(simplify(&two, 0.0), two);
        assert_eq!(simplify(&two, 100.0), two);
    }

    #[test]
    fn test_collinear_collapses_to_endpoints() {
        let line: Vec<Fix> = (0..50).map(|i| fix(i as f64 * 0.001, i as f64 * 0.002)).collect();
        let simplified = simplify(&line, 0.0002);
        assert_eq!(simplified, vec![line[0], line[49]]);
    }

    #[test]
    fn test_endpoints_preserved_and_never_longer() {
        let track = wiggly_track(500);
        for &epsilon in &[0.0, 0.00005, 0.0002, 0.001, 0.1] {
            let simplified = simplify(&track, epsilon);
            assert_eq!(simplified.first(), track.first());
            assert_eq!(simplified.last(), track.last());
            assert!(simplified.len() <= track.len());
        }
    }

    #[test]
    fn test_matches_recursive_formulation() {
        let track = wiggly_track(800);
        for &epsilon in &[0.0, 0.0001, 0.0002, 0.002] {
            assert_eq!(simplify(&track, epsilon), recursive(&track, epsilon));
        }
    }

    #[test]
    fn test_reduces_point_count() {
        let track = wiggly_track(1500);
        let simplified = simplify(&track, 0.0002);
        assert!(simplified.len() < track.len());
        assert!(simplified.len() > 2);
    }

    #[test]
    fn test_coincident_endpoints_use_point_distance() {
        // Out-and-back loop: start and end are the same place
        let loop_track = vec![fix(0.0, 0.0), fix(0.0, 0.01), fix(0.0, 0.02), fix(0.0, 0.0)];
        let simplified = simplify(&loop_track, 0.0002);
        assert_eq!(simplified, vec![loop_track[0], loop_track[2], loop_track[3]]);
    }

    #[test]
    fn test_perpendicular_distance() {
        let d = perpendicular_distance(&fix(1.0, 0.5), &fix(0.0, 0.0), &fix(0.0, 1.0));
        assert!((d - 1.0).abs() < 1e-12);

        let d = perpendicular_distance(&fix(3.0, 4.0), &fix(0.0, 0.0), &fix(0.0, 0.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_long_monotonic_track_does_not_overflow() {
        // Convex arc: every interior point splits, which is the deep case
        let arc: Vec<Fix> = (0..20_000)
            .map(|i| {
                let x = i as f64 / 20_000.0;
                fix(x * x, x)
            })
            .collect();
        let simplified = simplify(&arc, 0.0);
        assert_eq!(simplified.first(), arc.first());
        assert_eq!(simplified.last(), arc.last());
    }

    #[test]
    fn test_indices_ascending() {
        let track = wiggly_track(300);
        let indices = simplify_indices(&track, 0.0002);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(indices.first(), Some(&0));
        assert_eq!(indices.last(), Some(&299));
    }
}
