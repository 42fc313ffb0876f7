//! Bidirectional conversion between watch percentage and relative engagement
//!
//! Relative engagement is the empirical CDF value of a video's watch
//! percentage within its duration bin: the fraction of same-duration-cohort
//! videos it meets or exceeds. The reverse direction reads the percentile
//! table back, taking the midpoint of the two bracketing samples.
//!
//! The two directions are intentionally not exact inverses: the forward
//! conversion uses a right-continuous `<=` counting rule while the reverse
//! interpolates between adjacent percentile samples. Round trips land within
//! one percentile-bucket width, and are exact at 0 and 1.

use crate::map::EngagementMap;

/// Convert a watch percentage into relative engagement.
///
/// Returns the fraction of percentile samples in the covering duration bin
/// that are `<=` the given watch percentage. Monotone non-decreasing in
/// `watch_percentage` for a fixed duration, and exactly 1.0 at
/// `watch_percentage = 1` since every sample is clamped to [0, 1].
pub fn to_relative_engagement(
    map: &EngagementMap,
    duration: u32,
    watch_percentage: f64,
) -> f64 {
    let bin = map.bin(duration);
    // bins are ascending, so the <= count is a partition point
    let covered = bin.partition_point(|&value| value <= watch_percentage);
    covered as f64 / bin.len() as f64
}

/// Convert a relative engagement score back into a watch percentage.
///
/// At exactly 0 or 1 this returns the first or last percentile sample of the
/// covering bin; anywhere else it returns the midpoint of the two samples
/// bracketing `relative_engagement`. The boundary checks are exact equality
/// with no epsilon, so callers must not introduce floating noise near 0 or 1
/// unless they accept the interpolation branch instead.
pub fn to_watch_percentage(
    map: &EngagementMap,
    duration: u32,
    relative_engagement: f64,
) -> f64 {
    let bin = map.bin(duration);
    if relative_engagement == 0.0 {
        return bin[0];
    }
    if relative_engagement == 1.0 {
        return bin[bin.len() - 1];
    }

    let idx = ((relative_engagement * bin.len() as f64).floor() as usize).min(bin.len() - 1);
    if idx == 0 {
        // scores below one bucket width have no left bracket
        bin[0]
    } else {
        (bin[idx - 1] + bin[idx]) / 2.0
    }
}

/// Element-wise [`to_relative_engagement`] over parallel slices.
pub fn to_relative_engagement_all(
    map: &EngagementMap,
    durations: &[u32],
    watch_percentages: &[f64],
) -> Vec<f64> {
    assert_eq!(
        durations.len(),
        watch_percentages.len(),
        "durations and watch percentages must have the same length"
    );
    durations
        .iter()
        .zip(watch_percentages.iter())
        .map(|(&duration, &wp)| to_relative_engagement(map, duration, wp))
        .collect()
}

/// Element-wise [`to_watch_percentage`] over parallel slices.
pub fn to_watch_percentage_all(
    map: &EngagementMap,
    durations: &[u32],
    relative_engagements: &[f64],
) -> Vec<f64> {
    assert_eq!(
        durations.len(),
        relative_engagements.len(),
        "durations and relative engagements must have the same length"
    );
    durations
        .iter()
        .zip(relative_engagements.iter())
        .map(|(&duration, &re)| to_watch_percentage(map, duration, re))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PERCENTILE_COUNT;

    /// Two-bin fixture: durations up to 299s share a constant 0.1
    /// distribution, longer videos a linear ramp over [0, 1].
    fn two_bin_map() -> EngagementMap {
        let constant = vec![0.1; PERCENTILE_COUNT];
        let ramp: Vec<f64> = (0..PERCENTILE_COUNT)
            .map(|j| j as f64 / (PERCENTILE_COUNT - 1) as f64)
            .collect();
        EngagementMap::from_parts(vec![299], vec![constant, ramp]).unwrap()
    }

    #[test]
    fn test_bin_lookup_boundary() {
        let map = two_bin_map();
        assert_eq!(map.bin_index(1), 0);
        assert_eq!(map.bin_index(299), 0);
        assert_eq!(map.bin_index(300), 1);
        assert_eq!(map.bin_index(100_000), 1);
    }

    #[test]
    fn test_constant_bin_saturates() {
        let map = two_bin_map();
        // every sample in bin 0 is <= 0.1
        assert_eq!(to_relative_engagement(&map, 100, 0.1), 1.0);
        assert_eq!(to_relative_engagement(&map, 100, 0.0999), 0.0);
    }

    #[test]
    fn test_linear_ramp_midpoint() {
        let map = two_bin_map();
        let re = to_relative_engagement(&map, 500, 0.5);
        assert!((re - 0.5).abs() < 2e-3, "got {}", re);

        let wp = to_watch_percentage(&map, 500, 0.5);
        assert!((wp - 0.5).abs() < 2e-3, "got {}", wp);
    }

    #[test]
    fn test_watch_percentage_one_is_exact() {
        let map = two_bin_map();
        assert_eq!(to_relative_engagement(&map, 500, 1.0), 1.0);
        assert_eq!(to_relative_engagement(&map, 100, 1.0), 1.0);
    }

    #[test]
    fn test_boundary_exactness_every_bin() {
        let map = two_bin_map();
        for duration in [100u32, 500] {
            let bin = map.bin(duration);
            assert_eq!(to_watch_percentage(&map, duration, 0.0), bin[0]);
            assert_eq!(to_watch_percentage(&map, duration, 1.0), bin[bin.len() - 1]);
        }
    }

    #[test]
    fn test_monotonic_in_watch_percentage() {
        let map = two_bin_map();
        for duration in [100u32, 500] {
            let mut previous = f64::NEG_INFINITY;
            for step in 0..100 {
                let wp = step as f64 / 99.0;
                let re = to_relative_engagement(&map, duration, wp);
                assert!(re >= previous, "re decreased at wp={}", wp);
                previous = re;
            }
        }
    }

    #[test]
    fn test_round_trip_looseness() {
        let map = two_bin_map();
        for &re in &[0.0, 0.3, 0.5, 0.7, 1.0] {
            let wp = to_watch_percentage(&map, 500, re);
            let back = to_relative_engagement(&map, 500, wp);
            if re == 1.0 {
                // all samples are <= the maximum, so 1.0 round-trips exactly
                assert_eq!(back, re);
            } else if re == 0.0 {
                // the minimum sample counts itself under the <= rule, so 0
                // comes back one bucket width high
                assert!(back <= 1e-3 + f64::EPSILON, "re=0 came back as {}", back);
            } else {
                assert!((back - re).abs() <= 2e-3, "re={} came back as {}", re, back);
            }
        }
    }

    #[test]
    fn test_sub_bucket_relative_engagement() {
        let map = two_bin_map();
        // below one bucket width there is no left bracket; falls back to the
        // minimum percentile sample
        let wp = to_watch_percentage(&map, 500, 0.0005);
        assert_eq!(wp, map.bin(500)[0]);
    }

    #[test]
    fn test_element_wise_conversion_preserves_order() {
        let map = two_bin_map();
        let durations = [100u32, 500, 500];
        let wps = [0.1, 0.5, 1.0];
        let res = to_relative_engagement_all(&map, &durations, &wps);
        assert_eq!(res.len(), 3);
        assert_eq!(res[0], to_relative_engagement(&map, 100, 0.1));
        assert_eq!(res[1], to_relative_engagement(&map, 500, 0.5));
        assert_eq!(res[2], 1.0);

        let wps_back = to_watch_percentage_all(&map, &durations, &res);
        assert_eq!(wps_back[2], map.bin(500)[PERCENTILE_COUNT - 1]);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_element_wise_length_mismatch_panics() {
        let map = two_bin_map();
        to_relative_engagement_all(&map, &[100, 500], &[0.5]);
    }
}
