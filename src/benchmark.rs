//! Age-normalized benchmark comparison: maps a raw score to a z-score and an
//! approximate percentile against static, hand-authored reference tables.

use crate::error::AnalyticsError;
use crate::models::{ActivityKind, Benchmark, BenchmarkComparison, Difficulty};
use crate::stats;

/// Target levels per domain, indexed beginner/intermediate/advanced.
const TARGET_LEVELS: &[(ActivityKind, [f64; 3])] = &[
    (ActivityKind::Reading, [80.0, 90.0, 95.0]),
    (ActivityKind::Attention, [75.0, 85.0, 92.0]),
    (ActivityKind::Speech, [85.0, 92.0, 97.0]),
    (ActivityKind::Cognitive, [70.0, 80.0, 90.0]),
];

/// Universal fallback when a domain has no target row.
pub const DEFAULT_TARGET_LEVEL: f64 = 85.0;

pub fn target_level(kind: ActivityKind, difficulty: Difficulty) -> f64 {
    let idx = match difficulty {
        Difficulty::Beginner => 0,
        Difficulty::Intermediate => 1,
        Difficulty::Advanced => 2,
    };
    TARGET_LEVELS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, targets)| targets[idx])
        .unwrap_or(DEFAULT_TARGET_LEVEL)
}

/// The four fixed age buckets.
pub fn age_bucket(age: u32) -> &'static str {
    if age <= 5 {
        "4-5"
    } else if age <= 7 {
        "6-7"
    } else if age <= 9 {
        "8-9"
    } else {
        "10+"
    }
}

const fn bm(min: f64, avg: f64, max: f64, std_dev: f64) -> Benchmark {
    Benchmark { min, avg, max, std_dev }
}

/// Reference values per (age bucket, domain, skill). Reading speed is in
/// words per minute, focus duration in minutes, memory span in items; the
/// rest are percentages.
static BENCHMARK_TABLES: &[(&str, ActivityKind, &[(&str, Benchmark)])] = &[
    ("4-5", ActivityKind::Reading, &[
        ("reading speed", bm(10.0, 25.0, 45.0, 8.0)),
        ("phonics accuracy", bm(40.0, 62.0, 85.0, 12.0)),
        ("sight word recognition", bm(30.0, 55.0, 80.0, 14.0)),
    ]),
    ("6-7", ActivityKind::Reading, &[
        ("reading speed", bm(40.0, 65.0, 95.0, 12.0)),
        ("phonics accuracy", bm(55.0, 74.0, 95.0, 10.0)),
        ("sight word recognition", bm(50.0, 72.0, 95.0, 11.0)),
    ]),
    ("8-9", ActivityKind::Reading, &[
        ("reading speed", bm(70.0, 105.0, 140.0, 15.0)),
        ("phonics accuracy", bm(65.0, 84.0, 98.0, 8.0)),
        ("sight word recognition", bm(65.0, 85.0, 100.0, 8.0)),
    ]),
    ("10+", ActivityKind::Reading, &[
        ("reading speed", bm(90.0, 130.0, 180.0, 20.0)),
        ("phonics accuracy", bm(75.0, 90.0, 100.0, 6.0)),
        ("sight word recognition", bm(78.0, 92.0, 100.0, 5.0)),
    ]),
    ("4-5", ActivityKind::Attention, &[
        ("focus duration", bm(3.0, 8.0, 15.0, 3.0)),
        ("task completion", bm(35.0, 60.0, 85.0, 13.0)),
    ]),
    ("6-7", ActivityKind::Attention, &[
        ("focus duration", bm(5.0, 12.0, 20.0, 4.0)),
        ("task completion", bm(45.0, 70.0, 92.0, 11.0)),
    ]),
    ("8-9", ActivityKind::Attention, &[
        ("focus duration", bm(8.0, 16.0, 28.0, 5.0)),
        ("task completion", bm(55.0, 78.0, 96.0, 9.0)),
    ]),
    ("10+", ActivityKind::Attention, &[
        ("focus duration", bm(10.0, 20.0, 35.0, 6.0)),
        ("task completion", bm(65.0, 85.0, 98.0, 7.0)),
    ]),
    ("4-5", ActivityKind::Speech, &[
        ("articulation accuracy", bm(50.0, 72.0, 90.0, 11.0)),
        ("vocabulary range", bm(30.0, 55.0, 85.0, 15.0)),
    ]),
    ("6-7", ActivityKind::Speech, &[
        ("articulation accuracy", bm(62.0, 80.0, 95.0, 9.0)),
        ("vocabulary range", bm(45.0, 68.0, 92.0, 12.0)),
    ]),
    ("8-9", ActivityKind::Speech, &[
        ("articulation accuracy", bm(72.0, 88.0, 98.0, 7.0)),
        ("vocabulary range", bm(58.0, 79.0, 96.0, 10.0)),
    ]),
    ("10+", ActivityKind::Speech, &[
        ("articulation accuracy", bm(80.0, 93.0, 100.0, 5.0)),
        ("vocabulary range", bm(68.0, 87.0, 100.0, 8.0)),
    ]),
    ("4-5", ActivityKind::Cognitive, &[
        ("memory span", bm(2.0, 3.5, 5.0, 0.8)),
        ("pattern recognition", bm(30.0, 55.0, 80.0, 14.0)),
    ]),
    ("6-7", ActivityKind::Cognitive, &[
        ("memory span", bm(3.0, 4.5, 6.0, 1.0)),
        ("pattern recognition", bm(42.0, 66.0, 90.0, 12.0)),
    ]),
    ("8-9", ActivityKind::Cognitive, &[
        ("memory span", bm(4.0, 5.5, 7.0, 1.1)),
        ("pattern recognition", bm(55.0, 77.0, 95.0, 10.0)),
    ]),
    ("10+", ActivityKind::Cognitive, &[
        ("memory span", bm(5.0, 6.5, 9.0, 1.2)),
        ("pattern recognition", bm(65.0, 85.0, 98.0, 8.0)),
    ]),
];

fn bucket_table(bucket: &str, kind: ActivityKind) -> &'static [(&'static str, Benchmark)] {
    BENCHMARK_TABLES
        .iter()
        .find(|(b, k, _)| *b == bucket && *k == kind)
        .map(|(_, _, table)| *table)
        .unwrap_or(&[])
}

pub fn lookup(bucket: &str, kind: ActivityKind, skill: &str) -> Option<Benchmark> {
    bucket_table(bucket, kind)
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(skill))
        .map(|(_, benchmark)| *benchmark)
}

/// Full comparison for one score. A missing table entry degrades to a
/// neutral comparison (z 0, percentile 50) and is logged rather than
/// surfaced, so callers always receive a number.
pub fn compare(score: f64, kind: ActivityKind, skill: &str, age: u32) -> BenchmarkComparison {
    let bucket = age_bucket(age);
    let (z, percentile) = match lookup(bucket, kind, skill) {
        Some(benchmark) => {
            let z = stats::z_score(score, benchmark.avg, benchmark.std_dev);
            (z, stats::z_score_to_percentile(z))
        }
        None => {
            let missing = AnalyticsError::Configuration {
                age_bucket: bucket.to_string(),
                domain: kind.as_str().to_string(),
                skill: skill.to_string(),
            };
            tracing::warn!(error = %missing, "substituting neutral percentile");
            (0.0, 50.0)
        }
    };
    BenchmarkComparison {
        kind,
        skill: skill.to_string(),
        score,
        age_bucket: bucket.to_string(),
        z_score: z,
        percentile,
    }
}

pub fn calculate_percentile(score: f64, kind: ActivityKind, skill: &str, age: u32) -> f64 {
    compare(score, kind, skill, age).percentile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_buckets_are_fixed() {
        assert_eq!(age_bucket(4), "4-5");
        assert_eq!(age_bucket(5), "4-5");
        assert_eq!(age_bucket(6), "6-7");
        assert_eq!(age_bucket(7), "6-7");
        assert_eq!(age_bucket(8), "8-9");
        assert_eq!(age_bucket(9), "8-9");
        assert_eq!(age_bucket(10), "10+");
        assert_eq!(age_bucket(13), "10+");
    }

    #[test]
    fn score_at_bucket_average_is_fiftieth_percentile() {
        let comparison = compare(65.0, ActivityKind::Reading, "reading speed", 6);
        assert_eq!(comparison.age_bucket, "6-7");
        assert_eq!(comparison.z_score, 0.0);
        assert_eq!(comparison.percentile, 50.0);
    }

    #[test]
    fn percentile_is_monotone_in_score() {
        let mut previous = 0.0;
        for score in [20.0, 40.0, 55.0, 65.0, 72.0, 90.0, 120.0] {
            let p = calculate_percentile(score, ActivityKind::Reading, "reading speed", 7);
            assert!(p >= previous, "percentile dipped at score {score}");
            previous = p;
        }
    }

    #[test]
    fn missing_entry_returns_neutral_fifty() {
        let p = calculate_percentile(88.0, ActivityKind::Reading, "unknown skill", 6);
        assert_eq!(p, 50.0);
    }

    #[test]
    fn target_levels_follow_domain_table() {
        assert_eq!(target_level(ActivityKind::Reading, Difficulty::Beginner), 80.0);
        assert_eq!(target_level(ActivityKind::Reading, Difficulty::Advanced), 95.0);
        assert_eq!(target_level(ActivityKind::Attention, Difficulty::Intermediate), 85.0);
        assert_eq!(target_level(ActivityKind::Speech, Difficulty::Advanced), 97.0);
        assert_eq!(target_level(ActivityKind::Cognitive, Difficulty::Beginner), 70.0);
    }

    #[test]
    fn skill_lookup_ignores_case() {
        assert!(lookup("6-7", ActivityKind::Reading, "Reading Speed").is_some());
    }

    #[test]
    fn every_bucket_and_domain_has_reference_data() {
        let kinds = [
            ActivityKind::Reading,
            ActivityKind::Attention,
            ActivityKind::Speech,
            ActivityKind::Cognitive,
        ];
        for bucket in ["4-5", "6-7", "8-9", "10+"] {
            for kind in kinds {
                let table = bucket_table(bucket, kind);
                assert!(!table.is_empty(), "no data for {bucket}/{}", kind.as_str());
                for (skill, benchmark) in table {
                    assert!(
                        benchmark.min <= benchmark.avg && benchmark.avg <= benchmark.max,
                        "inconsistent range for {bucket}/{skill}"
                    );
                    assert!(benchmark.std_dev > 0.0, "zero spread for {bucket}/{skill}");
                }
            }
        }
        assert!(bucket_table("3", ActivityKind::Reading).is_empty());
    }
}
