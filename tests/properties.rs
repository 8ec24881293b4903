use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use eduspark_progress_analytics::benchmark;
use eduspark_progress_analytics::models::{
    ActivityKind, ActivityRecord, Difficulty, EngagementTier, LearningSession, SessionContext,
};
use eduspark_progress_analytics::recorder;
use eduspark_progress_analytics::report;
use eduspark_progress_analytics::store::{AssessmentStore, MemoryStore};

fn single_activity_session(
    student: Uuid,
    day_offset: i64,
    accuracy: f64,
) -> LearningSession {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::days(day_offset);
    LearningSession {
        id: Uuid::nil(),
        student_id: student,
        started_at: at,
        ended_at: at + Duration::minutes(20),
        engagement: EngagementTier::Medium,
        context: SessionContext::default(),
        activities: vec![ActivityRecord {
            id: Uuid::new_v4(),
            kind: ActivityKind::Reading,
            skill: "phonics accuracy".to_string(),
            started_at: at,
            ended_at: at + Duration::minutes(10),
            attempts: 3,
            accuracy,
            speed: 1.0,
            difficulty: Difficulty::Intermediate,
            engagement: EngagementTier::Medium,
            error_patterns: Vec::new(),
            breakthroughs: Vec::new(),
            note: String::new(),
        }],
    }
}

proptest! {
    // The smoothed level is a convex combination of the previous level and
    // the newest sample, so it always lies between them.
    #[test]
    fn current_level_stays_between_previous_and_sample(
        first in 0.0f64..=100.0,
        second in 0.0f64..=100.0,
    ) {
        let mut store = MemoryStore::new();
        let student = Uuid::new_v4();
        recorder::record_session(&mut store, single_activity_session(student, 0, first))
            .expect("valid session");
        recorder::record_session(&mut store, single_activity_session(student, 1, second))
            .expect("valid session");

        let level = store
            .assessment(student, ActivityKind::Reading, "phonics accuracy")
            .expect("assessment exists")
            .current_level;
        let low = first.min(second);
        let high = first.max(second);
        prop_assert!(level >= low - 1e-9 && level <= high + 1e-9);
    }

    #[test]
    fn percentile_is_monotone_and_bounded(
        a in 0.0f64..=150.0,
        b in 0.0f64..=150.0,
        age in 4u32..=12,
    ) {
        let low = a.min(b);
        let high = a.max(b);
        let p_low = benchmark::calculate_percentile(low, ActivityKind::Reading, "reading speed", age);
        let p_high = benchmark::calculate_percentile(high, ActivityKind::Reading, "reading speed", age);
        prop_assert!(p_low <= p_high);
        prop_assert!((1.0..=99.0).contains(&p_low));
        prop_assert!((1.0..=99.0).contains(&p_high));
    }

    #[test]
    fn assessment_level_is_total_and_honors_floor(
        score in 0.0f64..=100.0,
        error_rate in 0.0f64..=100.0,
    ) {
        let label = report::format_assessment_level(score, error_rate);
        prop_assert!(
            ["Mastery", "Proficient", "Developing", "Needs Support"].contains(&label)
        );
        if score < 60.0 {
            prop_assert_eq!(label, "Needs Support");
        }
        if label == "Mastery" {
            prop_assert!(score >= 90.0 && error_rate < 10.0);
        }
    }
}
