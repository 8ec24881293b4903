//! Session ingestion: updates formative assessments, detects progress
//! patterns, and returns a real-time insight bundle. All logic is stateless
//! and operates on a store handle passed by the caller.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::benchmark;
use crate::error::AnalyticsError;
use crate::models::{
    ActivityKind, ActivityRecord, EngagementTier, FormativeAssessment, LearningSession,
    PatternKind, ProgressPattern, RealtimeInsight,
};
use crate::stats;
use crate::store::{AssessmentStore, SessionStore};

/// Weight kept from the previous level estimate; the newest sample
/// contributes the remainder. The estimate never jumps to a single outlier.
const LEVEL_CARRYOVER: f64 = 0.7;
const SAMPLE_WEIGHT: f64 = 1.0 - LEVEL_CARRYOVER;

const SECONDS_PER_WEEK: f64 = 7.0 * 24.0 * 3600.0;

/// Sessions considered for the real-time insight bundle.
const INSIGHT_WINDOW: usize = 3;

/// Samples considered for pattern detection, newest last.
const PATTERN_WINDOW: usize = 10;
const PATTERN_MIN_SAMPLES: usize = 3;
const PLATEAU_WINDOW: usize = 5;

pub fn validate_activity(activity: &ActivityRecord) -> Result<(), AnalyticsError> {
    if activity.skill.trim().is_empty() {
        return Err(AnalyticsError::Validation("empty skill name".to_string()));
    }
    if !(0.0..=100.0).contains(&activity.accuracy) {
        return Err(AnalyticsError::Validation(format!(
            "accuracy {} outside 0-100 for skill '{}'",
            activity.accuracy, activity.skill
        )));
    }
    if activity.ended_at < activity.started_at {
        return Err(AnalyticsError::Validation(format!(
            "activity for skill '{}' ends before it starts",
            activity.skill
        )));
    }
    if activity.attempts == 0 {
        return Err(AnalyticsError::Validation(format!(
            "zero attempts recorded for skill '{}'",
            activity.skill
        )));
    }
    Ok(())
}

/// Ingests a completed session: assigns a fresh id, appends it to the log,
/// folds every activity into its formative assessment, re-runs pattern
/// detection, and returns the insight bundle for the caller to display.
///
/// Malformed activities are rejected up front and nothing is stored.
pub fn record_session<S>(
    store: &mut S,
    mut session: LearningSession,
) -> Result<RealtimeInsight, AnalyticsError>
where
    S: SessionStore + AssessmentStore,
{
    if session.ended_at < session.started_at {
        return Err(AnalyticsError::Validation(
            "session ends before it starts".to_string(),
        ));
    }
    for activity in &session.activities {
        validate_activity(activity)?;
    }

    session.id = Uuid::new_v4();
    let student_id = session.student_id;
    let activities = session.activities.clone();
    store.append_session(session);

    for activity in &activities {
        let updated = match store.assessment(student_id, activity.kind, &activity.skill) {
            Some(previous) => advance_assessment(previous.clone(), activity),
            None => seed_assessment(student_id, activity),
        };
        store.upsert_assessment(updated);
    }

    let detected_at = activities
        .iter()
        .map(|a| a.ended_at)
        .max()
        .unwrap_or_else(Utc::now);
    for pattern in detect_patterns(store, student_id, detected_at) {
        store.append_pattern(pattern);
    }

    Ok(build_insight(store, student_id))
}

fn seed_assessment(student_id: Uuid, activity: &ActivityRecord) -> FormativeAssessment {
    let mut assessment = FormativeAssessment {
        student_id,
        kind: activity.kind,
        skill: activity.skill.clone(),
        current_level: activity.accuracy,
        target_level: benchmark::target_level(activity.kind, activity.difficulty),
        progress_rate: 0.0,
        mastery_indicators: Vec::new(),
        struggling_areas: Vec::new(),
        recommendations: Vec::new(),
        last_assessed: activity.ended_at,
        next_assessment: activity.ended_at + Duration::days(14),
    };
    apply_indicators(&mut assessment, activity);
    assessment
}

fn advance_assessment(
    mut assessment: FormativeAssessment,
    activity: &ActivityRecord,
) -> FormativeAssessment {
    let old_level = assessment.current_level;
    let new_level = old_level * LEVEL_CARRYOVER + activity.accuracy * SAMPLE_WEIGHT;

    let weeks = (activity.ended_at - assessment.last_assessed).num_seconds() as f64
        / SECONDS_PER_WEEK;
    assessment.progress_rate = if weeks > 0.0 {
        (new_level - old_level) / weeks
    } else {
        0.0
    };

    assessment.current_level = new_level;
    assessment.target_level = benchmark::target_level(activity.kind, activity.difficulty);
    assessment.last_assessed = activity.ended_at;
    let interval = if assessment.progress_rate > 0.1 { 7 } else { 14 };
    assessment.next_assessment = activity.ended_at + Duration::days(interval);

    apply_indicators(&mut assessment, activity);
    assessment
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

/// Mastery and struggling tags accumulate as deduplicated sets and are
/// never removed once earned.
fn apply_indicators(assessment: &mut FormativeAssessment, activity: &ActivityRecord) {
    if activity.accuracy >= 90.0 {
        push_unique(&mut assessment.mastery_indicators, "high accuracy");
    }
    if activity.attempts <= 2 {
        push_unique(&mut assessment.mastery_indicators, "quick mastery");
    }
    if activity.engagement == EngagementTier::High {
        push_unique(&mut assessment.mastery_indicators, "high engagement");
    }
    if activity.error_patterns.is_empty() {
        push_unique(&mut assessment.mastery_indicators, "error free");
    }

    if activity.accuracy < 70.0 {
        push_unique(&mut assessment.struggling_areas, "low accuracy");
    }
    if activity.attempts > 5 {
        push_unique(&mut assessment.struggling_areas, "excessive attempts");
    }
    if activity.engagement == EngagementTier::Low {
        push_unique(&mut assessment.struggling_areas, "low engagement");
    }
    if activity.error_patterns.len() > 2 {
        push_unique(&mut assessment.struggling_areas, "recurring error patterns");
    }

    refresh_recommendations(assessment);
}

fn refresh_recommendations(assessment: &mut FormativeAssessment) {
    if assessment.struggling_areas.iter().any(|t| t == "low accuracy") {
        push_unique(
            &mut assessment.recommendations,
            &format!("Revisit {} at an easier difficulty", assessment.skill),
        );
    }
    if assessment.struggling_areas.iter().any(|t| t == "excessive attempts") {
        push_unique(
            &mut assessment.recommendations,
            &format!("Break {} practice into shorter drills", assessment.skill),
        );
    }
    if assessment.struggling_areas.iter().any(|t| t == "low engagement") {
        push_unique(
            &mut assessment.recommendations,
            "Vary activity formats to rebuild engagement",
        );
    }
    if assessment.current_level >= assessment.target_level {
        push_unique(
            &mut assessment.recommendations,
            &format!("Advance {} to the next difficulty tier", assessment.skill),
        );
    }
}

/// Trend detection over the per-skill accuracy series (normalized to 0-1),
/// using up to the last 10 samples. The checks are independent and NOT
/// mutually exclusive: one skill can yield a learning curve and a plateau in
/// the same call. Callers decide precedence.
pub fn detect_patterns<S: SessionStore>(
    store: &S,
    student_id: Uuid,
    detected_at: DateTime<Utc>,
) -> Vec<ProgressPattern> {
    let sessions = store.sessions_for(student_id);
    let mut skills: Vec<(ActivityKind, String)> = Vec::new();
    for session in &sessions {
        for activity in &session.activities {
            let key = (activity.kind, activity.skill.clone());
            if !skills.contains(&key) {
                skills.push(key);
            }
        }
    }

    let mut patterns = Vec::new();
    for (kind, skill) in skills {
        let mut series: Vec<f64> = sessions
            .iter()
            .flat_map(|session| session.activities.iter())
            .filter(|a| a.kind == kind && a.skill == skill)
            .map(|a| a.accuracy / 100.0)
            .collect();
        if series.len() < PATTERN_MIN_SAMPLES {
            continue;
        }
        if series.len() > PATTERN_WINDOW {
            series = series.split_off(series.len() - PATTERN_WINDOW);
        }

        let slope = stats::ols_slope(&series);
        let consistency = stats::consistency(&series);
        let mut push = |pattern: PatternKind, slope: f64, consistency: f64, samples: usize| {
            patterns.push(ProgressPattern {
                student_id,
                kind,
                skill: skill.clone(),
                pattern,
                slope,
                consistency,
                sample_count: samples,
                detected_at,
            });
        };

        if slope > 0.1 && consistency > 0.7 {
            push(PatternKind::LearningCurve, slope, consistency, series.len());
        }

        let tail = &series[series.len().saturating_sub(PLATEAU_WINDOW)..];
        let tail_slope = stats::ols_slope(tail);
        if stats::variance(tail) < 0.05 && tail_slope.abs() < 0.02 {
            push(PatternKind::Plateau, tail_slope, stats::consistency(tail), tail.len());
        }

        if slope < -0.1 {
            push(PatternKind::Regression, slope, consistency, series.len());
        }

        let newest = series[series.len() - 1];
        let prior_mean = stats::mean(&series[..series.len() - 1]);
        if newest - prior_mean > 0.15 {
            push(PatternKind::Breakthrough, slope, consistency, series.len());
        }

        if consistency < 0.3 {
            push(PatternKind::Inconsistency, slope, consistency, series.len());
        }
    }
    patterns
}

/// Aggregates the last up-to-3 sessions into the insight bundle. Pure
/// read-only aggregation; no store mutation.
pub fn build_insight<S>(store: &S, student_id: Uuid) -> RealtimeInsight
where
    S: SessionStore + AssessmentStore,
{
    let window = store.recent_sessions(student_id, INSIGHT_WINDOW);
    let activities: Vec<&ActivityRecord> = window
        .iter()
        .flat_map(|session| session.activities.iter())
        .collect();

    let accuracies: Vec<f64> = activities.iter().map(|a| a.accuracy).collect();
    let performance_average = stats::mean(&accuracies);

    let engagement = window
        .last()
        .map(|session| session.engagement)
        .unwrap_or(EngagementTier::Medium);

    let minutes: Vec<f64> = activities
        .iter()
        .map(|a| (a.ended_at - a.started_at).num_seconds() as f64 / 60.0)
        .collect();
    let attention_span_minutes = stats::mean(&minutes);

    let rates: Vec<f64> = store
        .assessments_for(student_id)
        .iter()
        .map(|a| a.progress_rate)
        .collect();
    let learning_velocity = stats::mean(&rates);

    let mut struggling_skills = Vec::new();
    for activity in &activities {
        if activity.accuracy < 70.0 && !struggling_skills.contains(&activity.skill) {
            struggling_skills.push(activity.skill.clone());
        }
    }

    let mut breakthroughs = Vec::new();
    for activity in &activities {
        for tag in &activity.breakthroughs {
            if !breakthroughs.contains(tag) {
                breakthroughs.push(tag.clone());
            }
        }
    }

    let mut recommendations = Vec::new();
    if !struggling_skills.is_empty() {
        recommendations.push(format!(
            "Schedule a short review of {}",
            struggling_skills.join(", ")
        ));
    }
    if engagement == EngagementTier::Low {
        recommendations.push("Shorten the next session and lead with a favorite game".to_string());
    }
    if performance_average >= 90.0 && !activities.is_empty() {
        recommendations.push("Introduce more challenging material".to_string());
    }

    RealtimeInsight {
        performance_average,
        engagement,
        attention_span_minutes,
        learning_velocity,
        struggling_skills,
        breakthroughs,
        recommendations,
    }
}
