//! Storage ports for the analytics pipeline. The statistical logic only ever
//! sees these traits; `MemoryStore` backs tests and the CLI, which hydrates
//! it from Postgres before computing.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{ActivityKind, FormativeAssessment, LearningSession, ProgressPattern};

/// Append-only log of learning sessions, keyed by student.
pub trait SessionStore {
    fn append_session(&mut self, session: LearningSession);
    /// All sessions for a student in recording order.
    fn sessions_for(&self, student_id: Uuid) -> Vec<&LearningSession>;
    /// The most recent `limit` sessions, still in chronological order.
    fn recent_sessions(&self, student_id: Uuid, limit: usize) -> Vec<&LearningSession> {
        let sessions = self.sessions_for(student_id);
        let skip = sessions.len().saturating_sub(limit);
        sessions.into_iter().skip(skip).collect()
    }
}

/// Formative assessments keyed by (student, domain, skill), plus the
/// append-only pattern log.
pub trait AssessmentStore {
    fn assessment(
        &self,
        student_id: Uuid,
        kind: ActivityKind,
        skill: &str,
    ) -> Option<&FormativeAssessment>;
    fn upsert_assessment(&mut self, assessment: FormativeAssessment);
    fn assessments_for(&self, student_id: Uuid) -> Vec<&FormativeAssessment>;
    fn append_pattern(&mut self, pattern: ProgressPattern);
    fn patterns_for(&self, student_id: Uuid) -> Vec<&ProgressPattern>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: HashMap<Uuid, Vec<LearningSession>>,
    assessments: HashMap<(Uuid, ActivityKind, String), FormativeAssessment>,
    patterns: Vec<ProgressPattern>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn append_session(&mut self, session: LearningSession) {
        self.sessions.entry(session.student_id).or_default().push(session);
    }

    fn sessions_for(&self, student_id: Uuid) -> Vec<&LearningSession> {
        self.sessions
            .get(&student_id)
            .map(|sessions| sessions.iter().collect())
            .unwrap_or_default()
    }
}

impl AssessmentStore for MemoryStore {
    fn assessment(
        &self,
        student_id: Uuid,
        kind: ActivityKind,
        skill: &str,
    ) -> Option<&FormativeAssessment> {
        self.assessments.get(&(student_id, kind, skill.to_string()))
    }

    fn upsert_assessment(&mut self, assessment: FormativeAssessment) {
        let key = (assessment.student_id, assessment.kind, assessment.skill.clone());
        self.assessments.insert(key, assessment);
    }

    fn assessments_for(&self, student_id: Uuid) -> Vec<&FormativeAssessment> {
        let mut assessments: Vec<&FormativeAssessment> = self
            .assessments
            .values()
            .filter(|a| a.student_id == student_id)
            .collect();
        assessments.sort_by(|a, b| {
            (a.kind.as_str(), a.skill.as_str()).cmp(&(b.kind.as_str(), b.skill.as_str()))
        });
        assessments
    }

    fn append_pattern(&mut self, pattern: ProgressPattern) {
        self.patterns.push(pattern);
    }

    fn patterns_for(&self, student_id: Uuid) -> Vec<&ProgressPattern> {
        self.patterns.iter().filter(|p| p.student_id == student_id).collect()
    }
}
