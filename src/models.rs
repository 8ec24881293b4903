use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Learning domain an activity exercises. Doubles as the benchmark domain key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Reading,
    Attention,
    Speech,
    Cognitive,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Reading => "reading",
            ActivityKind::Attention => "attention",
            ActivityKind::Speech => "speech",
            ActivityKind::Cognitive => "cognitive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reading" => Some(ActivityKind::Reading),
            "attention" => Some(ActivityKind::Attention),
            "speech" => Some(ActivityKind::Speech),
            "cognitive" => Some(ActivityKind::Cognitive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

/// Coarse attentiveness label observed for a session or a single activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementTier {
    High,
    Medium,
    Low,
}

impl EngagementTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementTier::High => "high",
            EngagementTier::Medium => "medium",
            EngagementTier::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(EngagementTier::High),
            "medium" => Some(EngagementTier::Medium),
            "low" => Some(EngagementTier::Low),
            _ => None,
        }
    }
}

/// One timed exercise attempt, produced after a game or drill ends.
/// Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub skill: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub attempts: u32,
    /// Percentage of correct responses, 0-100.
    pub accuracy: f64,
    pub speed: f64,
    pub difficulty: Difficulty,
    pub engagement: EngagementTier,
    pub error_patterns: Vec<String>,
    pub breakthroughs: Vec<String>,
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub time_of_day: String,
    pub distraction_count: u32,
    pub device: String,
    pub location: String,
}

/// A bounded sequence of activities with session-level engagement and
/// environmental context. Append-only once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSession {
    pub id: Uuid,
    pub student_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub engagement: EngagementTier,
    pub context: SessionContext,
    pub activities: Vec<ActivityRecord>,
}

/// Evolving per-(student, domain, skill) ability estimate. `current_level`
/// is a smoothed running estimate, not a raw average of samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormativeAssessment {
    pub student_id: Uuid,
    pub kind: ActivityKind,
    pub skill: String,
    pub current_level: f64,
    pub target_level: f64,
    /// Change in current level per week.
    pub progress_rate: f64,
    pub mastery_indicators: Vec<String>,
    pub struggling_areas: Vec<String>,
    pub recommendations: Vec<String>,
    pub last_assessed: DateTime<Utc>,
    pub next_assessment: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    LearningCurve,
    Plateau,
    Regression,
    Breakthrough,
    Inconsistency,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::LearningCurve => "learning_curve",
            PatternKind::Plateau => "plateau",
            PatternKind::Regression => "regression",
            PatternKind::Breakthrough => "breakthrough",
            PatternKind::Inconsistency => "inconsistency",
        }
    }
}

/// A derived trend observation over a student's recent sessions for one
/// skill. Write-once per detection event; stale patterns are never retracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPattern {
    pub student_id: Uuid,
    pub kind: ActivityKind,
    pub skill: String,
    pub pattern: PatternKind,
    pub slope: f64,
    pub consistency: f64,
    pub sample_count: usize,
    pub detected_at: DateTime<Utc>,
}

/// Static reference values for a skill within an age bucket.
#[derive(Debug, Clone, Copy)]
pub struct Benchmark {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub std_dev: f64,
}

/// A raw score contextualized against same-age peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkComparison {
    pub kind: ActivityKind,
    pub skill: String,
    pub score: f64,
    pub age_bucket: String,
    pub z_score: f64,
    pub percentile: f64,
}

/// Aggregate over the most recent sessions, recomputed on every
/// `record_session` call and returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInsight {
    pub performance_average: f64,
    pub engagement: EngagementTier,
    pub attention_span_minutes: f64,
    pub learning_velocity: f64,
    pub struggling_skills: Vec<String>,
    pub breakthroughs: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
}

impl LearningStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Auditory => "auditory",
            LearningStyle::Kinesthetic => "kinesthetic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProfile {
    pub visual: f64,
    pub auditory: f64,
    pub kinesthetic: f64,
    /// Largest of the three proxies; ties resolve in the fixed order
    /// visual, auditory, kinesthetic.
    pub dominant_style: LearningStyle,
    pub strengths: Vec<String>,
    pub challenges: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionPlan {
    pub skill: String,
    pub percentile: f64,
    pub strategies: Vec<String>,
    pub resources: Vec<String>,
    pub timeline: String,
    pub success_criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub id: Uuid,
    pub full_name: String,
    pub age: u32,
}

/// Point-in-time aggregate for display. Fully recomputed on each request,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveReport {
    pub student: StudentInfo,
    pub executive_summary: String,
    pub assessments: Vec<FormativeAssessment>,
    pub comparisons: Vec<BenchmarkComparison>,
    pub patterns: Vec<ProgressPattern>,
    pub profile: LearningProfile,
    pub interventions: Vec<InterventionPlan>,
    pub parent_guidance: Vec<String>,
    pub educator_guidance: Vec<String>,
}
