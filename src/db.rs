use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    ActivityKind, ActivityRecord, Difficulty, EngagementTier, LearningSession, SessionContext,
};

#[derive(Debug, Clone)]
pub struct StudentRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub birth_date: NaiveDate,
}

impl StudentRow {
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        let mut age = date.year() - self.birth_date.year();
        if (date.month(), date.day()) < (self.birth_date.month(), self.birth_date.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_students(pool: &PgPool, email: Option<&str>) -> anyhow::Result<Vec<StudentRow>> {
    let mut query = String::from(
        "SELECT id, full_name, email, birth_date FROM eduspark.students",
    );
    if email.is_some() {
        query.push_str(" WHERE email = $1");
    }
    query.push_str(" ORDER BY full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let students = records
        .into_iter()
        .map(|row| StudentRow {
            id: row.get("id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            birth_date: row.get("birth_date"),
        })
        .collect();
    Ok(students)
}

async fn upsert_student(
    pool: &PgPool,
    full_name: &str,
    email: &str,
    birth_date: NaiveDate,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO eduspark.students (id, full_name, email, birth_date)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name, birth_date = EXCLUDED.birth_date
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(birth_date)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn insert_session(
    pool: &PgPool,
    session: &LearningSession,
    source_key: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO eduspark.sessions
        (id, student_id, started_at, ended_at, engagement, time_of_day,
         distraction_count, device, location)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(session.id)
    .bind(session.student_id)
    .bind(session.started_at)
    .bind(session.ended_at)
    .bind(session.engagement.as_str())
    .bind(&session.context.time_of_day)
    .bind(session.context.distraction_count as i32)
    .bind(&session.context.device)
    .bind(&session.context.location)
    .execute(pool)
    .await?;

    for activity in &session.activities {
        sqlx::query(
            r#"
            INSERT INTO eduspark.activities
            (id, session_id, kind, skill, started_at, ended_at, attempts, accuracy,
             speed, difficulty, engagement, error_patterns, breakthroughs, note, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(activity.id)
        .bind(session.id)
        .bind(activity.kind.as_str())
        .bind(&activity.skill)
        .bind(activity.started_at)
        .bind(activity.ended_at)
        .bind(activity.attempts as i32)
        .bind(activity.accuracy)
        .bind(activity.speed)
        .bind(activity.difficulty.as_str())
        .bind(activity.engagement.as_str())
        .bind(&activity.error_patterns)
        .bind(&activity.breakthroughs)
        .bind(&activity.note)
        .bind(source_key)
        .execute(pool)
        .await?;
    }
    Ok(())
}

fn parse_kind(value: &str) -> anyhow::Result<ActivityKind> {
    ActivityKind::parse(value).with_context(|| format!("unknown activity kind '{value}'"))
}

fn parse_difficulty(value: &str) -> anyhow::Result<Difficulty> {
    Difficulty::parse(value).with_context(|| format!("unknown difficulty '{value}'"))
}

fn parse_engagement(value: &str) -> anyhow::Result<EngagementTier> {
    EngagementTier::parse(value).with_context(|| format!("unknown engagement tier '{value}'"))
}

/// Loads a student's sessions with their activities, oldest first, ready to
/// replay through the recorder.
pub async fn fetch_sessions(
    pool: &PgPool,
    student_id: Uuid,
    since: Option<DateTime<Utc>>,
) -> anyhow::Result<Vec<LearningSession>> {
    let mut query = String::from(
        "SELECT id, student_id, started_at, ended_at, engagement, time_of_day, \
         distraction_count, device, location \
         FROM eduspark.sessions WHERE student_id = $1",
    );
    if since.is_some() {
        query.push_str(" AND started_at >= $2");
    }
    query.push_str(" ORDER BY started_at ASC");

    let mut rows = sqlx::query(&query).bind(student_id);
    if let Some(value) = since {
        rows = rows.bind(value);
    }

    let mut sessions = Vec::new();
    for row in rows.fetch_all(pool).await? {
        let session_id: Uuid = row.get("id");
        let engagement: String = row.get("engagement");
        let distraction_count: i32 = row.get("distraction_count");
        let activities = fetch_activities(pool, session_id).await?;
        sessions.push(LearningSession {
            id: session_id,
            student_id: row.get("student_id"),
            started_at: row.get("started_at"),
            ended_at: row.get("ended_at"),
            engagement: parse_engagement(&engagement)?,
            context: SessionContext {
                time_of_day: row.get("time_of_day"),
                distraction_count: distraction_count.max(0) as u32,
                device: row.get("device"),
                location: row.get("location"),
            },
            activities,
        });
    }
    Ok(sessions)
}

async fn fetch_activities(pool: &PgPool, session_id: Uuid) -> anyhow::Result<Vec<ActivityRecord>> {
    let rows = sqlx::query(
        "SELECT id, kind, skill, started_at, ended_at, attempts, accuracy, speed, \
         difficulty, engagement, error_patterns, breakthroughs, note \
         FROM eduspark.activities WHERE session_id = $1 ORDER BY started_at ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    let mut activities = Vec::new();
    for row in rows {
        let kind: String = row.get("kind");
        let difficulty: String = row.get("difficulty");
        let engagement: String = row.get("engagement");
        let attempts: i32 = row.get("attempts");
        activities.push(ActivityRecord {
            id: row.get("id"),
            kind: parse_kind(&kind)?,
            skill: row.get("skill"),
            started_at: row.get("started_at"),
            ended_at: row.get("ended_at"),
            attempts: attempts.max(0) as u32,
            accuracy: row.get("accuracy"),
            speed: row.get("speed"),
            difficulty: parse_difficulty(&difficulty)?,
            engagement: parse_engagement(&engagement)?,
            error_patterns: row.get("error_patterns"),
            breakthroughs: row.get("breakthroughs"),
            note: row.get("note"),
        });
    }
    Ok(activities)
}

/// Imports single-activity sessions from a CSV export. Rows carry an
/// optional `source_key` used for idempotent re-imports.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        birth_date: NaiveDate,
        kind: String,
        skill: String,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        attempts: u32,
        accuracy: f64,
        speed: f64,
        difficulty: String,
        engagement: String,
        error_patterns: Option<String>,
        breakthroughs: Option<String>,
        note: Option<String>,
        source_key: Option<String>,
    }

    fn split_tags(value: Option<String>) -> Vec<String> {
        value
            .map(|v| {
                v.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let existing = sqlx::query(
            "SELECT 1 AS present FROM eduspark.activities WHERE source_key = $1",
        )
        .bind(&source_key)
        .fetch_optional(pool)
        .await?;
        if existing.is_some() {
            continue;
        }

        let student_id = upsert_student(pool, &row.full_name, &row.email, row.birth_date).await?;
        let engagement = parse_engagement(&row.engagement)?;
        let session = LearningSession {
            id: Uuid::new_v4(),
            student_id,
            started_at: row.started_at,
            ended_at: row.ended_at,
            engagement,
            context: SessionContext::default(),
            activities: vec![ActivityRecord {
                id: Uuid::new_v4(),
                kind: parse_kind(&row.kind)?,
                skill: row.skill,
                started_at: row.started_at,
                ended_at: row.ended_at,
                attempts: row.attempts,
                accuracy: row.accuracy,
                speed: row.speed,
                difficulty: parse_difficulty(&row.difficulty)?,
                engagement,
                error_patterns: split_tags(row.error_patterns),
                breakthroughs: split_tags(row.breakthroughs),
                note: row.note.unwrap_or_default(),
            }],
        };
        insert_session(pool, &session, Some(&source_key)).await?;
        inserted += 1;
    }

    Ok(inserted)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            "Mika Tanaka",
            "mika.tanaka@eduspark.example",
            NaiveDate::from_ymd_opt(2020, 4, 12).context("invalid date")?,
        ),
        (
            "Leo Okafor",
            "leo.okafor@eduspark.example",
            NaiveDate::from_ymd_opt(2018, 9, 3).context("invalid date")?,
        ),
        (
            "Sara Haddad",
            "sara.haddad@eduspark.example",
            NaiveDate::from_ymd_opt(2016, 1, 27).context("invalid date")?,
        ),
    ];

    let mut ids = Vec::new();
    for (name, email, birth_date) in &students {
        ids.push(upsert_student(pool, name, email, *birth_date).await?);
    }

    let seed_sessions: Vec<(usize, &str, &str, &str, i64, f64, u32)> = vec![
        (0, "reading", "phonics accuracy", "beginner", 21, 58.0, 5),
        (0, "reading", "phonics accuracy", "beginner", 14, 66.0, 4),
        (0, "reading", "phonics accuracy", "beginner", 7, 72.0, 3),
        (1, "attention", "focus duration", "intermediate", 10, 64.0, 6),
        (1, "cognitive", "memory span", "intermediate", 3, 82.0, 2),
        (2, "speech", "articulation accuracy", "advanced", 5, 91.0, 1),
    ];

    for (index, (student, kind, skill, difficulty, days_ago, accuracy, attempts)) in
        seed_sessions.into_iter().enumerate()
    {
        let started_at = Utc::now() - chrono::Duration::days(days_ago);
        let ended_at = started_at + chrono::Duration::minutes(15);
        let session = LearningSession {
            id: Uuid::new_v4(),
            student_id: ids[student],
            started_at,
            ended_at,
            engagement: EngagementTier::Medium,
            context: SessionContext {
                time_of_day: "afternoon".to_string(),
                distraction_count: 1,
                device: "tablet".to_string(),
                location: "home".to_string(),
            },
            activities: vec![ActivityRecord {
                id: Uuid::new_v4(),
                kind: parse_kind(kind)?,
                skill: skill.to_string(),
                started_at,
                ended_at,
                attempts,
                accuracy,
                speed: 1.0,
                difficulty: parse_difficulty(difficulty)?,
                engagement: EngagementTier::Medium,
                error_patterns: Vec::new(),
                breakthroughs: Vec::new(),
                note: String::new(),
            }],
        };
        let source_key = format!("seed-{index:03}");
        let existing = sqlx::query(
            "SELECT 1 AS present FROM eduspark.activities WHERE source_key = $1",
        )
        .bind(&source_key)
        .fetch_optional(pool)
        .await?;
        if existing.is_none() {
            insert_session(pool, &session, Some(&source_key)).await?;
        }
    }

    Ok(())
}
