use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AttemptRecord, CohortMember, RankedEntry, RecentAttempt, TraineeIdentity};

#[derive(Debug, Clone)]
pub struct CohortScope {
    pub mentor_id: Uuid,
    pub label: String,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn resolve_scope(
    pool: &PgPool,
    mentor_email: Option<&str>,
    trainee_email: Option<&str>,
) -> Result<CohortScope, StoreError> {
    if let Some(email) = mentor_email {
        let row = sqlx::query("SELECT id, full_name FROM orthosim.mentors WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(StoreError::Fetch)?
            .ok_or_else(|| StoreError::UnknownMentor(email.to_string()))?;

        return Ok(CohortScope {
            mentor_id: row.get("id"),
            label: row.get("full_name"),
        });
    }

    if let Some(email) = trainee_email {
        let row = sqlx::query(
            "SELECT m.id, m.full_name \
             FROM orthosim.trainees t \
             JOIN orthosim.mentors m ON m.id = t.mentor_id \
             WHERE t.email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Fetch)?
        .ok_or_else(|| StoreError::UnknownTrainee(email.to_string()))?;

        return Ok(CohortScope {
            mentor_id: row.get("id"),
            label: row.get("full_name"),
        });
    }

    Err(StoreError::MissingScope)
}

pub async fn fetch_cohort(
    pool: &PgPool,
    scope: &CohortScope,
) -> Result<Vec<CohortMember>, StoreError> {
    let rows = sqlx::query(
        "SELECT t.id AS trainee_id, t.full_name, t.email, t.institution, t.graduation_year, \
         a.id AS attempt_id, a.score, a.total_time_secs, a.attempt_date, a.is_completed \
         FROM orthosim.trainees t \
         LEFT JOIN orthosim.attempts a ON a.trainee_id = t.id \
         WHERE t.mentor_id = $1 \
         ORDER BY t.id, a.attempt_date",
    )
    .bind(scope.mentor_id)
    .fetch_all(pool)
    .await
    .map_err(StoreError::Fetch)?;

    let mut members: Vec<CohortMember> = Vec::new();

    for row in rows {
        let trainee_id: Uuid = row.get("trainee_id");
        if members.last().map(|member| member.trainee.id) != Some(trainee_id) {
            members.push(CohortMember {
                trainee: TraineeIdentity {
                    id: trainee_id,
                    name: row.get("full_name"),
                    email: row.get("email"),
                    institution: row.get("institution"),
                    graduation_year: row.get("graduation_year"),
                },
                attempts: Vec::new(),
            });
        }

        let attempt_id: Option<Uuid> = row.get("attempt_id");
        if let (Some(member), Some(id)) = (members.last_mut(), attempt_id) {
            member.attempts.push(AttemptRecord {
                id,
                score: row.get("score"),
                total_time_secs: row.get("total_time_secs"),
                attempt_date: row.get("attempt_date"),
                is_completed: row.get("is_completed"),
            });
        }
    }

    Ok(members)
}

pub async fn upsert_leaderboard(pool: &PgPool, entry: &RankedEntry) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO orthosim.leaderboard
        (trainee_id, rank, best_score, average_score, total_attempts, total_training_secs, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        ON CONFLICT (trainee_id) DO UPDATE
        SET rank = EXCLUDED.rank,
            best_score = EXCLUDED.best_score,
            average_score = EXCLUDED.average_score,
            total_attempts = EXCLUDED.total_attempts,
            total_training_secs = EXCLUDED.total_training_secs,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(entry.trainee.id)
    .bind(entry.rank as i32)
    .bind(entry.metrics.best_score)
    .bind(entry.metrics.average_score)
    .bind(entry.metrics.total_attempts as i32)
    .bind(entry.metrics.total_training_secs)
    .execute(pool)
    .await
    .map_err(|source| StoreError::Persist {
        trainee_id: entry.trainee.id,
        source,
    })?;

    Ok(())
}

// Best effort: a failed upsert must not abort the batch or the response.
pub async fn persist_rankings(pool: &PgPool, entries: &[RankedEntry]) -> usize {
    let mut persisted = 0;

    for entry in entries {
        match upsert_leaderboard(pool, entry).await {
            Ok(()) => persisted += 1,
            Err(error) => warn!(
                %error,
                trainee = %entry.trainee.email,
                "skipping leaderboard upsert"
            ),
        }
    }

    persisted
}

pub async fn fetch_recent_attempts(
    pool: &PgPool,
    scope: &CohortScope,
    limit: usize,
) -> Result<Vec<RecentAttempt>, StoreError> {
    let rows = sqlx::query(
        "SELECT t.full_name, a.score, a.attempt_date, a.is_completed \
         FROM orthosim.attempts a \
         JOIN orthosim.trainees t ON t.id = a.trainee_id \
         WHERE t.mentor_id = $1 \
         ORDER BY a.attempt_date DESC \
         LIMIT $2",
    )
    .bind(scope.mentor_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .map_err(StoreError::Fetch)?;

    Ok(rows
        .into_iter()
        .map(|row| RecentAttempt {
            trainee_name: row.get("full_name"),
            score: row.get("score"),
            attempt_date: row.get("attempt_date"),
            is_completed: row.get("is_completed"),
        })
        .collect())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let mentor_id = Uuid::parse_str("8b6f2c1d-4a0e-4f4b-9a4e-2f1f6d3b5c77")?;

    sqlx::query(
        r#"
        INSERT INTO orthosim.mentors (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name
        "#,
    )
    .bind(mentor_id)
    .bind("Dr. Salim Haddad")
    .bind("salim.haddad@orthosim.example")
    .execute(pool)
    .await?;

    let trainees = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@orthosim.example",
            "St. Mary Teaching Hospital",
            2027,
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "jules.moreno@orthosim.example",
            "Riverside Medical School",
            2026,
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@orthosim.example",
            "St. Mary Teaching Hospital",
            2027,
        ),
    ];

    for (id, name, email, institution, graduation_year) in trainees {
        sqlx::query(
            r#"
            INSERT INTO orthosim.trainees
            (id, full_name, email, institution, graduation_year, mentor_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                institution = EXCLUDED.institution,
                graduation_year = EXCLUDED.graduation_year,
                mentor_id = EXCLUDED.mentor_id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(institution)
        .bind(graduation_year)
        .bind(mentor_id)
        .execute(pool)
        .await?;
    }

    let attempts = vec![
        ("seed-001", "avery.lee@orthosim.example", "62%", 2400, true, date(2026, 6, 1)?),
        ("seed-002", "avery.lee@orthosim.example", "68%", 2100, true, date(2026, 6, 8)?),
        ("seed-003", "avery.lee@orthosim.example", "74%", 2250, true, date(2026, 6, 15)?),
        ("seed-004", "avery.lee@orthosim.example", "81%", 1980, true, date(2026, 6, 22)?),
        ("seed-005", "avery.lee@orthosim.example", "87%", 1900, true, date(2026, 6, 29)?),
        ("seed-006", "avery.lee@orthosim.example", "92%", 1750, true, date(2026, 7, 6)?),
        ("seed-007", "jules.moreno@orthosim.example", "71%", 2600, true, date(2026, 6, 10)?),
        ("seed-008", "jules.moreno@orthosim.example", "n/a", 1400, true, date(2026, 6, 17)?),
        ("seed-009", "jules.moreno@orthosim.example", "79%", 2300, true, date(2026, 6, 24)?),
        ("seed-010", "kiara.patel@orthosim.example", "88%", 2050, true, date(2026, 6, 12)?),
        ("seed-011", "kiara.patel@orthosim.example", "", 800, false, date(2026, 7, 2)?),
    ];

    for (source_key, email, score, total_time_secs, is_completed, attempt_date) in attempts {
        let trainee_id: Uuid =
            sqlx::query("SELECT id FROM orthosim.trainees WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO orthosim.attempts
            (id, trainee_id, score, total_time_secs, attempt_date, is_completed, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(trainee_id)
        .bind(score)
        .bind(total_time_secs as i64)
        .bind(attempt_date)
        .bind(is_completed)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .context("invalid date")
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        trainee_email: String,
        score: String,
        total_time_secs: i64,
        attempt_date: DateTime<Utc>,
        is_completed: bool,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;

        // Registration is handled elsewhere; an export for an unknown
        // trainee means the file is for the wrong deployment.
        let trainee_id: Uuid =
            sqlx::query("SELECT id FROM orthosim.trainees WHERE email = $1")
                .bind(&row.trainee_email)
                .fetch_optional(pool)
                .await?
                .with_context(|| format!("no trainee registered under {}", row.trainee_email))?
                .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO orthosim.attempts
            (id, trainee_id, score, total_time_secs, attempt_date, is_completed, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(trainee_id)
        .bind(&row.score)
        .bind(row.total_time_secs)
        .bind(row.attempt_date)
        .bind(row.is_completed)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
