use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// One stored week: the Friday anchoring the week and the admin-entered
/// score (1-5), if any. One row per (user, week), so a score update is a
/// single atomic UPDATE.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WeeklyScore {
    pub user_id: Uuid,
    pub year: i32,
    /// Zero-based month (0 = January), matching the recorded data model.
    pub month: u32,
    pub week_start_date: NaiveDate,
    pub score: Option<i64>,
}

/// Per-(user, month) view assembled from weekly rows, plus display fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MonthlyUserPerformance {
    pub user_id: Uuid,
    pub user_name: String,
    pub avatar_url: Option<String>,
    pub year: i32,
    pub month: u32,
    pub weekly_scores: Vec<WeeklyScoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct WeeklyScoreEntry {
    pub week_start_date: NaiveDate,
    pub score: Option<i64>,
}

/// Leaderboard row derived from a month of weekly scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct UserPerformanceScore {
    pub user_id: Uuid,
    pub user_name: String,
    pub avatar_url: Option<String>,
    /// Mean of the non-null weekly scores, rounded to 2 decimals; 0 if none.
    pub score: f64,
    pub rank: u32,
}

impl WeeklyScore {
    /// All weeks recorded for a (user, month), ascending by date.
    pub async fn find_month(
        pool: &SqlitePool,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WeeklyScore>(
            r#"SELECT * FROM weekly_scores
               WHERE user_id = $1 AND year = $2 AND month = $3
               ORDER BY week_start_date ASC"#,
        )
        .bind(user_id)
        .bind(year)
        .bind(month)
        .fetch_all(pool)
        .await
    }

    /// Insert a null-scored week if it is not recorded yet. Idempotent.
    pub async fn insert_if_missing(
        pool: &SqlitePool,
        user_id: Uuid,
        year: i32,
        month: u32,
        week_start_date: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT OR IGNORE INTO weekly_scores (user_id, year, month, week_start_date, score)
               VALUES ($1, $2, $3, $4, NULL)"#,
        )
        .bind(user_id)
        .bind(year)
        .bind(month)
        .bind(week_start_date)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Set (or clear) the score of an existing week. Returns the number of
    /// rows changed; 0 means the week is not recorded.
    pub async fn set_score(
        pool: &SqlitePool,
        user_id: Uuid,
        week_start_date: NaiveDate,
        score: Option<i64>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE weekly_scores SET score = $3 WHERE user_id = $1 AND week_start_date = $2",
        )
        .bind(user_id)
        .bind(week_start_date)
        .bind(score)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Record a week that initialisation did not produce (e.g. a date outside
    /// the canonical Friday set), carrying the given score.
    pub async fn insert_with_score(
        pool: &SqlitePool,
        user_id: Uuid,
        year: i32,
        month: u32,
        week_start_date: NaiveDate,
        score: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO weekly_scores (user_id, year, month, week_start_date, score)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (user_id, week_start_date) DO UPDATE SET score = excluded.score"#,
        )
        .bind(user_id)
        .bind(year)
        .bind(month)
        .bind(week_start_date)
        .bind(score)
        .execute(pool)
        .await?;
        Ok(())
    }
}
