//! Monthly performance aggregation: Friday-anchored weekly scores, lazy
//! month initialisation, and the current-month leaderboard.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use db::models::{
    performance::{MonthlyUserPerformance, UserPerformanceScore, WeeklyScore, WeeklyScoreEntry},
    user::User,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PerformanceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("score must be between 1 and 5, or null")]
    ScoreOutOfRange,
    #[error("month must be between 0 and 11")]
    InvalidMonth,
    #[error("no performance record for this user and week")]
    WeekNotFound,
}

pub struct PerformanceService;

impl PerformanceService {
    /// Every Friday of the given month, ascending. `month` is zero-based.
    pub fn fridays_of_month(year: i32, month: u32) -> Result<Vec<NaiveDate>, PerformanceError> {
        if month > 11 {
            return Err(PerformanceError::InvalidMonth);
        }
        let mut date = NaiveDate::from_ymd_opt(year, month + 1, 1)
            .ok_or(PerformanceError::InvalidMonth)?;

        while date.weekday() != Weekday::Fri {
            match date.succ_opt() {
                Some(next) if next.month0() == month => date = next,
                // Ran off the end of the month before hitting a Friday; can
                // only happen for a malformed calendar, but stay total.
                _ => return Ok(Vec::new()),
            }
        }

        let mut fridays = Vec::new();
        while date.month0() == month && date.year() == year {
            fridays.push(date);
            date = date + Duration::days(7);
        }
        Ok(fridays)
    }

    /// Fetch the month's record for a user, creating or backfilling a
    /// null-scored entry for every Friday. Idempotent: re-running against an
    /// already complete month changes nothing.
    pub async fn ensure_month(
        pool: &SqlitePool,
        user: &User,
        year: i32,
        month: u32,
    ) -> Result<MonthlyUserPerformance, PerformanceError> {
        for friday in Self::fridays_of_month(year, month)? {
            WeeklyScore::insert_if_missing(pool, user.id, year, month, friday).await?;
        }

        let weekly_scores = WeeklyScore::find_month(pool, user.id, year, month)
            .await?
            .into_iter()
            .map(|row| WeeklyScoreEntry {
                week_start_date: row.week_start_date,
                score: row.score,
            })
            .collect();

        Ok(MonthlyUserPerformance {
            user_id: user.id,
            user_name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            year,
            month,
            weekly_scores,
        })
    }

    /// The current month's records for every non-admin user, ordered by
    /// name. Records are initialised lazily here, so first read of a new
    /// month creates them.
    pub async fn current_month_overview(
        pool: &SqlitePool,
    ) -> Result<Vec<MonthlyUserPerformance>, PerformanceError> {
        let (year, month) = current_year_month();
        let mut records = Vec::new();
        for user in User::find_non_admins(pool).await? {
            records.push(Self::ensure_month(pool, &user, year, month).await?);
        }
        records.sort_by(|a, b| a.user_name.cmp(&b.user_name));
        Ok(records)
    }

    /// Set (or clear, with `None`) a user's score for the week anchored at
    /// `week_start_date`. Out-of-range scores are rejected before any write.
    /// A missing month record is initialised and the update retried once.
    pub async fn update_weekly_score(
        pool: &SqlitePool,
        user_id: Uuid,
        year: i32,
        month: u32,
        week_start_date: NaiveDate,
        score: Option<i64>,
    ) -> Result<(), PerformanceError> {
        if let Some(s) = score {
            if !(1..=5).contains(&s) {
                return Err(PerformanceError::ScoreOutOfRange);
            }
        }

        let changed = WeeklyScore::set_score(pool, user_id, week_start_date, score).await?;
        if changed > 0 {
            return Ok(());
        }

        // The month may simply not have been read yet. Initialise it and
        // retry exactly once.
        let fridays = Self::fridays_of_month(year, month)?;
        for friday in &fridays {
            WeeklyScore::insert_if_missing(pool, user_id, year, month, *friday).await?;
        }

        let changed = WeeklyScore::set_score(pool, user_id, week_start_date, score).await?;
        if changed > 0 {
            return Ok(());
        }

        // Week is outside the canonical Friday set (schema drift in the
        // source data). Record it rather than dropping the admin's entry.
        if week_start_date.year() == year && week_start_date.month0() == month {
            warn!(
                %user_id,
                %week_start_date,
                "recording weekly score outside the canonical Friday set"
            );
            WeeklyScore::insert_with_score(pool, user_id, year, month, week_start_date, score)
                .await?;
            return Ok(());
        }

        Err(PerformanceError::WeekNotFound)
    }

    /// Current-month leaderboard over non-admin users: mean of non-null
    /// weekly scores (0 with no scores), 2-decimal rounding, descending by
    /// score with ties broken by ascending name, 1-based ranks.
    pub async fn monthly_leaderboard(
        pool: &SqlitePool,
    ) -> Result<Vec<UserPerformanceScore>, PerformanceError> {
        let (year, month) = current_year_month();
        let mut entries = Vec::new();

        for user in User::find_non_admins(pool).await? {
            let record = Self::ensure_month(pool, &user, year, month).await?;
            let scores: Vec<Option<i64>> =
                record.weekly_scores.iter().map(|w| w.score).collect();
            entries.push(UserPerformanceScore {
                user_id: user.id,
                user_name: user.name,
                avatar_url: user.avatar_url,
                score: mean_score(&scores),
                rank: 0,
            });
        }

        Ok(rank_leaderboard(entries))
    }
}

fn current_year_month() -> (i32, u32) {
    let today = Utc::now().date_naive();
    (today.year(), today.month0())
}

/// Mean of the entered scores rounded to 2 decimal places; 0 if none.
fn mean_score(scores: &[Option<i64>]) -> f64 {
    let entered: Vec<i64> = scores.iter().flatten().copied().collect();
    if entered.is_empty() {
        return 0.0;
    }
    let mean = entered.iter().sum::<i64>() as f64 / entered.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Sort descending by score (name ascending on ties) and assign 1-based
/// ranks in list order.
fn rank_leaderboard(mut entries: Vec<UserPerformanceScore>) -> Vec<UserPerformanceScore> {
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.user_name.cmp(&b.user_name))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::{
        DBService,
        models::user::{CreateUser, User},
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fridays_are_all_fridays_of_the_requested_month() {
        for (year, month) in [(2024, 0), (2024, 1), (2025, 7), (2023, 11)] {
            let fridays = PerformanceService::fridays_of_month(year, month).unwrap();
            assert!(!fridays.is_empty());
            for friday in &fridays {
                assert_eq!(friday.weekday(), Weekday::Fri);
                assert_eq!(friday.month0(), month);
                assert_eq!(friday.year(), year);
            }
            // Consecutive Fridays are exactly a week apart.
            for pair in fridays.windows(2) {
                assert_eq!(pair[1].signed_duration_since(pair[0]), Duration::days(7));
            }
        }
    }

    #[test]
    fn february_2023_has_fridays_3_10_17_24() {
        let fridays = PerformanceService::fridays_of_month(2023, 1).unwrap();
        assert_eq!(
            fridays,
            vec![
                date(2023, 2, 3),
                date(2023, 2, 10),
                date(2023, 2, 17),
                date(2023, 2, 24),
            ]
        );
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert!(matches!(
            PerformanceService::fridays_of_month(2024, 12),
            Err(PerformanceError::InvalidMonth)
        ));
    }

    #[test]
    fn mean_skips_missing_weeks_and_rounds() {
        // Fridays [3,10,17,24] scored [5, null, 3, 4] -> (5+3+4)/3 = 4.00
        assert_eq!(mean_score(&[Some(5), None, Some(3), Some(4)]), 4.0);
        assert_eq!(mean_score(&[None, None]), 0.0);
        assert_eq!(mean_score(&[]), 0.0);
        // 5 + 4 over two weeks -> 4.5; 1+1+2 over three -> 1.33
        assert_eq!(mean_score(&[Some(5), Some(4)]), 4.5);
        assert_eq!(mean_score(&[Some(1), Some(1), Some(2)]), 1.33);
    }

    #[test]
    fn ranking_is_descending_with_alphabetical_ties() {
        let entry = |name: &str, score: f64| UserPerformanceScore {
            user_id: Uuid::new_v4(),
            user_name: name.to_string(),
            avatar_url: None,
            score,
            rank: 0,
        };
        let ranked = rank_leaderboard(vec![
            entry("Zoe", 3.5),
            entry("Abe", 3.5),
            entry("Mia", 4.2),
        ]);
        let order: Vec<(&str, u32)> = ranked
            .iter()
            .map(|e| (e.user_name.as_str(), e.rank))
            .collect();
        assert_eq!(order, vec![("Mia", 1), ("Abe", 2), ("Zoe", 3)]);
    }

    async fn seed_user(db: &DBService, name: &str, pin: &str, is_admin: bool) -> User {
        User::create(
            &db.pool,
            &CreateUser {
                name: name.to_string(),
                email: None,
                pin: pin.to_string(),
                is_admin,
                avatar_url: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn ensure_month_is_idempotent() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = seed_user(&db, "Rae", "1234", false).await;

        let first = PerformanceService::ensure_month(&db.pool, &user, 2023, 1)
            .await
            .unwrap();
        let second = PerformanceService::ensure_month(&db.pool, &user, 2023, 1)
            .await
            .unwrap();

        assert_eq!(first.weekly_scores.len(), 4);
        assert_eq!(first.weekly_scores, second.weekly_scores);
        assert!(first.weekly_scores.iter().all(|w| w.score.is_none()));
    }

    #[tokio::test]
    async fn out_of_range_scores_are_rejected_before_any_write() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = seed_user(&db, "Rae", "1234", false).await;
        let friday = date(2023, 2, 3);

        for bad in [6, -1, 0] {
            let err = PerformanceService::update_weekly_score(
                &db.pool, user.id, 2023, 1, friday, Some(bad),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, PerformanceError::ScoreOutOfRange));
        }

        // Nothing was initialised by the rejected updates.
        let rows = WeeklyScore::find_month(&db.pool, user.id, 2023, 1)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn update_initialises_missing_month_then_retries() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = seed_user(&db, "Rae", "1234", false).await;

        // No prior read of the month: the update must self-initialise.
        PerformanceService::update_weekly_score(
            &db.pool,
            user.id,
            2023,
            1,
            date(2023, 2, 10),
            Some(4),
        )
        .await
        .unwrap();

        let record = PerformanceService::ensure_month(&db.pool, &user, 2023, 1)
            .await
            .unwrap();
        assert_eq!(record.weekly_scores.len(), 4);
        assert_eq!(
            record
                .weekly_scores
                .iter()
                .find(|w| w.week_start_date == date(2023, 2, 10))
                .unwrap()
                .score,
            Some(4)
        );
    }

    #[tokio::test]
    async fn setting_null_clears_a_score() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = seed_user(&db, "Rae", "1234", false).await;
        let friday = date(2023, 2, 17);

        PerformanceService::update_weekly_score(&db.pool, user.id, 2023, 1, friday, Some(5))
            .await
            .unwrap();
        PerformanceService::update_weekly_score(&db.pool, user.id, 2023, 1, friday, None)
            .await
            .unwrap();

        let record = PerformanceService::ensure_month(&db.pool, &user, 2023, 1)
            .await
            .unwrap();
        assert!(record
            .weekly_scores
            .iter()
            .find(|w| w.week_start_date == friday)
            .unwrap()
            .score
            .is_none());
    }

    #[tokio::test]
    async fn leaderboard_covers_non_admins_and_ranks_from_one() {
        let db = DBService::new_in_memory().await.unwrap();
        seed_user(&db, "Admin", "0001", true).await;
        let rae = seed_user(&db, "Rae", "0002", false).await;
        let abe = seed_user(&db, "Abe", "0003", false).await;

        let (year, month) = current_year_month();
        let fridays = PerformanceService::fridays_of_month(year, month).unwrap();
        PerformanceService::update_weekly_score(
            &db.pool, rae.id, year, month, fridays[0], Some(5),
        )
        .await
        .unwrap();
        PerformanceService::update_weekly_score(
            &db.pool, abe.id, year, month, fridays[0], Some(3),
        )
        .await
        .unwrap();

        let board = PerformanceService::monthly_leaderboard(&db.pool).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_name, "Rae");
        assert_eq!(board[0].score, 5.0);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].user_name, "Abe");
        assert_eq!(board[1].rank, 2);
    }
}
