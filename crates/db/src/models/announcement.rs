use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Admin broadcast. `recipient_user_id = None` means every user can see it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Announcement {
    pub id: Uuid,
    pub message: String,
    pub recipient_user_id: Option<Uuid>,
    pub sent_by_name: String,
    pub created_at: DateTime<Utc>,
}

/// Announcement plus the ids of users who marked it read.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AnnouncementWithReads {
    #[serde(flatten)]
    #[ts(flatten)]
    pub announcement: Announcement,
    pub read_by: Vec<Uuid>,
}

impl Announcement {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>("SELECT * FROM announcements WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>("SELECT * FROM announcements ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    /// Announcements a user can see: ones addressed to them plus broadcasts.
    pub async fn find_visible_to_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(
            r#"SELECT * FROM announcements
               WHERE recipient_user_id IS NULL OR recipient_user_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        message: &str,
        recipient_user_id: Option<Uuid>,
        sent_by_name: &str,
        announcement_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(
            r#"INSERT INTO announcements (id, message, recipient_user_id, sent_by_name, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(announcement_id)
        .bind(message)
        .bind(recipient_user_id)
        .bind(sent_by_name)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn mark_read(
        pool: &SqlitePool,
        announcement_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO announcement_reads (announcement_id, user_id) VALUES ($1, $2)",
        )
        .bind(announcement_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn read_by(pool: &SqlitePool, announcement_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM announcement_reads WHERE announcement_id = $1")
                .bind(announcement_id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn with_reads(self, pool: &SqlitePool) -> Result<AnnouncementWithReads, sqlx::Error> {
        let read_by = Self::read_by(pool, self.id).await?;
        Ok(AnnouncementWithReads {
            announcement: self,
            read_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::user::{CreateUser, User},
    };

    async fn user(db: &DBService, name: &str, pin: &str) -> User {
        User::create(
            &db.pool,
            &CreateUser {
                name: name.to_string(),
                email: None,
                pin: pin.to_string(),
                is_admin: false,
                avatar_url: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn broadcasts_are_visible_to_everyone() {
        let db = DBService::new_in_memory().await.unwrap();
        let a = user(&db, "A", "1111").await;
        let b = user(&db, "B", "2222").await;

        Announcement::create(&db.pool, "hello all", None, "Admin", Uuid::new_v4())
            .await
            .unwrap();
        Announcement::create(&db.pool, "just for A", Some(a.id), "Admin", Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(
            Announcement::find_visible_to_user(&db.pool, a.id)
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            Announcement::find_visible_to_user(&db.pool, b.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let db = DBService::new_in_memory().await.unwrap();
        let a = user(&db, "A", "1111").await;
        let anno = Announcement::create(&db.pool, "hi", None, "Admin", Uuid::new_v4())
            .await
            .unwrap();

        Announcement::mark_read(&db.pool, anno.id, a.id).await.unwrap();
        Announcement::mark_read(&db.pool, anno.id, a.id).await.unwrap();

        assert_eq!(
            Announcement::read_by(&db.pool, anno.id).await.unwrap(),
            vec![a.id]
        );
    }
}
