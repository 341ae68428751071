use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct DirectMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
    /// True when a user wrote to the admin rather than the other way around.
    pub is_reply: bool,
}

impl DirectMessage {
    pub async fn create(
        pool: &SqlitePool,
        sender_id: Uuid,
        recipient_id: Uuid,
        message: &str,
        is_reply: bool,
        message_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DirectMessage>(
            r#"INSERT INTO direct_messages (id, sender_id, recipient_id, message, sent_at, read, is_reply)
               VALUES ($1, $2, $3, $4, $5, 0, $6)
               RETURNING *"#,
        )
        .bind(message_id)
        .bind(sender_id)
        .bind(recipient_id)
        .bind(message)
        .bind(Utc::now())
        .bind(is_reply)
        .fetch_one(pool)
        .await
    }

    /// Both directions of a two-party conversation, oldest first.
    pub async fn conversation(
        pool: &SqlitePool,
        user_id: Uuid,
        contact_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DirectMessage>(
            r#"SELECT * FROM direct_messages
               WHERE (sender_id = $1 AND recipient_id = $2)
                  OR (sender_id = $2 AND recipient_id = $1)
               ORDER BY sent_at ASC"#,
        )
        .bind(user_id)
        .bind(contact_id)
        .fetch_all(pool)
        .await
    }

    pub async fn unread_count(pool: &SqlitePool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM direct_messages WHERE recipient_id = $1 AND read = 0",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Unread messages `sender_id` has waiting for `recipient_id`.
    pub async fn unread_from(
        pool: &SqlitePool,
        recipient_id: Uuid,
        sender_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM direct_messages
               WHERE recipient_id = $1 AND sender_id = $2 AND read = 0"#,
        )
        .bind(recipient_id)
        .bind(sender_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// The most recent message between two parties, in either direction.
    pub async fn last_between(
        pool: &SqlitePool,
        user_id: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DirectMessage>(
            r#"SELECT * FROM direct_messages
               WHERE (sender_id = $1 AND recipient_id = $2)
                  OR (sender_id = $2 AND recipient_id = $1)
               ORDER BY sent_at DESC
               LIMIT 1"#,
        )
        .bind(user_id)
        .bind(contact_id)
        .fetch_optional(pool)
        .await
    }

    /// Mark everything `contact_id` sent to `user_id` as read. Returns how
    /// many rows changed.
    pub async fn mark_conversation_read(
        pool: &SqlitePool,
        user_id: Uuid,
        contact_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE direct_messages SET read = 1
               WHERE recipient_id = $1 AND sender_id = $2 AND read = 0"#,
        )
        .bind(user_id)
        .bind(contact_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::user::{CreateUser, User},
    };

    async fn user(db: &DBService, name: &str, pin: &str, is_admin: bool) -> User {
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
    async fn unread_count_drops_after_marking_conversation_read() {
        let db = DBService::new_in_memory().await.unwrap();
        let admin = user(&db, "Admin", "0001", true).await;
        let rae = user(&db, "Rae", "0002", false).await;

        DirectMessage::create(&db.pool, admin.id, rae.id, "ping", false, Uuid::new_v4())
            .await
            .unwrap();
        DirectMessage::create(&db.pool, admin.id, rae.id, "ping again", false, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(DirectMessage::unread_count(&db.pool, rae.id).await.unwrap(), 2);

        let changed = DirectMessage::mark_conversation_read(&db.pool, rae.id, admin.id)
            .await
            .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(DirectMessage::unread_count(&db.pool, rae.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn conversation_is_ordered_oldest_first() {
        let db = DBService::new_in_memory().await.unwrap();
        let admin = user(&db, "Admin", "0001", true).await;
        let rae = user(&db, "Rae", "0002", false).await;

        DirectMessage::create(&db.pool, admin.id, rae.id, "first", false, Uuid::new_v4())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        DirectMessage::create(&db.pool, rae.id, admin.id, "second", true, Uuid::new_v4())
            .await
            .unwrap();

        let thread = DirectMessage::conversation(&db.pool, rae.id, admin.id)
            .await
            .unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].message, "first");
        assert_eq!(thread[1].message, "second");
        assert!(thread[1].is_reply);
    }
}
