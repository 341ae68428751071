//! PIN-based authentication and user administration.
//!
//! PINs are 4-digit, unique across users, and stored in the clear; the login
//! response is the whole user record, which the client keeps locally. There
//! are no session tokens.

use db::models::user::{CreateUser, User};
use rand::Rng;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

const PIN_GENERATION_ATTEMPTS: usize = 50;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("PIN must be exactly 4 digits")]
    MalformedPin,
    #[error("this PIN is already in use by another user")]
    PinInUse,
    #[error("email conflicts with an existing user")]
    EmailInUse,
    #[error("could not generate an unused PIN")]
    PinSpaceExhausted,
    #[error("user not found")]
    UserNotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("admin cannot delete their own account")]
    CannotDeleteSelf,
}

pub struct AuthService;

impl AuthService {
    fn validate_pin_format(pin: &str) -> Result<(), AuthError> {
        if pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit()) {
            Ok(())
        } else {
            Err(AuthError::MalformedPin)
        }
    }

    /// Look up the user owning this PIN. Returns `None` for an unknown PIN
    /// so callers can distinguish a failed login from a storage failure.
    pub async fn login(pool: &SqlitePool, pin: &str) -> Result<Option<User>, AuthError> {
        Self::validate_pin_format(pin)?;
        let user = User::find_by_pin(pool, pin).await?;
        if let Some(user) = &user {
            info!(user_id = %user.id, is_admin = user.is_admin, "user logged in");
        }
        Ok(user)
    }

    /// Re-check a logged-in user's PIN (used before sensitive actions).
    pub async fn verify_pin(pool: &SqlitePool, user_id: Uuid, pin: &str) -> Result<bool, AuthError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(user.pin == pin)
    }

    /// Change a user's own PIN. Rejects malformed PINs and PINs already held
    /// by someone else.
    pub async fn update_pin(
        pool: &SqlitePool,
        user_id: Uuid,
        new_pin: &str,
    ) -> Result<User, AuthError> {
        Self::validate_pin_format(new_pin)?;
        if let Some(holder) = User::find_by_pin(pool, new_pin).await? {
            if holder.id != user_id {
                return Err(AuthError::PinInUse);
            }
        }
        Ok(User::update_pin(pool, user_id, new_pin).await?)
    }

    /// Admin-driven PIN reset for another user.
    pub async fn admin_update_pin(
        pool: &SqlitePool,
        acting_user_id: Uuid,
        target_user_id: Uuid,
        new_pin: &str,
    ) -> Result<User, AuthError> {
        Self::require_admin(pool, acting_user_id).await?;
        Self::validate_pin_format(new_pin)?;
        if let Some(holder) = User::find_by_pin(pool, new_pin).await? {
            if holder.id != target_user_id {
                return Err(AuthError::PinInUse);
            }
        }
        if User::find_by_id(pool, target_user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }
        Ok(User::update_pin(pool, target_user_id, new_pin).await?)
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        user_id: Uuid,
        name: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, AuthError> {
        if User::find_by_id(pool, user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }
        Ok(User::update_profile(pool, user_id, name, avatar_url).await?)
    }

    pub async fn add_user(
        pool: &SqlitePool,
        acting_user_id: Uuid,
        name: &str,
        email: &str,
        pin: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, AuthError> {
        Self::require_admin(pool, acting_user_id).await?;
        Self::validate_pin_format(pin)?;

        if User::find_by_pin(pool, pin).await?.is_some() {
            return Err(AuthError::PinInUse);
        }
        let email = email.to_lowercase();
        if User::find_by_email(pool, &email).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let user = User::create(
            pool,
            &CreateUser {
                name: name.to_string(),
                email: Some(email),
                pin: pin.to_string(),
                is_admin: false,
                avatar_url: avatar_url.map(str::to_string),
            },
            Uuid::new_v4(),
        )
        .await?;
        info!(user_id = %user.id, "admin added user");
        Ok(user)
    }

    pub async fn delete_user(
        pool: &SqlitePool,
        acting_user_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<(), AuthError> {
        Self::require_admin(pool, acting_user_id).await?;
        if acting_user_id == target_user_id {
            return Err(AuthError::CannotDeleteSelf);
        }
        if User::delete(pool, target_user_id).await? == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    /// Pick a random 4-digit PIN no existing user holds.
    pub async fn generate_pin(pool: &SqlitePool) -> Result<String, AuthError> {
        for _ in 0..PIN_GENERATION_ATTEMPTS {
            // ThreadRng is not Send, so it must not live across the await below.
            let candidate = format!("{:04}", rand::thread_rng().gen_range(0..10_000));
            if User::find_by_pin(pool, &candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(AuthError::PinSpaceExhausted)
    }

    /// Load the acting user and fail unless they are an admin.
    pub async fn require_admin(pool: &SqlitePool, user_id: Uuid) -> Result<User, AuthError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        if !user.is_admin {
            return Err(AuthError::Unauthorized);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::DBService;

    async fn seed(db: &DBService, name: &str, pin: &str, is_admin: bool) -> User {
        User::create(
            &db.pool,
            &CreateUser {
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase())),
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
    async fn login_rejects_malformed_pins_and_misses_unknown_ones() {
        let db = DBService::new_in_memory().await.unwrap();
        seed(&db, "Rae", "4821", false).await;

        assert!(matches!(
            AuthService::login(&db.pool, "48211").await,
            Err(AuthError::MalformedPin)
        ));
        assert!(matches!(
            AuthService::login(&db.pool, "48a1").await,
            Err(AuthError::MalformedPin)
        ));
        assert!(AuthService::login(&db.pool, "9999").await.unwrap().is_none());
        assert!(AuthService::login(&db.pool, "4821").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_pin_refuses_another_users_pin() {
        let db = DBService::new_in_memory().await.unwrap();
        let rae = seed(&db, "Rae", "1111", false).await;
        seed(&db, "Abe", "2222", false).await;

        assert!(matches!(
            AuthService::update_pin(&db.pool, rae.id, "2222").await,
            Err(AuthError::PinInUse)
        ));
        // Re-submitting your own PIN is allowed.
        assert!(AuthService::update_pin(&db.pool, rae.id, "1111").await.is_ok());
    }

    #[tokio::test]
    async fn only_admins_can_add_and_delete_users() {
        let db = DBService::new_in_memory().await.unwrap();
        let admin = seed(&db, "Admin", "0001", true).await;
        let rae = seed(&db, "Rae", "0002", false).await;

        assert!(matches!(
            AuthService::add_user(&db.pool, rae.id, "Eve", "eve@example.com", "3333", None).await,
            Err(AuthError::Unauthorized)
        ));

        let eve = AuthService::add_user(&db.pool, admin.id, "Eve", "EVE@Example.com", "3333", None)
            .await
            .unwrap();
        assert_eq!(eve.email.as_deref(), Some("eve@example.com"));
        assert!(!eve.is_admin);

        assert!(matches!(
            AuthService::delete_user(&db.pool, admin.id, admin.id).await,
            Err(AuthError::CannotDeleteSelf)
        ));
        AuthService::delete_user(&db.pool, admin.id, eve.id).await.unwrap();
        assert!(User::find_by_id(&db.pool, eve.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn generated_pins_are_valid_and_unused() {
        let db = DBService::new_in_memory().await.unwrap();
        seed(&db, "Rae", "1111", false).await;

        let pin = AuthService::generate_pin(&db.pool).await.unwrap();
        assert_eq!(pin.len(), 4);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));
        assert!(User::find_by_pin(&db.pool, &pin).await.unwrap().is_none());
    }
}
