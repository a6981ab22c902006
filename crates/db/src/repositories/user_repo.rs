//! Read-only access to the externally managed `users` table.

use flowwatch_core::types::DbId;
use sqlx::PgPool;

pub struct UserRepo;

impl UserRepo {
    /// Account email for a user, if the user exists.
    pub async fn find_email(pool: &PgPool, user_id: DbId) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
