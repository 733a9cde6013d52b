//! Admins and parents log in through the same endpoint, so a login name
//! may belong to at most one account across both tables.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::parents::repo::parents_with_username;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    Admin(Uuid),
    Parent(Uuid),
}

/// True when someone other than `current` already holds the name.
fn is_taken(holders: &[Account], current: Option<Account>) -> bool {
    holders.iter().any(|h| Some(*h) != current)
}

async fn holders(pool: &PgPool, username: &str) -> Result<Vec<Account>, AppError> {
    let admins: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM admins WHERE username = $1")
        .bind(username)
        .fetch_all(pool)
        .await?;
    let parents = parents_with_username(pool, username).await?;

    Ok(admins
        .into_iter()
        .map(Account::Admin)
        .chain(parents.into_iter().map(|p| Account::Parent(p.id)))
        .collect())
}

/// Rejects `username` if it belongs to any account other than `current`.
/// Pass `None` when creating a new account.
pub async fn ensure_username_free(
    pool: &PgPool,
    username: &str,
    current: Option<Account>,
) -> Result<(), AppError> {
    if is_taken(&holders(pool, username).await?, current) {
        return Err(AppError::Validation(format!(
            "username '{username}' is already taken"
        )));
    }
    Ok(())
}
