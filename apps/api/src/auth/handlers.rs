use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::password::{legacy_password_matches, verify_password};
use crate::errors::AppError;
use crate::models::admin::AdminRow;
use crate::models::parent::Parent;
use crate::parents::repo::parents_with_username;
use crate::state::AppState;
use crate::validate::required_text;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Who logged in. Session handling is left to the client.
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum LoginResponse {
    Admin { admin: AdminRow },
    Parent { parent: Parent },
}

/// True when `plain` matches either a stored hash or a legacy plain password.
fn parent_password_matches(parent: &Parent, plain: &str) -> bool {
    match (&parent.password_hash, &parent.legacy_password) {
        (Some(hash), _) => verify_password(plain, hash),
        (None, Some(legacy)) => legacy_password_matches(plain, legacy),
        (None, None) => false,
    }
}

/// The first candidate whose password matches. Usernames are unique for
/// migrated rows, but unmigrated legacy rows may still share one.
fn matching_parent(candidates: Vec<Parent>, plain: &str) -> Option<Parent> {
    candidates
        .into_iter()
        .find(|p| parent_password_matches(p, plain))
}

/// POST /api/auth/login
///
/// Checks admins first, then parents.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let username = required_text("username", &req.username)?;
    let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

    let admin = sqlx::query_as::<_, AdminRow>("SELECT * FROM admins WHERE username = $1")
        .bind(&username)
        .fetch_optional(&state.db)
        .await?;
    if let Some(admin) = admin.filter(|a| verify_password(&req.password, &a.password_hash)) {
        tracing::info!("Admin {} logged in", admin.id);
        return Ok(Json(LoginResponse::Admin { admin }));
    }

    let candidates = parents_with_username(&state.db, &username).await?;
    match matching_parent(candidates, &req.password) {
        Some(parent) => {
            tracing::info!("Parent {} logged in", parent.id);
            Ok(Json(LoginResponse::Parent { parent }))
        }
        None => Err(invalid()),
    }
}
