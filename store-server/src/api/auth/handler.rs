//! Authentication Handlers
//!
//! Handles login and current-user lookup

use std::time::Duration;

use axum::{Extension, Json, extract::State};

use crate::AppError;
use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::models::Account;
use crate::security_log;

// Re-use shared DTOs for API consistency
use shared::client::{LoginRequest, LoginResponse, UserInfo};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// Login handler
///
/// Authenticates user credentials and returns a JWT token
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let db = state.get_db();
    let username = req.username.clone();

    // Query account by username
    let mut result = db
        .query("SELECT * FROM account WHERE username = $username LIMIT 1")
        .bind(("username", username.clone()))
        .await
        .map_err(|e| AppError::database(format!("Query failed: {}", e)))?;

    let account: Option<Account> = result
        .take(0)
        .map_err(|e| AppError::database(format!("Failed to parse account: {}", e)))?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // Unified error message to prevent username enumeration
    let account = match account {
        Some(a) => {
            if !a.is_active {
                return Err(AppError::forbidden("Account has been disabled".to_string()));
            }

            let password_valid = a
                .verify_password(&req.password)
                .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;

            if !password_valid {
                security_log!(
                    "WARN",
                    "login_failed",
                    username = username.clone(),
                    reason = "invalid_credentials"
                );
                return Err(AppError::invalid_credentials());
            }

            a
        }
        None => {
            security_log!(
                "WARN",
                "login_failed",
                username = username.clone(),
                reason = "user_not_found"
            );
            return Err(AppError::invalid_credentials());
        }
    };

    // Generate JWT token
    let jwt_service = state.get_jwt_service();
    let user_id = account
        .id
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_default();
    let role = Role::parse(&account.role);

    let token = jwt_service
        .generate_token(&user_id, &account.username, &account.display_name, role)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    tracing::info!(
        user_id = %user_id,
        username = %account.username,
        role = %role,
        "User logged in successfully"
    );

    let response = LoginResponse {
        token,
        user: UserInfo {
            id: user_id,
            username: account.username,
            display_name: account.display_name,
            role: role.as_str().to_string(),
        },
    };

    Ok(Json(response))
}

/// Get current user info
pub async fn me(Extension(user): Extension<CurrentUser>) -> Result<Json<UserInfo>, AppError> {
    Ok(Json(UserInfo {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        role: user.role.as_str().to_string(),
    }))
}
