/// Auth service - reader registration, login and token refresh
use crate::app_state::AppState;
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::models::{NewUser, UserResponse};
use crate::security::{hash_password, verify_password};
use crypto_core::jwt::{self, TokenPair};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
}

/// Emails are compared and stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
        }
    }

    pub async fn register(&self, email: &str, password: &str, full_name: &str) -> Result<AuthResponse> {
        // Nothing is stored unless tokens can be handed back afterwards.
        if !jwt::can_issue_tokens() {
            return Err(AppError::Internal(
                "registration unavailable: token signing key not configured".to_string(),
            ));
        }

        let email = normalize_email(email);
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_user(NewUser {
                email,
                full_name: full_name.trim().to_string(),
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "reader registered");
        let tokens = issue_tokens(&user.id, &user.email)?;
        Ok(AuthResponse {
            user: UserResponse::from(&user),
            tokens,
        })
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "login rejected");
            return Err(invalid());
        }

        let tokens = issue_tokens(&user.id, &user.email)?;
        Ok(AuthResponse {
            user: UserResponse::from(&user),
            tokens,
        })
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let invalid = || AppError::Unauthorized("Token is invalid or expired".to_string());

        let claims = jwt::validate_refresh_token(refresh_token).map_err(|_| invalid())?;
        let user_id = claims.user_id().map_err(|_| invalid())?;
        let user = self.users.find_by_id(user_id).await?.ok_or_else(invalid)?;

        let access = jwt::generate_access_token(user.id, &user.email)
            .map_err(|e| AppError::Internal(format!("token issue failed: {e}")))?;
        Ok(RefreshResponse { access })
    }
}

fn issue_tokens(user_id: &uuid::Uuid, email: &str) -> Result<TokenPair> {
    jwt::generate_token_pair(*user_id, email)
        .map_err(|e| AppError::Internal(format!("token issue failed: {e}")))
}
