/// Account handlers - register, login and refresh
use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::services::AuthService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password_confirm: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub full_name: String,
}

impl RegisterRequest {
    fn check_passwords_match(&self) -> Result<()> {
        if self.password != self.password_confirm {
            return Err(AppError::field("password_confirm", "Passwords don't match."));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub email: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub refresh: String,
}

pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    req.check_passwords_match()?;
    let response = AuthService::new(&state)
        .register(&req.email, &req.password, &req.full_name)
        .await?;
    Ok(HttpResponse::Created().json(response))
}

pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let response = AuthService::new(&state)
        .login(&req.email, &req.password)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn refresh(
    state: web::Data<AppState>,
    req: web::Json<RefreshRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let response = AuthService::new(&state).refresh(&req.refresh).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password: &str, password_confirm: &str) -> RegisterRequest {
        RegisterRequest {
            email: "reader@example.com".to_string(),
            password: password.to_string(),
            password_confirm: password_confirm.to_string(),
            full_name: String::new(),
        }
    }

    #[test]
    fn mismatched_confirmation_is_a_field_error() {
        let err = request("reader-pass-42", "reader-pass-43")
            .check_passwords_match()
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref e) if e.contains_key("password_confirm")));

        assert!(request("reader-pass-42", "reader-pass-42")
            .check_passwords_match()
            .is_ok());
    }
}
