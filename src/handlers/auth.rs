use actix_web::{web, HttpRequest, HttpResponse};
use argon2::{password_hash::PasswordHasher, password_hash::SaltString, Argon2, PasswordVerifier};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::gate;
use crate::auth::session::SessionState;
use crate::errors::AppError;
use crate::models::user::User;
use crate::utils;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 6))]
    password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    email: String,
    token: String,
    redirect: String,
}

fn map_db_error(err: sqlx::Error) -> AppError {
    log::error!("Database error: {:?}", err);
    AppError::DatabaseError("Database error".to_string())
}

/// Sign-in. On success the session is recorded and the caller is pointed
/// back at the root route.
pub async fn login(
    payload: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    sessions: web::Data<SessionState>,
) -> Result<HttpResponse, actix_web::Error> {
    utils::validation::validate_payload(&payload.0)?;

    let user = sqlx::query_as::<_, User>(
        "SELECT user_id, email, password, created_at, updated_at \
         FROM users WHERE LOWER(email) = LOWER($1)",
    )
    .bind(&payload.email)
    .fetch_optional(&**pool)
    .await
    .map_err(map_db_error)?
    .ok_or_else(|| {
        log::error!("Error logging in: unknown email");
        AppError::Unauthorized("Invalid email or password".to_string())
    })?;

    let parsed_hash = argon2::PasswordHash::new(&user.password)
        .map_err(|_| AppError::InternalServerError("Invalid password hash".to_string()))?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|err| {
            log::error!("Error logging in: {}", err);
            AppError::Unauthorized("Invalid email or password".to_string())
        })?;

    let session_id = Uuid::new_v4().to_string();
    let token = utils::jwt::generate_token(&user.user_id.to_string(), &session_id)
        .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))?;
    sessions.sign_in(&session_id);

    Ok(HttpResponse::Ok().json(AuthResponse {
        email: user.email,
        token,
        redirect: "/".to_string(),
    }))
}

/// The login form resource. An already-authenticated caller never sees the
/// form; it is sent straight back to the root route.
pub async fn login_form(
    req: HttpRequest,
    sessions: web::Data<SessionState>,
) -> HttpResponse {
    if gate::require_session(&req, &sessions).is_ok() {
        return gate::redirect_to("/");
    }

    HttpResponse::Ok().json(json!({
        "form": "login",
        "fields": {
            "email": "required",
            "password": "required, minimum 6 characters"
        }
    }))
}

/// Sign-out. Revokes the presented session id; idempotent, so a missing or
/// expired token still answers with the login redirect.
pub async fn logout(
    req: HttpRequest,
    sessions: web::Data<SessionState>,
) -> Result<HttpResponse, actix_web::Error> {
    if let Some(token) = gate::bearer_token(&req) {
        if let Ok(claims) = utils::jwt::validate_token(token) {
            sessions.sign_out(&claims.jti);
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "redirect": "/login" })))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 6))]
    password: String,
}

/// Provisions an admin account and signs it in.
pub async fn register(
    payload: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    sessions: web::Data<SessionState>,
) -> Result<HttpResponse, actix_web::Error> {
    utils::validation::validate_payload(&payload.0)?;

    let exists: Option<String> =
        sqlx::query_scalar("SELECT email FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(&payload.email)
            .fetch_optional(&**pool)
            .await
            .map_err(map_db_error)?;
    if exists.is_some() {
        return Err(AppError::Conflict("Email already exists".to_string()).into());
    }

    let salt = SaltString::generate(&mut rand::thread_rng());
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|_| AppError::InternalServerError("Hashing error".to_string()))?
        .to_string();

    let user_id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (user_id, email, password, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .execute(&**pool)
    .await
    .map_err(map_db_error)?;

    let session_id = Uuid::new_v4().to_string();
    let token = utils::jwt::generate_token(&user_id.to_string(), &session_id)
        .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))?;
    sessions.sign_in(&session_id);

    Ok(HttpResponse::Created().json(AuthResponse {
        email: payload.email.clone(),
        token,
        redirect: "/".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_payload_requires_a_valid_email() {
        let payload = LoginRequest {
            email: "not-an-email".to_string(),
            password: "secret-password".to_string(),
        };
        assert!(utils::validation::validate_payload(&payload).is_err());
    }

    #[test]
    fn login_payload_requires_six_character_passwords() {
        let payload = LoginRequest {
            email: "admin@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(utils::validation::validate_payload(&payload).is_err());

        let payload = LoginRequest {
            email: "admin@example.com".to_string(),
            password: "longer".to_string(),
        };
        assert!(utils::validation::validate_payload(&payload).is_ok());
    }

    #[actix_web::test]
    async fn login_form_redirects_an_authenticated_caller() {
        std::env::set_var("JWT_SECRET", "test-secret");
        let sessions = web::Data::new(SessionState::new());
        sessions.sign_in("s1");
        let token = utils::jwt::generate_token("user-1", "s1").unwrap();

        let req = actix_web::test::TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();
        let resp = login_form(req, sessions).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
    }

    #[actix_web::test]
    async fn login_form_renders_for_anonymous_callers() {
        let sessions = web::Data::new(SessionState::new());
        let req = actix_web::test::TestRequest::default().to_http_request();
        let resp = login_form(req, sessions).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    }

    #[actix_web::test]
    async fn logout_revokes_the_session() {
        std::env::set_var("JWT_SECRET", "test-secret");
        let sessions = web::Data::new(SessionState::new());
        sessions.sign_in("s1");
        let token = utils::jwt::generate_token("user-1", "s1").unwrap();

        let req = actix_web::test::TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();
        logout(req, sessions.clone()).await.unwrap();
        assert!(!sessions.is_active("s1"));
    }

    #[actix_web::test]
    async fn logout_without_a_token_still_succeeds() {
        let sessions = web::Data::new(SessionState::new());
        let req = actix_web::test::TestRequest::default().to_http_request();
        let resp = logout(req, sessions).await.unwrap();
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    }
}
