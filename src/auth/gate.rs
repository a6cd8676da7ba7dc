use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};

use crate::auth::session::SessionState;
use crate::errors::AppError;
use crate::utils;

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.split_whitespace().nth(1))
}

/// Route-level guard: the request must carry a valid token whose session is
/// still active. Sign-out revokes the session id, so a token alone is not
/// enough.
pub fn require_session(req: &HttpRequest, sessions: &SessionState) -> Result<utils::jwt::Claims, AppError> {
    let token = bearer_token(req).ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    let claims = utils::jwt::validate_token(token)
        .map_err(|err| AppError::Unauthorized(err.to_string()))?;

    if !sessions.is_active(&claims.jti) {
        return Err(AppError::Unauthorized("Session revoked".to_string()));
    }

    Ok(claims)
}

pub fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
