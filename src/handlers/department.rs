use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::gate;
use crate::auth::session::SessionState;
use crate::cache::DepartmentCache;
use crate::db;
use crate::models::department::Plo;
use crate::utils;

/// The root listing: every department with its PLO array, served from the
/// snapshot cache. Anonymous callers are sent to the login route instead of
/// getting a bare 401, mirroring the page-level guard.
pub async fn index(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    cache: web::Data<DepartmentCache>,
    sessions: web::Data<SessionState>,
) -> Result<HttpResponse, actix_web::Error> {
    if gate::require_session(&req, &sessions).is_err() {
        return Ok(gate::redirect_to("/login"));
    }

    let departments = cache.departments(&pool).await?;
    Ok(HttpResponse::Ok().json(&*departments))
}

#[derive(Deserialize, Validate)]
pub struct NewPlo {
    #[serde(rename = "PLO")]
    #[validate(length(min = 1))]
    plo: String,
}

pub async fn add_plo(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    cache: web::Data<DepartmentCache>,
    sessions: web::Data<SessionState>,
    department_id: web::Path<String>,
    payload: web::Json<NewPlo>,
) -> Result<HttpResponse, actix_web::Error> {
    gate::require_session(&req, &sessions)?;
    utils::validation::validate_payload(&payload.0)?;

    let entry = Plo {
        plo: payload.plo.clone(),
    };
    db::departments::add_plo(&pool, &department_id, &entry)
        .await
        .map_err(|err| {
            log::error!("Error adding PLO: {}", err);
            err
        })?;

    cache.invalidate(&pool).await;
    Ok(HttpResponse::Created().json(entry))
}

fn validate_plo_entry(plo: &Plo) -> Result<(), validator::ValidationError> {
    if plo.plo.is_empty() {
        return Err(validator::ValidationError::new("empty"));
    }
    Ok(())
}

#[derive(Deserialize, Validate)]
pub struct PloEdit {
    old: Plo,
    #[validate(custom = "validate_plo_entry")]
    new: Plo,
}

pub async fn edit_plo(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    cache: web::Data<DepartmentCache>,
    sessions: web::Data<SessionState>,
    department_id: web::Path<String>,
    payload: web::Json<PloEdit>,
) -> Result<HttpResponse, actix_web::Error> {
    gate::require_session(&req, &sessions)?;
    utils::validation::validate_payload(&payload.0)?;

    db::departments::edit_plo(&pool, &department_id, &payload.old, &payload.new)
        .await
        .map_err(|err| {
            log::error!("Error editing PLO: {}", err);
            err
        })?;

    cache.invalidate(&pool).await;
    Ok(HttpResponse::Ok().json(&payload.new))
}

pub async fn delete_plo(
    req: HttpRequest,
    pool: web::Data<sqlx::PgPool>,
    cache: web::Data<DepartmentCache>,
    sessions: web::Data<SessionState>,
    department_id: web::Path<String>,
    payload: web::Json<Plo>,
) -> Result<HttpResponse, actix_web::Error> {
    gate::require_session(&req, &sessions)?;

    db::departments::delete_plo(&pool, &department_id, &payload)
        .await
        .map_err(|err| {
            log::error!("Error deleting PLO: {}", err);
            err
        })?;

    cache.invalidate(&pool).await;
    Ok(HttpResponse::Ok().json(json!({
        "message": "PLO deleted successfully",
    })))
}
