use crate::errors::AppError;
use crate::models::department::{replace_plo, Department, Plo};
use sqlx::types::Json;
use sqlx::PgPool;

fn map_db_error(err: sqlx::Error) -> AppError {
    log::error!("Database error: {:?}", err);
    AppError::DatabaseError("Database error".to_string())
}

/// Reads every department document, identifier included. Any read failure
/// collapses into one generic fetch error.
pub async fn fetch_departments(pool: &PgPool) -> Result<Vec<Department>, AppError> {
    sqlx::query_as::<_, Department>(
        "SELECT department_id, department_name, faculty_id, image, quantity, plos \
         FROM departments ORDER BY department_name",
    )
    .fetch_all(pool)
    .await
    .map_err(|err| {
        log::error!("Error fetching departments: {:?}", err);
        AppError::DatabaseError("Error fetching departments".to_string())
    })
}

/// Appends `new_plo` to the department's list with array-union semantics:
/// the write is a no-op when an equal element already exists.
pub async fn add_plo(pool: &PgPool, department_id: &str, new_plo: &Plo) -> Result<(), AppError> {
    let entry = serde_json::to_value(new_plo)
        .map_err(|err| AppError::InternalServerError(err.to_string()))?;

    let result = sqlx::query(
        "UPDATE departments \
         SET plos = CASE \
             WHEN plos @> jsonb_build_array($2::jsonb) THEN plos \
             ELSE plos || jsonb_build_array($2::jsonb) \
         END \
         WHERE department_id = $1",
    )
    .bind(department_id)
    .bind(entry)
    .execute(pool)
    .await
    .map_err(map_db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Department not found".to_string()));
    }
    Ok(())
}

/// Replaces `old_plo` with `new_plo` in a single read-modify-write
/// transaction, so an interruption can never lose the old entry without
/// adding the new one. Structurally equal values are a no-op.
pub async fn edit_plo(
    pool: &PgPool,
    department_id: &str,
    old_plo: &Plo,
    new_plo: &Plo,
) -> Result<(), AppError> {
    if old_plo == new_plo {
        return Ok(());
    }

    let mut tx = pool.begin().await.map_err(map_db_error)?;

    let row: Option<Json<Vec<Plo>>> =
        sqlx::query_scalar("SELECT plos FROM departments WHERE department_id = $1 FOR UPDATE")
            .bind(department_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;

    let Json(mut plos) = row.ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;
    replace_plo(&mut plos, old_plo, new_plo.clone());

    sqlx::query("UPDATE departments SET plos = $2 WHERE department_id = $1")
        .bind(department_id)
        .bind(Json(&plos))
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

    tx.commit().await.map_err(map_db_error)?;
    Ok(())
}

/// Removes every element structurally equal to `plo`, keeping the order of
/// the remaining entries.
pub async fn delete_plo(pool: &PgPool, department_id: &str, plo: &Plo) -> Result<(), AppError> {
    let entry = serde_json::to_value(plo)
        .map_err(|err| AppError::InternalServerError(err.to_string()))?;

    let result = sqlx::query(
        "UPDATE departments \
         SET plos = COALESCE( \
             (SELECT jsonb_agg(elem ORDER BY ord) \
                FROM jsonb_array_elements(plos) WITH ORDINALITY AS t(elem, ord) \
               WHERE elem <> $2::jsonb), \
             '[]'::jsonb) \
         WHERE department_id = $1",
    )
    .bind(department_id)
    .bind(entry)
    .execute(pool)
    .await
    .map_err(map_db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Department not found".to_string()));
    }
    Ok(())
}
