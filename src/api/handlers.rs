use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::model::{CreatedEmployee, Employee, Id, NewEmployee, PatchDocument};
use crate::store::{Store, StoreError};

pub type AppState<S> = Arc<S>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

fn error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

fn employee_not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "Employee not found.")
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    log::debug!("Rejected request body: {}", rejection.body_text());
    error(StatusCode::BAD_REQUEST, &rejection.body_text())
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::InvalidPatch(e) => error(StatusCode::BAD_REQUEST, &e.to_string()),
        StoreError::Conflict(message) => error(StatusCode::CONFLICT, &message),
        other => {
            log::error!("Storage failure: {}", other);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

pub async fn create_employee<S: Store>(
    State(store): State<AppState<S>>,
    payload: Result<Json<NewEmployee>, JsonRejection>,
) -> Result<Json<CreatedEmployee>, ApiError> {
    let Json(employee) = payload.map_err(bad_body)?;

    let id = store.create_employee(&employee).await.map_err(store_error)?;
    Ok(Json(CreatedEmployee { id }))
}

pub async fn get_employee<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<Employee>, ApiError> {
    match store.get_employee(id).await {
        Ok(Some(employee)) => Ok(Json(employee)),
        Ok(None) => Err(employee_not_found()),
        Err(e) => Err(store_error(e)),
    }
}

pub async fn delete_employee<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    match store.delete_employee(id).await {
        Ok(true) => {
            log::info!("Deleted employee {}", id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => {
            log::debug!("Delete of unknown employee {}", id);
            Err(employee_not_found())
        }
        Err(e) => Err(store_error(e)),
    }
}

/// An empty result is a successful empty list, not a 404.
pub async fn list_company_employees<S: Store>(
    State(store): State<AppState<S>>,
    Path(company_id): Path<Id>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    let employees = store.find_by_company(company_id).await.map_err(store_error)?;
    Ok(Json(employees))
}

pub async fn list_department_employees<S: Store>(
    State(store): State<AppState<S>>,
    Path(department_id): Path<Id>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    let employees = store
        .find_by_department(department_id)
        .await
        .map_err(store_error)?;
    Ok(Json(employees))
}

pub async fn patch_employee<S: Store>(
    State(store): State<AppState<S>>,
    Path(id): Path<Id>,
    payload: Result<Json<Option<PatchDocument>>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(document) = payload.map_err(bad_body)?;
    let Some(document) = document else {
        return Err(error(StatusCode::BAD_REQUEST, "Patch document is required"));
    };

    match store.patch_employee(id, &document).await {
        Ok(true) => {
            log::info!("Patched employee {}", id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(employee_not_found()),
        Err(e) => Err(store_error(e)),
    }
}
