use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Employees
        .route("/employees", post(handlers::create_employee::<S>))
        .route(
            "/employees/:id",
            get(handlers::get_employee::<S>)
                .delete(handlers::delete_employee::<S>)
                .patch(handlers::patch_employee::<S>),
        )
        .route(
            "/employees/company/:company_id",
            get(handlers::list_company_employees::<S>),
        )
        .route(
            "/employees/department/:department_id",
            get(handlers::list_department_employees::<S>),
        )
}
